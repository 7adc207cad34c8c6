//! Integration tests for the engine.
//!
//! These tests parse JavaScript source code, compile it to closures and run it
//! to verify end-to-end functionality.

extern crate closure_js;

use closure_js::parser::JsParser;
use closure_js::runner::api::{Engine, EngineError};
use closure_js::runner::compiler::{compile_program, CompileOptions};
use closure_js::runner::ds::realm::Realm;
use closure_js::runner::ds::value::JsValue;
use closure_js::runner::std_lib::register_builtins;

/// Helper to run JavaScript code, returning the value of the last expression statement.
fn run_js(code: &str) -> Result<JsValue, String> {
    Engine::new().eval(code).map_err(|e| e.to_string())
}

/// Helper to run JS and get a specific global's value.
fn run_js_get_var(code: &str, var_name: &str) -> Result<JsValue, String> {
    let engine = Engine::new();
    engine.eval(code).map_err(|e| e.to_string())?;
    engine
        .global(var_name)
        .ok_or_else(|| format!("{} is not defined", var_name))
}

fn num(n: f64) -> JsValue {
    JsValue::Number(n)
}

// ============================================================================
// Basic Arithmetic Tests
// ============================================================================

#[test]
fn test_simple_addition() {
    assert_eq!(run_js("1 + 2").unwrap(), num(3.0));
}

#[test]
fn test_arithmetic_with_parens() {
    assert_eq!(run_js("(2 + 3) * 4 - 6 / 3").unwrap(), num(18.0));
}

#[test]
fn test_modulo_and_division() {
    assert_eq!(run_js("17 % 5").unwrap(), num(2.0));
    assert_eq!(run_js("-7 % 3").unwrap(), num(-1.0));
    assert_eq!(run_js("1 / 0").unwrap(), num(f64::INFINITY));
}

#[test]
fn test_number_literals() {
    assert_eq!(run_js("0x1F").unwrap(), num(31.0));
    assert_eq!(run_js("1.5e3").unwrap(), num(1500.0));
    assert_eq!(run_js(".25").unwrap(), num(0.25));
}

// ============================================================================
// Variable Declaration and Assignment Tests
// ============================================================================

#[test]
fn test_var_declaration() {
    assert_eq!(run_js_get_var("var x = 5;", "x").unwrap(), num(5.0));
}

#[test]
fn test_var_without_initializer_is_undefined() {
    assert_eq!(run_js_get_var("var x;", "x").unwrap(), JsValue::Undefined);
}

#[test]
fn test_variable_reassignment_and_compound() {
    assert_eq!(
        run_js_get_var("var x = 5; x = 10; x += 5; x *= 2;", "x").unwrap(),
        num(30.0)
    );
}

#[test]
fn test_hoisted_var_reads_undefined() {
    assert_eq!(run_js("typeof early; var early = 1;").unwrap(), JsValue::from_str("undefined"));
}

#[test]
fn test_undeclared_read_is_reference_error() {
    let err = run_js("missing + 1").unwrap_err();
    assert!(err.contains("missing"), "{}", err);
}

// ============================================================================
// Control Flow Tests
// ============================================================================

#[test]
fn test_if_else_statement() {
    assert_eq!(
        run_js_get_var("var x; if (1 > 2) { x = 'a'; } else if (2 > 1) { x = 'b'; } else { x = 'c'; }", "x")
            .unwrap(),
        JsValue::from_str("b")
    );
}

#[test]
fn test_completion_value_of_program() {
    assert_eq!(run_js("var x = 1; if (x) { 'yes'; } else { 'no'; }").unwrap(), JsValue::from_str("yes"));
    assert_eq!(run_js("var x = 1;").unwrap(), JsValue::Undefined);
    assert_eq!(run_js("3; var y = 4;").unwrap(), num(3.0));
}

// ============================================================================
// String Tests
// ============================================================================

#[test]
fn test_string_concatenation() {
    assert_eq!(run_js("'Hello' + ' ' + 'World'").unwrap(), JsValue::from_str("Hello World"));
}

#[test]
fn test_string_escapes() {
    assert_eq!(run_js(r#""a\tbA\x42""#).unwrap(), JsValue::from_str("a\tbAB"));
}

#[test]
fn test_string_length_and_index() {
    assert_eq!(run_js("'hello'.length").unwrap(), num(5.0));
    assert_eq!(run_js("'hello'[1]").unwrap(), JsValue::from_str("e"));
    assert_eq!(run_js("'hello'[9]").unwrap(), JsValue::Undefined);
}

#[test]
fn test_number_to_string() {
    assert_eq!(run_js("'' + 1.5").unwrap(), JsValue::from_str("1.5"));
    assert_eq!(run_js("'' + 1e21").unwrap(), JsValue::from_str("1e+21"));
    assert_eq!(run_js("'' + -0").unwrap(), JsValue::from_str("0"));
    assert_eq!(run_js("'' + 0 / 0").unwrap(), JsValue::from_str("NaN"));
}

// ============================================================================
// Objects and Arrays
// ============================================================================

#[test]
fn test_object_literal_and_member_access() {
    assert_eq!(
        run_js("var o = { a: 1, 'b c': 2, 3: 'three' }; o.a + o['b c'] + o[3];").unwrap(),
        JsValue::from_str("3three")
    );
}

#[test]
fn test_missing_property_is_undefined() {
    assert_eq!(run_js("var o = {}; o.nope").unwrap(), JsValue::Undefined);
}

#[test]
fn test_property_access_on_null_is_type_error() {
    let err = run_js("var o = null; o.x").unwrap_err();
    assert!(err.starts_with("Uncaught type error"), "{}", err);
}

#[test]
fn test_array_literal_and_length() {
    assert_eq!(run_js("var a = [1, 2, 3]; a.length").unwrap(), num(3.0));
    assert_eq!(run_js("var a = []; a[4] = 1; a.length").unwrap(), num(5.0));
    assert_eq!(run_js("var a = [1, 2, 3]; a.length = 1; a.join()").unwrap(), JsValue::from_str("1"));
}

#[test]
fn test_objects_are_shared_by_reference() {
    assert_eq!(
        run_js("var a = { n: 1 }; var b = a; b.n = 2; a.n + (a === b ? 10 : 0);").unwrap(),
        num(12.0)
    );
}

#[test]
fn test_regexp_literal_is_an_object() {
    assert_eq!(
        run_js("var r = /ab+c/gi; [typeof r, r.source, r.global, r.multiline].join()").unwrap(),
        JsValue::from_str("object,ab+c,true,false")
    );
}

// ============================================================================
// Functions, this and new
// ============================================================================

#[test]
fn test_function_declaration_and_call() {
    assert_eq!(run_js("function add(a, b) { return a + b; } add(2, 3);").unwrap(), num(5.0));
}

#[test]
fn test_missing_arguments_are_undefined() {
    assert_eq!(run_js("function f(a, b) { return b; } f(1);").unwrap(), JsValue::Undefined);
    assert_eq!(run_js("function f(a) { return arguments.length; } f(1, 2, 3);").unwrap(), num(3.0));
}

#[test]
fn test_function_length_and_name() {
    assert_eq!(
        run_js("function named(a, b, c) {} named.length + named.name").unwrap(),
        JsValue::from_str("3named")
    );
}

#[test]
fn test_method_call_binds_this() {
    assert_eq!(
        run_js("var o = { v: 7, read: function () { return this.v; } }; o.read() + o['read']();").unwrap(),
        num(14.0)
    );
}

#[test]
fn test_sloppy_this_is_global_and_strict_this_is_undefined() {
    assert_eq!(
        run_js("function f() { return this; } f() === this;").unwrap(),
        JsValue::Boolean(true)
    );
    assert_eq!(
        run_js("function f() { 'use strict'; return this; } f();").unwrap(),
        JsValue::Undefined
    );
}

#[test]
fn test_new_with_prototype_methods() {
    assert_eq!(
        run_js(
            r#"
            function Point(x, y) { this.x = x; this.y = y; }
            Point.prototype.sum = function () { return this.x + this.y; };
            var p = new Point(2, 3);
            p.sum() + (p.constructor === Point ? 100 : 0);
            "#
        )
        .unwrap(),
        num(105.0)
    );
}

#[test]
fn test_constructor_returning_object_replaces_this() {
    assert_eq!(
        run_js("function C() { this.a = 1; return { a: 2 }; } new C().a").unwrap(),
        num(2.0)
    );
    assert_eq!(
        run_js("function C() { this.a = 1; return 5; } new C().a").unwrap(),
        num(1.0)
    );
}

#[test]
fn test_calling_a_non_function_is_type_error() {
    let err = run_js("var x = 1; x();").unwrap_err();
    assert!(err.contains("not a function"), "{}", err);
}

#[test]
fn test_recursion() {
    assert_eq!(
        run_js("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15);").unwrap(),
        num(610.0)
    );
}

// ============================================================================
// Benchmark-style programs
// ============================================================================

#[test]
fn test_sum_of_squares() {
    assert_eq!(
        run_js("var s = 0; for (var i = 1; i <= 10; i++) { s += i * i; } s;").unwrap(),
        num(385.0)
    );
}

#[test]
fn test_is_prime() {
    assert_eq!(
        run_js(
            r#"
            function isPrime(n) {
                if (n < 2) return false;
                for (var i = 2; i * i <= n; i++) { if (n % i === 0) return false; }
                return true;
            }
            var primes = [];
            for (var n = 0; n < 30; n++) { if (isPrime(n)) primes.push(n); }
            primes.join(" ");
            "#
        )
        .unwrap(),
        JsValue::from_str("2 3 5 7 11 13 17 19 23 29")
    );
}

#[test]
fn test_gcd() {
    assert_eq!(
        run_js("function gcd(a, b) { while (b) { var t = b; b = a % b; a = t; } return a; } gcd(1071, 462);")
            .unwrap(),
        num(21.0)
    );
}

#[test]
fn test_bitwise_hash() {
    assert_eq!(
        run_js(
            r#"
            function hash(s) {
                var h = 0;
                for (var i = 0; i < s.length; i++) { h = ((h << 5) - h + i) | 0; }
                return h;
            }
            hash("abcdefgh");
            "#
        )
        .unwrap(),
        num(947_656_708.0)
    );
}

// ============================================================================
// Engine API
// ============================================================================

#[test]
fn test_globals_persist_across_evals() {
    let engine = Engine::new();
    engine.eval("function inc() { return ++count; } var count = 0;").unwrap();
    engine.eval("inc(); inc();").unwrap();
    assert_eq!(engine.eval("count").unwrap(), num(2.0));
}

#[test]
fn test_parse_errors_are_reported() {
    let result = Engine::new().eval("var = ;");
    assert!(matches!(result, Err(EngineError::Parse(_))));
}

#[test]
fn test_compile_once_run_twice() {
    let engine = Engine::new();
    let program = JsParser::parse_to_ast_from_str("var runs = (typeof runs == 'number' ? runs : 0) + 1; runs;")
        .unwrap();
    let compiled = engine.compile(&program).unwrap();
    assert_eq!(engine.run(&compiled).unwrap(), num(1.0));
    assert_eq!(engine.run(&compiled).unwrap(), num(2.0));
}

#[test]
fn test_compiled_program_runs_against_a_bare_realm() {
    let program = JsParser::parse_to_ast_from_str("var x = 20; x + 22;").unwrap();
    let compiled = compile_program(&program, &CompileOptions::default()).unwrap();
    let realm = Realm::new(16);
    register_builtins(&realm);
    assert_eq!(compiled.code.run_program(&realm).unwrap(), num(42.0));
    assert_eq!(realm.get_global("x"), Some(num(20.0)));
}
