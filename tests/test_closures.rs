//! Closure capture tests.
//!
//! These run scripts whose nested functions read and write variables of enclosing
//! activations, with and without type specialization.

extern crate closure_js;

use closure_js::runner::api::Engine;
use closure_js::runner::config::EngineConfig;
use closure_js::runner::ds::value::JsValue;

/// Helper to run JavaScript code, returning the value of the last expression statement.
fn run_js(code: &str) -> Result<JsValue, String> {
    Engine::new().eval(code).map_err(|e| e.to_string())
}

/// Same as `run_js`, with every operation on the dynamic path.
fn run_js_dynamic(code: &str) -> Result<JsValue, String> {
    let config = EngineConfig {
        specialize: false,
        ..EngineConfig::default()
    };
    Engine::with_config(&config)
        .eval(code)
        .map_err(|e| e.to_string())
}

fn assert_both(code: &str, expected: JsValue) {
    assert_eq!(run_js(code).unwrap(), expected, "specialized: {}", code);
    assert_eq!(run_js_dynamic(code).unwrap(), expected, "dynamic: {}", code);
}

// ============================================================================
// Per-activation records
// ============================================================================

#[test]
fn test_closures_in_a_loop_capture_their_own_activation() {
    assert_both(
        r#"
        var fns = [];
        for (var i = 0; i < 3; i++) {
            (function () {
                var j = i;
                fns.push(function () { return j; });
            })();
        }
        fns[0]() + "," + fns[1]() + "," + fns[2]();
        "#,
        JsValue::from_str("0,1,2"),
    );
}

#[test]
fn test_counters_do_not_share_state() {
    assert_both(
        r#"
        function counter() {
            var count = 0;
            return function () { count += 1; return count; };
        }
        var a = counter(), b = counter();
        a(); a(); b();
        a() * 10 + b();
        "#,
        JsValue::Number(32.0),
    );
}

#[test]
fn test_uncaptured_locals_are_per_call() {
    assert_both(
        r#"
        function f(n) { var local = n * 2; if (n > 0) { f(n - 1); } return local; }
        f(3);
        "#,
        JsValue::Number(6.0),
    );
}

// ============================================================================
// Reaching through ancestors
// ============================================================================

#[test]
fn test_grandchild_reads_grandparent_variable() {
    assert_both(
        r#"
        function outer() {
            var x = "outer";
            function middle() {
                return function inner() { return x; };
            }
            return middle()();
        }
        outer();
        "#,
        JsValue::from_str("outer"),
    );
}

#[test]
fn test_inner_write_is_visible_to_outer() {
    assert_both(
        r#"
        function f() {
            var total = 1;
            function add(n) { total = total + n; }
            add(2); add(3);
            return total;
        }
        f();
        "#,
        JsValue::Number(6.0),
    );
}

#[test]
fn test_captured_parameter() {
    assert_both(
        r#"
        function adder(n) { return function (m) { n = n + m; return n; }; }
        var add = adder(10);
        add(1);
        add(2);
        "#,
        JsValue::Number(13.0),
    );
}

#[test]
fn test_captured_arguments_object() {
    assert_both(
        r#"
        function f() { return function () { return arguments.length; }; }
        function g() { var args = arguments; return function () { return args[1]; }; }
        f(1, 2, 3)() + g("a", "b")();
        "#,
        JsValue::from_str("0b"),
    );
}

#[test]
fn test_arguments_aliases_parameters() {
    assert_both(
        r#"
        function f(a, b) { arguments[0] = 10; b = 5; return a + arguments[1]; }
        f(1, 2);
        "#,
        JsValue::Number(15.0),
    );
}

// ============================================================================
// Hoisting and self bindings
// ============================================================================

#[test]
fn test_hoisted_function_sees_later_vars() {
    assert_both(
        r#"
        function f() {
            var r = g();
            var v = 7;
            function g() { return typeof v; }
            return r + ":" + g();
        }
        f();
        "#,
        JsValue::from_str("undefined:number"),
    );
}

#[test]
fn test_named_function_expression_binds_itself() {
    assert_both(
        r#"
        var fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); };
        var f = 0;
        fact(5) + f;
        "#,
        JsValue::Number(120.0),
    );
}

#[test]
fn test_named_function_expression_name_ignores_sloppy_writes() {
    assert_both(
        r#"
        var g = function f() { f = 1; f += 2; f++; return typeof f; };
        g();
        "#,
        JsValue::from_str("function"),
    );
    assert_both(
        r#"
        var g = function f() { return function () { f = 1; return f === g; }; };
        g()();
        "#,
        JsValue::Boolean(true),
    );
}

#[test]
fn test_named_function_expression_name_rejects_strict_writes() {
    assert_both(
        r#"
        var g = function f() { 'use strict'; f = 1; };
        var r;
        try { g(); r = 'no error'; } catch (e) { r = (e instanceof TypeError) + ':' + typeof g; }
        r;
        "#,
        JsValue::from_str("true:function"),
    );
    let err = run_js("(function f() { 'use strict'; f = 1; })();").unwrap_err();
    assert!(err.starts_with("Uncaught type error"), "{}", err);
}

#[test]
fn test_var_redeclaring_the_function_name_is_writable() {
    assert_both(
        "(function f() { var f = 1; f = 2; return f; })();",
        JsValue::Number(2.0),
    );
}

#[test]
fn test_catch_binding_can_be_captured() {
    assert_both(
        r#"
        function f() {
            var get;
            try { throw "boom"; } catch (e) { get = function () { return e; }; }
            return get();
        }
        f();
        "#,
        JsValue::from_str("boom"),
    );
}

#[test]
fn test_global_functions_close_over_globals() {
    assert_both(
        r#"
        var n = 1;
        function bump() { n = n + 1; }
        bump(); bump();
        n;
        "#,
        JsValue::Number(3.0),
    );
}

// Catch bindings live in one slot per function activation, so closures made by
// different executions of the same catch clause observe the latest exception.
#[test]
fn test_catch_binding_is_shared_across_loop_iterations() {
    assert_both(
        r#"
        function f() {
            var fs = [];
            for (var i = 0; i < 3; i++) {
                try { throw i; } catch (e) { fs.push(function () { return e; }); }
            }
            return fs[0]() + ',' + fs[2]();
        }
        f();
        "#,
        JsValue::from_str("2,2"),
    );
}
