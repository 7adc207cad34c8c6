//! `with` statement tests.
//!
//! Every identifier inside a `with` body is probed against the with objects,
//! innermost first, before its ordinary binding is used.

extern crate closure_js;

use closure_js::runner::api::{Engine, EngineError};
use closure_js::runner::config::EngineConfig;
use closure_js::runner::ds::error::CompileError;
use closure_js::runner::ds::value::JsValue;

fn run_js(code: &str) -> Result<JsValue, String> {
    Engine::new().eval(code).map_err(|e| e.to_string())
}

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
// Resolution
// ============================================================================

#[test]
fn test_nested_function_mutation_through_captured_with() {
    let engine = Engine::new();
    engine
        .eval(
            r#"
            var y = 3, x = {};
            with (x) {
                y = 10;
                (function () { x.y = 4; y = 11; })();
            }
            "#,
        )
        .unwrap();
    assert_eq!(engine.global("y"), Some(JsValue::Number(10.0)));
    assert_eq!(engine.eval("x.y").unwrap(), JsValue::Number(11.0));
}

#[test]
fn test_innermost_object_wins() {
    assert_both(
        r#"
        var a = { x: 1 }, b = { x: 2 }, x = 0;
        with (a) { with (b) { x = 5; } }
        a.x + "," + b.x + "," + x;
        "#,
        JsValue::from_str("1,5,0"),
    );
}

#[test]
fn test_outer_object_used_when_inner_lacks_property() {
    assert_both(
        r#"
        var a = { x: 1 }, b = {}, x = 0;
        with (a) { with (b) { x = 5; } }
        a.x + "," + b.x + "," + x;
        "#,
        JsValue::from_str("5,undefined,0"),
    );
}

#[test]
fn test_falls_through_to_global() {
    assert_both(
        r#"
        var a = {}, b = {}, x = 0;
        with (a) { with (b) { x = 5; } }
        x + ":" + ("x" in a) + ":" + ("x" in b);
        "#,
        JsValue::from_str("5:false:false"),
    );
}

#[test]
fn test_falls_through_to_local() {
    assert_both(
        r#"
        function f(o) { var v = 1; with (o) { v = v + 1; } return v; }
        f({}) + f({ v: 10 });
        "#,
        JsValue::Number(3.0),
    );
}

#[test]
fn test_properties_added_in_body_are_seen() {
    assert_both(
        r#"
        var o = {}, p = "global";
        with (o) {
            var before = p;
            o.p = "own";
            var after = p;
        }
        before + "/" + after;
        "#,
        JsValue::from_str("global/own"),
    );
}

#[test]
fn test_method_call_receives_with_object_as_this() {
    assert_both(
        r#"
        var o = { name: "o", who: function () { return this.name; } };
        with (o) { who(); }
        "#,
        JsValue::from_str("o"),
    );
}

#[test]
fn test_compound_assignment_and_update_resolve_once() {
    assert_both(
        r#"
        var o = { n: 1 };
        with (o) { n += 2; n++; ++n; }
        o.n;
        "#,
        JsValue::Number(5.0),
    );
}

#[test]
fn test_typeof_inside_with() {
    assert_both(
        r#"
        var o = { f: 1 };
        with (o) { typeof f + "," + typeof missing; }
        "#,
        JsValue::from_str("number,undefined"),
    );
}

#[test]
fn test_with_primitive_uses_wrapper() {
    assert_both(
        r#"
        var len;
        with ("abc") { len = length; }
        len;
        "#,
        JsValue::Number(3.0),
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_with_null_throws() {
    let err = run_js("with (null) {}").unwrap_err();
    assert!(err.contains("cannot be converted to object"), "{}", err);
}

#[test]
fn test_with_rejected_in_strict_code() {
    let result = Engine::new().eval("function f() { 'use strict'; with ({}) {} }");
    assert!(matches!(
        result,
        Err(EngineError::Compile(CompileError::WithInStrictMode))
    ));
}
