//! Control flow tests: loops, labels, switch, exceptions and their static errors.

extern crate closure_js;

use closure_js::runner::api::{Engine, EngineError};
use closure_js::runner::config::EngineConfig;
use closure_js::runner::ds::error::{CompileError, JErrorType};
use closure_js::runner::ds::value::JsValue;

fn run_js(code: &str) -> Result<JsValue, EngineError> {
    Engine::new().eval(code)
}

fn run_js_dynamic(code: &str) -> Result<JsValue, EngineError> {
    let config = EngineConfig {
        specialize: false,
        ..EngineConfig::default()
    };
    Engine::with_config(&config).eval(code)
}

fn assert_both(code: &str, expected: JsValue) {
    assert_eq!(run_js(code).unwrap(), expected, "specialized: {}", code);
    assert_eq!(run_js_dynamic(code).unwrap(), expected, "dynamic: {}", code);
}

fn compile_error(code: &str) -> CompileError {
    match run_js(code) {
        Err(EngineError::Compile(e)) => e,
        other => panic!("expected a compile error for {:?}, got {:?}", code, other),
    }
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_while_and_do_while() {
    assert_both(
        r#"
        function f() {
            var i = 0, s = 0;
            while (i < 5) { s += i; i++; }
            do { s = s * 2; } while (false);
            return s;
        }
        f();
        "#,
        JsValue::Number(20.0),
    );
}

#[test]
fn test_for_with_break_and_continue() {
    assert_both(
        r#"
        function f() {
            var out = "";
            for (var i = 0; i < 10; i++) {
                if (i % 2 == 0) continue;
                if (i > 7) break;
                out = out + i;
            }
            return out;
        }
        f();
        "#,
        JsValue::from_str("1357"),
    );
}

#[test]
fn test_for_without_clauses() {
    assert_both(
        r#"
        var n = 0;
        for (;;) { if (++n == 4) break; }
        n;
        "#,
        JsValue::Number(4.0),
    );
}

#[test]
fn test_labeled_continue_targets_outer_loop() {
    assert_both(
        r#"
        var pairs = "";
        outer: for (var i = 0; i < 3; i++) {
            for (var j = 0; j < 3; j++) {
                if (j == 1) continue outer;
                if (i == 2) break outer;
                pairs = pairs + i + j + " ";
            }
        }
        pairs;
        "#,
        JsValue::from_str("00 10 "),
    );
}

#[test]
fn test_labeled_block_break() {
    assert_both(
        r#"
        var r = "start";
        done: { r = "inside"; break done; r = "unreachable"; }
        r;
        "#,
        JsValue::from_str("inside"),
    );
}

#[test]
fn test_return_from_inside_loop() {
    assert_both(
        r#"
        function find(list, v) {
            for (var i = 0; i < list.length; i++) { if (list[i] === v) return i; }
            return -1;
        }
        find([4, 5, 6], 6) * 10 + find([], 1);
        "#,
        JsValue::Number(19.0),
    );
}

// ============================================================================
// for-in
// ============================================================================

#[test]
fn test_for_in_visits_own_then_inherited_keys() {
    assert_both(
        r#"
        function Base() {}
        Base.prototype.inherited = 1;
        var o = new Base();
        o.b = 1; o.a = 2;
        var keys = [];
        for (var k in o) keys.push(k);
        keys.join(",");
        "#,
        JsValue::from_str("b,a,inherited"),
    );
}

#[test]
fn test_for_in_array_indices_first() {
    assert_both(
        r#"
        var a = ["x", "y"];
        a.extra = true;
        var keys = "";
        for (var k in a) keys = keys + k;
        keys;
        "#,
        JsValue::from_str("01extra"),
    );
}

#[test]
fn test_for_in_skips_deleted_keys() {
    assert_both(
        r#"
        var o = { a: 1, b: 2, c: 3 }, seen = "";
        for (var k in o) { seen = seen + k; delete o.b; }
        seen;
        "#,
        JsValue::from_str("ac"),
    );
}

#[test]
fn test_for_in_member_target_and_nullish() {
    assert_both(
        r#"
        var holder = {}, count = 0;
        for (holder.key in { p: 1 }) count++;
        for (var k in null) count = 100;
        for (var k in undefined) count = 100;
        holder.key + count;
        "#,
        JsValue::from_str("p1"),
    );
}

#[test]
fn test_for_in_hides_builtins() {
    assert_both(
        r#"
        var n = 0;
        for (var k in {}) n++;
        for (var k in []) n++;
        n;
        "#,
        JsValue::Number(0.0),
    );
}

// ============================================================================
// switch
// ============================================================================

#[test]
fn test_switch_falls_through_until_break() {
    assert_both(
        r#"
        function f(v) {
            var out = "";
            switch (v) {
                case 1: out += "one ";
                case 2: out += "two "; break;
                case "1": out += "string "; break;
                default: out += "default ";
                case 3: out += "three";
            }
            return out;
        }
        f(1) + "|" + f("1") + "|" + f(9) + "|" + f(3);
        "#,
        JsValue::from_str("one two |string |default three|three"),
    );
}

#[test]
fn test_switch_evaluates_discriminant_once() {
    assert_both(
        r#"
        var calls = 0;
        function d() { calls++; return 2; }
        switch (d()) { case 1: break; case 2: break; case 3: break; }
        calls;
        "#,
        JsValue::Number(1.0),
    );
}

#[test]
fn test_switch_nan_never_matches() {
    assert_both(
        r#"
        var r = "none";
        switch (0 / 0) { case 0 / 0: r = "nan"; break; default: r = "default"; }
        r;
        "#,
        JsValue::from_str("default"),
    );
}

#[test]
fn test_continue_inside_switch_targets_loop() {
    assert_both(
        r#"
        var s = "";
        for (var i = 0; i < 3; i++) {
            switch (i) { case 1: continue; }
            s = s + i;
        }
        s;
        "#,
        JsValue::from_str("02"),
    );
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_throw_and_catch_value() {
    assert_both(
        r#"
        var r;
        try { throw { code: 42 }; } catch (e) { r = e.code; }
        r;
        "#,
        JsValue::Number(42.0),
    );
}

#[test]
fn test_engine_errors_become_error_objects() {
    assert_both(
        r#"
        var r = [];
        try { missing; } catch (e) { r.push(e instanceof ReferenceError, e.name); }
        try { null.x; } catch (e) { r.push(e instanceof TypeError, e instanceof Error); }
        try { (void 0)(); } catch (e) { r.push(e.name); }
        r.join(",");
        "#,
        JsValue::from_str("true,ReferenceError,true,true,TypeError"),
    );
}

#[test]
fn test_finally_runs_and_normal_finally_keeps_result() {
    assert_both(
        r#"
        var log = "";
        function f() {
            try { log += "t"; return "try"; } finally { log += "f"; }
        }
        f() + ":" + log;
        "#,
        JsValue::from_str("try:tf"),
    );
}

#[test]
fn test_abrupt_finally_overrides() {
    assert_both(
        r#"
        function f() {
            try { throw "lost"; } finally { return "finally"; }
        }
        function g() {
            for (var i = 0; i < 3; i++) { try { return i; } finally { if (i == 0) continue; } }
            return "done";
        }
        f() + ":" + g();
        "#,
        JsValue::from_str("finally:1"),
    );
}

#[test]
fn test_error_in_catch_propagates_after_finally() {
    let engine = Engine::new();
    let result = engine.eval(
        r#"
        var cleaned = false;
        try { throw 1; } catch (e) { throw 2; } finally { cleaned = true; }
        "#,
    );
    assert!(matches!(
        result,
        Err(EngineError::Runtime(JErrorType::Thrown(JsValue::Number(n)))) if n == 2.0
    ));
    assert_eq!(engine.global("cleaned"), Some(JsValue::Boolean(true)));
}

#[test]
fn test_uncaught_throw_reaches_the_host() {
    let result = run_js("throw new RangeError('too far');");
    match result {
        Err(EngineError::Runtime(JErrorType::Thrown(v))) => {
            assert_eq!(v.to_string(), "RangeError: too far")
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_call_depth_is_limited() {
    let config = EngineConfig {
        max_call_depth: 64,
        ..EngineConfig::default()
    };
    let engine = Engine::with_config(&config);
    let result = engine.eval("function f() { return f(); } f();");
    assert!(matches!(result, Err(EngineError::Runtime(JErrorType::RangeError(_)))));
    let caught = engine
        .eval("var r; try { f(); } catch (e) { r = e instanceof RangeError; } r;")
        .unwrap();
    assert_eq!(caught, JsValue::Boolean(true));
}

// ============================================================================
// Static errors
// ============================================================================

#[test]
fn test_static_errors_stop_everything() {
    let engine = Engine::new();
    let result = engine.eval("var ran = true; function f() { break; }");
    assert!(matches!(result, Err(EngineError::Compile(CompileError::IllegalBreak))));
    assert_eq!(engine.global("ran"), None);
}

#[test]
fn test_jump_errors() {
    assert_eq!(compile_error("return 1;"), CompileError::IllegalReturn);
    assert_eq!(compile_error("continue;"), CompileError::IllegalContinue);
    assert_eq!(
        compile_error("while (true) { break nowhere; }"),
        CompileError::UndefinedLabel("nowhere".to_string())
    );
    assert_eq!(
        compile_error("a: { while (true) { continue a; } }"),
        CompileError::IllegalContinue
    );
    assert_eq!(
        compile_error("a: a: ;"),
        CompileError::DuplicateLabel("a".to_string())
    );
    assert_eq!(
        compile_error("switch (1) { case 1: continue; }"),
        CompileError::IllegalContinue
    );
}

#[test]
fn test_strict_mode_errors() {
    assert_eq!(
        compile_error("'use strict'; function f(eval) {}"),
        CompileError::RestrictedName("eval".to_string())
    );
    assert_eq!(
        compile_error("'use strict'; function f(a, a) {}"),
        CompileError::DuplicateParameter("a".to_string())
    );
    assert_eq!(
        compile_error("'use strict'; try {} catch (arguments) {}"),
        CompileError::RestrictedName("arguments".to_string())
    );
    assert_eq!(
        compile_error("'use strict'; var x; delete x;"),
        CompileError::DeleteOfIdentifier("x".to_string())
    );
}

#[test]
fn test_strict_assignment_to_undeclared_throws() {
    let result = run_js("'use strict'; undeclared = 1;");
    assert!(matches!(result, Err(EngineError::Runtime(JErrorType::ReferenceError(_)))));
    assert_eq!(run_js("sloppy = 1; sloppy;").unwrap(), JsValue::Number(1.0));
}
