//! Operator tests.
//!
//! The property tests compile the same expression over statically typed locals
//! (specialized lowering) and with specialization disabled (fully dynamic
//! lowering), and require identical results.

extern crate closure_js;

use closure_js::runner::api::Engine;
use closure_js::runner::config::EngineConfig;
use closure_js::runner::ds::value::JsValue;
use proptest::prelude::*;

fn engine(specialize: bool) -> Engine {
    Engine::with_config(&EngineConfig {
        specialize,
        ..EngineConfig::default()
    })
}

fn run_js(code: &str) -> Result<JsValue, String> {
    engine(true).eval(code).map_err(|e| e.to_string())
}

fn run_js_dynamic(code: &str) -> Result<JsValue, String> {
    engine(false).eval(code).map_err(|e| e.to_string())
}

/// Both lowerings, rendered so NaN compares equal to NaN.
fn both(code: &str) -> (String, String) {
    (
        format!("{:?}", run_js(code)),
        format!("{:?}", run_js_dynamic(code)),
    )
}

const OPERANDS: &[&str] = &[
    "0", "1", "-1", "2.5", "-0", "0 / 0", "1 / 0", "'12'", "''", "'abc'", "' 7 '", "'0x10'",
    "true", "false", "null", "undefined",
];

const BINARY: &[&str] = &[
    "+", "-", "*", "/", "%", "<<", ">>", ">>>", "&", "|", "^", "<", ">", "<=", ">=", "==",
    "!=", "===", "!==",
];

const UNARY: &[&str] = &["-", "+", "!", "~", "typeof ", "void "];

const COMPOUND: &[&str] = &["+", "-", "*", "|", "<<"];

fn operand() -> impl Strategy<Value = &'static str> {
    prop::sample::select(OPERANDS)
}

fn binary_script(l: &str, op: &str, r: &str) -> String {
    format!(
        "function f() {{ var x = {}; var y = {}; return x {} y; }} f();",
        l, r, op
    )
}

proptest! {
  #[test]
  fn specialized_binary_matches_dynamic(
      l in operand(),
      r in operand(),
      op in prop::sample::select(BINARY),
  ) {
      let (specialized, dynamic) = both(&binary_script(l, op, r));
      prop_assert_eq!(specialized, dynamic);
  }

  #[test]
  fn specialized_unary_matches_dynamic(
      v in operand(),
      op in prop::sample::select(UNARY),
  ) {
      let code = format!("function f() {{ var x = {}; return {}x; }} f();", v, op);
      let (specialized, dynamic) = both(&code);
      prop_assert_eq!(specialized, dynamic);
  }

  #[test]
  fn specialized_compound_assignment_matches_dynamic(
      l in operand(),
      r in operand(),
      op in prop::sample::select(COMPOUND),
  ) {
      let code = format!(
          "function f() {{ var x = {}; var y = {}; x {}= y; return x; }} f();",
          l, r, op
      );
      let (specialized, dynamic) = both(&code);
      prop_assert_eq!(specialized, dynamic);
  }

  #[test]
  fn double_loop_counter_matches_dynamic(n in 0u32..40, step in 1u32..5) {
      let code = format!(
          "function f() {{ var s = 0; for (var i = 0; i < {}; i += {}) {{ s = s + i * 0.5; }} return s; }} f();",
          n, step
      );
      let (specialized, dynamic) = both(&code);
      prop_assert_eq!(specialized, dynamic);
  }
}

// ============================================================================
// Fixed expectations
// ============================================================================

#[test]
fn test_number_plus_string_concatenates() {
    assert_eq!(run_js("1 + '2'").unwrap(), JsValue::from_str("12"));
    assert_eq!(run_js_dynamic("1 + '2'").unwrap(), JsValue::from_str("12"));
    assert_eq!(
        run_js("function f() { var a = 1; var b = '2'; return a + b; } f();").unwrap(),
        JsValue::from_str("12")
    );
}

#[test]
fn test_nan_is_not_equal_to_itself() {
    let code = "function f() { var n = 0 / 0; return (n == n) + ',' + (n === n) + ',' + (n != n); } f();";
    assert_eq!(run_js(code).unwrap(), JsValue::from_str("false,false,true"));
    assert_eq!(run_js_dynamic(code).unwrap(), JsValue::from_str("false,false,true"));
}

#[test]
fn test_abstract_equality() {
    assert_eq!(
        run_js("[null == undefined, '1' == 1, true == 1, null == 0, 'a' == 'a'].join()").unwrap(),
        JsValue::from_str("true,true,true,false,true")
    );
}

#[test]
fn test_object_operands_use_to_primitive() {
    assert_eq!(
        run_js("var o = { valueOf: function () { return 41; } }; o + 1;").unwrap(),
        JsValue::Number(42.0)
    );
    assert_eq!(
        run_js("var o = { toString: function () { return 'x'; } }; 'a' + o;").unwrap(),
        JsValue::from_str("ax")
    );
    assert_eq!(
        run_js("var o = { valueOf: function () { return 1; }, toString: function () { return 'x'; } }; 'a' + o;").unwrap(),
        JsValue::from_str("a1")
    );
    assert_eq!(
        run_js("'' + [1, [2, 3]]").unwrap(),
        JsValue::from_str("1,2,3")
    );
}

#[test]
fn test_shift_counts_are_masked() {
    assert_eq!(run_js("1 << 33").unwrap(), JsValue::Number(2.0));
    assert_eq!(run_js("-1 >>> 28").unwrap(), JsValue::Number(15.0));
    assert_eq!(run_js("-16 >> 2").unwrap(), JsValue::Number(-4.0));
}

#[test]
fn test_string_comparison_is_lexicographic() {
    assert_eq!(run_js("'10' < '9'").unwrap(), JsValue::Boolean(true));
    assert_eq!(run_js("'10' < 9").unwrap(), JsValue::Boolean(false));
}

#[test]
fn test_logical_operators_yield_operands() {
    assert_eq!(
        run_js("(0 || 'x') + (1 && 'y') + (null || 0)").unwrap(),
        JsValue::from_str("xy0")
    );
    assert_eq!(
        run_js("var hit = false; false && (hit = true); hit;").unwrap(),
        JsValue::Boolean(false)
    );
}

#[test]
fn test_typeof_results() {
    assert_eq!(
        run_js("[typeof 1, typeof 'a', typeof true, typeof undefined, typeof null, typeof {}, typeof function () {}, typeof nope].join()").unwrap(),
        JsValue::from_str("number,string,boolean,undefined,object,object,function,undefined")
    );
}

#[test]
fn test_in_and_instanceof() {
    assert_eq!(
        run_js("function C() {} var c = new C(); [c instanceof C, c instanceof Object, 'x' in { x: 1 }, 'toString' in {}].join()").unwrap(),
        JsValue::from_str("true,true,true,true")
    );
    assert!(run_js("'x' in 5").unwrap_err().contains("Cannot use 'in' operator"));
}

#[test]
fn test_delete() {
    assert_eq!(
        run_js("var o = { a: 1 }; [delete o.a, 'a' in o, delete o.missing].join()").unwrap(),
        JsValue::from_str("true,false,true")
    );
    assert_eq!(
        run_js("implicit = 1; delete implicit; typeof implicit").unwrap(),
        JsValue::from_str("undefined")
    );
    assert_eq!(
        run_js("function f(a) { var l = 1; return delete a || delete l; } f(1);").unwrap(),
        JsValue::Boolean(false)
    );
}

#[test]
fn test_update_expressions() {
    assert_eq!(
        run_js("function f() { var i = 5; var a = i++; var b = ++i; var c = i--; return [a, b, c, i].join(); } f();").unwrap(),
        JsValue::from_str("5,7,7,6")
    );
    assert_eq!(
        run_js("var o = { n: '5' }; o.n++; o.n").unwrap(),
        JsValue::Number(6.0)
    );
}

#[test]
fn test_comma_and_conditional() {
    assert_eq!(run_js("(1, 2, 3)").unwrap(), JsValue::Number(3.0));
    assert_eq!(run_js("true ? 'a' : 1").unwrap(), JsValue::from_str("a"));
    assert_eq!(run_js("0 ? 'a' : 1").unwrap(), JsValue::Number(1.0));
}
