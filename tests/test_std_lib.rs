//! Tests for standard library built-in functions.
//!
//! These tests verify the built-in objects scripts can reach: Object,
//! Function.prototype, Array, the Error constructors and console.

extern crate closure_js;

use closure_js::runner::api::Engine;
use closure_js::runner::ds::realm::Realm;
use closure_js::runner::ds::value::JsValue;
use closure_js::runner::std_lib::register_builtins;

fn run_js(code: &str) -> Result<JsValue, String> {
    Engine::new().eval(code).map_err(|e| e.to_string())
}

fn js_str(code: &str) -> String {
    match run_js(code) {
        Ok(v) => v.to_string(),
        Err(e) => panic!("{} failed: {}", code, e),
    }
}

// ============================================================================
// Global tests
// ============================================================================

mod global_tests {
    use super::*;

    #[test]
    fn test_value_globals() {
        assert_eq!(js_str("typeof NaN + ',' + (NaN === NaN)"), "number,false");
        assert_eq!(run_js("Infinity").unwrap(), JsValue::Number(f64::INFINITY));
        assert_eq!(run_js("undefined").unwrap(), JsValue::Undefined);
    }

    #[test]
    fn test_builtins_are_not_enumerable_on_the_global() {
        assert_eq!(
            js_str(
                r#"
                var builtins = 0;
                for (var k in this) {
                    if (k == 'Object' || k == 'Array' || k == 'console' || k == 'NaN') builtins++;
                }
                builtins
                "#
            ),
            "0"
        );
    }

    #[test]
    fn test_register_builtins_on_a_fresh_realm() {
        let realm = Realm::new(8);
        register_builtins(&realm);
        for name in [
            "Object",
            "Function",
            "Array",
            "Error",
            "TypeError",
            "ReferenceError",
            "RangeError",
            "SyntaxError",
            "console",
        ] {
            assert!(realm.has_global(name), "{} should be registered", name);
        }
    }
}

// ============================================================================
// Object tests
// ============================================================================

mod object_tests {
    use super::*;

    #[test]
    fn test_object_constructor() {
        assert_eq!(js_str("typeof Object()"), "object");
        assert_eq!(js_str("typeof new Object(null)"), "object");
        assert_eq!(js_str("var o = {}; (Object(o) === o) + ''"), "true");
        assert_eq!(js_str("Object('ab').length"), "2");
    }

    #[test]
    fn test_object_to_string_tags() {
        assert_eq!(js_str("({}).toString()"), "[object Object]");
        assert_eq!(
            js_str("Object.prototype.toString.call([]) + Object.prototype.toString.call(null)"),
            "[object Array][object Null]"
        );
        assert_eq!(
            js_str("Object.prototype.toString.call(function () {})"),
            "[object Function]"
        );
    }

    #[test]
    fn test_has_own_property() {
        assert_eq!(
            js_str(
                r#"
                function P() { this.own = 1; }
                P.prototype.inherited = 2;
                var p = new P();
                [p.hasOwnProperty('own'), p.hasOwnProperty('inherited'), 'inherited' in p].join()
                "#
            ),
            "true,false,true"
        );
        assert_eq!(js_str("[1, 2].hasOwnProperty(1) + ',' + 'ab'.hasOwnProperty('length')"), "true,true");
    }

    #[test]
    fn test_prototype_chain_reaches_object_prototype() {
        assert_eq!(
            js_str("var o = {}; (o.constructor === Object) + ',' + (o instanceof Object)"),
            "true,true"
        );
    }
}

// ============================================================================
// Function tests
// ============================================================================

mod function_tests {
    use super::*;

    #[test]
    fn test_call_sets_this_and_arguments() {
        assert_eq!(
            js_str("function f(a, b) { return this.base + a + b; } f.call({ base: 1 }, 2, 3)"),
            "6"
        );
    }

    #[test]
    fn test_apply_spreads_arrays_and_arguments() {
        assert_eq!(
            js_str(
                r#"
                function sum() { var s = 0; for (var i = 0; i < arguments.length; i++) s += arguments[i]; return s; }
                function forward() { return sum.apply(null, arguments); }
                sum.apply(null, [1, 2, 3]) + ',' + forward(4, 5) + ',' + sum.apply(null)
                "#
            ),
            "6,9,0"
        );
        let err = run_js("function f() {} f.apply(null, 5)").unwrap_err();
        assert!(err.contains("CreateListFromArrayLike"), "{}", err);
    }

    #[test]
    fn test_call_on_native_methods() {
        assert_eq!(js_str("Array.prototype.join.call([1, 2], '-')"), "1-2");
    }

    #[test]
    fn test_function_to_string() {
        assert_eq!(
            js_str("Array.prototype.push.toString()"),
            "function push() { [native code] }"
        );
        assert!(js_str("(function named() {}).toString()").starts_with("function named()"));
    }

    #[test]
    fn test_function_constructor_is_unsupported() {
        let err = run_js("Function('return 1')").unwrap_err();
        assert!(err.contains("not supported"), "{}", err);
    }

    #[test]
    fn test_functions_inherit_from_function_prototype() {
        assert_eq!(
            js_str("function f() {} (f instanceof Function) + ',' + (typeof f.call)"),
            "true,function"
        );
    }
}

// ============================================================================
// Array tests
// ============================================================================

mod array_tests {
    use super::*;

    #[test]
    fn test_array_constructor() {
        assert_eq!(js_str("new Array(3).length"), "3");
        assert_eq!(js_str("Array(1, 2).join()"), "1,2");
        assert_eq!(js_str("new Array('3').length"), "1");
        let err = run_js("new Array(-1)").unwrap_err();
        assert!(err.contains("Invalid array length"), "{}", err);
    }

    #[test]
    fn test_is_array() {
        assert_eq!(
            js_str(
                "[Array.isArray([]), Array.isArray({}), Array.isArray('a'), Array.isArray(1)].join()"
            ),
            "true,false,false,false"
        );
    }

    #[test]
    fn test_push_and_pop() {
        assert_eq!(
            js_str("var a = [1]; var n = a.push(2, 3); var last = a.pop(); n + ':' + last + ':' + a.join()"),
            "3:3:1,2"
        );
        assert_eq!(run_js("[].pop()").unwrap(), JsValue::Undefined);
    }

    #[test]
    fn test_join_and_to_string() {
        assert_eq!(js_str("[1, null, undefined, 'x'].join('|')"), "1|||x");
        assert_eq!(js_str("[1, [2, 3]].toString()"), "1,2,3");
        assert_eq!(js_str("'' + []"), "");
    }

    #[test]
    fn test_methods_reject_non_arrays() {
        let err = run_js("Array.prototype.push.call({}, 1)").unwrap_err();
        assert!(err.contains("called on non-array"), "{}", err);
    }
}

// ============================================================================
// Error tests
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        assert_eq!(js_str("new Error('boom').message"), "boom");
        assert_eq!(js_str("Error('no new').message"), "no new");
        assert_eq!(js_str("new TypeError().message === ''"), "true");
    }

    #[test]
    fn test_error_hierarchy() {
        assert_eq!(
            js_str(
                r#"
                var e = new RangeError('r');
                [e instanceof RangeError, e instanceof Error, e instanceof TypeError, e.name].join()
                "#
            ),
            "true,true,false,RangeError"
        );
    }

    #[test]
    fn test_error_to_string() {
        assert_eq!(js_str("new SyntaxError('bad').toString()"), "SyntaxError: bad");
        assert_eq!(js_str("'' + new Error()"), "Error");
        assert_eq!(
            js_str("var e = new Error('m'); e.name = ''; e.toString()"),
            "m"
        );
        assert_eq!(js_str("'' + new ReferenceError('x')"), "ReferenceError: x");
    }

    #[test]
    fn test_user_errors_can_be_caught_by_type() {
        assert_eq!(
            js_str(
                r#"
                function check(v) { if (typeof v != 'number') throw new TypeError('want number'); return v; }
                var r;
                try { check('x'); } catch (e) { r = e instanceof TypeError ? e.message : 'other'; }
                r
                "#
            ),
            "want number"
        );
    }
}

// ============================================================================
// Console tests
// ============================================================================

mod console_tests {
    use super::*;
    use closure_js::runner::std_lib::console::format_args;

    #[test]
    fn test_console_log_returns_undefined() {
        assert_eq!(run_js("console.log('test', 1)").unwrap(), JsValue::Undefined);
    }

    #[test]
    fn test_console_log_exists() {
        assert_eq!(js_str("typeof console.log"), "function");
    }

    #[test]
    fn test_format_args_joins_with_spaces() {
        let args = vec![
            JsValue::from_str("a"),
            JsValue::Number(1.5),
            JsValue::Boolean(true),
            JsValue::Undefined,
            JsValue::Null,
        ];
        assert_eq!(format_args(&args), "a 1.5 true undefined null");
        assert_eq!(format_args(&[]), "");
    }
}
