//! Tests for the analysis passes: variable marking, closure layout and type marking.

extern crate closure_js;

use closure_js::parser::JsParser;
use closure_js::runner::analysis::variable::{ValueType, VariableType};
use closure_js::runner::analysis::{analyze, Analysis, AnalysisOptions};

fn analyze_js(code: &str) -> Analysis {
    let program = JsParser::parse_to_ast_from_str(code).unwrap();
    analyze(&program, &AnalysisOptions::default()).unwrap()
}

fn type_of(a: &Analysis, block: usize, name: &str) -> ValueType {
    a.find_declared(block, name)
        .unwrap_or_else(|| panic!("{} not declared in block {}", name, block))
        .value_type
}

// ============================================================================
// Variable marking
// ============================================================================

#[test]
fn test_program_declarations_are_globals() {
    let a = analyze_js("var g = 1; function h() {} undeclared = 2;");
    assert_eq!(a.find_declared(0, "g").unwrap().var_type, VariableType::Global);
    assert_eq!(a.find_declared(0, "h").unwrap().var_type, VariableType::Global);
    assert_eq!(
        a.find_declared(0, "undeclared").unwrap().var_type,
        VariableType::Global
    );
    assert_eq!(a.variable(a.this_variable).var_type, VariableType::This);
}

#[test]
fn test_function_bindings() {
    let a = analyze_js("function f(p, q) { var l; function inner() {} }");
    let f = a.block(1);
    assert_eq!(f.name, "f");
    assert_eq!(f.parent, Some(0));
    assert_eq!(f.params.len(), 2);
    assert_eq!(a.variable(f.params[1]).index, Some(1));
    assert_eq!(a.find_declared(1, "p").unwrap().var_type, VariableType::Parameter);
    assert_eq!(a.find_declared(1, "l").unwrap().var_type, VariableType::Local);
    assert_eq!(a.find_declared(1, "inner").unwrap().var_type, VariableType::Local);
    assert_eq!(
        a.variable(f.arguments.unwrap()).var_type,
        VariableType::Arguments
    );
}

#[test]
fn test_named_function_expression_gets_self_binding() {
    let a = analyze_js("var fact = function fact2(n) { return fact2; };");
    let self_binding = a.block(1).self_binding.unwrap();
    let v = a.variable(self_binding);
    assert_eq!(v.name, "fact2");
    assert_eq!(v.value_type, ValueType::Object);
    assert!(v.immutable);
    assert!(a.find_declared(0, "fact2").is_none());
    assert!(!a.find_declared(0, "fact").unwrap().immutable);
}

#[test]
fn test_catch_binding_has_synthetic_storage() {
    let a = analyze_js("function f() { try {} catch (e) { e; } }");
    let synthetic = &a.block(1).synthetic;
    assert_eq!(synthetic.len(), 1);
    let e = a.variable(synthetic[0]);
    assert_eq!(e.name, "e");
    assert!(e.storage_name.starts_with("%catch"));
    assert!(a.find_declared(1, "e").is_none());
}

#[test]
fn test_with_body_identifiers_get_with_variables() {
    let a = analyze_js("function f(o) { var v; with (o) { v = 1; } }");
    assert_eq!(a.with_variables.len(), 1);
    let holder = *a.with_variables.values().next().unwrap();
    assert!(a.variable(holder).name.starts_with("%with"));
    assert_eq!(a.variable(holder).value_type, ValueType::Object);

    let local_v = a.block(1).declared.get("v").unwrap();
    let probes: Vec<_> = a
        .variables
        .iter()
        .filter(|v| v.var_type == VariableType::WithScope)
        .collect();
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].name, "v");
    assert_eq!(probes[0].fallback, Some(local_v));
    let chain: Vec<_> = probes[0].with_scope.as_ref().unwrap().iter().collect();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].variable, holder);
    // The fallback of a with probe can be anything at run time.
    assert_eq!(a.variable(local_v).value_type, ValueType::Unknown);
}

#[test]
fn test_nested_with_chain_runs_innermost_first() {
    let a = analyze_js("with (a) { with (b) { x; } }");
    let probe = a
        .variables
        .iter()
        .find(|v| v.var_type == VariableType::WithScope && v.name == "x")
        .unwrap();
    let chain: Vec<_> = probe.with_scope.as_ref().unwrap().iter().collect();
    assert_eq!(chain.len(), 2);
    let names: Vec<_> = chain
        .iter()
        .map(|w| a.variable(w.variable).name.clone())
        .collect();
    assert!(names[0] > names[1], "innermost first: {:?}", names);
}

// ============================================================================
// Closure layout
// ============================================================================

#[test]
fn test_only_captured_variables_get_fields() {
    let a = analyze_js(
        "function f(b, a) { var z, y, unused; return function () { return z + y + a; }; }",
    );
    assert_eq!(a.captured_names(1), vec!["a", "y", "z"]);
    let closure = a.closure(a.block(1).closure.unwrap());
    assert_eq!(closure.fields, vec!["arguments", "y", "z"]);
    assert_eq!(closure.field_index("y"), Some(1));
    assert!(!a.find_declared(1, "unused").unwrap().is_captured());
    assert!(a.find_declared(1, "z").unwrap().is_captured());
    // Captured parameters are reached through the arguments object.
    let a_param = a.find_declared(1, "a").unwrap();
    assert_eq!(a_param.closure_field.unwrap().index, 0);
}

#[test]
fn test_closures_link_to_nearest_capturing_ancestor() {
    let a = analyze_js(
        r#"
        function f() {
            var x = 1;
            return function g() {
                return function h() { return x; };
            };
        }
        "#,
    );
    let f_closure = a.block(1).closure.unwrap();
    assert!(a.block(2).closure.is_none());
    assert_eq!(a.block(2).parent_closure, Some(f_closure));
    assert_eq!(a.block(3).parent_closure, Some(f_closure));
    assert_eq!(a.closure(f_closure).parent, None);
    assert_eq!(a.closures.len(), 1);
}

#[test]
fn test_chained_closures() {
    let a = analyze_js(
        r#"
        function f() {
            var x;
            return function g() {
                var y;
                return function h() { return x + y; };
            };
        }
        "#,
    );
    let f_closure = a.block(1).closure.unwrap();
    let g_closure = a.block(2).closure.unwrap();
    assert_eq!(a.closure(g_closure).parent, Some(f_closure));
    assert_eq!(a.block(3).parent_closure, Some(g_closure));
    assert_eq!(a.closure(f_closure).fields, vec!["x"]);
    assert_eq!(a.closure(g_closure).fields, vec!["y"]);
}

#[test]
fn test_globals_are_never_captured() {
    let a = analyze_js("var n = 0; function bump() { n++; }");
    assert!(a.closures.is_empty());
    assert!(!a.find_declared(0, "n").unwrap().is_captured());
}

// ============================================================================
// Type marking
// ============================================================================

#[test]
fn test_locals_take_their_literal_types() {
    let a = analyze_js(
        r#"
        function f() {
            var d = 1, s = "a", b = true, mixed = 1;
            mixed = "b";
            var sum = d + 2, text = s + d, cmp = d < 2;
            return d;
        }
        "#,
    );
    assert_eq!(type_of(&a, 1, "d"), ValueType::Double);
    assert_eq!(type_of(&a, 1, "s"), ValueType::String);
    assert_eq!(type_of(&a, 1, "b"), ValueType::Boolean);
    assert_eq!(type_of(&a, 1, "mixed"), ValueType::Unknown);
    assert_eq!(type_of(&a, 1, "sum"), ValueType::Double);
    assert_eq!(type_of(&a, 1, "text"), ValueType::String);
    assert_eq!(type_of(&a, 1, "cmp"), ValueType::Boolean);
}

#[test]
fn test_dynamic_bindings_stay_unknown() {
    let a = analyze_js(
        r#"
        var g = 1;
        function f(p) {
            var captured = 1, never;
            return function () { return captured; };
        }
        "#,
    );
    assert_eq!(type_of(&a, 0, "g"), ValueType::Unknown);
    assert_eq!(type_of(&a, 1, "p"), ValueType::Unknown);
    assert_eq!(type_of(&a, 1, "captured"), ValueType::Unknown);
    assert_eq!(type_of(&a, 1, "never"), ValueType::Unknown);
}

#[test]
fn test_types_propagate_between_locals() {
    let a = analyze_js(
        r#"
        function f() {
            var a = b;
            var b = 1;
            var c = 2;
            var d = c * 2;
            return a;
        }
        "#,
    );
    assert_eq!(type_of(&a, 1, "a"), ValueType::Unknown);
    assert_eq!(type_of(&a, 1, "d"), ValueType::Double);
}

#[test]
fn test_specialization_can_be_disabled() {
    let program = JsParser::parse_to_ast_from_str("function f() { var n = 1; return n; }").unwrap();
    let options = AnalysisOptions {
        strict: false,
        specialize: false,
    };
    let a = analyze(&program, &options).unwrap();
    assert_eq!(type_of(&a, 1, "n"), ValueType::Unknown);
}
