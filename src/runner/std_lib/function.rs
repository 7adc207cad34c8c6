//! Function.prototype methods.

use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{call, FunctionKind};
use crate::runner::ds::object::ObjectClass;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::{arg, BuiltInObject};

pub fn register(realm: &Rc<Realm>) {
    BuiltInObject::new("Function")
        .with_prototype(&realm.function_prototype)
        .with_constructor(function_constructor, 1)
        .add_method("call", function_call, 1)
        .add_method("apply", function_apply, 2)
        .add_method("toString", function_to_string, 0)
        .register(realm);
}

fn function_constructor(
    _realm: &Rc<Realm>,
    _this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Err(JErrorType::SyntaxError(
        "Function constructor is not supported".to_string(),
    ))
}

fn function_call(
    realm: &Rc<Realm>,
    this: JsValue,
    mut args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let this_arg = if args.is_empty() {
        JsValue::Undefined
    } else {
        args.remove(0)
    };
    call(realm, &this, this_arg, args)
}

/// Spreads an array or arguments object into an argument list.
fn list_from_array_like(v: &JsValue) -> Result<Vec<JsValue>, JErrorType> {
    match v {
        JsValue::Undefined | JsValue::Null => Ok(vec![]),
        JsValue::Object(o) => match &o.borrow().class {
            ObjectClass::Array(elements) => Ok(elements.clone()),
            ObjectClass::Arguments(data) => Ok(data.values[..data.length].to_vec()),
            _ => Err(JErrorType::TypeError(
                "CreateListFromArrayLike called on non-array".to_string(),
            )),
        },
        _ => Err(JErrorType::TypeError(
            "CreateListFromArrayLike called on non-object".to_string(),
        )),
    }
}

fn function_apply(
    realm: &Rc<Realm>,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let list = list_from_array_like(&arg(&args, 1))?;
    call(realm, &this, arg(&args, 0), list)
}

fn function_to_string(
    _realm: &Rc<Realm>,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    if let JsValue::Object(o) = &this {
        if let ObjectClass::Function(kind) = &o.borrow().class {
            let body = match kind {
                FunctionKind::Script { .. } => "[compiled code]",
                FunctionKind::Native { .. } => "[native code]",
            };
            return Ok(JsValue::from_str(&format!(
                "function {}() {{ {} }}",
                kind.name(),
                body
            )));
        }
    }
    Err(JErrorType::TypeError(
        "Function.prototype.toString requires that 'this' be a Function".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_arg(_: &Rc<Realm>, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        Ok(JsValue::from_str(&format!("{}:{}", this, arg(&args, 0))))
    }

    #[test]
    fn call_and_apply_forward_this_and_arguments() {
        let realm = Realm::new(16);
        let f = JsValue::Object(realm.new_native_function("f", first_arg, 1));
        let via_call = function_call(
            &realm,
            f.clone(),
            vec![JsValue::Number(1.0), JsValue::Number(2.0)],
        );
        assert_eq!(via_call.unwrap(), JsValue::from_str("1:2"));
        let list = JsValue::Object(realm.new_array(vec![JsValue::from_str("x")]));
        let via_apply = function_apply(&realm, f, vec![JsValue::Boolean(true), list]);
        assert_eq!(via_apply.unwrap(), JsValue::from_str("true:x"));
    }

    #[test]
    fn native_functions_print_as_native_code() {
        let realm = Realm::new(16);
        let f = JsValue::Object(realm.new_native_function("f", first_arg, 1));
        assert_eq!(
            function_to_string(&realm, f, vec![]).unwrap(),
            JsValue::from_str("function f() { [native code] }")
        );
    }
}
