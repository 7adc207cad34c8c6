//! Array built-in.
//!
//! Provides the Array constructor, `Array.isArray` and the prototype methods
//! `push`, `pop`, `join` and `toString`.

use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{ObjectClass, ObjectRef};
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::{arg, BuiltInObject};

pub fn register(realm: &Rc<Realm>) {
    BuiltInObject::new("Array")
        .with_prototype(&realm.array_prototype)
        .with_constructor(array_constructor, 1)
        .add_static_method("isArray", is_array, 1)
        .add_method("push", array_push, 1)
        .add_method("pop", array_pop, 0)
        .add_method("join", array_join, 1)
        .add_method("toString", array_to_string, 0)
        .register(realm);
}

fn this_array(this: &JsValue, method: &str) -> Result<ObjectRef, JErrorType> {
    if let JsValue::Object(o) = this {
        if matches!(o.borrow().class, ObjectClass::Array(_)) {
            return Ok(o.clone());
        }
    }
    Err(JErrorType::TypeError(format!(
        "Array.prototype.{} called on non-array",
        method
    )))
}

/// `Array(len)` makes `len` holes; any other argument list becomes the elements.
fn array_constructor(
    realm: &Rc<Realm>,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    if let [JsValue::Number(n)] = args.as_slice() {
        let n = *n;
        if n < 0.0 || n.fract() != 0.0 || n >= 4294967296.0 {
            return Err(JErrorType::RangeError("Invalid array length".to_string()));
        }
        return Ok(JsValue::Object(
            realm.new_array(vec![JsValue::Undefined; n as usize]),
        ));
    }
    Ok(JsValue::Object(realm.new_array(args)))
}

fn is_array(
    _realm: &Rc<Realm>,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let result = match arg(&args, 0) {
        JsValue::Object(o) => matches!(o.borrow().class, ObjectClass::Array(_)),
        _ => false,
    };
    Ok(JsValue::Boolean(result))
}

fn array_push(
    _realm: &Rc<Realm>,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let array = this_array(&this, "push")?;
    let mut b = array.borrow_mut();
    match &mut b.class {
        ObjectClass::Array(elements) => {
            elements.extend(args);
            Ok(JsValue::Number(elements.len() as f64))
        }
        _ => Ok(JsValue::Undefined),
    }
}

fn array_pop(
    _realm: &Rc<Realm>,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let array = this_array(&this, "pop")?;
    let mut b = array.borrow_mut();
    match &mut b.class {
        ObjectClass::Array(elements) => Ok(elements.pop().unwrap_or(JsValue::Undefined)),
        _ => Ok(JsValue::Undefined),
    }
}

fn array_join(
    realm: &Rc<Realm>,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let array = this_array(&this, "join")?;
    let separator = match arg(&args, 0) {
        JsValue::Undefined => Rc::from(","),
        s => to_string(realm, &s)?,
    };
    // Copied out so element conversions may call back into script code.
    let elements = match &array.borrow().class {
        ObjectClass::Array(elements) => elements.clone(),
        _ => vec![],
    };
    let mut parts = Vec::with_capacity(elements.len());
    for e in &elements {
        if e.is_nullish() {
            parts.push(String::new());
        } else {
            parts.push(to_string(realm, e)?.to_string());
        }
    }
    Ok(JsValue::from_str(&parts.join(&separator)))
}

fn array_to_string(
    realm: &Rc<Realm>,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    array_join(realm, this, vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_and_join() {
        let realm = Realm::new(16);
        let a = JsValue::Object(realm.new_array(vec![JsValue::Number(1.0)]));
        let len = array_push(&realm, a.clone(), vec![JsValue::Null, JsValue::from_str("x")]);
        assert_eq!(len.unwrap(), JsValue::Number(3.0));
        assert_eq!(
            array_join(&realm, a.clone(), vec![JsValue::from_str("-")]).unwrap(),
            JsValue::from_str("1--x")
        );
        assert_eq!(array_pop(&realm, a.clone(), vec![]).unwrap(), JsValue::from_str("x"));
        assert_eq!(array_to_string(&realm, a, vec![]).unwrap(), JsValue::from_str("1,"));
    }

    #[test]
    fn single_numeric_argument_is_a_length() {
        let realm = Realm::new(16);
        let a = array_constructor(&realm, JsValue::Undefined, vec![JsValue::Number(3.0)]).unwrap();
        match &a {
            JsValue::Object(o) => assert_eq!(o.borrow().get_own("length"), Some(JsValue::Number(3.0))),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            array_constructor(&realm, JsValue::Undefined, vec![JsValue::Number(-1.0)]),
            Err(JErrorType::RangeError(_))
        ));
    }

    #[test]
    fn methods_reject_non_arrays() {
        let realm = Realm::new(16);
        let o = JsValue::Object(realm.new_object());
        assert!(matches!(
            array_push(&realm, o, vec![]),
            Err(JErrorType::TypeError(_))
        ));
    }
}
