//! Object built-in.

use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{to_object, to_string};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::{arg, BuiltInObject};

pub fn register(realm: &Rc<Realm>) {
    BuiltInObject::new("Object")
        .with_prototype(&realm.object_prototype)
        .with_constructor(object_constructor, 1)
        .add_method("toString", object_to_string, 0)
        .add_method("valueOf", object_value_of, 0)
        .add_method("hasOwnProperty", object_has_own_property, 1)
        .register(realm);
}

/// `Object(v)` and `new Object(v)`: a fresh object for nullish input, otherwise ToObject.
fn object_constructor(
    realm: &Rc<Realm>,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let value = arg(&args, 0);
    if value.is_nullish() {
        Ok(JsValue::Object(realm.new_object()))
    } else {
        to_object(realm, &value)
    }
}

fn object_to_string(
    _realm: &Rc<Realm>,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let tag = match &this {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        JsValue::Boolean(_) => "Boolean",
        JsValue::Number(_) => "Number",
        JsValue::String(_) => "String",
        JsValue::Object(o) => o.borrow().class_name(),
    };
    Ok(JsValue::String(Rc::from(format!("[object {}]", tag).as_str())))
}

fn object_value_of(
    realm: &Rc<Realm>,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    to_object(realm, &this)
}

fn object_has_own_property(
    realm: &Rc<Realm>,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let key = to_string(realm, &arg(&args, 0))?;
    match to_object(realm, &this)? {
        JsValue::Object(o) => Ok(JsValue::Boolean(o.borrow().has_own(&key))),
        _ => Ok(JsValue::Boolean(false)),
    }
}
