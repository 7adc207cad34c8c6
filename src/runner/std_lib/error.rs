//! Error built-in objects.
//!
//! Provides the Error, TypeError, ReferenceError, RangeError and SyntaxError
//! constructors. The subtypes share `Error.prototype.toString`.

use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::NativeFn;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::operations::object::get;
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::{arg, BuiltInObject};

pub fn register(realm: &Rc<Realm>) {
    let kinds: [(&'static str, &ObjectRef, NativeFn); 5] = [
        ("Error", &realm.error_prototype, error_constructor),
        ("TypeError", &realm.type_error_prototype, type_error_constructor),
        ("ReferenceError", &realm.reference_error_prototype, reference_error_constructor),
        ("RangeError", &realm.range_error_prototype, range_error_constructor),
        ("SyntaxError", &realm.syntax_error_prototype, syntax_error_constructor),
    ];
    for (name, prototype, constructor) in kinds {
        let mut builder = BuiltInObject::new(name)
            .with_prototype(prototype)
            .with_constructor(constructor, 1)
            .add_property("name", JsValue::from_str(name))
            .add_property("message", JsValue::from_str(""));
        if name == "Error" {
            builder = builder.add_method("toString", error_to_string, 0);
        }
        builder.register(realm);
    }
}

fn make_error(realm: &Rc<Realm>, name: &str, args: &[JsValue]) -> Result<JsValue, JErrorType> {
    let message = match arg(args, 0) {
        JsValue::Undefined => Rc::from(""),
        v => to_string(realm, &v)?,
    };
    Ok(JsValue::Object(realm.new_error(name, &message)))
}

fn error_constructor(realm: &Rc<Realm>, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    make_error(realm, "Error", &args)
}

fn type_error_constructor(realm: &Rc<Realm>, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    make_error(realm, "TypeError", &args)
}

fn reference_error_constructor(realm: &Rc<Realm>, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    make_error(realm, "ReferenceError", &args)
}

fn range_error_constructor(realm: &Rc<Realm>, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    make_error(realm, "RangeError", &args)
}

fn syntax_error_constructor(realm: &Rc<Realm>, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    make_error(realm, "SyntaxError", &args)
}

/// Error.prototype.toString: `name`, `message`, or `name: message`.
fn error_to_string(realm: &Rc<Realm>, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let o = match &this {
        JsValue::Object(o) => o.clone(),
        _ => {
            return Err(JErrorType::TypeError(
                "Error.prototype.toString called on non-object".to_string(),
            ))
        }
    };
    let name = match get(&o, "name") {
        JsValue::Undefined => Rc::from("Error"),
        v => to_string(realm, &v)?,
    };
    let message = match get(&o, "message") {
        JsValue::Undefined => Rc::from(""),
        v => to_string(realm, &v)?,
    };
    let text = if name.is_empty() {
        message.to_string()
    } else if message.is_empty() {
        name.to_string()
    } else {
        format!("{}: {}", name, message)
    };
    Ok(JsValue::from_str(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtypes_inherit_to_string() {
        let realm = Realm::new(16);
        register(&realm);
        let e = type_error_constructor(&realm, JsValue::Undefined, vec![JsValue::from_str("bad")])
            .unwrap();
        assert_eq!(
            error_to_string(&realm, e, vec![]).unwrap(),
            JsValue::from_str("TypeError: bad")
        );
        let bare = error_constructor(&realm, JsValue::Undefined, vec![]).unwrap();
        assert_eq!(
            error_to_string(&realm, bare, vec![]).unwrap(),
            JsValue::from_str("Error")
        );
    }
}
