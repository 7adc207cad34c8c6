use crate::runner::ds::object::{JsObject, ObjectClass, ObjectRef};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

/// Storage behind an arguments object. It doubles as the parameter storage of the
/// activation, so `values` is padded up to the declared parameter count while
/// `length` remains the number of arguments actually passed.
pub struct ArgumentsData {
    pub values: Vec<JsValue>,
    pub length: usize,
}

pub fn new_arguments_object(
    realm: &Realm,
    mut args: Vec<JsValue>,
    param_count: usize,
    callee: Option<&ObjectRef>,
) -> ObjectRef {
    let length = args.len();
    if args.len() < param_count {
        args.resize(param_count, JsValue::Undefined);
    }
    let mut o = JsObject::new(
        ObjectClass::Arguments(ArgumentsData {
            values: args,
            length,
        }),
        Some(realm.object_prototype.clone()),
    );
    o.define_own("length", JsValue::Number(length as f64), false);
    if let Some(callee) = callee {
        o.define_own("callee", JsValue::Object(callee.clone()), false);
    }
    o.into_ref()
}

/// Reads parameter `index` out of an arguments object.
pub fn get_parameter(arguments: &JsValue, index: usize) -> JsValue {
    if let JsValue::Object(o) = arguments {
        if let ObjectClass::Arguments(data) = &o.borrow().class {
            return data.values.get(index).cloned().unwrap_or(JsValue::Undefined);
        }
    }
    JsValue::Undefined
}

/// Writes parameter `index` of an arguments object. The write is dropped if the value
/// is no longer an arguments object.
pub fn set_parameter(arguments: &JsValue, index: usize, value: JsValue) {
    if let JsValue::Object(o) = arguments {
        if let ObjectClass::Arguments(data) = &mut o.borrow_mut().class {
            if index >= data.values.len() {
                data.values.resize(index + 1, JsValue::Undefined);
            }
            data.values[index] = value;
        }
    }
}
