use std::collections::HashSet;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::ensure_function_prototype;
use crate::runner::ds::object::{array_index, string_char_at, ObjectRef};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

/// [[Get]] on an object, walking the prototype chain. Missing properties read as `undefined`.
pub fn get(o: &ObjectRef, key: &str) -> JsValue {
    let mut current = o.clone();
    loop {
        let next = {
            let b = current.borrow();
            if let Some(v) = b.get_own(key) {
                return v;
            }
            b.prototype.clone()
        };
        match next {
            Some(p) => current = p,
            None => return JsValue::Undefined,
        }
    }
}

/// Property read on any value. Primitives read through their wrapper prototypes.
pub fn get_v(realm: &Rc<Realm>, v: &JsValue, key: &str) -> Result<JsValue, JErrorType> {
    match v {
        JsValue::Object(o) => {
            if key == "prototype" {
                ensure_function_prototype(realm, o);
            }
            Ok(get(o, key))
        }
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read property '{}' of {}",
            key, v
        ))),
        JsValue::String(s) => {
            if key == "length" {
                return Ok(JsValue::Number(s.encode_utf16().count() as f64));
            }
            if let Some(i) = array_index(key) {
                if let Some(c) = string_char_at(s, i) {
                    return Ok(JsValue::String(c));
                }
            }
            Ok(get(&realm.string_prototype, key))
        }
        JsValue::Number(_) => Ok(get(&realm.number_prototype, key)),
        JsValue::Boolean(_) => Ok(get(&realm.boolean_prototype, key)),
    }
}

/// Looks up a method to call; `undefined` and `null` mean "no method".
pub fn get_method(realm: &Rc<Realm>, v: &JsValue, key: &str) -> Result<JsValue, JErrorType> {
    let f = get_v(realm, v, key)?;
    match &f {
        JsValue::Undefined | JsValue::Null => Ok(JsValue::Undefined),
        _ if f.is_callable() => Ok(f),
        _ => Err(JErrorType::TypeError(format!("'{}' is not a function", key))),
    }
}

/// Property write on any value. Writes to primitives are dropped, or rejected in strict code.
pub fn put_v(
    v: &JsValue,
    key: &str,
    value: JsValue,
    strict: bool,
) -> Result<(), JErrorType> {
    match v {
        JsValue::Object(o) => o.borrow_mut().put_own(key, value),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot set property '{}' of {}",
            key, v
        ))),
        _ if strict => Err(JErrorType::TypeError(format!(
            "Cannot create property '{}' on {}",
            key, v
        ))),
        _ => Ok(()),
    }
}

/// [[HasProperty]]: own or inherited.
pub fn has_property(o: &ObjectRef, key: &str) -> bool {
    let mut current = o.clone();
    loop {
        let next = {
            let b = current.borrow();
            if b.has_own(key) {
                return true;
            }
            b.prototype.clone()
        };
        match next {
            Some(p) => current = p,
            None => return false,
        }
    }
}

/// The `in` operator.
pub fn has_property_v(realm: &Rc<Realm>, v: &JsValue, key: &str) -> Result<bool, JErrorType> {
    match v {
        JsValue::Object(o) => {
            if key == "prototype" {
                ensure_function_prototype(realm, o);
            }
            Ok(has_property(o, key))
        }
        _ => Err(JErrorType::TypeError(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key, v
        ))),
    }
}

/// The `delete` operator applied to a property reference.
pub fn delete_property(v: &JsValue, key: &str, strict: bool) -> Result<bool, JErrorType> {
    let deleted = match v {
        JsValue::Object(o) => o.borrow_mut().delete_own(key),
        JsValue::Undefined | JsValue::Null => {
            return Err(JErrorType::TypeError(format!(
                "Cannot convert {} to object",
                v
            )))
        }
        JsValue::String(s) => {
            key != "length"
                && !array_index(key)
                    .map(|i| i < s.encode_utf16().count())
                    .unwrap_or(false)
        }
        _ => true,
    };
    if !deleted && strict {
        return Err(JErrorType::TypeError(format!(
            "Cannot delete property '{}' of {}",
            key, v
        )));
    }
    Ok(deleted)
}

/// Keys visited by `for-in`: own enumerable keys, then inherited ones not already seen.
pub fn enumerate_keys(o: &ObjectRef) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = vec![];
    let mut current = Some(o.clone());
    while let Some(obj) = current {
        let b = obj.borrow();
        for key in b.own_keys(false) {
            if seen.insert(key.clone()) && b.is_own_enumerable(&key) {
                keys.push(key);
            }
        }
        current = b.prototype.clone();
    }
    keys
}
