use std::cmp::Ordering;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::object::get_v;
use crate::runner::ds::operations::type_conversion::{
    primitive_to_number, string_to_number, to_primitive, PreferredType,
};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

/// SameValue: like `===` except NaN equals NaN and +0 differs from -0.
pub fn same_value(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                true
            } else {
                x == y && x.is_sign_negative() == y.is_sign_negative()
            }
        }
        _ => a == b,
    }
}

pub fn strict_equality_comparison(a: &JsValue, b: &JsValue) -> bool {
    a == b
}

/// The `==` algorithm.
pub fn abstract_equality_comparison(
    realm: &Rc<Realm>,
    a: &JsValue,
    b: &JsValue,
) -> Result<bool, JErrorType> {
    Ok(match (a, b) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => false,
        (JsValue::Number(x), JsValue::String(s)) => *x == string_to_number(s),
        (JsValue::String(s), JsValue::Number(y)) => string_to_number(s) == *y,
        (JsValue::Boolean(_), _) => {
            let x = JsValue::Number(primitive_to_number(a));
            return abstract_equality_comparison(realm, &x, b);
        }
        (_, JsValue::Boolean(_)) => {
            let y = JsValue::Number(primitive_to_number(b));
            return abstract_equality_comparison(realm, a, &y);
        }
        (JsValue::Object(_), JsValue::Object(_)) => a == b,
        (JsValue::Object(_), _) => {
            let x = to_primitive(realm, a, PreferredType::Default)?;
            return abstract_equality_comparison(realm, &x, b);
        }
        (_, JsValue::Object(_)) => {
            let y = to_primitive(realm, b, PreferredType::Default)?;
            return abstract_equality_comparison(realm, a, &y);
        }
        _ => a == b,
    })
}

/// Compares strings by UTF-16 code units.
pub fn compare_strings(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// The abstract relational comparison `a < b`. `None` stands for `undefined` (a NaN was involved).
pub fn abstract_relational_comparison(
    realm: &Rc<Realm>,
    a: &JsValue,
    b: &JsValue,
    left_first: bool,
) -> Result<Option<bool>, JErrorType> {
    let (px, py) = if left_first {
        let px = to_primitive(realm, a, PreferredType::Number)?;
        let py = to_primitive(realm, b, PreferredType::Number)?;
        (px, py)
    } else {
        let py = to_primitive(realm, b, PreferredType::Number)?;
        let px = to_primitive(realm, a, PreferredType::Number)?;
        (px, py)
    };
    if let (JsValue::String(x), JsValue::String(y)) = (&px, &py) {
        return Ok(Some(compare_strings(x, y) == Ordering::Less));
    }
    let nx = primitive_to_number(&px);
    let ny = primitive_to_number(&py);
    Ok(number_less_than(nx, ny))
}

pub fn number_less_than(x: f64, y: f64) -> Option<bool> {
    if x.is_nan() || y.is_nan() {
        None
    } else {
        Some(x < y)
    }
}

/// The `instanceof` operator: walks `v`'s prototype chain looking for `target.prototype`.
pub fn instance_of(realm: &Rc<Realm>, v: &JsValue, target: &JsValue) -> Result<bool, JErrorType> {
    if !target.is_callable() {
        return Err(JErrorType::TypeError(
            "Right-hand side of 'instanceof' is not callable".to_string(),
        ));
    }
    let o = match v {
        JsValue::Object(o) => o.clone(),
        _ => return Ok(false),
    };
    let proto = match get_v(realm, target, "prototype")? {
        JsValue::Object(p) => p,
        _ => {
            return Err(JErrorType::TypeError(
                "Function has non-object prototype in instanceof check".to_string(),
            ))
        }
    };
    let mut current = o.borrow().prototype.clone();
    while let Some(p) = current {
        if Rc::ptr_eq(&p, &proto) {
            return Ok(true);
        }
        current = p.borrow().prototype.clone();
    }
    Ok(false)
}
