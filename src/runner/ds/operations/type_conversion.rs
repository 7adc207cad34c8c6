use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::call;
use crate::runner::ds::object::{JsObject, ObjectClass};
use crate::runner::ds::operations::object::get;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// The result of `typeof`.
pub fn get_type(a: &JsValue) -> &'static str {
    match a {
        JsValue::Undefined => TYPE_STR_UNDEFINED,
        JsValue::Null => TYPE_STR_OBJECT,
        JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
        JsValue::String(_) => TYPE_STR_STRING,
        JsValue::Number(_) => TYPE_STR_NUMBER,
        JsValue::Object(o) => {
            if o.borrow().is_callable() {
                TYPE_STR_FUNCTION
            } else {
                TYPE_STR_OBJECT
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    String,
    Number,
}

pub fn to_primitive(
    realm: &Rc<Realm>,
    v: &JsValue,
    preferred_type: PreferredType,
) -> Result<JsValue, JErrorType> {
    let o = match v {
        JsValue::Object(o) => o,
        _ => return Ok(v.clone()),
    };
    let methods = match preferred_type {
        PreferredType::String => ["toString", "valueOf"],
        PreferredType::Default | PreferredType::Number => ["valueOf", "toString"],
    };
    for name in methods.iter() {
        let f = get(o, name);
        if f.is_callable() {
            let result = call(realm, &f, v.clone(), vec![])?;
            if !matches!(result, JsValue::Object(_)) {
                return Ok(result);
            }
        }
    }
    Err(JErrorType::TypeError(
        "Cannot convert object to primitive value".to_string(),
    ))
}

pub fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => number_to_boolean(*n),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
    }
}

pub fn number_to_boolean(n: f64) -> bool {
    !(n == 0.0 || n.is_nan())
}

pub fn to_number(realm: &Rc<Realm>, v: &JsValue) -> Result<f64, JErrorType> {
    match v {
        JsValue::Object(_) => {
            let pv = to_primitive(realm, v, PreferredType::Number)?;
            Ok(primitive_to_number(&pv))
        }
        _ => Ok(primitive_to_number(v)),
    }
}

/// ToNumber for values that are already primitive. Objects map to NaN.
pub fn primitive_to_number(v: &JsValue) -> f64 {
    match v {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(true) => 1.0,
        JsValue::Boolean(false) => 0.0,
        JsValue::Number(n) => *n,
        JsValue::String(s) => string_to_number(s),
        JsValue::Object(_) => f64::NAN,
    }
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

/// ToNumber applied to a string (the StringNumericLiteral grammar).
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim_matches(is_js_whitespace);
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        if hex.is_empty() {
            return f64::NAN;
        }
        let mut value = 0.0;
        for c in hex.chars() {
            match c.to_digit(16) {
                Some(d) => value = value * 16.0 + d as f64,
                None => return f64::NAN,
            }
        }
        return value;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if !t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    let unsigned = t.trim_start_matches(|c| c == '+' || c == '-');
    if unsigned.starts_with('.') && unsigned.len() == 1 {
        return f64::NAN;
    }
    let mut normalized = t.replace(".e", ".0e").replace(".E", ".0E");
    if normalized.ends_with('.') {
        normalized.push('0');
    }
    normalized.parse::<f64>().unwrap_or(f64::NAN)
}

/// Number::toString(10): shortest round-tripping digits, laid out per ECMAScript.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }
    let formatted = format!("{:e}", n);
    let (mantissa, exponent) = match formatted.split_once('e') {
        Some(parts) => parts,
        None => return formatted,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let point = exponent + 1;
    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let sign = if e >= 0 { "+" } else { "-" };
        if k == 1 {
            format!("{}e{}{}", digits, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], sign, e.abs())
        }
    }
}

/// ToString for values that are already primitive.
pub fn primitive_to_string(v: &JsValue) -> Rc<str> {
    match v {
        JsValue::Undefined => Rc::from(TYPE_STR_UNDEFINED),
        JsValue::Null => Rc::from(TYPE_STR_NULL),
        JsValue::Boolean(true) => Rc::from("true"),
        JsValue::Boolean(false) => Rc::from("false"),
        JsValue::Number(n) => Rc::from(number_to_string(*n).as_str()),
        JsValue::String(s) => s.clone(),
        JsValue::Object(_) => Rc::from("[object Object]"),
    }
}

pub fn to_string(realm: &Rc<Realm>, v: &JsValue) -> Result<Rc<str>, JErrorType> {
    match v {
        JsValue::Object(_) => {
            let pv = to_primitive(realm, v, PreferredType::String)?;
            Ok(primitive_to_string(&pv))
        }
        _ => Ok(primitive_to_string(v)),
    }
}

pub fn to_object(realm: &Rc<Realm>, v: &JsValue) -> Result<JsValue, JErrorType> {
    let (class, prototype) = match v {
        JsValue::Undefined | JsValue::Null => {
            return Err(JErrorType::TypeError(format!(
                "'{}' cannot be converted to object",
                v
            )))
        }
        JsValue::Object(_) => return Ok(v.clone()),
        JsValue::Boolean(b) => (ObjectClass::Boolean(*b), realm.boolean_prototype.clone()),
        JsValue::Number(n) => (ObjectClass::Number(*n), realm.number_prototype.clone()),
        JsValue::String(s) => (ObjectClass::String(s.clone()), realm.string_prototype.clone()),
    };
    Ok(JsValue::Object(JsObject::new(class, Some(prototype)).into_ref()))
}

pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}
