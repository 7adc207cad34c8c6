use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::object::{ObjectClass, ObjectRef};
use crate::runner::ds::operations::object::get;
use crate::runner::ds::operations::type_conversion::{
    number_to_string, TYPE_STR_NULL, TYPE_STR_UNDEFINED,
};

/// The boxed dynamic value every compiled expression can fall back to.
#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
}

impl JsValue {
    pub fn from_str(s: &str) -> Self {
        JsValue::String(Rc::from(s))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(o) => o.borrow().is_callable(),
            _ => false,
        }
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::from_str(s)
    }
}

impl From<Rc<str>> for JsValue {
    fn from(s: Rc<str>) -> Self {
        JsValue::String(s)
    }
}

impl From<ObjectRef> for JsValue {
    fn from(o: ObjectRef) -> Self {
        JsValue::Object(o)
    }
}

/// Display renders values the way a console would, without invoking script code.
impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            JsValue::Null => write!(f, "{}", TYPE_STR_NULL),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            JsValue::String(s) => write!(f, "{}", s),
            JsValue::Object(o) => fmt_object(o, f),
        }
    }
}

fn fmt_object(o: &ObjectRef, f: &mut Formatter<'_>) -> fmt::Result {
    let class_name = {
        let b = o.borrow();
        match &b.class {
            ObjectClass::Function(_) => return write!(f, "[Function]"),
            ObjectClass::Array(elements) => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|e| match e {
                        JsValue::Undefined | JsValue::Null => String::new(),
                        JsValue::Object(_) => "[object]".to_string(),
                        other => other.to_string(),
                    })
                    .collect();
                return write!(f, "{}", parts.join(","));
            }
            _ => b.class_name(),
        }
    };
    if class_name == "Error" {
        let name = get(o, "name");
        let message = get(o, "message");
        return match (name, message) {
            (JsValue::Undefined, JsValue::Undefined) => write!(f, "Error"),
            (JsValue::Undefined, m) => write!(f, "Error: {}", m),
            (n, JsValue::Undefined) => write!(f, "{}", n),
            (n, JsValue::String(m)) if m.is_empty() => write!(f, "{}", n),
            (n, m) => write!(f, "{}: {}", n, m),
        };
    }
    write!(f, "[object {}]", class_name)
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "JsValue::Undefined"),
            JsValue::Null => write!(f, "JsValue::Null"),
            JsValue::Boolean(b) => write!(f, "JsValue::Boolean({})", b),
            JsValue::Number(n) => write!(f, "JsValue::Number({:?})", n),
            JsValue::String(s) => write!(f, "JsValue::String({:?})", s),
            JsValue::Object(_) => write!(f, "JsValue::Object({})", self),
        }
    }
}

/// Structural for primitives, identity for objects. NaN compares unequal to itself.
impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
