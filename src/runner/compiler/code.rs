use std::rc::Rc;

use crate::runner::analysis::variable::ValueType;
use crate::runner::ds::activation::Activation;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{
    number_to_boolean, number_to_string, string_to_number, to_boolean, to_number, to_string,
};
use crate::runner::ds::value::JsValue;

/// A compiled expression producing a `T`.
pub type Code<T> = Box<dyn Fn(&mut Activation) -> Result<T, JErrorType>>;

pub type TargetId = usize;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    Return(JsValue),
    Break(TargetId),
    Continue(TargetId),
}

pub type StatementCode = Code<Completion>;

/// Compiled expression together with the representation of its result.
///
/// Expressions the analysis could type stay unboxed until something needs a
/// `JsValue`; the conversions below are exact whenever the static type holds.
pub enum TypedCode {
    Double(Code<f64>),
    Boolean(Code<bool>),
    String(Code<Rc<str>>),
    Boxed(Code<JsValue>),
}

fn bool_str(b: bool) -> Rc<str> {
    Rc::from(if b { "true" } else { "false" })
}

impl TypedCode {
    pub fn constant(value: JsValue) -> TypedCode {
        match value {
            JsValue::Number(n) => TypedCode::Double(Box::new(move |_| Ok(n))),
            JsValue::Boolean(b) => TypedCode::Boolean(Box::new(move |_| Ok(b))),
            JsValue::String(s) => TypedCode::String(Box::new(move |_| Ok(s.clone()))),
            other => TypedCode::Boxed(Box::new(move |_| Ok(other.clone()))),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            TypedCode::Double(_) => ValueType::Double,
            TypedCode::Boolean(_) => ValueType::Boolean,
            TypedCode::String(_) => ValueType::String,
            TypedCode::Boxed(_) => ValueType::Unknown,
        }
    }

    pub fn into_boxed(self) -> Code<JsValue> {
        match self {
            TypedCode::Double(c) => Box::new(move |a| c(a).map(JsValue::Number)),
            TypedCode::Boolean(c) => Box::new(move |a| c(a).map(JsValue::Boolean)),
            TypedCode::String(c) => Box::new(move |a| c(a).map(JsValue::String)),
            TypedCode::Boxed(c) => c,
        }
    }

    pub fn into_double(self) -> Code<f64> {
        match self {
            TypedCode::Double(c) => c,
            TypedCode::Boolean(c) => Box::new(move |a| c(a).map(|b| if b { 1.0 } else { 0.0 })),
            TypedCode::String(c) => Box::new(move |a| c(a).map(|s| string_to_number(&s))),
            TypedCode::Boxed(c) => Box::new(move |a| {
                let v = c(a)?;
                to_number(&a.realm, &v)
            }),
        }
    }

    pub fn into_boolean(self) -> Code<bool> {
        match self {
            TypedCode::Double(c) => Box::new(move |a| c(a).map(number_to_boolean)),
            TypedCode::Boolean(c) => c,
            TypedCode::String(c) => Box::new(move |a| c(a).map(|s| !s.is_empty())),
            TypedCode::Boxed(c) => Box::new(move |a| c(a).map(|v| to_boolean(&v))),
        }
    }

    pub fn into_string(self) -> Code<Rc<str>> {
        match self {
            TypedCode::Double(c) => {
                Box::new(move |a| c(a).map(|n| Rc::from(number_to_string(n).as_str())))
            }
            TypedCode::Boolean(c) => Box::new(move |a| c(a).map(bool_str)),
            TypedCode::String(c) => c,
            TypedCode::Boxed(c) => Box::new(move |a| {
                let v = c(a)?;
                to_string(&a.realm, &v)
            }),
        }
    }

    /// Re-represents the code as `value_type`; `Unknown` and `Object` mean boxed.
    pub fn into_type(self, value_type: ValueType) -> TypedCode {
        match value_type {
            ValueType::Double => TypedCode::Double(self.into_double()),
            ValueType::Boolean => TypedCode::Boolean(self.into_boolean()),
            ValueType::String => TypedCode::String(self.into_string()),
            ValueType::Unset | ValueType::Unknown | ValueType::Object => {
                TypedCode::Boxed(self.into_boxed())
            }
        }
    }

    /// Runs the code for its side effects only.
    pub fn into_effect(self) -> Code<()> {
        match self {
            TypedCode::Double(c) => Box::new(move |a| c(a).map(|_| ())),
            TypedCode::Boolean(c) => Box::new(move |a| c(a).map(|_| ())),
            TypedCode::String(c) => Box::new(move |a| c(a).map(|_| ())),
            TypedCode::Boxed(c) => Box::new(move |a| c(a).map(|_| ())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::activation::FrameLayout;
    use crate::runner::ds::realm::Realm;

    fn activation() -> Activation {
        let realm = Realm::new(16);
        Activation::new(
            realm,
            &FrameLayout::default(),
            JsValue::Undefined,
            None,
            JsValue::Undefined,
            None,
        )
    }

    #[test]
    fn conversions_follow_to_number_and_to_string() {
        let mut a = activation();
        let s = TypedCode::constant(JsValue::from_str(" 12 ")).into_double();
        assert_eq!(s(&mut a).unwrap(), 12.0);
        let d = TypedCode::constant(JsValue::Number(0.5)).into_string();
        assert_eq!(&*d(&mut a).unwrap(), "0.5");
        let b = TypedCode::constant(JsValue::Boolean(true)).into_string();
        assert_eq!(&*b(&mut a).unwrap(), "true");
        let n = TypedCode::constant(JsValue::Null).into_double();
        assert_eq!(n(&mut a).unwrap(), 0.0);
    }

    #[test]
    fn into_type_keeps_matching_representation() {
        let c = TypedCode::constant(JsValue::Number(1.0)).into_type(ValueType::Unknown);
        assert_eq!(c.value_type(), ValueType::Unknown);
        let c = TypedCode::constant(JsValue::from_str("x")).into_type(ValueType::String);
        assert_eq!(c.value_type(), ValueType::String);
    }
}
