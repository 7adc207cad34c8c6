//! Operator specialization.
//!
//! Each operator is looked up by the static types of its operands, most specific
//! key first. A hit returns a closure that works on unboxed values; a miss falls
//! back to [`apply_binary`] / [`apply_unary`], which implement the full dynamic
//! semantics on boxed values.

use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::ast::{BinaryOperator, UnaryOperator};
use crate::runner::analysis::variable::ValueType;
use crate::runner::compiler::code::TypedCode;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::object::has_property_v;
use crate::runner::ds::operations::test_and_comparison::{
    abstract_equality_comparison, abstract_relational_comparison, compare_strings,
    instance_of, number_less_than, strict_equality_comparison,
};
use crate::runner::ds::operations::type_conversion::{
    get_type, primitive_to_number, primitive_to_string, to_boolean, to_int32, to_number,
    to_primitive, to_string, to_uint32, PreferredType, TYPE_STR_BOOLEAN, TYPE_STR_NUMBER,
    TYPE_STR_STRING,
};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

type BinarySpecializer = fn(TypedCode, TypedCode) -> TypedCode;
type UnarySpecializer = fn(TypedCode) -> TypedCode;

fn concat(a: &str, b: &str) -> Rc<str> {
    let mut s = String::with_capacity(a.len() + b.len());
    s.push_str(a);
    s.push_str(b);
    Rc::from(s.as_str())
}

fn shift_count(n: f64) -> u32 {
    to_uint32(n) & 0x1f
}

fn numeric_result(operator: BinaryOperator, x: f64, y: f64) -> f64 {
    match operator {
        BinaryOperator::Add => x + y,
        BinaryOperator::Subtract => x - y,
        BinaryOperator::Multiply => x * y,
        BinaryOperator::Divide => x / y,
        BinaryOperator::Modulo => x % y,
        BinaryOperator::BitwiseLeftShift => to_int32(x).wrapping_shl(shift_count(y)) as f64,
        BinaryOperator::BitwiseRightShift => (to_int32(x) >> shift_count(y)) as f64,
        BinaryOperator::BitwiseUnsignedRightShift => (to_uint32(x) >> shift_count(y)) as f64,
        BinaryOperator::BitwiseOr => (to_int32(x) | to_int32(y)) as f64,
        BinaryOperator::BitwiseXor => (to_int32(x) ^ to_int32(y)) as f64,
        BinaryOperator::BitwiseAnd => (to_int32(x) & to_int32(y)) as f64,
        _ => f64::NAN,
    }
}

fn relational_numbers(operator: BinaryOperator, x: f64, y: f64) -> bool {
    match operator {
        BinaryOperator::LessThan => number_less_than(x, y) == Some(true),
        BinaryOperator::GreaterThan => number_less_than(y, x) == Some(true),
        BinaryOperator::LessThanEqual => number_less_than(y, x) == Some(false),
        BinaryOperator::GreaterThanEqual => number_less_than(x, y) == Some(false),
        _ => false,
    }
}

fn relational_strings(operator: BinaryOperator, x: &str, y: &str) -> bool {
    let ordering = compare_strings(x, y);
    match operator {
        BinaryOperator::LessThan => ordering.is_lt(),
        BinaryOperator::GreaterThan => ordering.is_gt(),
        BinaryOperator::LessThanEqual => ordering.is_le(),
        BinaryOperator::GreaterThanEqual => ordering.is_ge(),
        _ => false,
    }
}

fn relational_values(
    realm: &Rc<Realm>,
    operator: BinaryOperator,
    x: &JsValue,
    y: &JsValue,
) -> Result<bool, JErrorType> {
    Ok(match operator {
        BinaryOperator::LessThan => {
            abstract_relational_comparison(realm, x, y, true)? == Some(true)
        }
        BinaryOperator::GreaterThan => {
            abstract_relational_comparison(realm, y, x, false)? == Some(true)
        }
        BinaryOperator::LessThanEqual => {
            abstract_relational_comparison(realm, y, x, false)? == Some(false)
        }
        BinaryOperator::GreaterThanEqual => {
            abstract_relational_comparison(realm, x, y, true)? == Some(false)
        }
        _ => false,
    })
}

fn equality_values(
    realm: &Rc<Realm>,
    operator: BinaryOperator,
    x: &JsValue,
    y: &JsValue,
) -> Result<bool, JErrorType> {
    Ok(match operator {
        BinaryOperator::StrictlyEqual => strict_equality_comparison(x, y),
        BinaryOperator::StrictlyUnequal => !strict_equality_comparison(x, y),
        BinaryOperator::LooselyEqual => abstract_equality_comparison(realm, x, y)?,
        BinaryOperator::LooselyUnequal => !abstract_equality_comparison(realm, x, y)?,
        _ => false,
    })
}

fn is_negated(operator: BinaryOperator) -> bool {
    matches!(
        operator,
        BinaryOperator::StrictlyUnequal | BinaryOperator::LooselyUnequal
    )
}

/// The `+` operator on arbitrary values.
fn add_values(realm: &Rc<Realm>, x: &JsValue, y: &JsValue) -> Result<JsValue, JErrorType> {
    let lp = to_primitive(realm, x, PreferredType::Default)?;
    let rp = to_primitive(realm, y, PreferredType::Default)?;
    if matches!(lp, JsValue::String(_)) || matches!(rp, JsValue::String(_)) {
        let (ls, rs) = (primitive_to_string(&lp), primitive_to_string(&rp));
        return Ok(JsValue::String(concat(&ls, &rs)));
    }
    Ok(JsValue::Number(
        primitive_to_number(&lp) + primitive_to_number(&rp),
    ))
}

/// Full dynamic semantics of a binary operator on already evaluated operands.
pub fn apply_binary(
    realm: &Rc<Realm>,
    operator: BinaryOperator,
    x: &JsValue,
    y: &JsValue,
) -> Result<JsValue, JErrorType> {
    match operator {
        BinaryOperator::Add => add_values(realm, x, y),
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo
        | BinaryOperator::BitwiseLeftShift
        | BinaryOperator::BitwiseRightShift
        | BinaryOperator::BitwiseUnsignedRightShift
        | BinaryOperator::BitwiseOr
        | BinaryOperator::BitwiseXor
        | BinaryOperator::BitwiseAnd => {
            let l = to_number(realm, x)?;
            let r = to_number(realm, y)?;
            Ok(JsValue::Number(numeric_result(operator, l, r)))
        }
        BinaryOperator::LessThan
        | BinaryOperator::LessThanEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanEqual => {
            relational_values(realm, operator, x, y).map(JsValue::Boolean)
        }
        BinaryOperator::LooselyEqual
        | BinaryOperator::LooselyUnequal
        | BinaryOperator::StrictlyEqual
        | BinaryOperator::StrictlyUnequal => {
            equality_values(realm, operator, x, y).map(JsValue::Boolean)
        }
        BinaryOperator::In => {
            if !matches!(y, JsValue::Object(_)) {
                return Err(JErrorType::TypeError(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    x, y
                )));
            }
            let key = to_string(realm, x)?;
            has_property_v(realm, y, &key).map(JsValue::Boolean)
        }
        BinaryOperator::InstanceOf => instance_of(realm, x, y).map(JsValue::Boolean),
    }
}

/// Full dynamic semantics of a unary operator on an evaluated operand. `delete` of
/// a non-reference is `true`.
pub fn apply_unary(
    realm: &Rc<Realm>,
    operator: UnaryOperator,
    v: &JsValue,
) -> Result<JsValue, JErrorType> {
    Ok(match operator {
        UnaryOperator::Minus => JsValue::Number(-to_number(realm, v)?),
        UnaryOperator::Plus => JsValue::Number(to_number(realm, v)?),
        UnaryOperator::BitwiseNot => JsValue::Number(!to_int32(to_number(realm, v)?) as f64),
        UnaryOperator::LogicalNot => JsValue::Boolean(!to_boolean(v)),
        UnaryOperator::TypeOf => JsValue::from_str(get_type(v)),
        UnaryOperator::Void => JsValue::Undefined,
        UnaryOperator::Delete => JsValue::Boolean(true),
    })
}

fn dynamic_binary(operator: BinaryOperator, l: TypedCode, r: TypedCode) -> TypedCode {
    let (l, r) = (l.into_boxed(), r.into_boxed());
    TypedCode::Boxed(Box::new(move |a| {
        let x = l(a)?;
        let y = r(a)?;
        apply_binary(&a.realm, operator, &x, &y)
    }))
}

fn dynamic_unary(operator: UnaryOperator, c: TypedCode) -> TypedCode {
    let c = c.into_boxed();
    TypedCode::Boxed(Box::new(move |a| {
        let v = c(a)?;
        apply_unary(&a.realm, operator, &v)
    }))
}

/// Numeric operators. Primitive operands convert without side effects, so they are
/// converted as they are evaluated; anything else is evaluated first and converted
/// afterwards, left before right.
fn numeric(operator: BinaryOperator, l: TypedCode, r: TypedCode) -> TypedCode {
    if l.value_type() != ValueType::Unknown && r.value_type() != ValueType::Unknown {
        let (l, r) = (l.into_double(), r.into_double());
        return TypedCode::Double(Box::new(move |a| {
            let x = l(a)?;
            let y = r(a)?;
            Ok(numeric_result(operator, x, y))
        }));
    }
    let (l, r) = (l.into_boxed(), r.into_boxed());
    TypedCode::Double(Box::new(move |a| {
        let x = l(a)?;
        let y = r(a)?;
        let x = to_number(&a.realm, &x)?;
        let y = to_number(&a.realm, &y)?;
        Ok(numeric_result(operator, x, y))
    }))
}

fn relational(operator: BinaryOperator, l: TypedCode, r: TypedCode) -> TypedCode {
    match (l, r) {
        (TypedCode::Double(l), TypedCode::Double(r)) => TypedCode::Boolean(Box::new(move |a| {
            let x = l(a)?;
            let y = r(a)?;
            Ok(relational_numbers(operator, x, y))
        })),
        (TypedCode::String(l), TypedCode::String(r)) => TypedCode::Boolean(Box::new(move |a| {
            let x = l(a)?;
            let y = r(a)?;
            Ok(relational_strings(operator, &x, &y))
        })),
        (l, r) => {
            let (l, r) = (l.into_boxed(), r.into_boxed());
            TypedCode::Boolean(Box::new(move |a| {
                let x = l(a)?;
                let y = r(a)?;
                relational_values(&a.realm, operator, &x, &y)
            }))
        }
    }
}

fn equality(operator: BinaryOperator, l: TypedCode, r: TypedCode) -> TypedCode {
    let negate = is_negated(operator);
    match (l, r) {
        (TypedCode::Double(l), TypedCode::Double(r)) => TypedCode::Boolean(Box::new(move |a| {
            let x = l(a)?;
            let y = r(a)?;
            Ok((x == y) != negate)
        })),
        (TypedCode::Boolean(l), TypedCode::Boolean(r)) => TypedCode::Boolean(Box::new(move |a| {
            let x = l(a)?;
            let y = r(a)?;
            Ok((x == y) != negate)
        })),
        (TypedCode::String(l), TypedCode::String(r)) => TypedCode::Boolean(Box::new(move |a| {
            let x = l(a)?;
            let y = r(a)?;
            Ok((x == y) != negate)
        })),
        (l, r) => {
            let (l, r) = (l.into_boxed(), r.into_boxed());
            TypedCode::Boolean(Box::new(move |a| {
                let x = l(a)?;
                let y = r(a)?;
                equality_values(&a.realm, operator, &x, &y)
            }))
        }
    }
}

fn concatenation(l: TypedCode, r: TypedCode) -> TypedCode {
    let (l, r) = (l.into_string(), r.into_string());
    TypedCode::String(Box::new(move |a| {
        let x = l(a)?;
        let y = r(a)?;
        Ok(concat(&x, &y))
    }))
}

/// A string plus an unknown value: the unknown side goes through ToPrimitive first.
fn concat_with_unknown(l: TypedCode, r: TypedCode) -> TypedCode {
    let (l, r) = (l.into_boxed(), r.into_boxed());
    TypedCode::String(Box::new(move |a| {
        let x = l(a)?;
        let y = r(a)?;
        let x = to_primitive(&a.realm, &x, PreferredType::Default)?;
        let y = to_primitive(&a.realm, &y, PreferredType::Default)?;
        Ok(concat(&primitive_to_string(&x), &primitive_to_string(&y)))
    }))
}

macro_rules! binary_specializer {
    ($name:ident, $helper:ident, $op:expr) => {
        fn $name(l: TypedCode, r: TypedCode) -> TypedCode {
            $helper($op, l, r)
        }
    };
}

fn add_numbers(l: TypedCode, r: TypedCode) -> TypedCode {
    numeric(BinaryOperator::Add, l, r)
}

binary_specializer!(subtract, numeric, BinaryOperator::Subtract);
binary_specializer!(multiply, numeric, BinaryOperator::Multiply);
binary_specializer!(divide, numeric, BinaryOperator::Divide);
binary_specializer!(modulo, numeric, BinaryOperator::Modulo);
binary_specializer!(left_shift, numeric, BinaryOperator::BitwiseLeftShift);
binary_specializer!(right_shift, numeric, BinaryOperator::BitwiseRightShift);
binary_specializer!(
    unsigned_right_shift,
    numeric,
    BinaryOperator::BitwiseUnsignedRightShift
);
binary_specializer!(bitwise_or, numeric, BinaryOperator::BitwiseOr);
binary_specializer!(bitwise_xor, numeric, BinaryOperator::BitwiseXor);
binary_specializer!(bitwise_and, numeric, BinaryOperator::BitwiseAnd);
binary_specializer!(less_than, relational, BinaryOperator::LessThan);
binary_specializer!(less_than_equal, relational, BinaryOperator::LessThanEqual);
binary_specializer!(greater_than, relational, BinaryOperator::GreaterThan);
binary_specializer!(greater_than_equal, relational, BinaryOperator::GreaterThanEqual);
binary_specializer!(strictly_equal, equality, BinaryOperator::StrictlyEqual);
binary_specializer!(strictly_unequal, equality, BinaryOperator::StrictlyUnequal);
binary_specializer!(loosely_equal, equality, BinaryOperator::LooselyEqual);
binary_specializer!(loosely_unequal, equality, BinaryOperator::LooselyUnequal);

fn in_operator(l: TypedCode, r: TypedCode) -> TypedCode {
    let (l, r) = (l.into_boxed(), r.into_boxed());
    TypedCode::Boolean(Box::new(move |a| {
        let x = l(a)?;
        let y = r(a)?;
        Ok(to_boolean(&apply_binary(&a.realm, BinaryOperator::In, &x, &y)?))
    }))
}

fn instance_of_operator(l: TypedCode, r: TypedCode) -> TypedCode {
    let (l, r) = (l.into_boxed(), r.into_boxed());
    TypedCode::Boolean(Box::new(move |a| {
        let x = l(a)?;
        let y = r(a)?;
        instance_of(&a.realm, &x, &y)
    }))
}

fn negate(c: TypedCode) -> TypedCode {
    let c = c.into_double();
    TypedCode::Double(Box::new(move |a| Ok(-c(a)?)))
}

fn unary_plus(c: TypedCode) -> TypedCode {
    TypedCode::Double(c.into_double())
}

fn bitwise_not(c: TypedCode) -> TypedCode {
    let c = c.into_double();
    TypedCode::Double(Box::new(move |a| Ok(!to_int32(c(a)?) as f64)))
}

fn logical_not(c: TypedCode) -> TypedCode {
    let c = c.into_boolean();
    TypedCode::Boolean(Box::new(move |a| Ok(!c(a)?)))
}

fn type_of_constant(c: TypedCode, name: &'static str) -> TypedCode {
    let c = c.into_effect();
    TypedCode::String(Box::new(move |a| {
        c(a)?;
        Ok(Rc::from(name))
    }))
}

fn type_of_number(c: TypedCode) -> TypedCode {
    type_of_constant(c, TYPE_STR_NUMBER)
}

fn type_of_boolean(c: TypedCode) -> TypedCode {
    type_of_constant(c, TYPE_STR_BOOLEAN)
}

fn type_of_string(c: TypedCode) -> TypedCode {
    type_of_constant(c, TYPE_STR_STRING)
}

fn type_of(c: TypedCode) -> TypedCode {
    let c = c.into_boxed();
    TypedCode::String(Box::new(move |a| Ok(Rc::from(get_type(&c(a)?)))))
}

fn void(c: TypedCode) -> TypedCode {
    let c = c.into_effect();
    TypedCode::Boxed(Box::new(move |a| {
        c(a)?;
        Ok(JsValue::Undefined)
    }))
}

lazy_static! {
    static ref BINARY_SPECIALIZATIONS: HashMap<(BinaryOperator, ValueType, ValueType), BinarySpecializer> = {
        use crate::runner::analysis::variable::ValueType::{Boolean, Double, String, Unknown};
        let mut m: HashMap<(BinaryOperator, ValueType, ValueType), BinarySpecializer> =
            HashMap::new();

        for l in [Double, Boolean] {
            for r in [Double, Boolean] {
                m.insert((BinaryOperator::Add, l, r), add_numbers);
            }
        }
        for other in [Double, Boolean, String] {
            m.insert((BinaryOperator::Add, String, other), concatenation);
            m.insert((BinaryOperator::Add, other, String), concatenation);
        }
        m.insert((BinaryOperator::Add, String, Unknown), concat_with_unknown);
        m.insert((BinaryOperator::Add, Unknown, String), concat_with_unknown);

        let numeric_ops: [(BinaryOperator, BinarySpecializer); 10] = [
            (BinaryOperator::Subtract, subtract),
            (BinaryOperator::Multiply, multiply),
            (BinaryOperator::Divide, divide),
            (BinaryOperator::Modulo, modulo),
            (BinaryOperator::BitwiseLeftShift, left_shift),
            (BinaryOperator::BitwiseRightShift, right_shift),
            (BinaryOperator::BitwiseUnsignedRightShift, unsigned_right_shift),
            (BinaryOperator::BitwiseOr, bitwise_or),
            (BinaryOperator::BitwiseXor, bitwise_xor),
            (BinaryOperator::BitwiseAnd, bitwise_and),
        ];
        for (op, f) in numeric_ops {
            m.insert((op, Double, Double), f);
            m.insert((op, Unknown, Unknown), f);
        }

        let relational_ops: [(BinaryOperator, BinarySpecializer); 4] = [
            (BinaryOperator::LessThan, less_than),
            (BinaryOperator::LessThanEqual, less_than_equal),
            (BinaryOperator::GreaterThan, greater_than),
            (BinaryOperator::GreaterThanEqual, greater_than_equal),
        ];
        for (op, f) in relational_ops {
            m.insert((op, Double, Double), f);
            m.insert((op, String, String), f);
            m.insert((op, Unknown, Unknown), f);
        }

        let equality_ops: [(BinaryOperator, BinarySpecializer); 4] = [
            (BinaryOperator::StrictlyEqual, strictly_equal),
            (BinaryOperator::StrictlyUnequal, strictly_unequal),
            (BinaryOperator::LooselyEqual, loosely_equal),
            (BinaryOperator::LooselyUnequal, loosely_unequal),
        ];
        for (op, f) in equality_ops {
            for t in [Double, Boolean, String, Unknown] {
                m.insert((op, t, t), f);
            }
        }

        m.insert((BinaryOperator::In, Unknown, Unknown), in_operator);
        m.insert((BinaryOperator::InstanceOf, Unknown, Unknown), instance_of_operator);
        m
    };

    static ref UNARY_SPECIALIZATIONS: HashMap<(UnaryOperator, ValueType), UnarySpecializer> = {
        use crate::runner::analysis::variable::ValueType::{Boolean, Double, String, Unknown};
        let mut m: HashMap<(UnaryOperator, ValueType), UnarySpecializer> = HashMap::new();
        m.insert((UnaryOperator::Minus, Unknown), negate);
        m.insert((UnaryOperator::Plus, Unknown), unary_plus);
        m.insert((UnaryOperator::BitwiseNot, Unknown), bitwise_not);
        m.insert((UnaryOperator::LogicalNot, Unknown), logical_not);
        m.insert((UnaryOperator::TypeOf, Double), type_of_number);
        m.insert((UnaryOperator::TypeOf, Boolean), type_of_boolean);
        m.insert((UnaryOperator::TypeOf, String), type_of_string);
        m.insert((UnaryOperator::TypeOf, Unknown), type_of);
        m.insert((UnaryOperator::Void, Unknown), void);
        m
    };
}

/// Picks the most specific implementation of `operator` for the operands' types.
pub fn specialize_binary(operator: BinaryOperator, l: TypedCode, r: TypedCode) -> TypedCode {
    let (lt, rt) = (l.value_type(), r.value_type());
    let keys = [
        (operator, lt, rt),
        (operator, ValueType::Unknown, rt),
        (operator, lt, ValueType::Unknown),
        (operator, ValueType::Unknown, ValueType::Unknown),
    ];
    for key in keys.iter() {
        if let Some(f) = BINARY_SPECIALIZATIONS.get(key) {
            return f(l, r);
        }
    }
    dynamic_binary(operator, l, r)
}

pub fn specialize_unary(operator: UnaryOperator, c: TypedCode) -> TypedCode {
    let t = c.value_type();
    for key in [(operator, t), (operator, ValueType::Unknown)].iter() {
        if let Some(f) = UNARY_SPECIALIZATIONS.get(key) {
            return f(c);
        }
    }
    dynamic_unary(operator, c)
}
