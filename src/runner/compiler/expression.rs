use std::rc::Rc;

use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, ExpressionType, IdentifierData, LiteralType,
    LogicalOperator, MemberExpressionType, UnaryOperator, UpdateOperator,
};
use crate::runner::compiler::code::{Code, TypedCode};
use crate::runner::compiler::operators::{apply_binary, specialize_binary, specialize_unary};
use crate::runner::compiler::scope::{with_base, Access, Slot, SlotKind};
use crate::runner::compiler::FunctionCompiler;
use crate::runner::ds::activation::Activation;
use crate::runner::ds::error::{CompileError, JErrorType};
use crate::runner::ds::function_object::{call, construct};
use crate::runner::ds::operations::object::{delete_property, get_v, put_v};
use crate::runner::ds::operations::type_conversion::{
    number_to_boolean, to_boolean, to_number, to_string,
};
use crate::runner::ds::value::JsValue;

/// The key half of a property reference.
enum PropertyKey {
    Static(Rc<str>),
    Computed(Code<JsValue>),
}

impl PropertyKey {
    fn evaluate(&self, a: &mut Activation) -> Result<JsValue, JErrorType> {
        match self {
            PropertyKey::Static(s) => Ok(JsValue::String(s.clone())),
            PropertyKey::Computed(c) => c(a),
        }
    }
}

/// Base object then key, both evaluated; the base must be coercible before the key is
/// converted to a string.
fn evaluate_property(
    object: &Code<JsValue>,
    key: &PropertyKey,
    a: &mut Activation,
) -> Result<(JsValue, Rc<str>), JErrorType> {
    let base = object(a)?;
    let key = key.evaluate(a)?;
    if base.is_nullish() {
        return Err(JErrorType::TypeError(format!(
            "Cannot read property '{}' of {}",
            key, base
        )));
    }
    let key = match key {
        JsValue::String(s) => s,
        other => to_string(&a.realm, &other)?,
    };
    Ok((base, key))
}

fn evaluate_arguments(args: &[Code<JsValue>], a: &mut Activation) -> Result<Vec<JsValue>, JErrorType> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(arg(a)?);
    }
    Ok(values)
}

fn not_a_function(what: &str) -> JErrorType {
    JErrorType::TypeError(format!("{} is not a function", what))
}

/// Stores a value into an already compiled reference.
pub(crate) type Writer = Box<dyn Fn(&mut Activation, JsValue) -> Result<(), JErrorType>>;

/// Evaluates a value given the old one; returns what to store and what the
/// expression yields.
type Modify = Box<dyn Fn(&mut Activation, JsValue) -> Result<(JsValue, JsValue), JErrorType>>;

/// Runs `effects` before `last`, keeping the representation of `last`.
fn prefixed(effects: Vec<Code<()>>, last: TypedCode) -> TypedCode {
    if effects.is_empty() {
        return last;
    }
    let run = move |a: &mut Activation| -> Result<(), JErrorType> {
        for e in &effects {
            e(a)?;
        }
        Ok(())
    };
    match last {
        TypedCode::Double(c) => TypedCode::Double(Box::new(move |a| {
            run(a)?;
            c(a)
        })),
        TypedCode::Boolean(c) => TypedCode::Boolean(Box::new(move |a| {
            run(a)?;
            c(a)
        })),
        TypedCode::String(c) => TypedCode::String(Box::new(move |a| {
            run(a)?;
            c(a)
        })),
        TypedCode::Boxed(c) => TypedCode::Boxed(Box::new(move |a| {
            run(a)?;
            c(a)
        })),
    }
}

/// `&&` and `||`: the right side runs only when the left side's truthiness asks for it.
fn logical(operator: LogicalOperator, l: TypedCode, r: TypedCode) -> TypedCode {
    let and = operator == LogicalOperator::And;
    match (l, r) {
        (TypedCode::Double(l), TypedCode::Double(r)) => TypedCode::Double(Box::new(move |a| {
            let x = l(a)?;
            if number_to_boolean(x) == and {
                r(a)
            } else {
                Ok(x)
            }
        })),
        (TypedCode::Boolean(l), TypedCode::Boolean(r)) => TypedCode::Boolean(Box::new(move |a| {
            let x = l(a)?;
            if x == and {
                r(a)
            } else {
                Ok(x)
            }
        })),
        (TypedCode::String(l), TypedCode::String(r)) => TypedCode::String(Box::new(move |a| {
            let x = l(a)?;
            if !x.is_empty() == and {
                r(a)
            } else {
                Ok(x)
            }
        })),
        (l, r) => {
            let (l, r) = (l.into_boxed(), r.into_boxed());
            TypedCode::Boxed(Box::new(move |a| {
                let x = l(a)?;
                if to_boolean(&x) == and {
                    r(a)
                } else {
                    Ok(x)
                }
            }))
        }
    }
}

fn conditional(test: Code<bool>, c: TypedCode, alt: TypedCode) -> TypedCode {
    match (c, alt) {
        (TypedCode::Double(c), TypedCode::Double(alt)) => {
            TypedCode::Double(Box::new(move |a| if test(a)? { c(a) } else { alt(a) }))
        }
        (TypedCode::Boolean(c), TypedCode::Boolean(alt)) => {
            TypedCode::Boolean(Box::new(move |a| if test(a)? { c(a) } else { alt(a) }))
        }
        (TypedCode::String(c), TypedCode::String(alt)) => {
            TypedCode::String(Box::new(move |a| if test(a)? { c(a) } else { alt(a) }))
        }
        (c, alt) => {
            let (c, alt) = (c.into_boxed(), alt.into_boxed());
            TypedCode::Boxed(Box::new(move |a| if test(a)? { c(a) } else { alt(a) }))
        }
    }
}

impl<'a> FunctionCompiler<'a> {
    pub(crate) fn identifier_access(&mut self, id: &IdentifierData) -> Result<Access, CompileError> {
        let variable = self.analysis.reference(id)?;
        self.scope.access(variable)
    }

    fn compile_boxed(&mut self, e: &ExpressionType) -> Result<Code<JsValue>, CompileError> {
        Ok(self.compile_expression(e)?.into_boxed())
    }

    fn compile_property(
        &mut self,
        m: &MemberExpressionType,
    ) -> Result<(Code<JsValue>, PropertyKey), CompileError> {
        Ok(match m {
            MemberExpressionType::SimpleMemberExpression {
                object, property, ..
            } => (
                self.compile_boxed(object)?,
                PropertyKey::Static(Rc::from(property.as_str())),
            ),
            MemberExpressionType::ComputedMemberExpression {
                object, property, ..
            } => {
                let object = self.compile_boxed(object)?;
                let property = match property.as_ref() {
                    ExpressionType::Literal(l) => match &l.value {
                        LiteralType::StringLiteral(s) => PropertyKey::Static(Rc::from(s.as_str())),
                        _ => PropertyKey::Computed(self.compile_boxed(property)?),
                    },
                    _ => PropertyKey::Computed(self.compile_boxed(property)?),
                };
                (object, property)
            }
        })
    }

    /// A plain store into `target`, as `for-in` performs for every key.
    pub(crate) fn compile_reference_writer(&mut self, target: &ExpressionType) -> Result<Writer, CompileError> {
        let strict = self.scope.strict;
        match target {
            ExpressionType::Identifier(id) => {
                let access = self.identifier_access(id)?;
                Ok(Box::new(move |a, v| access.write(a, v, strict)))
            }
            ExpressionType::MemberExpression(m) => {
                let (object, key) = self.compile_property(m)?;
                Ok(Box::new(move |a, v| {
                    let (base, key) = evaluate_property(&object, &key, a)?;
                    put_v(&base, &key, v, strict)
                }))
            }
            _ => Err(CompileError::InvalidAssignmentTarget),
        }
    }

    fn compile_arguments(&mut self, args: &[ExpressionType]) -> Result<Vec<Code<JsValue>>, CompileError> {
        args.iter().map(|e| self.compile_boxed(e)).collect()
    }

    pub(crate) fn compile_expression(&mut self, expression: &ExpressionType) -> Result<TypedCode, CompileError> {
        Ok(match expression {
            ExpressionType::Literal(l) => match &l.value {
                LiteralType::NullLiteral => TypedCode::constant(JsValue::Null),
                LiteralType::BooleanLiteral(b) => TypedCode::constant(JsValue::Boolean(*b)),
                LiteralType::StringLiteral(s) => TypedCode::constant(JsValue::from_str(s)),
                LiteralType::NumberLiteral(n) => TypedCode::constant(JsValue::Number(*n)),
                LiteralType::RegExpLiteral(r) => {
                    let (pattern, flags) = (r.pattern.clone(), r.flags.clone());
                    TypedCode::Boxed(Box::new(move |a| {
                        Ok(JsValue::Object(a.realm.new_regexp(&pattern, &flags)))
                    }))
                }
            },
            ExpressionType::Identifier(id) => self.identifier_access(id)?.load(false),
            ExpressionType::ThisExpression { .. } => {
                TypedCode::Boxed(Box::new(|a| Ok(a.this_value.clone())))
            }
            ExpressionType::ArrayExpression { elements, .. } => {
                let mut codes: Vec<Option<Code<JsValue>>> = vec![];
                for e in elements {
                    codes.push(match e {
                        Some(e) => Some(self.compile_boxed(e)?),
                        None => None,
                    });
                }
                TypedCode::Boxed(Box::new(move |a| {
                    let mut values = Vec::with_capacity(codes.len());
                    for c in &codes {
                        values.push(match c {
                            Some(c) => c(a)?,
                            None => JsValue::Undefined,
                        });
                    }
                    Ok(JsValue::Object(a.realm.new_array(values)))
                }))
            }
            ExpressionType::ObjectExpression { properties, .. } => {
                let mut codes: Vec<(String, Code<JsValue>)> = vec![];
                for p in properties {
                    codes.push((p.key.clone(), self.compile_boxed(&p.value)?));
                }
                TypedCode::Boxed(Box::new(move |a| {
                    let o = a.realm.new_object();
                    for (key, c) in &codes {
                        let v = c(a)?;
                        o.borrow_mut().put_own(key, v)?;
                    }
                    Ok(JsValue::Object(o))
                }))
            }
            ExpressionType::FunctionExpression(f) => {
                let code = FunctionCompiler::compile_function(self.analysis, f)?;
                TypedCode::Boxed(Box::new(move |a| {
                    let scope = a.head_closure();
                    Ok(JsValue::Object(a.realm.new_script_function(code.clone(), scope)))
                }))
            }
            ExpressionType::UnaryExpression {
                operator, argument, ..
            } => self.compile_unary(*operator, argument)?,
            ExpressionType::UpdateExpression {
                operator,
                argument,
                prefix,
                ..
            } => self.compile_update(*operator, argument, *prefix)?,
            ExpressionType::BinaryExpression {
                operator,
                left,
                right,
                ..
            } => {
                let l = self.compile_expression(left)?;
                let r = self.compile_expression(right)?;
                specialize_binary(*operator, l, r)
            }
            ExpressionType::LogicalExpression {
                operator,
                left,
                right,
                ..
            } => {
                let l = self.compile_expression(left)?;
                let r = self.compile_expression(right)?;
                logical(*operator, l, r)
            }
            ExpressionType::AssignmentExpression {
                operator,
                left,
                right,
                ..
            } => self.compile_assignment(*operator, left, right)?,
            ExpressionType::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => {
                let test = self.compile_expression(test)?.into_boolean();
                let c = self.compile_expression(consequent)?;
                let alt = self.compile_expression(alternate)?;
                conditional(test, c, alt)
            }
            ExpressionType::CallExpression {
                callee, arguments, ..
            } => self.compile_call(callee, arguments)?,
            ExpressionType::NewExpression {
                callee, arguments, ..
            } => {
                let callee = self.compile_boxed(callee)?;
                let args = self.compile_arguments(arguments)?;
                TypedCode::Boxed(Box::new(move |a| {
                    let f = callee(a)?;
                    let values = evaluate_arguments(&args, a)?;
                    construct(&a.realm, &f, values)
                }))
            }
            ExpressionType::SequenceExpression { expressions, .. } => {
                let (last, rest) = match expressions.split_last() {
                    Some(split) => split,
                    None => return Ok(TypedCode::constant(JsValue::Undefined)),
                };
                let mut effects = vec![];
                for e in rest {
                    effects.push(self.compile_expression(e)?.into_effect());
                }
                prefixed(effects, self.compile_expression(last)?)
            }
            ExpressionType::MemberExpression(m) => {
                let (object, key) = self.compile_property(m)?;
                TypedCode::Boxed(Box::new(move |a| {
                    let (base, key) = evaluate_property(&object, &key, a)?;
                    get_v(&a.realm, &base, &key)
                }))
            }
        })
    }

    fn compile_unary(
        &mut self,
        operator: UnaryOperator,
        argument: &ExpressionType,
    ) -> Result<TypedCode, CompileError> {
        let strict = self.scope.strict;
        match (operator, argument) {
            (UnaryOperator::Delete, ExpressionType::Identifier(id)) => {
                let access = self.identifier_access(id)?;
                Ok(TypedCode::Boolean(Box::new(move |a| access.delete(a))))
            }
            (UnaryOperator::Delete, ExpressionType::MemberExpression(m)) => {
                let (object, key) = self.compile_property(m)?;
                Ok(TypedCode::Boolean(Box::new(move |a| {
                    let (base, key) = evaluate_property(&object, &key, a)?;
                    delete_property(&base, &key, strict)
                })))
            }
            (UnaryOperator::TypeOf, ExpressionType::Identifier(id)) => {
                let code = self.identifier_access(id)?.load(true);
                Ok(specialize_unary(operator, code))
            }
            _ => {
                let code = self.compile_expression(argument)?;
                Ok(specialize_unary(operator, code))
            }
        }
    }

    /// Reads a reference once, hands the old value to `modify` and writes the result
    /// back through the same resolved reference.
    fn read_modify_write(&mut self, target: &ExpressionType, modify: Modify) -> Result<TypedCode, CompileError> {
        let strict = self.scope.strict;
        Ok(TypedCode::Boxed(match target {
            ExpressionType::Identifier(id) => match self.identifier_access(id)? {
                Access::With {
                    targets,
                    name,
                    fallback,
                } => Box::new(move |a| {
                    let base = with_base(&targets, &name, a)?;
                    let old = match &base {
                        Some(o) => get_v(&a.realm, &JsValue::Object(o.clone()), &name)?,
                        None => fallback.read(a, false)?,
                    };
                    let (stored, result) = modify(a, old)?;
                    match base {
                        Some(o) => put_v(&JsValue::Object(o), &name, stored, strict)?,
                        None => fallback.write(a, stored, strict)?,
                    }
                    Ok(result)
                }),
                Access::This => return Err(CompileError::InvalidAssignmentTarget),
                access => Box::new(move |a| {
                    let old = access.read(a, false)?;
                    let (stored, result) = modify(a, old)?;
                    access.write(a, stored, strict)?;
                    Ok(result)
                }),
            },
            ExpressionType::MemberExpression(m) => {
                let (object, key) = self.compile_property(m)?;
                Box::new(move |a| {
                    let (base, key) = evaluate_property(&object, &key, a)?;
                    let old = get_v(&a.realm, &base, &key)?;
                    let (stored, result) = modify(a, old)?;
                    put_v(&base, &key, stored, strict)?;
                    Ok(result)
                })
            }
            _ => return Err(CompileError::InvalidAssignmentTarget),
        }))
    }

    fn compile_update(
        &mut self,
        operator: UpdateOperator,
        argument: &ExpressionType,
        prefix: bool,
    ) -> Result<TypedCode, CompileError> {
        let delta = match operator {
            UpdateOperator::PlusPlus => 1.0,
            UpdateOperator::MinusMinus => -1.0,
        };
        if let ExpressionType::Identifier(id) = argument {
            if let Access::Slot(Slot {
                kind: SlotKind::Double,
                index,
            }) = self.identifier_access(id)?
            {
                return Ok(TypedCode::Double(Box::new(move |a| {
                    let old = a.doubles[index];
                    let new = old + delta;
                    a.doubles[index] = new;
                    Ok(if prefix { new } else { old })
                })));
            }
        }
        let code = self.read_modify_write(
            argument,
            Box::new(move |a, old| {
                let old = to_number(&a.realm, &old)?;
                let new = old + delta;
                Ok((
                    JsValue::Number(new),
                    JsValue::Number(if prefix { new } else { old }),
                ))
            }),
        )?;
        Ok(TypedCode::Double(code.into_double()))
    }

    fn compile_assignment(
        &mut self,
        operator: AssignmentOperator,
        left: &ExpressionType,
        right: &ExpressionType,
    ) -> Result<TypedCode, CompileError> {
        let strict = self.scope.strict;
        let binary = operator.binary_operator();
        match (binary, left) {
            (None, ExpressionType::Identifier(id)) => {
                let access = self.identifier_access(id)?;
                let value = self.compile_expression(right)?;
                access.store(value, strict)
            }
            (None, ExpressionType::MemberExpression(m)) => {
                let (object, key) = self.compile_property(m)?;
                let value = self.compile_boxed(right)?;
                Ok(TypedCode::Boxed(Box::new(move |a| {
                    let (base, key) = evaluate_property(&object, &key, a)?;
                    let v = value(a)?;
                    put_v(&base, &key, v.clone(), strict)?;
                    Ok(v)
                })))
            }
            (Some(op), ExpressionType::Identifier(id)) => {
                let access = self.identifier_access(id)?;
                if matches!(access, Access::With { .. }) {
                    return self.compound_dynamic(op, left, right);
                }
                let current = access.load(false);
                let value = self.compile_expression(right)?;
                access.store(specialize_binary(op, current, value), strict)
            }
            (Some(op), ExpressionType::MemberExpression(_)) => self.compound_dynamic(op, left, right),
            _ => Err(CompileError::InvalidAssignmentTarget),
        }
    }

    fn compound_dynamic(
        &mut self,
        operator: BinaryOperator,
        left: &ExpressionType,
        right: &ExpressionType,
    ) -> Result<TypedCode, CompileError> {
        let value = self.compile_boxed(right)?;
        self.read_modify_write(
            left,
            Box::new(move |a, old| {
                let r = value(a)?;
                let v = apply_binary(&a.realm, operator, &old, &r)?;
                Ok((v.clone(), v))
            }),
        )
    }

    fn compile_call(
        &mut self,
        callee: &ExpressionType,
        arguments: &[ExpressionType],
    ) -> Result<TypedCode, CompileError> {
        Ok(TypedCode::Boxed(match callee {
            ExpressionType::MemberExpression(m) => {
                let (object, key) = self.compile_property(m)?;
                let args = self.compile_arguments(arguments)?;
                Box::new(move |a| {
                    let (base, key) = evaluate_property(&object, &key, a)?;
                    let f = get_v(&a.realm, &base, &key)?;
                    let values = evaluate_arguments(&args, a)?;
                    if !f.is_callable() {
                        return Err(not_a_function(&key));
                    }
                    call(&a.realm, &f, base, values)
                })
            }
            ExpressionType::Identifier(id) => {
                let access = self.identifier_access(id)?;
                let name = id.name.clone();
                let args = self.compile_arguments(arguments)?;
                Box::new(move |a| {
                    let (f, this) = access.read_callee(a)?;
                    let values = evaluate_arguments(&args, a)?;
                    if !f.is_callable() {
                        return Err(not_a_function(&name));
                    }
                    call(&a.realm, &f, this, values)
                })
            }
            other => {
                let callee = self.compile_boxed(other)?;
                let args = self.compile_arguments(arguments)?;
                Box::new(move |a| {
                    let f = callee(a)?;
                    let values = evaluate_arguments(&args, a)?;
                    call(&a.realm, &f, JsValue::Undefined, values)
                })
            }
        }))
    }
}
