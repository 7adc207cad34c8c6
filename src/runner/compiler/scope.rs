use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::ast::FunctionId;
use crate::runner::analysis::variable::{ClosureId, ValueType, VariableId, VariableType};
use crate::runner::analysis::Analysis;
use crate::runner::compiler::code::{TargetId, TypedCode};
use crate::runner::ds::activation::{Activation, FrameLayout};
use crate::runner::ds::arguments_object::{get_parameter, set_parameter};
use crate::runner::ds::error::{CompileError, JErrorType};
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::operations::object::{delete_property, get_v, has_property, put_v};
use crate::runner::ds::operations::type_conversion::{
    primitive_to_number, primitive_to_string, to_boolean,
};
use crate::runner::ds::value::JsValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Value,
    Double,
    Boolean,
    String,
}

impl SlotKind {
    fn of(value_type: ValueType) -> SlotKind {
        match value_type {
            ValueType::Double => SlotKind::Double,
            ValueType::Boolean => SlotKind::Boolean,
            ValueType::String => SlotKind::String,
            ValueType::Unset | ValueType::Unknown | ValueType::Object => SlotKind::Value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub kind: SlotKind,
    pub index: usize,
}

/// Where compiled code finds a variable at run time.
#[derive(Debug, Clone)]
pub enum Access {
    Global {
        name: Rc<str>,
    },
    /// A parameter, read out of the arguments object. `via` names the closure field
    /// holding that object when the parameter belongs to an enclosing function.
    Parameter {
        index: usize,
        via: Option<(usize, usize)>,
    },
    Slot(Slot),
    ClosureField {
        alias: usize,
        index: usize,
    },
    This,
    /// Resolution through open `with` scopes, innermost first, then `fallback`.
    With {
        targets: Vec<Access>,
        name: Rc<str>,
        fallback: Box<Access>,
    },
    /// The name of a named function expression inside its own body.
    ReadOnly {
        name: Rc<str>,
        target: Box<Access>,
    },
}

fn not_defined(name: &str) -> JErrorType {
    JErrorType::ReferenceError(format!("{} is not defined", name))
}

impl Access {
    /// Dynamic read used where no specialized closure applies.
    pub fn read(&self, a: &mut Activation, typeof_mode: bool) -> Result<JsValue, JErrorType> {
        match self {
            Access::Global { name } => match a.realm.get_global(name) {
                Some(v) => Ok(v),
                None if typeof_mode => Ok(JsValue::Undefined),
                None => Err(not_defined(name)),
            },
            Access::Parameter { index, via } => Ok(match via {
                Some((alias, field)) => get_parameter(&a.closure(*alias)?.get(*field), *index),
                None => get_parameter(&a.arguments, *index),
            }),
            Access::Slot(Slot { kind, index }) => Ok(match kind {
                SlotKind::Value => a.values[*index].clone(),
                SlotKind::Double => JsValue::Number(a.doubles[*index]),
                SlotKind::Boolean => JsValue::Boolean(a.booleans[*index]),
                SlotKind::String => JsValue::String(a.strings[*index].clone()),
            }),
            Access::ClosureField { alias, index } => Ok(a.closure(*alias)?.get(*index)),
            Access::This => Ok(a.this_value.clone()),
            Access::With {
                targets,
                name,
                fallback,
            } => match with_base(targets, name, a)? {
                Some(o) => get_v(&a.realm, &JsValue::Object(o), name),
                None => fallback.read(a, typeof_mode),
            },
            Access::ReadOnly { target, .. } => target.read(a, typeof_mode),
        }
    }

    /// Dynamic write used where no specialized closure applies.
    pub fn write(&self, a: &mut Activation, value: JsValue, strict: bool) -> Result<(), JErrorType> {
        match self {
            Access::Global { name } => {
                if strict && !a.realm.has_global(name) {
                    return Err(not_defined(name));
                }
                a.realm.put_global(name, value)
            }
            Access::Parameter { index, via } => {
                match via {
                    Some((alias, field)) => {
                        set_parameter(&a.closure(*alias)?.get(*field), *index, value)
                    }
                    None => set_parameter(&a.arguments, *index, value),
                }
                Ok(())
            }
            Access::Slot(Slot { kind, index }) => {
                match kind {
                    SlotKind::Value => a.values[*index] = value,
                    SlotKind::Double => a.doubles[*index] = primitive_to_number(&value),
                    SlotKind::Boolean => a.booleans[*index] = to_boolean(&value),
                    SlotKind::String => a.strings[*index] = primitive_to_string(&value),
                }
                Ok(())
            }
            Access::ClosureField { alias, index } => {
                a.closure(*alias)?.set(*index, value);
                Ok(())
            }
            Access::This => Err(JErrorType::ReferenceError(
                "Invalid assignment to this".to_string(),
            )),
            Access::With {
                targets,
                name,
                fallback,
            } => match with_base(targets, name, a)? {
                Some(o) => put_v(&JsValue::Object(o), name, value, strict),
                None => fallback.write(a, value, strict),
            },
            Access::ReadOnly { name, .. } => {
                if strict {
                    Err(JErrorType::TypeError(format!(
                        "Assignment to constant variable '{}'",
                        name
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The access an initializer writes through, bypassing read-only protection.
    pub fn into_initializer(self) -> Access {
        match self {
            Access::ReadOnly { target, .. } => *target,
            other => other,
        }
    }

    /// The function value of a call through this binding, with the `this` it implies.
    pub fn read_callee(&self, a: &mut Activation) -> Result<(JsValue, JsValue), JErrorType> {
        match self {
            Access::With {
                targets,
                name,
                fallback,
            } => match with_base(targets, name, a)? {
                Some(o) => {
                    let base = JsValue::Object(o);
                    let f = get_v(&a.realm, &base, name)?;
                    Ok((f, base))
                }
                None => fallback.read_callee(a),
            },
            other => Ok((other.read(a, false)?, JsValue::Undefined)),
        }
    }

    /// `delete name` in sloppy code.
    pub fn delete(&self, a: &mut Activation) -> Result<bool, JErrorType> {
        match self {
            Access::Global { name } => {
                if !a.realm.has_global(name) {
                    return Ok(true);
                }
                delete_property(&JsValue::Object(a.realm.global.clone()), name, false)
            }
            Access::With {
                targets,
                name,
                fallback,
            } => match with_base(targets, name, a)? {
                Some(o) => delete_property(&JsValue::Object(o), name, false),
                None => fallback.delete(a),
            },
            _ => Ok(false),
        }
    }

    /// A specialized closure reading this binding.
    pub fn load(&self, typeof_mode: bool) -> TypedCode {
        match self.clone() {
            Access::Slot(Slot { kind, index }) => match kind {
                SlotKind::Value => TypedCode::Boxed(Box::new(move |a| Ok(a.values[index].clone()))),
                SlotKind::Double => TypedCode::Double(Box::new(move |a| Ok(a.doubles[index]))),
                SlotKind::Boolean => TypedCode::Boolean(Box::new(move |a| Ok(a.booleans[index]))),
                SlotKind::String => {
                    TypedCode::String(Box::new(move |a| Ok(a.strings[index].clone())))
                }
            },
            Access::ClosureField { alias, index } => {
                TypedCode::Boxed(Box::new(move |a| Ok(a.closure(alias)?.get(index))))
            }
            Access::Parameter { index, via: None } => {
                TypedCode::Boxed(Box::new(move |a| Ok(get_parameter(&a.arguments, index))))
            }
            Access::Global { name } => TypedCode::Boxed(Box::new(move |a| {
                match a.realm.get_global(&name) {
                    Some(v) => Ok(v),
                    None if typeof_mode => Ok(JsValue::Undefined),
                    None => Err(not_defined(&name)),
                }
            })),
            other => TypedCode::Boxed(Box::new(move |a| other.read(a, typeof_mode))),
        }
    }

    /// A closure evaluating `value`, storing it here and yielding it.
    pub fn store(&self, value: TypedCode, strict: bool) -> Result<TypedCode, CompileError> {
        Ok(match self.clone() {
            Access::Slot(Slot { kind, index }) => match kind {
                SlotKind::Value => {
                    let c = value.into_boxed();
                    TypedCode::Boxed(Box::new(move |a| {
                        let v = c(a)?;
                        a.values[index] = v.clone();
                        Ok(v)
                    }))
                }
                SlotKind::Double => {
                    let c = value.into_double();
                    TypedCode::Double(Box::new(move |a| {
                        let v = c(a)?;
                        a.doubles[index] = v;
                        Ok(v)
                    }))
                }
                SlotKind::Boolean => {
                    let c = value.into_boolean();
                    TypedCode::Boolean(Box::new(move |a| {
                        let v = c(a)?;
                        a.booleans[index] = v;
                        Ok(v)
                    }))
                }
                SlotKind::String => {
                    let c = value.into_string();
                    TypedCode::String(Box::new(move |a| {
                        let v = c(a)?;
                        a.strings[index] = v.clone();
                        Ok(v)
                    }))
                }
            },
            Access::This => return Err(CompileError::InvalidAssignmentTarget),
            Access::With {
                targets,
                name,
                fallback,
            } => {
                let c = value.into_boxed();
                // The with objects are probed before the right-hand side runs.
                TypedCode::Boxed(Box::new(move |a| {
                    let base = with_base(&targets, &name, a)?;
                    let v = c(a)?;
                    match base {
                        Some(o) => put_v(&JsValue::Object(o), &name, v.clone(), strict)?,
                        None => fallback.write(a, v.clone(), strict)?,
                    }
                    Ok(v)
                }))
            }
            other => {
                let c = value.into_boxed();
                TypedCode::Boxed(Box::new(move |a| {
                    let v = c(a)?;
                    other.write(a, v.clone(), strict)?;
                    Ok(v)
                }))
            }
        })
    }
}

/// The innermost with-target object that has `name`, if any.
pub fn with_base(
    targets: &[Access],
    name: &str,
    a: &mut Activation,
) -> Result<Option<ObjectRef>, JErrorType> {
    for target in targets {
        if let JsValue::Object(o) = target.read(a, false)? {
            if has_property(&o, name) {
                return Ok(Some(o));
            }
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Loop,
    Switch,
    Labeled,
}

#[derive(Debug)]
pub struct JumpTarget {
    pub labels: Vec<String>,
    pub kind: TargetKind,
    pub id: TargetId,
}

/// Compile-time state of one function body: slot allocation, closure aliases and
/// jump targets.
pub struct FunctionScope<'a> {
    pub analysis: &'a Analysis,
    pub function_id: FunctionId,
    pub strict: bool,
    pub is_program: bool,
    slots: HashMap<VariableId, Slot>,
    layout: FrameLayout,
    /// The head record first, then its ancestors.
    closure_chain: Vec<ClosureId>,
    /// Hop count to alias index.
    aliases: Vec<(usize, usize)>,
    targets: Vec<JumpTarget>,
    pending_labels: Vec<String>,
    next_target_id: TargetId,
}

impl<'a> FunctionScope<'a> {
    pub fn new(analysis: &'a Analysis, function_id: FunctionId, is_program: bool) -> Self {
        let block = analysis.block(function_id);
        let mut closure_chain = vec![];
        let mut next = block.closure.or(block.parent_closure);
        while let Some(c) = next {
            closure_chain.push(c);
            next = analysis.closure(c).parent;
        }
        let layout = FrameLayout {
            own_closure_fields: block.closure.map(|c| analysis.closure(c).fields.len()),
            ..FrameLayout::default()
        };
        FunctionScope {
            analysis,
            function_id,
            strict: block.strict,
            is_program,
            slots: HashMap::new(),
            layout,
            closure_chain,
            aliases: vec![],
            targets: vec![],
            pending_labels: vec![],
            next_target_id: 0,
        }
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// `(hops, alias)` pairs the prologue must fill.
    pub fn aliases(&self) -> &[(usize, usize)] {
        &self.aliases
    }

    pub fn allocated_slot(&self, variable: VariableId) -> Option<Slot> {
        self.slots.get(&variable).copied()
    }

    fn new_slot(&mut self, kind: SlotKind) -> Slot {
        let counter = match kind {
            SlotKind::Value => &mut self.layout.values,
            SlotKind::Double => &mut self.layout.doubles,
            SlotKind::Boolean => &mut self.layout.booleans,
            SlotKind::String => &mut self.layout.strings,
        };
        let index = *counter;
        *counter += 1;
        Slot { kind, index }
    }

    pub fn temp_value(&mut self) -> Slot {
        self.new_slot(SlotKind::Value)
    }

    fn slot(&mut self, variable: VariableId) -> Slot {
        if let Some(s) = self.slots.get(&variable) {
            return *s;
        }
        let analysis = self.analysis;
        let kind = SlotKind::of(analysis.variable(variable).value_type);
        let slot = self.new_slot(kind);
        self.slots.insert(variable, slot);
        slot
    }

    fn alias(&mut self, closure: ClosureId) -> Result<usize, CompileError> {
        let hops = self
            .closure_chain
            .iter()
            .position(|c| *c == closure)
            .ok_or_else(|| {
                CompileError::UnresolvedIdentifier(format!("closure {} out of reach", closure))
            })?;
        if let Some((_, alias)) = self.aliases.iter().find(|(h, _)| *h == hops) {
            return Ok(*alias);
        }
        let alias = self.layout.closure_aliases;
        self.layout.closure_aliases += 1;
        self.aliases.push((hops, alias));
        Ok(alias)
    }

    pub fn access(&mut self, variable: VariableId) -> Result<Access, CompileError> {
        let analysis = self.analysis;
        let v = analysis.variable(variable);
        let access = self.binding_access(variable)?;
        Ok(if v.immutable {
            Access::ReadOnly {
                name: Rc::from(v.name.as_str()),
                target: Box::new(access),
            }
        } else {
            access
        })
    }

    fn binding_access(&mut self, variable: VariableId) -> Result<Access, CompileError> {
        let analysis = self.analysis;
        let v = analysis.variable(variable);
        match v.var_type {
            VariableType::Global => Ok(Access::Global {
                name: Rc::from(v.name.as_str()),
            }),
            VariableType::This => Ok(Access::This),
            VariableType::WithScope => {
                let name: Rc<str> = Rc::from(v.name.as_str());
                let chain: Vec<VariableId> = v
                    .with_scope
                    .as_ref()
                    .map(|w| w.iter().map(|s| s.variable).collect())
                    .unwrap_or_default();
                let fallback = v
                    .fallback
                    .ok_or_else(|| CompileError::UnresolvedIdentifier(v.name.clone()))?;
                let mut targets = vec![];
                for t in chain {
                    targets.push(self.access(t)?);
                }
                Ok(Access::With {
                    targets,
                    name,
                    fallback: Box::new(self.access(fallback)?),
                })
            }
            VariableType::Parameter => {
                let index = v.index.unwrap_or(0);
                if v.block == self.function_id {
                    return Ok(Access::Parameter { index, via: None });
                }
                let field = v
                    .closure_field
                    .ok_or_else(|| CompileError::UnresolvedIdentifier(v.name.clone()))?;
                let alias = self.alias(field.closure)?;
                Ok(Access::Parameter {
                    index,
                    via: Some((alias, field.index)),
                })
            }
            VariableType::Local | VariableType::Arguments | VariableType::Unknown => {
                match v.closure_field {
                    Some(field) => Ok(Access::ClosureField {
                        alias: self.alias(field.closure)?,
                        index: field.index,
                    }),
                    None if v.block == self.function_id => Ok(Access::Slot(self.slot(variable))),
                    None => Err(CompileError::UnresolvedIdentifier(v.name.clone())),
                }
            }
        }
    }

    fn labels_in_use(&self, label: &str) -> bool {
        self.pending_labels.iter().any(|l| l == label)
            || self
                .targets
                .iter()
                .any(|t| t.labels.iter().any(|l| l == label))
    }

    pub fn add_pending_label(&mut self, label: &str) -> Result<(), CompileError> {
        if self.labels_in_use(label) {
            return Err(CompileError::DuplicateLabel(label.to_string()));
        }
        self.pending_labels.push(label.to_string());
        Ok(())
    }

    /// Opens a jump target that takes over any labels directly in front of it.
    pub fn push_target(&mut self, kind: TargetKind) -> TargetId {
        let id = self.next_target_id;
        self.next_target_id += 1;
        let labels = std::mem::take(&mut self.pending_labels);
        self.targets.push(JumpTarget { labels, kind, id });
        id
    }

    pub fn pop_target(&mut self) {
        self.targets.pop();
    }

    pub fn break_target(&self, label: Option<&str>) -> Result<TargetId, CompileError> {
        match label {
            Some(label) => self
                .targets
                .iter()
                .rev()
                .find(|t| t.labels.iter().any(|l| l == label))
                .map(|t| t.id)
                .ok_or_else(|| CompileError::UndefinedLabel(label.to_string())),
            None => self
                .targets
                .iter()
                .rev()
                .find(|t| t.kind != TargetKind::Labeled)
                .map(|t| t.id)
                .ok_or(CompileError::IllegalBreak),
        }
    }

    pub fn continue_target(&self, label: Option<&str>) -> Result<TargetId, CompileError> {
        let target = match label {
            Some(label) => self
                .targets
                .iter()
                .rev()
                .find(|t| t.labels.iter().any(|l| l == label))
                .ok_or_else(|| CompileError::UndefinedLabel(label.to_string()))?,
            None => self
                .targets
                .iter()
                .rev()
                .find(|t| t.kind == TargetKind::Loop)
                .ok_or(CompileError::IllegalContinue)?,
        };
        if target.kind != TargetKind::Loop {
            return Err(CompileError::IllegalContinue);
        }
        Ok(target.id)
    }
}
