use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::ast::FunctionId;

pub type VariableId = usize;
pub type ClosureId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    Unknown,
    Parameter,
    Local,
    This,
    Arguments,
    Global,
    WithScope,
}

/// Static value type of a variable or expression.
///
/// The lattice is `Unset` below the four concrete types, all of which sit below
/// `Unknown`. Types only ever move up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Unset,
    Unknown,
    Boolean,
    String,
    Double,
    Object,
}

impl ValueType {
    /// Least upper bound.
    pub fn merge(self, other: ValueType) -> ValueType {
        match (self, other) {
            (ValueType::Unset, t) | (t, ValueType::Unset) => t,
            (a, b) if a == b => a,
            _ => ValueType::Unknown,
        }
    }

    /// Reads never see `Unset`; a variable read before any write may hold `undefined`.
    pub fn or_unknown(self) -> ValueType {
        match self {
            ValueType::Unset => ValueType::Unknown,
            t => t,
        }
    }
}

/// Where a captured variable lives: a field of a closure record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureField {
    pub closure: ClosureId,
    pub index: usize,
}

/// One `with` nesting level. The chain runs innermost first.
#[derive(Debug)]
pub struct WithScope {
    /// The synthetic local that holds the with-target object.
    pub variable: VariableId,
    /// The function body the `with` statement belongs to.
    pub block: FunctionId,
    pub parent: Option<Rc<WithScope>>,
}

impl WithScope {
    pub fn iter(self: &Rc<Self>) -> WithScopeIter {
        WithScopeIter {
            next: Some(self.clone()),
        }
    }
}

pub struct WithScopeIter {
    next: Option<Rc<WithScope>>,
}

impl Iterator for WithScopeIter {
    type Item = Rc<WithScope>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.parent.clone();
        Some(current)
    }
}

#[derive(Debug)]
pub struct Variable {
    pub name: String,
    /// Key for the closure field layout. Equal to `name` except for synthetic bindings.
    pub storage_name: String,
    /// Parameter ordinal.
    pub index: Option<usize>,
    pub var_type: VariableType,
    /// The function body that owns this binding.
    pub block: FunctionId,
    pub closure_field: Option<ClosureField>,
    pub with_scope: Option<Rc<WithScope>>,
    pub fallback: Option<VariableId>,
    pub value_type: ValueType,
    /// Assignments are ignored in sloppy code and throw in strict code.
    pub immutable: bool,
}

impl Variable {
    pub fn new(name: &str, var_type: VariableType, block: FunctionId) -> Self {
        Variable {
            name: name.to_string(),
            storage_name: name.to_string(),
            index: None,
            var_type,
            block,
            closure_field: None,
            with_scope: None,
            fallback: None,
            value_type: ValueType::Unset,
            immutable: false,
        }
    }

    pub fn is_captured(&self) -> bool {
        self.closure_field.is_some()
    }

    /// Whether a nested function may hold this binding in a closure record.
    pub fn is_capturable(&self) -> bool {
        matches!(
            self.var_type,
            VariableType::Local | VariableType::Parameter | VariableType::Arguments
        )
    }
}

/// Variables declared in one block, keyed by name, in declaration order.
#[derive(Debug, Default)]
pub struct VariableCollection {
    order: Vec<VariableId>,
    by_name: HashMap<String, VariableId>,
}

impl VariableCollection {
    pub fn get(&self, name: &str) -> Option<VariableId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, id: VariableId) {
        if self.by_name.insert(name.to_string(), id).is_none() {
            self.order.push(id);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A closure record layout.
#[derive(Debug)]
pub struct Closure {
    pub id: ClosureId,
    pub block: FunctionId,
    pub parent: Option<ClosureId>,
    /// Field names, sorted.
    pub fields: Vec<String>,
}

impl Closure {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.binary_search_by(|f| f.as_str().cmp(name)).ok()
    }
}

/// Everything the analysis knows about one function body (or the program).
#[derive(Debug)]
pub struct BlockInfo {
    pub function_id: FunctionId,
    pub parent: Option<FunctionId>,
    pub name: String,
    pub strict: bool,
    pub declared: VariableCollection,
    pub params: Vec<VariableId>,
    pub arguments: Option<VariableId>,
    /// The name binding of a named function expression, visible inside its body.
    pub self_binding: Option<VariableId>,
    /// Catch bindings and with-target holders.
    pub synthetic: Vec<VariableId>,
    /// Variables of this block read or written from a nested function, in first-capture order.
    pub closed_over: Vec<VariableId>,
    pub closure: Option<ClosureId>,
    /// The nearest enclosing block's closure; the record this function captures when created.
    pub parent_closure: Option<ClosureId>,
}

impl BlockInfo {
    pub fn new(function_id: FunctionId) -> Self {
        BlockInfo {
            function_id,
            parent: None,
            name: String::new(),
            strict: false,
            declared: VariableCollection::default(),
            params: vec![],
            arguments: None,
            self_binding: None,
            synthetic: vec![],
            closed_over: vec![],
            closure: None,
            parent_closure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_types_only_widen() {
        assert_eq!(ValueType::Unset.merge(ValueType::Double), ValueType::Double);
        assert_eq!(ValueType::Double.merge(ValueType::Double), ValueType::Double);
        assert_eq!(ValueType::Double.merge(ValueType::String), ValueType::Unknown);
        assert_eq!(ValueType::Unknown.merge(ValueType::Unset), ValueType::Unknown);
    }

    #[test]
    fn collection_keeps_declaration_order() {
        let mut c = VariableCollection::default();
        c.insert("b", 0);
        c.insert("a", 1);
        c.insert("b", 0);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(c.get("a"), Some(1));
    }
}
