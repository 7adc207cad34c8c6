use std::rc::Rc;

use crate::runner::ds::closure_record::ClosureRecord;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

/// Slot counts of one compiled function body, one per storage kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    pub values: usize,
    pub doubles: usize,
    pub booleans: usize,
    pub strings: usize,
    pub closure_aliases: usize,
    /// Field count of the record this body allocates, if it captures anything.
    pub own_closure_fields: Option<usize>,
}

/// The per-call state compiled code runs against.
pub struct Activation {
    pub realm: Rc<Realm>,
    pub this_value: JsValue,
    pub callee: Option<ObjectRef>,
    /// The arguments object, which also stores the parameters.
    pub arguments: JsValue,
    /// The record the function closed over when it was created.
    pub scope: Option<Rc<ClosureRecord>>,
    pub own_closure: Option<Rc<ClosureRecord>>,
    /// Aliases for records up the parent chain, filled by the prologue.
    pub closures: Vec<Option<Rc<ClosureRecord>>>,
    pub values: Vec<JsValue>,
    pub doubles: Vec<f64>,
    pub booleans: Vec<bool>,
    pub strings: Vec<Rc<str>>,
    /// Value of the last expression statement run at program level.
    pub completion_value: JsValue,
}

impl Activation {
    pub fn new(
        realm: Rc<Realm>,
        layout: &FrameLayout,
        this_value: JsValue,
        callee: Option<ObjectRef>,
        arguments: JsValue,
        scope: Option<Rc<ClosureRecord>>,
    ) -> Self {
        let own_closure = layout
            .own_closure_fields
            .map(|n| ClosureRecord::new(n, scope.clone()));
        Activation {
            realm,
            this_value,
            callee,
            arguments,
            scope,
            own_closure,
            closures: vec![None; layout.closure_aliases],
            values: vec![JsValue::Undefined; layout.values],
            doubles: vec![f64::NAN; layout.doubles],
            booleans: vec![false; layout.booleans],
            strings: vec![Rc::from(""); layout.strings],
            completion_value: JsValue::Undefined,
        }
    }

    /// The innermost record visible to this activation: its own if it has one,
    /// otherwise the one it closed over. Nested functions capture this record.
    pub fn head_closure(&self) -> Option<Rc<ClosureRecord>> {
        self.own_closure.clone().or_else(|| self.scope.clone())
    }

    pub fn closure(&self, alias: usize) -> Result<&Rc<ClosureRecord>, JErrorType> {
        self.closures
            .get(alias)
            .and_then(|c| c.as_ref())
            .ok_or_else(|| {
                JErrorType::ReferenceError(format!("closure level {} is not available", alias))
            })
    }
}
