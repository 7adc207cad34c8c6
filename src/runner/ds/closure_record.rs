use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::value::JsValue;

/// Heap storage for the captured variables of one function activation.
///
/// Field layout is fixed at compile time; the parent link follows lexical nesting
/// of the functions that themselves capture something, so the chain is acyclic.
pub struct ClosureRecord {
    fields: RefCell<Vec<JsValue>>,
    parent: Option<Rc<ClosureRecord>>,
}

impl ClosureRecord {
    pub fn new(field_count: usize, parent: Option<Rc<ClosureRecord>>) -> Rc<Self> {
        Rc::new(ClosureRecord {
            fields: RefCell::new(vec![JsValue::Undefined; field_count]),
            parent,
        })
    }

    pub fn get(&self, index: usize) -> JsValue {
        self.fields
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(JsValue::Undefined)
    }

    pub fn set(&self, index: usize, value: JsValue) {
        if let Some(slot) = self.fields.borrow_mut().get_mut(index) {
            *slot = value;
        }
    }

    pub fn parent(&self) -> Option<&Rc<ClosureRecord>> {
        self.parent.as_ref()
    }

    /// The record `hops` parent links up from this one.
    pub fn ancestor(self: &Rc<Self>, hops: usize) -> Option<Rc<ClosureRecord>> {
        let mut current = self.clone();
        for _ in 0..hops {
            current = current.parent.clone()?;
        }
        Some(current)
    }

    pub fn field_count(&self) -> usize {
        self.fields.borrow().len()
    }
}
