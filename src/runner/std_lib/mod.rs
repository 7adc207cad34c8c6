//! Standard library built-in objects.
//!
//! Only the handful of built-ins scripts need to observe the engine: `Object`,
//! `Function.prototype`, `Array`, the Error family and `console.log`, plus the
//! `NaN`, `Infinity` and `undefined` globals.

pub mod array;
pub mod console;
pub mod error;
pub mod function;
pub mod object;

use std::rc::Rc;

use tracing::trace;

use crate::runner::ds::function_object::NativeFn;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

/// Built-in object definition.
///
/// With a constructor, registration binds a native function under `name` whose
/// `prototype` is the given intrinsic prototype. Without one, `name` is bound to a
/// plain object carrying the static methods.
pub struct BuiltInObject {
    name: &'static str,
    prototype: Option<ObjectRef>,
    constructor: Option<(NativeFn, usize)>,
    methods: Vec<(&'static str, NativeFn, usize)>,
    static_methods: Vec<(&'static str, NativeFn, usize)>,
    properties: Vec<(&'static str, JsValue)>,
}

impl BuiltInObject {
    pub fn new(name: &'static str) -> Self {
        BuiltInObject {
            name,
            prototype: None,
            constructor: None,
            methods: vec![],
            static_methods: vec![],
            properties: vec![],
        }
    }

    /// The intrinsic prototype that receives `add_method` entries.
    pub fn with_prototype(mut self, prototype: &ObjectRef) -> Self {
        self.prototype = Some(prototype.clone());
        self
    }

    pub fn with_constructor(mut self, constructor: NativeFn, length: usize) -> Self {
        self.constructor = Some((constructor, length));
        self
    }

    /// Adds a method to the prototype.
    pub fn add_method(mut self, name: &'static str, func: NativeFn, length: usize) -> Self {
        self.methods.push((name, func, length));
        self
    }

    /// Adds a method to the constructor (or to the plain object).
    pub fn add_static_method(mut self, name: &'static str, func: NativeFn, length: usize) -> Self {
        self.static_methods.push((name, func, length));
        self
    }

    /// Adds a data property to the prototype.
    pub fn add_property(mut self, name: &'static str, value: JsValue) -> Self {
        self.properties.push((name, value));
        self
    }

    pub fn register(self, realm: &Rc<Realm>) -> ObjectRef {
        let holder = match self.constructor {
            Some((func, length)) => realm.new_native_function(self.name, func, length),
            None => realm.new_object(),
        };
        if let Some(prototype) = &self.prototype {
            let mut p = prototype.borrow_mut();
            for (name, func, length) in self.methods {
                p.define_own(
                    name,
                    JsValue::Object(realm.new_native_function(name, func, length)),
                    false,
                );
            }
            for (name, value) in self.properties {
                p.define_own(name, value, false);
            }
            if self.constructor.is_some() {
                p.define_own("constructor", JsValue::Object(holder.clone()), false);
            }
        }
        {
            let mut h = holder.borrow_mut();
            if let (Some(prototype), Some(_)) = (&self.prototype, &self.constructor) {
                h.define_own("prototype", JsValue::Object(prototype.clone()), false);
            }
            for (name, func, length) in self.static_methods {
                h.define_own(
                    name,
                    JsValue::Object(realm.new_native_function(name, func, length)),
                    false,
                );
            }
        }
        trace!(name = self.name, "registered built-in");
        realm.define_global(self.name, JsValue::Object(holder.clone()));
        holder
    }
}

/// Installs every built-in into `realm`'s global object.
pub fn register_builtins(realm: &Rc<Realm>) {
    object::register(realm);
    function::register(realm);
    array::register(realm);
    error::register(realm);
    console::register(realm);
    realm.define_global("NaN", JsValue::Number(f64::NAN));
    realm.define_global("Infinity", JsValue::Number(f64::INFINITY));
    realm.define_global("undefined", JsValue::Undefined);
}

/// The argument at `index`, `undefined` when absent.
pub(crate) fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::operations::object::get;

    #[test]
    fn constructor_and_prototype_are_linked() {
        let realm = Realm::new(16);
        register_builtins(&realm);
        let array = realm.get_global("Array").unwrap();
        let array = array.as_object().unwrap();
        match get(array, "prototype") {
            JsValue::Object(p) => assert!(Rc::ptr_eq(&p, &realm.array_prototype)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            get(&realm.array_prototype, "constructor"),
            JsValue::Object(array.clone())
        );
    }

    #[test]
    fn value_globals_are_not_enumerable() {
        let realm = Realm::new(16);
        register_builtins(&realm);
        assert!(realm.has_global("undefined"));
        assert!(!realm.global.borrow().is_own_enumerable("NaN"));
    }
}
