use std::cell::Cell;
use std::rc::Rc;

use crate::runner::compiler::function::CompiledFunction;
use crate::runner::ds::closure_record::ClosureRecord;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::{FunctionKind, NativeFn};
use crate::runner::ds::object::{JsObject, ObjectClass, ObjectRef};
use crate::runner::ds::operations::object::has_property;
use crate::runner::ds::value::JsValue;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

/// The global object, the intrinsic prototypes and the call-depth counter shared by
/// every activation running against them.
pub struct Realm {
    pub global: ObjectRef,
    pub object_prototype: ObjectRef,
    pub function_prototype: ObjectRef,
    pub array_prototype: ObjectRef,
    pub error_prototype: ObjectRef,
    pub type_error_prototype: ObjectRef,
    pub reference_error_prototype: ObjectRef,
    pub range_error_prototype: ObjectRef,
    pub syntax_error_prototype: ObjectRef,
    pub boolean_prototype: ObjectRef,
    pub number_prototype: ObjectRef,
    pub string_prototype: ObjectRef,
    pub regexp_prototype: ObjectRef,
    call_depth: Cell<usize>,
    max_call_depth: usize,
}

/// Decrements the call depth when a call returns or unwinds.
pub struct CallDepthGuard<'a> {
    realm: &'a Realm,
}

impl<'a> Drop for CallDepthGuard<'a> {
    fn drop(&mut self) {
        self.realm.call_depth.set(self.realm.call_depth.get() - 1);
    }
}

impl Realm {
    /// A realm with bare intrinsics. `std_lib::register_builtins` fills them in.
    pub fn new(max_call_depth: usize) -> Rc<Self> {
        let object_prototype = JsObject::new(ObjectClass::Ordinary, None).into_ref();
        let derive = |class: ObjectClass, proto: &ObjectRef| {
            JsObject::new(class, Some(proto.clone())).into_ref()
        };
        let function_prototype = derive(
            ObjectClass::Function(FunctionKind::Native {
                name: "",
                func: |_, _, _| Ok(JsValue::Undefined),
            }),
            &object_prototype,
        );
        let array_prototype = derive(ObjectClass::Array(vec![]), &object_prototype);
        let error_prototype = derive(ObjectClass::Ordinary, &object_prototype);
        let type_error_prototype = derive(ObjectClass::Ordinary, &error_prototype);
        let reference_error_prototype = derive(ObjectClass::Ordinary, &error_prototype);
        let range_error_prototype = derive(ObjectClass::Ordinary, &error_prototype);
        let syntax_error_prototype = derive(ObjectClass::Ordinary, &error_prototype);
        let boolean_prototype = derive(ObjectClass::Boolean(false), &object_prototype);
        let number_prototype = derive(ObjectClass::Number(0.0), &object_prototype);
        let string_prototype = derive(ObjectClass::String(Rc::from("")), &object_prototype);
        let regexp_prototype = derive(ObjectClass::Ordinary, &object_prototype);
        let global = derive(ObjectClass::Ordinary, &object_prototype);
        Rc::new(Realm {
            global,
            object_prototype,
            function_prototype,
            array_prototype,
            error_prototype,
            type_error_prototype,
            reference_error_prototype,
            range_error_prototype,
            syntax_error_prototype,
            boolean_prototype,
            number_prototype,
            string_prototype,
            regexp_prototype,
            call_depth: Cell::new(0),
            max_call_depth,
        })
    }

    pub fn enter_call(&self) -> Result<CallDepthGuard<'_>, JErrorType> {
        let depth = self.call_depth.get();
        if depth >= self.max_call_depth {
            return Err(JErrorType::RangeError(
                "Maximum call stack size exceeded".to_string(),
            ));
        }
        self.call_depth.set(depth + 1);
        Ok(CallDepthGuard { realm: self })
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth.get()
    }

    pub fn new_object(&self) -> ObjectRef {
        JsObject::new(ObjectClass::Ordinary, Some(self.object_prototype.clone())).into_ref()
    }

    pub fn new_array(&self, elements: Vec<JsValue>) -> ObjectRef {
        JsObject::new(
            ObjectClass::Array(elements),
            Some(self.array_prototype.clone()),
        )
        .into_ref()
    }

    pub fn new_regexp(&self, pattern: &str, flags: &str) -> ObjectRef {
        let mut o = JsObject::new(ObjectClass::RegExp, Some(self.regexp_prototype.clone()));
        o.define_own("source", JsValue::from_str(pattern), false);
        o.define_own("global", JsValue::Boolean(flags.contains('g')), false);
        o.define_own("ignoreCase", JsValue::Boolean(flags.contains('i')), false);
        o.define_own("multiline", JsValue::Boolean(flags.contains('m')), false);
        o.define_own("lastIndex", JsValue::Number(0.0), false);
        o.into_ref()
    }

    /// An Error instance whose prototype matches `name` (falling back to `Error.prototype`).
    pub fn new_error(&self, name: &str, message: &str) -> ObjectRef {
        let prototype = match name {
            "TypeError" => &self.type_error_prototype,
            "ReferenceError" => &self.reference_error_prototype,
            "RangeError" => &self.range_error_prototype,
            "SyntaxError" => &self.syntax_error_prototype,
            _ => &self.error_prototype,
        };
        let mut o = JsObject::new(ObjectClass::Error, Some(prototype.clone()));
        if !message.is_empty() {
            o.define_own("message", JsValue::from_str(message), false);
        }
        o.into_ref()
    }

    /// The value a `catch` clause observes for a runtime error.
    pub fn error_to_value(&self, error: JErrorType) -> JsValue {
        match error {
            JErrorType::Thrown(v) => v,
            other => {
                let name = other.error_name().unwrap_or("Error");
                JsValue::Object(self.new_error(name, &other.message()))
            }
        }
    }

    pub fn new_native_function(&self, name: &'static str, func: NativeFn, length: usize) -> ObjectRef {
        let mut o = JsObject::new(
            ObjectClass::Function(FunctionKind::Native { name, func }),
            Some(self.function_prototype.clone()),
        );
        o.define_own("length", JsValue::Number(length as f64), false);
        o.define_own("name", JsValue::from_str(name), false);
        o.into_ref()
    }

    pub fn new_script_function(
        &self,
        code: Rc<CompiledFunction>,
        scope: Option<Rc<ClosureRecord>>,
    ) -> ObjectRef {
        let length = code.param_count;
        let name = JsValue::from_str(&code.name);
        let mut o = JsObject::new(
            ObjectClass::Function(FunctionKind::Script { code, scope }),
            Some(self.function_prototype.clone()),
        );
        o.define_own("length", JsValue::Number(length as f64), false);
        o.define_own("name", name, false);
        o.into_ref()
    }

    /// Global lookup. `None` when the name is bound nowhere on the global object's chain.
    pub fn get_global(&self, name: &str) -> Option<JsValue> {
        if has_property(&self.global, name) {
            Some(crate::runner::ds::operations::object::get(&self.global, name))
        } else {
            None
        }
    }

    pub fn has_global(&self, name: &str) -> bool {
        has_property(&self.global, name)
    }

    pub fn put_global(&self, name: &str, value: JsValue) -> Result<(), JErrorType> {
        self.global.borrow_mut().put_own(name, value)
    }

    /// Defines a non-enumerable global, used for built-ins.
    pub fn define_global(&self, name: &str, value: JsValue) {
        self.global.borrow_mut().define_own(name, value, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_depth_is_bounded_and_restored() {
        let realm = Realm::new(2);
        {
            let _a = realm.enter_call().unwrap();
            let _b = realm.enter_call().unwrap();
            assert!(matches!(realm.enter_call(), Err(JErrorType::RangeError(_))));
        }
        assert_eq!(realm.call_depth(), 0);
    }

    #[test]
    fn host_errors_become_error_objects() {
        let realm = Realm::new(10);
        let v = realm.error_to_value(JErrorType::TypeError("x is not a function".to_string()));
        match v {
            JsValue::Object(o) => {
                assert!(Rc::ptr_eq(
                    o.borrow().prototype.as_ref().unwrap(),
                    &realm.type_error_prototype
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
        let thrown = realm.error_to_value(JErrorType::Thrown(JsValue::Number(1.0)));
        assert_eq!(thrown, JsValue::Number(1.0));
    }
}
