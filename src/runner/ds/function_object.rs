use std::rc::Rc;

use crate::runner::compiler::function::CompiledFunction;
use crate::runner::ds::closure_record::ClosureRecord;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObject, ObjectClass, ObjectRef};
use crate::runner::ds::operations::object::get;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

/// A host function. It receives `this` and the argument list, and returns a value or
/// a runtime error.
pub type NativeFn = fn(&Rc<Realm>, JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType>;

pub enum FunctionKind {
    Script {
        code: Rc<CompiledFunction>,
        /// Captured record of the enclosing activation, if any ancestor captures.
        scope: Option<Rc<ClosureRecord>>,
    },
    Native {
        name: &'static str,
        func: NativeFn,
    },
}

impl FunctionKind {
    pub fn name(&self) -> &str {
        match self {
            FunctionKind::Script { code, .. } => &code.name,
            FunctionKind::Native { name, .. } => name,
        }
    }
}

enum Target {
    Script(Rc<CompiledFunction>, Option<Rc<ClosureRecord>>),
    Native(NativeFn),
}

fn resolve_target(callee: &JsValue, what: &str) -> Result<(ObjectRef, Target), JErrorType> {
    if let JsValue::Object(o) = callee {
        let target = match &o.borrow().class {
            ObjectClass::Function(FunctionKind::Script { code, scope }) => {
                Some(Target::Script(code.clone(), scope.clone()))
            }
            ObjectClass::Function(FunctionKind::Native { func, .. }) => Some(Target::Native(*func)),
            _ => None,
        };
        if let Some(target) = target {
            return Ok((o.clone(), target));
        }
    }
    Err(JErrorType::TypeError(format!("{} is not {}", callee, what)))
}

/// The invocation ABI compiled code calls through.
pub fn call(
    realm: &Rc<Realm>,
    callee: &JsValue,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let (o, target) = resolve_target(callee, "a function")?;
    let _depth = realm.enter_call()?;
    match target {
        Target::Script(code, scope) => code.invoke(realm, o, this, args, scope),
        Target::Native(func) => func(realm, this, args),
    }
}

/// `new callee(...args)`. Host functions are called with an undefined `this` and
/// build their own result.
pub fn construct(
    realm: &Rc<Realm>,
    callee: &JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let (o, target) = resolve_target(callee, "a constructor")?;
    match target {
        Target::Script(..) => {
            ensure_function_prototype(realm, &o);
            let prototype = match get(&o, "prototype") {
                JsValue::Object(p) => p,
                _ => realm.object_prototype.clone(),
            };
            let instance = JsObject::new(ObjectClass::Ordinary, Some(prototype)).into_ref();
            let result = call(realm, callee, JsValue::Object(instance.clone()), args)?;
            match result {
                JsValue::Object(_) => Ok(result),
                _ => Ok(JsValue::Object(instance)),
            }
        }
        Target::Native(_) => call(realm, callee, JsValue::Undefined, args),
    }
}

/// Script functions get their `prototype` object on first use.
pub fn ensure_function_prototype(realm: &Realm, f: &ObjectRef) {
    let missing = {
        let b = f.borrow();
        matches!(b.class, ObjectClass::Function(FunctionKind::Script { .. }))
            && !b.has_own("prototype")
    };
    if missing {
        let prototype = realm.new_object();
        prototype
            .borrow_mut()
            .define_own("constructor", JsValue::Object(f.clone()), false);
        f.borrow_mut()
            .define_own("prototype", JsValue::Object(prototype), false);
    }
}
