use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::parser::ast::FunctionId;
use crate::runner::compiler::code::{Code, Completion, StatementCode};
use crate::runner::ds::activation::{Activation, FrameLayout};
use crate::runner::ds::arguments_object::new_arguments_object;
use crate::runner::ds::closure_record::ClosureRecord;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::operations::type_conversion::to_object;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;

/// One function body (or the program) lowered to closures.
pub struct CompiledFunction {
    pub name: String,
    pub function_id: FunctionId,
    pub param_count: usize,
    pub strict: bool,
    pub is_program: bool,
    pub layout: FrameLayout,
    pub(crate) prologue: Code<()>,
    pub(crate) body: StatementCode,
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("name", &self.name)
            .field("function_id", &self.function_id)
            .field("param_count", &self.param_count)
            .field("strict", &self.strict)
            .field("layout", &self.layout)
            .finish()
    }
}

impl CompiledFunction {
    /// Runs the body for a call. `scope` is the record the function object captured.
    pub fn invoke(
        &self,
        realm: &Rc<Realm>,
        callee: ObjectRef,
        this: JsValue,
        args: Vec<JsValue>,
        scope: Option<Rc<ClosureRecord>>,
    ) -> Result<JsValue, JErrorType> {
        let this = if self.strict {
            this
        } else {
            match this {
                JsValue::Undefined | JsValue::Null => JsValue::Object(realm.global.clone()),
                JsValue::Object(_) => this,
                primitive => to_object(realm, &primitive)?,
            }
        };
        trace!(name = %self.name, args = args.len(), depth = realm.call_depth(), "invoke");
        let arguments = JsValue::Object(new_arguments_object(
            realm,
            args,
            self.param_count,
            Some(&callee),
        ));
        let mut activation = Activation::new(
            realm.clone(),
            &self.layout,
            this,
            Some(callee),
            arguments,
            scope,
        );
        (self.prologue)(&mut activation)?;
        match (self.body)(&mut activation)? {
            Completion::Return(v) => Ok(v),
            _ => Ok(JsValue::Undefined),
        }
    }

    /// Runs a compiled program against `realm`, yielding the value of the last
    /// expression statement executed.
    pub fn run_program(&self, realm: &Rc<Realm>) -> Result<JsValue, JErrorType> {
        let mut activation = Activation::new(
            realm.clone(),
            &self.layout,
            JsValue::Object(realm.global.clone()),
            None,
            JsValue::Undefined,
            None,
        );
        (self.prologue)(&mut activation)?;
        (self.body)(&mut activation)?;
        Ok(activation.completion_value)
    }
}
