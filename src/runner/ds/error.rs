use thiserror::Error;

use crate::runner::ds::value::JsValue;

/// A runtime error raised while compiled code runs.
///
/// The first four variants come from the engine itself; `Thrown` carries whatever a
/// script `throw` produced. Engine variants become real Error objects at the first
/// `catch` that observes them.
#[derive(Debug, Clone, Error)]
pub enum JErrorType {
    #[error("Uncaught reference error: {0}.")]
    ReferenceError(String),
    #[error("Uncaught type error: {0}.")]
    TypeError(String),
    #[error("Uncaught range error: {0}.")]
    RangeError(String),
    #[error("Uncaught syntax error: {0}.")]
    SyntaxError(String),
    #[error("Uncaught {0}")]
    Thrown(JsValue),
}

impl JErrorType {
    /// The intrinsic constructor name matching an engine-raised error.
    pub fn error_name(&self) -> Option<&'static str> {
        match self {
            JErrorType::ReferenceError(_) => Some("ReferenceError"),
            JErrorType::TypeError(_) => Some("TypeError"),
            JErrorType::RangeError(_) => Some("RangeError"),
            JErrorType::SyntaxError(_) => Some("SyntaxError"),
            JErrorType::Thrown(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            JErrorType::ReferenceError(m)
            | JErrorType::TypeError(m)
            | JErrorType::RangeError(m)
            | JErrorType::SyntaxError(m) => m.clone(),
            JErrorType::Thrown(v) => v.to_string(),
        }
    }
}

/// A static error found while marking or compiling. Nothing runs once one is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Unexpected eval or arguments in strict mode: '{0}'")]
    RestrictedName(String),
    #[error("Duplicate parameter name not allowed in strict mode: '{0}'")]
    DuplicateParameter(String),
    #[error("Strict mode code may not include a with statement")]
    WithInStrictMode,
    #[error("Delete of an unqualified identifier in strict mode: '{0}'")]
    DeleteOfIdentifier(String),
    #[error("Illegal return statement")]
    IllegalReturn,
    #[error("Illegal break statement")]
    IllegalBreak,
    #[error("Illegal continue statement")]
    IllegalContinue,
    #[error("Undefined label '{0}'")]
    UndefinedLabel(String),
    #[error("Label '{0}' has already been declared")]
    DuplicateLabel(String),
    #[error("Invalid left-hand side in assignment")]
    InvalidAssignmentTarget,
    #[error("Identifier '{0}' was never resolved")]
    UnresolvedIdentifier(String),
}
