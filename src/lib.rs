//! # closure-js - a closure-compiling JavaScript engine
//!
//! Scripts are parsed with a PEG grammar, analyzed in three passes and lowered into
//! trees of Rust closures:
//!
//! - The variable marker resolves every identifier to a local, parameter, global,
//!   with-fallback or closure-captured variable.
//! - The closure builder gives every function that owns captured variables a
//!   closure record linked to its parent's.
//! - The type marker infers a static value type per variable, so the compiler can
//!   keep numbers, booleans and strings unboxed and pick specialized operators.
//!
//! ## Quick Start
//!
//! ```
//! use closure_js::runner::api::Engine;
//! use closure_js::runner::ds::value::JsValue;
//!
//! let engine = Engine::new();
//! let result = engine
//!     .eval("function add(a, b) { return a + b; } add(2, 3);")
//!     .unwrap();
//! assert_eq!(result, JsValue::Number(5.0));
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG parser and AST types
//! - **[`runner`]** - Analysis, compilation and the runtime
//!   - **[`runner::analysis`]** - Variable, closure and type marking
//!   - **[`runner::compiler`]** - Lowering to closures with operator specialization
//!   - **[`runner::ds`]** - Values, objects, closure records and the realm
//!   - **[`runner::api`]** - The `Engine` embedding API

#[macro_use]
extern crate lazy_static;

pub mod parser;
pub mod runner;
