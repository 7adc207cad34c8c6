mod api;
pub mod ast;
mod static_semantics;

pub use api::{JsParser, Rule};
