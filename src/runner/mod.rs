//! Everything after parsing: static analysis, lowering to closures, the runtime
//! object model and the embedding API.

pub mod analysis;
pub mod api;
pub mod compiler;
pub mod config;
pub mod ds;
pub mod std_lib;
