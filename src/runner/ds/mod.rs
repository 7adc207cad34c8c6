//! Runtime data structures: values, objects, closure records and the realm.

pub mod activation;
pub mod arguments_object;
pub mod closure_record;
pub mod error;
pub mod function_object;
pub mod object;
pub mod operations;
pub mod realm;
pub mod value;
