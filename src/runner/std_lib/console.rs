//! Console built-in object.
//!
//! Provides `console.log`, which writes its arguments to stdout separated by spaces.

use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::BuiltInObject;

pub fn register(realm: &Rc<Realm>) {
    BuiltInObject::new("console")
        .add_static_method("log", console_log, 0)
        .register(realm);
}

/// Format all arguments for console output.
pub fn format_args(args: &[JsValue]) -> String {
    args.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn console_log(
    _realm: &Rc<Realm>,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    println!("{}", format_args(&args));
    Ok(JsValue::Undefined)
}
