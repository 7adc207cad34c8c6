use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runner::ds::arguments_object::ArgumentsData;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::FunctionKind;
use crate::runner::ds::value::JsValue;

pub type ObjectRef = Rc<RefCell<JsObject>>;

pub struct Property {
    pub value: JsValue,
    pub enumerable: bool,
}

/// Own properties, iterated in insertion order.
#[derive(Default)]
pub struct PropertyMap {
    keys: Vec<String>,
    entries: HashMap<String, Property>,
}

impl PropertyMap {
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, property: Property) {
        if self.entries.insert(key.to_string(), property).is_none() {
            self.keys.push(key.to_string());
        }
    }

    pub fn set_value(&mut self, key: &str, value: JsValue) {
        match self.entries.get_mut(key) {
            Some(p) => p.value = value,
            None => self.insert(
                key,
                Property {
                    value,
                    enumerable: true,
                },
            ),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.keys.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = (&String, &Property)> {
        self.keys
            .iter()
            .filter_map(move |k| self.entries.get(k).map(|p| (k, p)))
    }
}

pub enum ObjectClass {
    Ordinary,
    Array(Vec<JsValue>),
    Function(FunctionKind),
    Arguments(ArgumentsData),
    Error,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    RegExp,
}

pub struct JsObject {
    pub class: ObjectClass,
    pub prototype: Option<ObjectRef>,
    properties: PropertyMap,
}

/// Parses a canonical array index ("0", "17", never "01" or "-1").
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>()
        .ok()
        .filter(|i| *i != u32::MAX)
        .map(|i| i as usize)
}

impl JsObject {
    pub fn new(class: ObjectClass, prototype: Option<ObjectRef>) -> Self {
        JsObject {
            class,
            prototype,
            properties: PropertyMap::default(),
        }
    }

    pub fn into_ref(self) -> ObjectRef {
        Rc::new(RefCell::new(self))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.class, ObjectClass::Function(_))
    }

    pub fn class_name(&self) -> &'static str {
        match self.class {
            ObjectClass::Ordinary => "Object",
            ObjectClass::Array(_) => "Array",
            ObjectClass::Function(_) => "Function",
            ObjectClass::Arguments(_) => "Arguments",
            ObjectClass::Error => "Error",
            ObjectClass::Boolean(_) => "Boolean",
            ObjectClass::Number(_) => "Number",
            ObjectClass::String(_) => "String",
            ObjectClass::RegExp => "RegExp",
        }
    }

    /// Own property lookup, including the virtual element and `length` properties.
    pub fn get_own(&self, key: &str) -> Option<JsValue> {
        match &self.class {
            ObjectClass::Array(elements) => {
                if key == "length" {
                    return Some(JsValue::Number(elements.len() as f64));
                }
                if let Some(i) = array_index(key) {
                    return elements.get(i).cloned();
                }
            }
            ObjectClass::Arguments(args) => {
                if let Some(i) = array_index(key) {
                    if i < args.length {
                        return args.values.get(i).cloned();
                    }
                }
            }
            ObjectClass::String(s) => {
                if key == "length" {
                    return Some(JsValue::Number(s.encode_utf16().count() as f64));
                }
                if let Some(i) = array_index(key) {
                    return string_char_at(s, i).map(JsValue::String);
                }
            }
            _ => {}
        }
        self.properties.get(key).map(|p| p.value.clone())
    }

    pub fn has_own(&self, key: &str) -> bool {
        match &self.class {
            ObjectClass::Array(elements) => {
                if key == "length" {
                    return true;
                }
                if let Some(i) = array_index(key) {
                    if i < elements.len() {
                        return true;
                    }
                }
            }
            ObjectClass::Arguments(args) => {
                if let Some(i) = array_index(key) {
                    if i < args.length {
                        return true;
                    }
                }
            }
            ObjectClass::String(s) => {
                if key == "length" {
                    return true;
                }
                if let Some(i) = array_index(key) {
                    if i < s.encode_utf16().count() {
                        return true;
                    }
                }
            }
            _ => {}
        }
        self.properties.contains(key)
    }

    /// Assigns an own property, creating an enumerable one when absent.
    pub fn put_own(&mut self, key: &str, value: JsValue) -> Result<(), JErrorType> {
        match &mut self.class {
            ObjectClass::Array(elements) => {
                if key == "length" {
                    let new_len = match value {
                        JsValue::Number(n) if n >= 0.0 && n.fract() == 0.0 && n < 4294967296.0 => {
                            n as usize
                        }
                        _ => return Err(JErrorType::RangeError("Invalid array length".to_string())),
                    };
                    elements.resize(new_len, JsValue::Undefined);
                    return Ok(());
                }
                if let Some(i) = array_index(key) {
                    if i >= elements.len() {
                        elements.resize(i + 1, JsValue::Undefined);
                    }
                    elements[i] = value;
                    return Ok(());
                }
            }
            ObjectClass::Arguments(args) => {
                if let Some(i) = array_index(key) {
                    if i < args.length {
                        args.values[i] = value;
                        return Ok(());
                    }
                }
            }
            ObjectClass::String(s) => {
                if key == "length" {
                    return Ok(());
                }
                if let Some(i) = array_index(key) {
                    if i < s.encode_utf16().count() {
                        return Ok(());
                    }
                }
            }
            _ => {}
        }
        self.properties.set_value(key, value);
        Ok(())
    }

    /// Defines (or redefines) an own data property with an explicit enumerable flag.
    pub fn define_own(&mut self, key: &str, value: JsValue, enumerable: bool) {
        self.properties.insert(key, Property { value, enumerable });
    }

    pub fn delete_own(&mut self, key: &str) -> bool {
        match &mut self.class {
            ObjectClass::Array(elements) => {
                if key == "length" {
                    return false;
                }
                if let Some(i) = array_index(key) {
                    if i < elements.len() {
                        elements[i] = JsValue::Undefined;
                        return true;
                    }
                }
            }
            ObjectClass::Arguments(args) => {
                if let Some(i) = array_index(key) {
                    if i < args.length {
                        args.values[i] = JsValue::Undefined;
                        return true;
                    }
                }
            }
            ObjectClass::String(s) => {
                if key == "length" {
                    return false;
                }
                if let Some(i) = array_index(key) {
                    if i < s.encode_utf16().count() {
                        return false;
                    }
                }
            }
            _ => {}
        }
        self.properties.remove(key);
        true
    }

    /// Own keys, element indices first, then named properties in insertion order.
    pub fn own_keys(&self, enumerable_only: bool) -> Vec<String> {
        let mut keys = vec![];
        let indexed = match &self.class {
            ObjectClass::Array(elements) => elements.len(),
            ObjectClass::Arguments(args) => args.length,
            ObjectClass::String(s) => s.encode_utf16().count(),
            _ => 0,
        };
        for i in 0..indexed {
            keys.push(i.to_string());
        }
        for (k, p) in self.properties.keys() {
            if p.enumerable || !enumerable_only {
                keys.push(k.clone());
            }
        }
        keys
    }

    pub fn is_own_enumerable(&self, key: &str) -> bool {
        match self.properties.get(key) {
            Some(p) => p.enumerable,
            None => self.has_own(key),
        }
    }
}

/// The UTF-16 code unit at `index` as a one-unit string.
pub fn string_char_at(s: &str, index: usize) -> Option<Rc<str>> {
    let unit = s.encode_utf16().nth(index)?;
    Some(Rc::from(String::from_utf16_lossy(&[unit]).as_str()))
}
