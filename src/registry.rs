//! Named record lists that templates bind against

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// One bindable unit of data: field name to JSON value
pub type Record = serde_json::Map<String, Value>;

/// Errors that can occur when loading component data from JSON
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read component data file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse component data JSON: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("component data must be a JSON object mapping names to records, found {found}")]
    NotAnObject { found: &'static str },
    #[error("component '{name}' must be a record or a list of records")]
    InvalidEntry { name: String },
}

/// Registry of component data, keyed by component name
///
/// A later [`set`](Self::set) for the same name replaces the earlier list wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentDataRegistry {
    components: HashMap<String, Vec<Record>>,
}

impl ComponentDataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the records for `name`
    pub fn set(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.components.insert(name.into(), records);
    }

    /// Records registered under `name`
    pub fn get(&self, name: &str) -> Option<&[Record]> {
        self.components.get(name).map(Vec::as_slice)
    }

    /// Remove a component, returning its records
    pub fn remove(&mut self, name: &str) -> Option<Vec<Record>> {
        self.components.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// All registered component names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Load a registry from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Load a registry from JSON text
    ///
    /// The top level is an object; each value is either an array of records or a single
    /// record, which is registered as a one-element list.
    pub fn from_json_str(content: &str) -> Result<Self, RegistryError> {
        let root: Value = serde_json::from_str(content)?;
        let Value::Object(entries) = root else {
            return Err(RegistryError::NotAnObject {
                found: json_kind(&root),
            });
        };

        let mut registry = Self::new();
        for (name, value) in entries {
            let records = match value {
                Value::Object(record) => vec![record],
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(record) => Some(record),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| RegistryError::InvalidEntry { name: name.clone() })?,
                _ => return Err(RegistryError::InvalidEntry { name }),
            };
            registry.set(name, records);
        }
        Ok(registry)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
