//! Render strategies for the two template dialects

pub mod component_loop;
pub mod rule_script;

pub use component_loop::ComponentLoopProcessor;
pub use rule_script::RuleScriptProcessor;

use serde_json::Value;

/// Text form of a record value: strings verbatim, `null` empty, everything else as JSON
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Loose truthiness: `null`, `false`, zero and the empty string are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
