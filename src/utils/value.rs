use serde_json::Value;

/// Convert a JSON claim value into a plain string suitable for an identity field.
pub fn value_to_string(value: Value) -> String {
    let raw = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    strip_control_chars(raw)
}

fn strip_control_chars(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}
