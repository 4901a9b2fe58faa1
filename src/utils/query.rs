use serde_json::Value;

/// Flatten a JSON parameter into `(key, value)` query pairs.
///
/// Nested objects become `key[nested]`, arrays become repeated `key[]`
/// entries, booleans are sent as `1`/`0` and null as an empty value.
pub fn query_components(key: &str, value: &Value) -> Vec<(String, String)> {
    let mut components = Vec::new();
    push_components(key, value, &mut components);
    components
}

fn push_components(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (nested_key, nested) in map {
                push_components(&format!("{}[{}]", key, nested_key), nested, out);
            }
        }
        Value::Array(items) => {
            let array_key = format!("{}[]", key);
            for item in items {
                push_components(&array_key, item, out);
            }
        }
        Value::Bool(b) => out.push((key.to_string(), if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((key.to_string(), n.to_string())),
        Value::String(s) => out.push((key.to_string(), s.clone())),
        Value::Null => out.push((key.to_string(), String::new())),
    }
}
