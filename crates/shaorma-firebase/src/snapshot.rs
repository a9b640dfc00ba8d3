use serde_json::Value;
use shaorma::{RawChild, RemoteError};

/// Split a collection read into its children.
///
/// The REST surface answers `null` for a missing collection, an object for
/// keyed children, and an array when every key is a small integer. Array
/// holes come back as `null` and are dropped.
pub fn into_children(value: Value) -> Result<Vec<RawChild>, RemoteError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| RawChild::new(key, value))
            .collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| RawChild::new(index.to_string(), value))
            .collect()),
        other => Err(RemoteError::Parse(format!(
            "expected a collection, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_is_an_empty_collection() {
        assert!(into_children(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn object_children_keep_their_keys() {
        let children = into_children(json!({
            "-Nb": {"Title": "B"},
            "-Na": {"Title": "A"}
        }))
        .unwrap();

        let keys: Vec<_> = children.iter().filter_map(RawChild::remote_key).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"-Na"));
        assert!(keys.contains(&"-Nb"));
    }

    #[test]
    fn array_children_are_keyed_by_index_without_holes() {
        let children = into_children(json!([null, {"Id": 1}, {"Id": 2}])).unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].remote_key(), Some("1"));
        assert_eq!(children[1].value, json!({"Id": 2}));
    }

    #[test]
    fn scalar_root_is_a_parse_error() {
        let err = into_children(json!("oops")).unwrap_err();
        assert!(matches!(err, RemoteError::Parse(msg) if msg.contains("a string")));
    }
}
