/// Inbound envelope normalisation
///
/// Meter messages arrive either as bare text (`[230.1,229.8,231.0]`) or
/// wrapped in a JSON object whose `data` field is a string, a serialized
/// Node-style Buffer (`{"type":"Buffer","data":[91,49,93]}`) or some other
/// JSON value.
use crate::errors::DecodeError;
use serde_json::Value;

/// True for `{"type": "Buffer", "data": [...]}`
pub fn is_buffer_shaped(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("Buffer")
        && value.get("data").map(Value::is_array).unwrap_or(false)
}

/// Decode a Buffer-shaped object into a UTF-8 string
fn buffer_to_string(value: &Value) -> Result<String, DecodeError> {
    let items = value
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::InvalidBuffer("missing byte array".to_string()))?;

    let bytes = items
        .iter()
        .map(|item| {
            item.as_u64()
                .filter(|b| *b <= u8::MAX as u64)
                .map(|b| b as u8)
                .ok_or_else(|| DecodeError::InvalidBuffer(format!("invalid byte {}", item)))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    String::from_utf8(bytes).map_err(|e| DecodeError::InvalidBuffer(e.to_string()))
}

/// Extract the text that carries register data
///
/// JSON objects with a `data` field yield that field as text; anything
/// else (bare lists, non-JSON text, JSON without `data`) is used as is.
pub fn payload_text(text: &str) -> Result<String, DecodeError> {
    if text.trim().is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let parsed: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return Ok(text.to_string()),
    };

    match parsed {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::String(data)) => Ok(data),
            Some(data) if is_buffer_shaped(&data) => buffer_to_string(&data),
            Some(data) => {
                serde_json::to_string(&data).map_err(|e| DecodeError::InvalidJson(e.to_string()))
            }
            None => Ok(text.to_string()),
        },
        _ => Ok(text.to_string()),
    }
}

/// Replace a Buffer-shaped `data` field with its decoded string, in place
///
/// Returns true when a conversion happened.
pub fn normalize_buffer_data(message: &mut Value) -> Result<bool, DecodeError> {
    let decoded = match message.get("data") {
        Some(data) if is_buffer_shaped(data) => buffer_to_string(data)?,
        _ => return Ok(false),
    };

    if let Some(map) = message.as_object_mut() {
        map.insert("data".to_string(), Value::String(decoded));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn buffer_of(text: &str) -> Value {
        json!({"type": "Buffer", "data": text.as_bytes()})
    }

    #[test]
    fn test_bare_list_passes_through() {
        assert_eq!(payload_text("[230.1,229.8,231.0]").unwrap(), "[230.1,229.8,231.0]");
    }

    #[test]
    fn test_data_string_field_extracted() {
        let text = json!({"message": "meter", "data": "[0.92]"}).to_string();
        assert_eq!(payload_text(&text).unwrap(), "[0.92]");
    }

    #[test]
    fn test_data_buffer_field_decoded() {
        let text = json!({"data": buffer_of("[10,20,30]")}).to_string();
        assert_eq!(payload_text(&text).unwrap(), "[10,20,30]");
    }

    #[test]
    fn test_non_string_data_is_serialized() {
        let text = json!({"data": {"registers": [1.5, 2.5]}}).to_string();
        assert_eq!(payload_text(&text).unwrap(), r#"{"registers":[1.5,2.5]}"#);
    }

    #[test]
    fn test_invalid_buffer_bytes_rejected() {
        let text = json!({"data": {"type": "Buffer", "data": [300]}}).to_string();
        assert!(matches!(payload_text(&text), Err(DecodeError::InvalidBuffer(_))));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(payload_text(""), Err(DecodeError::EmptyPayload));
    }

    #[test]
    fn test_normalize_in_place() {
        let mut message = json!({"message": "hi", "data": buffer_of("hello")});
        assert!(normalize_buffer_data(&mut message).unwrap());
        assert_eq!(message, json!({"message": "hi", "data": "hello"}));

        let mut plain = json!({"message": "Hello Server!"});
        assert!(!normalize_buffer_data(&mut plain).unwrap());
    }
}
