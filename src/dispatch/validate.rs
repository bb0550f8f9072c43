use super::DispatchError;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedPayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatPayload {
    pub prompt: String,
}

pub fn embed_payload(body: &[u8]) -> Result<EmbedPayload, DispatchError> {
    let text = required_string(body, "text")?;
    Ok(EmbedPayload { text })
}

pub fn chat_payload(body: &[u8]) -> Result<ChatPayload, DispatchError> {
    let prompt = required_string(body, "prompt")?;
    Ok(ChatPayload { prompt })
}

/// Extracts `field` as a string from a JSON object body.
///
/// Rules, first failure wins:
/// 1. the body is a non-empty JSON object
/// 2. `field` is a key of that object
/// 3. its value is a JSON string
///
/// An unparseable, non-object or empty-object body counts as a missing field.
pub fn required_string(body: &[u8], field: &str) -> Result<String, DispatchError> {
    let object = match parse_object(body) {
        Some(object) if !object.is_empty() => object,
        _ => return Err(DispatchError::missing(field)),
    };

    match object.get(field) {
        None => Err(DispatchError::missing(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DispatchError::not_a_string(field)),
    }
}

fn parse_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_valid_text() {
        let payload = embed_payload(br#"{"text": "hello world"}"#).unwrap();
        assert_eq!(payload.text, "hello world");
    }

    #[test]
    fn test_empty_string_is_valid() {
        let payload = embed_payload(br#"{"text": ""}"#).unwrap();
        assert_eq!(payload.text, "");
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let payload = chat_payload(br#"{"prompt": "hi", "max_new_tokens": 5}"#).unwrap();
        assert_eq!(payload.prompt, "hi");
    }

    #[rstest]
    #[case::empty_body(b"")]
    #[case::invalid_json(b"not json")]
    #[case::empty_object(b"{}")]
    #[case::other_key(br#"{"input": "hello"}"#)]
    #[case::array_body(br#"["text"]"#)]
    #[case::string_body(br#""text""#)]
    #[case::null_body(b"null")]
    fn test_missing_text(#[case] body: &[u8]) {
        let err = embed_payload(body).unwrap_err();
        assert_eq!(err, DispatchError::Validation("Missing 'text' in request".to_string()));
    }

    #[rstest]
    #[case::number(br#"{"text": 42}"#)]
    #[case::float(br#"{"text": 4.2}"#)]
    #[case::boolean(br#"{"text": true}"#)]
    #[case::null(br#"{"text": null}"#)]
    #[case::object(br#"{"text": {"nested": "x"}}"#)]
    #[case::array(br#"{"text": ["a", "b"]}"#)]
    fn test_text_must_be_string(#[case] body: &[u8]) {
        let err = embed_payload(body).unwrap_err();
        assert_eq!(err, DispatchError::Validation("'text' must be a string".to_string()));
    }

    #[test]
    fn test_chat_messages_name_prompt() {
        assert_eq!(
            chat_payload(b"{}").unwrap_err().to_string(),
            "Missing 'prompt' in request"
        );
        assert_eq!(
            chat_payload(br#"{"prompt": 1}"#).unwrap_err().to_string(),
            "'prompt' must be a string"
        );
    }
}
