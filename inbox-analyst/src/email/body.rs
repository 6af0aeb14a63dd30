use base64::{engine::general_purpose::URL_SAFE, Engine};

use super::raw_message::MessagePart;

/// Stand-in body for data that is not padded base64url or not UTF-8
pub const UNDECODABLE_BODY: &str = "Unable to decode email content";

/// Text of the first `text/plain` part, or of the payload itself when it has
/// no parts. Returns an empty string when there is no plain text part.
pub fn extract_body(payload: &MessagePart) -> String {
    let part = match &payload.parts {
        Some(parts) => parts.iter().find(|p| p.is_text_plain()),
        None => Some(payload).filter(|p| p.is_text_plain()),
    };

    part.map_or_else(String::new, |p| {
        decode_body_data(p.encoded_data().unwrap_or_default())
    })
}

pub fn decode_body_data(data: &str) -> String {
    match URL_SAFE.decode(data) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|e| {
            tracing::debug!("Body is not valid UTF-8: {}", e);
            UNDECODABLE_BODY.to_string()
        }),
        Err(e) => {
            tracing::debug!("Could not decode body data: {}", e);
            UNDECODABLE_BODY.to_string()
        }
    }
}
