use serde::{Deserialize, Serialize};

use super::{body::extract_body, raw_message::RawMessage};

pub const DEFAULT_SUBJECT: &str = "No Subject";
pub const DEFAULT_SENDER: &str = "Unknown Sender";

/// Provider independent view of a message, built once per fetched message
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub body: String,
    pub labels: Vec<String>,
    pub snippet: String,
}

impl NormalizedMessage {
    pub fn from_raw_message(msg: &RawMessage) -> Self {
        let payload = &msg.payload;
        let header_or = |name: &str, default: &str| {
            payload.header(name).unwrap_or(default).to_string()
        };

        NormalizedMessage {
            id: msg.id.clone(),
            subject: header_or("Subject", DEFAULT_SUBJECT),
            sender: header_or("From", DEFAULT_SENDER),
            date: header_or("Date", ""),
            body: extract_body(payload),
            labels: msg.label_ids.clone(),
            snippet: msg.snippet.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::body::UNDECODABLE_BODY;
    use crate::testing::common::load_raw_message;

    #[test]
    fn test_from_plain_message() {
        let msg = load_raw_message("plain_message.json");
        let normalized = NormalizedMessage::from_raw_message(&msg);

        assert_eq!(
            normalized,
            NormalizedMessage {
                id: "18c2f0a9d1b3e4f5".to_string(),
                subject: "Test Subject".to_string(),
                sender: "test@example.com".to_string(),
                date: "Mon, 1 Jan 2024 12:00:00 +0000".to_string(),
                body: "Test email body".to_string(),
                labels: vec!["INBOX".to_string(), "UNREAD".to_string()],
                snippet: "Test email snippet".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_headers_use_defaults() {
        let msg = load_raw_message("html_only.json");
        let normalized = NormalizedMessage::from_raw_message(&msg);

        assert_eq!(normalized.subject, DEFAULT_SUBJECT);
        assert_eq!(normalized.sender, "deals@shop.example");
        assert_eq!(normalized.date, "");
        assert_eq!(normalized.body, "");

        let bare = RawMessage {
            id: "bare".to_string(),
            ..Default::default()
        };
        let normalized = NormalizedMessage::from_raw_message(&bare);
        assert_eq!(normalized.subject, DEFAULT_SUBJECT);
        assert_eq!(normalized.sender, DEFAULT_SENDER);
    }

    #[test]
    fn test_undecodable_body_is_kept_as_marker() {
        let msg = load_raw_message("malformed_body.json");
        let normalized = NormalizedMessage::from_raw_message(&msg);

        assert_eq!(normalized.subject, "Broken encoding");
        assert_eq!(normalized.body, UNDECODABLE_BODY);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let msg = load_raw_message("multipart_alternative.json");
        let first = NormalizedMessage::from_raw_message(&msg);
        let second = NormalizedMessage::from_raw_message(&msg);

        assert_eq!(first, second);
        assert_eq!(first.sender, "Ana <ana@example.org>");
    }
}
