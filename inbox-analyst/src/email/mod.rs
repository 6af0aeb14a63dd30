pub mod body;
pub mod client;
pub mod normalized_message;
pub mod processor;
pub mod raw_message;
pub mod summary_report;

/// Mailbox filter used when the caller gives none
pub const DEFAULT_QUERY: &str = "is:unread";
