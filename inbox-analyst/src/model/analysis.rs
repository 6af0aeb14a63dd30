use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Category used whenever the model did not name one
pub const UNKNOWN_CATEGORY: &str = "unknown";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

/// Analysis of a single message, as produced by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub email_id: String,
    pub category: String,
    pub priority: Priority,
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    /// Only set when the analysis could not be completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Any other keys the model returned
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    pub fn fallback(
        email_id: impl Into<String>,
        error: impl Into<String>,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email_id: email_id.into(),
            category: UNKNOWN_CATEGORY.to_string(),
            priority: Priority::default(),
            sentiment: Sentiment::default(),
            key_topics: None,
            suggested_actions: None,
            summary: None,
            analyzed_at,
            error: Some(error.into()),
            extra: Map::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority == Priority::High
    }
}
