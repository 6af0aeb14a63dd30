use chrono::{DateTime, Utc};
use indoc::formatdoc;
use serde_json::{Map, Value};

use super::TextGenerator;
use crate::{
    app_config::ModelConfig,
    email::normalized_message::NormalizedMessage,
    model::analysis::{AnalysisResult, Priority, Sentiment, UNKNOWN_CATEGORY},
    util::truncate_chars,
};

pub const SYSTEM_INSTRUCTION: &str =
    "You are an expert email analyst. Provide structured analysis in JSON format.";

/// Keys we always set ourselves, never taken from the model
const RESERVED_KEYS: [&str; 3] = ["email_id", "analyzed_at", "error"];

pub fn analysis_instruction(email: &NormalizedMessage, body_char_limit: usize) -> String {
    formatdoc! {r#"
        Analyze this email and provide structured insights:

        Subject: {subject}
        From: {sender}
        Content: {body}...

        Please provide:
        1. Category (work, personal, promotional, newsletter, urgent, etc.)
        2. Priority (high, medium, low)
        3. Sentiment (positive, neutral, negative)
        4. Key topics/entities mentioned
        5. Suggested actions
        6. Brief summary

        Return as a JSON object with the keys category, priority, sentiment, key_topics, suggested_actions and summary."#,
        subject = email.subject,
        sender = email.sender,
        body = truncate_chars(&email.body, body_char_limit),
    }
}

/// Fields read from the model's JSON answer. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnalysis {
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub sentiment: Option<Sentiment>,
    pub key_topics: Option<Vec<String>>,
    pub suggested_actions: Option<Vec<String>>,
    pub summary: Option<String>,
    pub extra: Map<String, Value>,
}

impl ParsedAnalysis {
    pub fn into_result(self, email_id: &str, analyzed_at: DateTime<Utc>) -> AnalysisResult {
        AnalysisResult {
            email_id: email_id.to_string(),
            category: self.category.unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
            priority: self.priority.unwrap_or_default(),
            sentiment: self.sentiment.unwrap_or_default(),
            key_topics: self.key_topics,
            suggested_actions: self.suggested_actions,
            summary: self.summary,
            analyzed_at,
            error: None,
            extra: self.extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Parsed(ParsedAnalysis),
    Failure(String),
}

impl AnalysisOutcome {
    pub fn into_result(self, email_id: &str, analyzed_at: DateTime<Utc>) -> AnalysisResult {
        match self {
            AnalysisOutcome::Parsed(parsed) => parsed.into_result(email_id, analyzed_at),
            AnalysisOutcome::Failure(reason) => {
                AnalysisResult::fallback(email_id, reason, analyzed_at)
            }
        }
    }
}

/// Parse the model's answer. Only a response that is not a JSON object is a
/// failure; missing or oddly typed fields are dropped.
pub fn parse_analysis(content: &str) -> AnalysisOutcome {
    let parsed = match serde_json::from_str::<Value>(content) {
        Ok(value) => value,
        Err(e) => {
            return AnalysisOutcome::Failure(format!("Could not parse analysis response: {e}"))
        }
    };

    let Value::Object(mut fields) = parsed else {
        return AnalysisOutcome::Failure("Analysis response is not a JSON object".to_string());
    };

    let category = take_string(&mut fields, &["category"]);
    let priority = take_string(&mut fields, &["priority"]).and_then(|p| p.parse().ok());
    let sentiment = take_string(&mut fields, &["sentiment"]).and_then(|s| s.parse().ok());
    let key_topics = take_list(&mut fields, &["key_topics", "topics", "key_entities"]);
    let suggested_actions = take_list(&mut fields, &["suggested_actions", "actions"]);
    let summary = take_string(&mut fields, &["summary", "brief_summary"]);

    for key in RESERVED_KEYS {
        fields.remove(key);
    }

    AnalysisOutcome::Parsed(ParsedAnalysis {
        category,
        priority,
        sentiment,
        key_topics,
        suggested_actions,
        summary,
        extra: fields,
    })
}

fn take_first(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let value = keys.iter().find_map(|key| fields.remove(*key));
    // drop aliases so they don't resurface as extra fields
    for key in keys {
        fields.remove(*key);
    }
    value
}

fn take_string(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    match take_first(fields, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn take_list(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<Vec<String>> {
    match take_first(fields, keys)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Value::String(s) if !s.trim().is_empty() => Some(vec![s]),
        _ => None,
    }
}

pub struct EmailAnalyzer<G> {
    generator: G,
    temperature: f64,
    body_char_limit: usize,
}

impl<G: TextGenerator> EmailAnalyzer<G> {
    pub fn new(generator: G, model: &ModelConfig) -> Self {
        Self {
            generator,
            temperature: model.temperature,
            body_char_limit: model.body_char_limit,
        }
    }

    /// Never fails: any problem talking to the model or reading its answer
    /// yields the fallback analysis.
    pub async fn analyze(&self, email: &NormalizedMessage) -> AnalysisResult {
        let instruction = analysis_instruction(email, self.body_char_limit);

        let outcome = match self
            .generator
            .complete(SYSTEM_INSTRUCTION, &instruction, self.temperature)
            .await
        {
            Ok(content) => parse_analysis(&content),
            Err(e) => AnalysisOutcome::Failure(e.to_string()),
        };

        if let AnalysisOutcome::Failure(reason) = &outcome {
            tracing::error!("Error analyzing email {}: {}", email.id, reason);
        }

        outcome.into_result(&email.id, Utc::now())
    }
}
