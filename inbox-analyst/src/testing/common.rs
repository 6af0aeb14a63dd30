use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex},
};

use chrono::Utc;

use crate::{
    app_config::GmailConfig,
    auth::{CredentialStore, StoredCredential},
    email::{
        client::MailProvider, normalized_message::NormalizedMessage, raw_message::RawMessage,
    },
    error::{AppError, AppResult},
    model::{
        analysis::{AnalysisResult, Priority, Sentiment},
        processed_email::ProcessedMessage,
    },
    prompt::TextGenerator,
};

pub fn load_raw_message(name: &str) -> RawMessage {
    let path = format!("{}/src/testing/data/{}", env!("CARGO_MANIFEST_DIR"), name);
    let json = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path, e));
    serde_json::from_str(&json).unwrap_or_else(|e| panic!("{}: {}", path, e))
}

pub fn test_gmail_config() -> GmailConfig {
    GmailConfig {
        client_id: "123.apps.googleusercontent.com".to_string(),
        project_id: Some("inbox-analyst-test".to_string()),
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        auth_provider_x509_cert_url: None,
        client_secret: "test-secret".to_string(),
        redirect_uris: vec!["http://localhost".to_string()],
    }
}

/// A processed message with a successful analysis
pub fn processed(id: &str, subject: &str, category: &str, priority: Priority) -> ProcessedMessage {
    let email = NormalizedMessage {
        id: id.to_string(),
        subject: subject.to_string(),
        sender: format!("{}@example.com", id),
        date: "Mon, 1 Jan 2024 12:00:00 +0000".to_string(),
        body: format!("Body of {}", subject),
        labels: vec!["INBOX".to_string(), "UNREAD".to_string()],
        snippet: subject.to_string(),
    };
    let mut analysis = AnalysisResult::fallback(id, "", Utc::now());
    analysis.error = None;
    analysis.category = category.to_string();
    analysis.priority = priority;
    analysis.sentiment = Sentiment::Neutral;
    analysis.summary = Some(format!("About {}", subject));

    ProcessedMessage::new(email, analysis)
}

#[derive(Debug, Clone)]
pub struct GeneratorCall {
    pub system_instruction: String,
    pub user_instruction: String,
    pub temperature: f64,
}

/// Replays canned answers in order and records every request
#[derive(Debug, Clone, Default)]
pub struct FakeTextGenerator {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<GeneratorCall>>>,
}

impl FakeTextGenerator {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TextGenerator for FakeTextGenerator {
    async fn complete(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        temperature: f64,
    ) -> AppResult<String> {
        self.calls.lock().unwrap().push(GeneratorCall {
            system_instruction: system_instruction.to_string(),
            user_instruction: user_instruction.to_string(),
            temperature,
        });

        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(e)) => Err(AppError::Internal(anyhow::anyhow!(e))),
            None => Err(AppError::Internal(anyhow::anyhow!("No canned response left"))),
        }
    }
}

/// In-memory mailbox
#[derive(Debug, Clone, Default)]
pub struct FakeMailProvider {
    messages: Vec<RawMessage>,
    fail_list: bool,
    failing_fetches: HashSet<String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeMailProvider {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn failing_list() -> Self {
        Self {
            fail_list: true,
            ..Default::default()
        }
    }

    pub fn fail_fetch(mut self, message_id: &str) -> Self {
        self.failing_fetches.insert(message_id.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl MailProvider for FakeMailProvider {
    async fn list(&self, query: &str, limit: u32) -> AppResult<Vec<String>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail_list {
            return Err(AppError::Unauthorized("Invalid Credentials".to_string()));
        }

        Ok(self
            .messages
            .iter()
            .take(limit as usize)
            .map(|m| m.id.clone())
            .collect())
    }

    async fn fetch(&self, message_id: &str) -> AppResult<RawMessage> {
        if self.failing_fetches.contains(message_id) {
            return Err(AppError::TooManyRequests);
        }

        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(message_id.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    pub fn with(credential: StoredCredential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> AppResult<Option<StoredCredential>> {
        Ok(self.credential.lock().unwrap().clone())
    }

    fn save(&self, credential: &StoredCredential) -> AppResult<()> {
        *self.credential.lock().unwrap() = Some(credential.clone());
        Ok(())
    }
}
