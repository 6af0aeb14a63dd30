use super::{client::MailProvider, normalized_message::NormalizedMessage, DEFAULT_QUERY};
use crate::{
    error::AppResult,
    model::processed_email::ProcessedMessage,
    prompt::{EmailAnalyzer, TextGenerator},
    util::truncate_chars,
};

/// Runs one batch: list, fetch and normalize, then analyze each message in
/// order.
pub struct EmailProcessor<M, G> {
    mail: Option<M>,
    analyzer: EmailAnalyzer<G>,
}

impl<M: MailProvider, G: TextGenerator> EmailProcessor<M, G> {
    /// `mail` is `None` when no mailbox could be connected
    pub fn new(mail: Option<M>, analyzer: EmailAnalyzer<G>) -> Self {
        Self { mail, analyzer }
    }

    /// All or nothing: any list or fetch failure yields an empty batch
    pub async fn get_recent_emails(&self, max_results: u32, query: &str) -> Vec<NormalizedMessage> {
        let Some(mail) = &self.mail else {
            tracing::error!("Gmail service not available");
            return Vec::new();
        };

        match fetch_normalized(mail, max_results, query).await {
            Ok(emails) => {
                tracing::info!("Retrieved {} emails", emails.len());
                emails
            }
            Err(e) => {
                tracing::error!("Error retrieving emails: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn process_emails(
        &self,
        max_emails: u32,
        query: Option<&str>,
    ) -> Vec<ProcessedMessage> {
        tracing::info!("Processing up to {} emails...", max_emails);

        if max_emails == 0 {
            tracing::info!("No emails found to process");
            return Vec::new();
        }

        let emails = self
            .get_recent_emails(max_emails, query.unwrap_or(DEFAULT_QUERY))
            .await;

        if emails.is_empty() {
            tracing::info!("No emails found to process");
            return Vec::new();
        }

        let mut processed = Vec::with_capacity(emails.len());
        for email in emails {
            tracing::info!("Analyzing email: {}...", truncate_chars(&email.subject, 50));
            let analysis = self.analyzer.analyze(&email).await;
            processed.push(ProcessedMessage::new(email, analysis));
        }

        tracing::info!("Processed {} emails successfully", processed.len());
        processed
    }
}

async fn fetch_normalized<M: MailProvider>(
    mail: &M,
    max_results: u32,
    query: &str,
) -> AppResult<Vec<NormalizedMessage>> {
    let ids = mail.list(query, max_results).await?;

    let mut emails = Vec::with_capacity(ids.len());
    for id in ids {
        let raw = mail.fetch(&id).await?;
        emails.push(NormalizedMessage::from_raw_message(&raw));
    }

    Ok(emails)
}
