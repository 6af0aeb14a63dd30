use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::analysis::AnalysisResult;
use crate::{email::normalized_message::NormalizedMessage, error::AppResult};

/// A message together with its analysis, the unit that gets reported on and
/// saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMessage {
    #[serde(flatten)]
    pub email: NormalizedMessage,
    pub analysis: AnalysisResult,
}

impl ProcessedMessage {
    pub fn new(email: NormalizedMessage, analysis: AnalysisResult) -> Self {
        debug_assert_eq!(email.id, analysis.email_id);
        Self { email, analysis }
    }
}

/// Overwrites `path` with the whole run as a pretty-printed JSON array
pub fn save_processed_emails(path: &Path, emails: &[ProcessedMessage]) -> AppResult<()> {
    let json = serde_json::to_string_pretty(emails)?;
    fs::write(path, json)?;
    Ok(())
}
