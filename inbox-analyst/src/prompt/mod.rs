pub(crate) mod analysis;
pub(crate) mod openai;

pub use analysis::{AnalysisOutcome, EmailAnalyzer, ParsedAnalysis};
pub use openai::OpenAiClient;

use crate::error::AppResult;

/// A chat-style text generation backend
pub trait TextGenerator {
    async fn complete(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        temperature: f64,
    ) -> AppResult<String>;
}
