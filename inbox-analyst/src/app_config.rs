use config::{Config, ConfigError};
use serde::Deserialize;
use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{
    email::DEFAULT_QUERY,
    error::{AppError, AppResult},
};

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const GMAIL_CREDENTIALS_VAR: &str = "GMAIL_CREDENTIALS_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "inbox-analyst.toml";
const ENV_PREFIX: &str = "ANALYST";

/// OAuth client secrets as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct GmailConfig {
    pub client_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub auth_provider_x509_cert_url: Option<String>,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<GmailConfig>,
    web: Option<GmailConfig>,
}

impl GmailConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file: ClientSecretFile = Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        file.installed.or(file.web).ok_or_else(|| {
            ConfigError::Message(format!(
                "{} has neither an `installed` nor a `web` client section",
                path.display()
            ))
        })
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("http://localhost")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub id: String,
    pub temperature: f64,
    /// Characters of the body forwarded to the model
    pub body_char_limit: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: "gpt-4o".to_string(),
            temperature: 0.3,
            body_char_limit: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_messages: u32,
    pub query: String,
    pub output_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_messages: 10,
            query: DEFAULT_QUERY.to_string(),
            output_path: PathBuf::from("processed_emails.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GmailSettings {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub scopes: Vec<String>,
}

impl Default for GmailSettings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.readonly".to_string(),
                "https://www.googleapis.com/auth/gmail.modify".to_string(),
                "https://www.googleapis.com/auth/gmail.labels".to_string(),
            ],
        }
    }
}

#[derive(Clone)]
pub struct ApiConfig {
    pub key: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig").field("key", &"<redacted>").finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    model: ModelConfig,
    settings: Settings,
    gmail: GmailSettings,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub model: ModelConfig,
    pub settings: Settings,
    pub gmail: GmailSettings,
}

impl AppConfig {
    /// Reads the process environment and the optional config file
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let api_key = env::var(OPENAI_API_KEY_VAR).ok();
        let credentials_path = env::var(GMAIL_CREDENTIALS_VAR).ok().map(PathBuf::from);
        Self::from_sources(path, api_key, credentials_path)
    }

    pub fn from_sources(
        path: Option<&Path>,
        api_key: Option<String>,
        credentials_path: Option<PathBuf>,
    ) -> AppResult<Self> {
        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(AppError::MissingCredential(OPENAI_API_KEY_VAR))?;

        // An explicitly named file must exist, the default one may not.
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let cfg_file: ConfigFile = Config::builder()
            .add_source(config::File::from(file.as_path()).required(required))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        let ConfigFile {
            model,
            settings,
            mut gmail,
        } = cfg_file;

        if let Some(credentials_path) = credentials_path {
            gmail.credentials_path = credentials_path;
        }

        if settings.max_messages == 0 {
            return Err(ConfigError::Message("settings.max_messages must be at least 1".into()).into());
        }
        if !(0.0..=2.0).contains(&model.temperature) {
            return Err(ConfigError::Message(format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                model.temperature
            ))
            .into());
        }

        Ok(AppConfig {
            api: ApiConfig { key },
            model,
            settings,
            gmail,
        })
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "App Config:\n\nModel Config: {:?}\n\nSettings: {:?}\n\nGmail: {:?}",
            self.model, self.settings, self.gmail,
        )
    }
}
