#![allow(dead_code)]

mod app_config;
mod auth;
mod cli;
mod email;
mod error;
mod model;
mod prompt;
#[cfg(test)]
mod testing;
mod util;

use std::{io::IsTerminal, time::Duration};

use app_config::{AppConfig, GmailConfig};
use auth::{FileCredentialStore, GmailAuthenticator};
use clap::Parser;
use cli::Cli;
use email::{client::GmailClient, processor::EmailProcessor, summary_report::generate_report};
use error::{AppError, AppResult};
use mimalloc::MiMalloc;
use model::processed_email::save_processed_emails;
use prompt::{EmailAnalyzer, OpenAiClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::Layer::default()
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    tracing::debug!("{}", config);

    let http_client = reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let gmail = match connect_gmail(&http_client, &config).await {
        Ok(client) => {
            tracing::info!("Gmail service initialized successfully");
            Some(client)
        }
        Err(AppError::MailUnavailable) => {
            tracing::warn!("Gmail credentials not found. Email features will be limited.");
            None
        }
        Err(e) => {
            tracing::error!("Failed to setup Gmail service: {}", e);
            None
        }
    };

    let generator = OpenAiClient::new(http_client, &config.api, &config.model);
    let processor = EmailProcessor::new(gmail, EmailAnalyzer::new(generator, &config.model));

    let max_messages = cli.max_messages.unwrap_or(config.settings.max_messages);
    let query = cli.query.as_deref().unwrap_or(&config.settings.query);
    let processed = processor.process_emails(max_messages, Some(query)).await;

    println!("{}", generate_report(&processed));

    if cli.no_save {
        return Ok(());
    }

    let output = cli.output.unwrap_or(config.settings.output_path);
    match save_processed_emails(&output, &processed) {
        Ok(()) => tracing::info!(
            "Email processing complete. Results saved to {}",
            output.display()
        ),
        Err(e) => tracing::error!("Failed to save results to {}: {}", output.display(), e),
    }

    Ok(())
}

/// Authorizes against Gmail. `MailUnavailable` means there are neither client
/// secrets nor a usable stored token.
async fn connect_gmail(http_client: &HttpClient, config: &AppConfig) -> AppResult<GmailClient> {
    let settings = &config.gmail;

    let client_secrets = if settings.credentials_path.exists() {
        Some(GmailConfig::from_file(&settings.credentials_path)?)
    } else {
        None
    };

    let authenticator = GmailAuthenticator::new(
        http_client.clone(),
        client_secrets,
        settings.scopes.clone(),
        FileCredentialStore::new(&settings.token_path),
        std::io::stdin().is_terminal(),
    );
    let access_token = authenticator.access_token().await?;

    Ok(GmailClient::new(http_client.clone(), access_token))
}
