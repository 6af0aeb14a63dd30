use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use super::credential_store::{CredentialStore, StoredCredential};
use crate::{
    app_config::GmailConfig,
    error::{AppError, AppResult},
    HttpClient,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct GmailApiTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Display)]
pub enum AuthError {
    #[display("Bad response from the token endpoint")]
    BadOauthResponse,
    #[display("Token has been expired or revoked")]
    ExpiredOrRevoked,
    #[display("{_0}")]
    Unexpected(String),
}

impl std::error::Error for AuthError {}

type OauthResult<T> = Result<T, AuthError>;

/// Consent page URL for the installed-app flow
pub fn authorization_url(gmail_config: &GmailConfig, scopes: &[String]) -> AppResult<Url> {
    let mut url = Url::parse(&gmail_config.auth_uri)
        .map_err(|e| anyhow::anyhow!("Invalid auth_uri {}: {}", gmail_config.auth_uri, e))?;

    url.query_pairs_mut().extend_pairs(&[
        ("client_id", gmail_config.client_id.as_str()),
        ("redirect_uri", gmail_config.redirect_uri()),
        ("response_type", "code"),
        ("scope", scopes.join(" ").as_str()),
        ("access_type", "offline"),
        ("prompt", "consent"),
    ]);

    Ok(url)
}

/// Accepts either the bare code or the whole redirect URL pasted back by the user
pub fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned()),
        Err(_) => Some(input.to_string()),
    }
}

pub async fn exchange_code(
    http_client: &HttpClient,
    gmail_config: &GmailConfig,
    code: &str,
) -> OauthResult<GmailApiTokenResponse> {
    post_token_request(
        http_client,
        &gmail_config.token_uri,
        &[
            ("client_id", gmail_config.client_id.as_str()),
            ("client_secret", gmail_config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", gmail_config.redirect_uri()),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

pub async fn exchange_refresh_token(
    http_client: &HttpClient,
    gmail_config: &GmailConfig,
    refresh_token: &str,
) -> OauthResult<GmailApiTokenResponse> {
    post_token_request(
        http_client,
        &gmail_config.token_uri,
        &[
            ("client_id", gmail_config.client_id.as_str()),
            ("client_secret", gmail_config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

async fn post_token_request(
    http_client: &HttpClient,
    token_uri: &str,
    form: &[(&str, &str)],
) -> OauthResult<GmailApiTokenResponse> {
    let resp = http_client
        .post(token_uri)
        .form(form)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Error calling token endpoint: {:?}", e);
            AuthError::BadOauthResponse
        })?;

    let resp = resp.json::<serde_json::Value>().await.map_err(|e| {
        tracing::error!("Unexpected serde error: {:?}", e);
        AuthError::Unexpected(e.to_string())
    })?;

    token_response_from_value(resp)
}

fn token_response_from_value(resp: serde_json::Value) -> OauthResult<GmailApiTokenResponse> {
    if let Some(error) = resp.get("error") {
        let description = resp.get("error_description").and_then(|d| d.as_str());
        return match (error.as_str(), description) {
            (_, Some("Token has been expired or revoked.")) | (Some("invalid_grant"), _) => {
                Err(AuthError::ExpiredOrRevoked)
            }
            (_, Some(desc)) => {
                tracing::error!("Unexpected error from token endpoint: {:?}", desc);
                Err(AuthError::Unexpected(desc.to_string()))
            }
            (_, None) => Err(AuthError::Unexpected(error.to_string())),
        };
    }

    serde_json::from_value::<GmailApiTokenResponse>(resp).map_err(|e| {
        tracing::error!("Could not parse token response: {:?}", e);
        AuthError::BadOauthResponse
    })
}

/// Hands out a usable Gmail access token, refreshing or re-authorizing
/// through the credential store as needed.
pub struct GmailAuthenticator<S> {
    http_client: HttpClient,
    gmail_config: Option<GmailConfig>,
    scopes: Vec<String>,
    store: S,
    interactive: bool,
}

impl<S: CredentialStore> GmailAuthenticator<S> {
    pub fn new(
        http_client: HttpClient,
        gmail_config: Option<GmailConfig>,
        scopes: Vec<String>,
        store: S,
        interactive: bool,
    ) -> Self {
        Self {
            http_client,
            gmail_config,
            scopes,
            store,
            interactive,
        }
    }

    pub async fn access_token(&self) -> AppResult<String> {
        let stored = self.store.load()?;

        if let Some(credential) = &stored {
            if self.store.is_valid(credential) {
                return Ok(credential.access_token.clone());
            }
        }

        let gmail_config = self.gmail_config.as_ref().ok_or(AppError::MailUnavailable)?;

        if let Some(refresh_token) = stored.and_then(|c| c.refresh_token) {
            match exchange_refresh_token(&self.http_client, gmail_config, &refresh_token).await {
                Ok(resp) => {
                    tracing::info!("Refreshed Gmail access token");
                    return self.persist(resp, Some(refresh_token));
                }
                Err(AuthError::ExpiredOrRevoked) => {
                    tracing::info!("Gmail refresh token expired or revoked, re-authorization required");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if !self.interactive {
            return Err(AppError::Unauthorized(
                "No valid Gmail token and no terminal to authorize with".to_string(),
            ));
        }

        let url = authorization_url(gmail_config, &self.scopes)?;
        let code = prompt_for_code(&url).await?;
        let resp = exchange_code(&self.http_client, gmail_config, &code).await?;
        tracing::info!("Authorized Gmail access");

        self.persist(resp, None)
    }

    fn persist(
        &self,
        resp: GmailApiTokenResponse,
        previous_refresh_token: Option<String>,
    ) -> AppResult<String> {
        let credential =
            StoredCredential::from_token_response(resp, previous_refresh_token, &self.scopes)?;
        self.store.save(&credential)?;
        Ok(credential.access_token)
    }
}

async fn prompt_for_code(url: &Url) -> AppResult<String> {
    eprintln!("Open this URL in your browser to grant Gmail access:\n\n{}\n", url);
    eprintln!("Paste the authorization code (or the full redirect URL) here:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;

    extract_code(&line)
        .ok_or_else(|| AppError::Unauthorized("No authorization code entered".to_string()))
}
