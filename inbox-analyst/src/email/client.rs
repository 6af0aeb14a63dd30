use std::future::Future;

use google_gmail1::api::ListMessagesResponse;

use super::raw_message::RawMessage;
use crate::{
    error::{AppError, AppResult},
    HttpClient,
};

/// The mailbox as seen by the processor
pub trait MailProvider {
    /// Ids of at most `limit` messages matching `query`, newest first
    async fn list(&self, query: &str, limit: u32) -> AppResult<Vec<String>>;

    async fn fetch(&self, message_id: &str) -> AppResult<RawMessage>;
}

/// Gmail API error response structure
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GmailApiError {
    pub error: GmailApiErrorDetail,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GmailApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default)]
/// Filter and paging options for message list
pub struct MessageListOptions {
    /// Gmail search query (e.g., "is:unread", "from:example@gmail.com")
    pub query: Option<String>,
    pub page_token: Option<String>,
    pub max_results: Option<u32>,
}

macro_rules! gmail_url {
    ($($params:expr),*) => {
        {
            const GMAIL_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
            let list_params: Vec<&str> = vec![$($params),*];
            let path = list_params.join("/");
            format!("{}/{}", GMAIL_ENDPOINT, path)
        }
    };
}

pub const MAX_MESSAGES_PER_PAGE_DEFAULT: u32 = 500;

#[derive(Debug, Clone)]
pub struct GmailClient {
    http_client: HttpClient,
    access_token: String,
}

impl GmailClient {
    pub fn new(http_client: HttpClient, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
        }
    }

    pub async fn get_message_list(
        &self,
        options: MessageListOptions,
    ) -> AppResult<ListMessagesResponse> {
        let max_results = options
            .max_results
            .unwrap_or(MAX_MESSAGES_PER_PAGE_DEFAULT)
            .min(MAX_MESSAGES_PER_PAGE_DEFAULT);

        let mut query = vec![("maxResults".to_string(), max_results.to_string())];
        if let Some(q) = options.query {
            query.push(("q".to_string(), q));
        }
        if let Some(token) = options.page_token {
            query.push(("pageToken".to_string(), token));
        }

        let resp = self
            .http_client
            .get(gmail_url!("messages"))
            .query(&query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let data = check_response(resp)
            .await?
            .json::<ListMessagesResponse>()
            .await?;

        Ok(data)
    }

    pub async fn get_message_by_id(&self, message_id: &str) -> AppResult<RawMessage> {
        let resp = self
            .http_client
            .get(gmail_url!("messages", message_id))
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .send()
            .await?;

        let message = check_response(resp).await?.json::<RawMessage>().await?;

        Ok(message)
    }
}

impl MailProvider for GmailClient {
    async fn list(&self, query: &str, limit: u32) -> AppResult<Vec<String>> {
        collect_message_ids(limit, |page_token, max_results| {
            self.get_message_list(MessageListOptions {
                query: Some(query.to_string()),
                page_token,
                max_results: Some(max_results),
            })
        })
        .await
    }

    async fn fetch(&self, message_id: &str) -> AppResult<RawMessage> {
        self.get_message_by_id(message_id).await
    }
}

/// Pages through a message list until `limit` ids are collected, the last
/// page is reached, or a page comes back empty. `fetch_page` is called with
/// the page token and the number of ids still wanted.
async fn collect_message_ids<F, Fut>(limit: u32, mut fetch_page: F) -> AppResult<Vec<String>>
where
    F: FnMut(Option<String>, u32) -> Fut,
    Fut: Future<Output = AppResult<ListMessagesResponse>>,
{
    let mut ids = Vec::new();
    let mut page_token = None;

    while (ids.len() as u32) < limit {
        let resp = fetch_page(page_token, limit - ids.len() as u32).await?;

        page_token = resp.next_page_token.clone();
        let page = message_ids(resp);
        if page.is_empty() {
            break;
        }
        ids.extend(page);

        if page_token.is_none() {
            break;
        }
    }

    ids.truncate(limit as usize);
    Ok(ids)
}

fn message_ids(resp: ListMessagesResponse) -> Vec<String> {
    resp.messages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|m| m.id)
        .collect()
}

/// Turn a non-success Gmail response into an `AppError`
async fn check_response(resp: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GmailApiError>(&body) {
        Ok(err) => err.error.message,
        Err(_) => body,
    };
    tracing::error!("Gmail API request failed with {}: {}", status, message);

    Err(AppError::from_status(status, message))
}
