//! MoltbookClient - `Platform` over the Moltbook HTTPS JSON API.
//!
//! Every response is wrapped as `{ "success": bool, "data"?: .., "error"?: .., "hint"?: .. }`.
//! List endpoints have been seen returning their list both under `data.<key>`
//! and at the top level, so both are accepted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::MoltbookConfig;
use crate::domain::{Comment, CommentId, Post, PostId};
use crate::ports::{CommentSort, FeedSort, Platform, PlatformError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wait used when a 429 carries no hint.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 429 retries before `RateLimited` is surfaced.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

pub struct MoltbookClient {
    api_key: String,
    base_url: String,
    client: Client,
    max_retries: u32,
}

impl MoltbookClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PlatformError::Transport(format!("failed to create http client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn from_config(config: &MoltbookConfig) -> Result<Self, PlatformError> {
        Self::new(&config.api_key, &config.base_url)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// One API call. A 429 pauses this future only, then repeats the call.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, PlatformError> {
        let mut retries = 0;
        loop {
            let mut builder = self
                .client
                .request(method.clone(), self.url(endpoint))
                .bearer_auth(&self.api_key)
                .query(query);
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| PlatformError::Transport(e.to_string()))?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let header_secs = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                let payload: Value = response.json().await.unwrap_or(Value::Null);
                let wait_secs = retry_after_secs(&payload, header_secs);

                if retries >= self.max_retries {
                    return Err(PlatformError::RateLimited {
                        retry_after_secs: wait_secs,
                    });
                }
                retries += 1;
                warn!(%method, endpoint, wait_secs, retries, "rate limited, waiting");
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            let text = response
                .text()
                .await
                .map_err(|e| PlatformError::Transport(e.to_string()))?;

            if !status.is_success() {
                return Err(PlatformError::Http {
                    status: status.as_u16(),
                    message: error_message(&text),
                });
            }

            debug!(%method, endpoint, status = status.as_u16(), "api call ok");
            let value = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).map_err(|e| PlatformError::Decode(e.to_string()))?
            };
            check_envelope(&value)?;
            return Ok(value);
        }
    }
}

#[async_trait]
impl Platform for MoltbookClient {
    async fn create_post(&self, community: &str, title: &str, body: &str) -> Result<PostId, PlatformError> {
        let payload = json!({ "submolt": community, "title": title, "content": body });
        let response = self.request(Method::POST, "posts", &[], Some(&payload)).await?;
        created_id(&response, "post").map(PostId::new)
    }

    async fn get_feed(
        &self,
        sort: FeedSort,
        limit: usize,
        community: Option<&str>,
    ) -> Result<Vec<Post>, PlatformError> {
        let mut query = vec![("sort", sort.as_str().to_string()), ("limit", limit.to_string())];
        if let Some(community) = community {
            query.push(("submolt", community.to_string()));
        }
        let response = self.request(Method::GET, "posts", &query, None).await?;
        list_field(&response, "posts")
    }

    async fn get_personalized_feed(&self, sort: FeedSort, limit: usize) -> Result<Vec<Post>, PlatformError> {
        let query = [("sort", sort.as_str().to_string()), ("limit", limit.to_string())];
        let response = self.request(Method::GET, "feed", &query, None).await?;
        list_field(&response, "posts")
    }

    async fn get_comments(&self, post_id: &PostId, sort: CommentSort) -> Result<Vec<Comment>, PlatformError> {
        let query = [("sort", sort.as_str().to_string())];
        let endpoint = format!("posts/{post_id}/comments");
        let response = self.request(Method::GET, &endpoint, &query, None).await?;
        list_field(&response, "comments")
    }

    async fn add_comment(
        &self,
        post_id: &PostId,
        body: &str,
        parent_id: Option<&CommentId>,
    ) -> Result<CommentId, PlatformError> {
        let mut payload = json!({ "content": body });
        if let Some(parent_id) = parent_id {
            payload["parent_id"] = json!(parent_id.as_str());
        }
        let endpoint = format!("posts/{post_id}/comments");
        let response = self.request(Method::POST, &endpoint, &[], Some(&payload)).await?;
        created_id(&response, "comment").map(CommentId::new)
    }

    async fn upvote_post(&self, post_id: &PostId) -> Result<(), PlatformError> {
        let endpoint = format!("posts/{post_id}/upvote");
        self.request(Method::POST, &endpoint, &[], None).await?;
        Ok(())
    }

    async fn update_profile(&self, description: &str) -> Result<(), PlatformError> {
        let payload = json!({ "description": description });
        self.request(Method::PATCH, "agents/me", &[], Some(&payload)).await?;
        Ok(())
    }
}

/// Body `retry_after_seconds`, then the `Retry-After` header, then the default.
fn retry_after_secs(body: &Value, header_secs: Option<u64>) -> u64 {
    body.get("retry_after_seconds")
        .and_then(Value::as_u64)
        .or(header_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

fn check_envelope(value: &Value) -> Result<(), PlatformError> {
    if value.get("success").and_then(Value::as_bool) != Some(false) {
        return Ok(());
    }
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("request failed");
    Err(match value.get("hint").and_then(Value::as_str) {
        Some(hint) => PlatformError::Api(format!("{error} ({hint})")),
        None => PlatformError::Api(error.to_string()),
    })
}

fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string())
}

fn list_field<T: DeserializeOwned>(response: &Value, key: &str) -> Result<Vec<T>, PlatformError> {
    let list = response
        .get("data")
        .and_then(|data| match data {
            Value::Array(_) => Some(data),
            _ => data.get(key),
        })
        .or_else(|| response.get(key));

    match list {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => serde_json::from_value(list.clone())
            .map_err(|e| PlatformError::Decode(format!("{key}: {e}"))),
    }
}

/// Id of a created resource: `data.<key>.id`, `<key>.id`, `data.id` or `id`.
fn created_id(response: &Value, key: &str) -> Result<String, PlatformError> {
    let data = response.get("data");
    [
        data.and_then(|d| d.get(key)),
        response.get(key),
        data,
        Some(response),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| match v.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
    .ok_or_else(|| PlatformError::Decode(format!("no {key} id in response")))
}
