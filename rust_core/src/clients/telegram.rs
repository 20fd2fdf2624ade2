use crate::error::DispatchError;
use crate::providers::NotificationChannel;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Used when a 429 arrives without `retry_after`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

impl TelegramClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token,
            method
        )
    }

    /// `getMe`: confirms the token is valid before polling starts
    pub async fn verify(&self) -> Result<BotUser, DispatchError> {
        let resp = self.http.get(self.method_url("getMe")).send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let parsed: Option<ApiResponse<BotUser>> = serde_json::from_str(&body).ok();

        match parsed {
            Some(ApiResponse {
                ok: true,
                result: Some(user),
                ..
            }) if status.is_success() => Ok(user),
            other => Err(classify_failure(
                status,
                other.as_ref().and_then(|r| r.description.clone()),
                other
                    .as_ref()
                    .and_then(|r| r.parameters.as_ref())
                    .and_then(|p| p.retry_after),
                &body,
            )),
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramClient {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DispatchError> {
        let body = SendMessageRequest {
            chat_id: destination,
            text,
            disable_web_page_preview: true,
        };

        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let parsed: Option<ApiResponse<serde_json::Value>> = serde_json::from_str(&text).ok();

        if status.is_success() && parsed.as_ref().map(|r| r.ok).unwrap_or(false) {
            return Ok(());
        }

        Err(classify_failure(
            status,
            parsed.as_ref().and_then(|r| r.description.clone()),
            parsed
                .as_ref()
                .and_then(|r| r.parameters.as_ref())
                .and_then(|p| p.retry_after),
            &text,
        ))
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}

fn classify_failure(
    status: StatusCode,
    description: Option<String>,
    retry_after: Option<u64>,
    raw_body: &str,
) -> DispatchError {
    let detail = description.unwrap_or_else(|| raw_body.chars().take(200).collect());
    if status == StatusCode::TOO_MANY_REQUESTS {
        return DispatchError::RateLimited {
            retry_after: retry_after
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER),
        };
    }
    match status.as_u16() {
        400 | 401 | 403 | 404 => DispatchError::Permanent(format!("Telegram {status}: {detail}")),
        _ => DispatchError::Transient(format!("Telegram {status}: {detail}")),
    }
}
