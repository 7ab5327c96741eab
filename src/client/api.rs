use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{IntakeError, IntakeResult};
use crate::protocol::{format_number, ApiResponse};

/// Server operations the batch sender relies on.
#[async_trait]
pub trait IntakeApi: Send + Sync {
    /// Server clock in epoch milliseconds.
    async fn server_time(&self) -> IntakeResult<i64>;

    /// Appends one record and returns the line the server wrote.
    async fn add_item(&self, code: &str, qtty: f64, date: Option<i64>) -> IntakeResult<String>;
}

/// `IntakeApi` over the server's HTTP endpoints.
pub struct HttpIntakeApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpIntakeApi {
    pub fn new(base_url: &str, timeout: Duration) -> IntakeResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> IntakeResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, ?query, "intake request");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        decode_response(status.as_u16(), &body)
    }
}

/// Decodes a response body into `ApiResponse`. Failures carry the
/// server's `error` field when the body is structured, else the raw body,
/// else the status line.
pub fn decode_response(status: u16, body: &str) -> IntakeResult<ApiResponse> {
    let parsed = serde_json::from_str::<ApiResponse>(body);
    let success = (200..300).contains(&status);

    match parsed {
        Ok(resp) if success && resp.ok => Ok(resp),
        Ok(resp) => Err(IntakeError::Server {
            status,
            message: resp
                .error
                .unwrap_or_else(|| fallback_message(status, body)),
        }),
        Err(_) if success => Err(IntakeError::Protocol(format!(
            "expected a JSON body, got {:?}",
            truncate(body, 120)
        ))),
        Err(_) => Err(IntakeError::Server {
            status,
            message: fallback_message(status, body),
        }),
    }
}

fn fallback_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed with status {status}")
    } else {
        truncate(trimmed, 200).to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl IntakeApi for HttpIntakeApi {
    async fn server_time(&self) -> IntakeResult<i64> {
        self.get("/getTime", &[])
            .await?
            .server_time
            .ok_or_else(|| IntakeError::Protocol("getTime response without serverTime".into()))
    }

    async fn add_item(&self, code: &str, qtty: f64, date: Option<i64>) -> IntakeResult<String> {
        let mut query = vec![("code", code.trim().to_string()), ("qtty", format_number(qtty))];
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        self.get("/addItem", &query)
            .await?
            .written
            .ok_or_else(|| IntakeError::Protocol("addItem response without written".into()))
    }
}
