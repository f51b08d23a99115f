pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use url::Url;

/// Browserless resource types that never contribute readable text.
const REJECTED_RESOURCES: &[&str] = &["image", "media", "font", "stylesheet"];

/// Extra headroom on the HTTP call beyond the in-browser navigation timeout.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

const MAX_ERROR_CHARS: usize = 300;

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    stealth: bool,
}

/// Body of a `/content` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentBody<'a> {
    url: &'a str,
    goto_options: GotoOptions,
    reject_resource_types: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    wait_until: &'static str,
    timeout: u64,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            stealth: true,
        }
    }

    /// Disable the stealth launch flag (some self-hosted images reject it).
    pub fn without_stealth(mut self) -> Self {
        self.stealth = false;
        self
    }

    fn endpoint(&self) -> Result<Url> {
        let raw = format!("{}/content", self.base_url);
        let mut endpoint =
            Url::parse(&raw).map_err(|e| BrowserlessError::InvalidEndpoint(format!("{raw}: {e}")))?;
        if self.token.is_some() || self.stealth {
            let mut query = endpoint.query_pairs_mut();
            if let Some(ref token) = self.token {
                query.append_pair("token", token);
            }
            if self.stealth {
                query.append_pair("stealth", "true");
            }
        }
        Ok(endpoint)
    }

    /// Fetch rendered HTML for a URL, waiting for `DOMContentLoaded` at most `timeout`.
    pub async fn content(&self, url: &str, timeout: Duration) -> Result<String> {
        let timeout_ms = timeout.as_millis() as u64;
        let body = ContentBody {
            url,
            goto_options: GotoOptions {
                wait_until: "domcontentloaded",
                timeout: timeout_ms,
            },
            reject_resource_types: REJECTED_RESOURCES,
        };

        debug!(url, timeout_ms, "Browserless content request");

        let resp = self
            .client
            .post(self.endpoint()?)
            .header("Content-Type", "application/json")
            .timeout(timeout + HTTP_TIMEOUT_SLACK)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserlessError::Timeout(timeout_ms)
                } else {
                    BrowserlessError::from(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message: error_preview(&body),
            });
        }

        let html = resp.text().await?;
        if html.trim().is_empty() {
            return Err(BrowserlessError::EmptyContent(url.to_string()));
        }
        Ok(html)
    }
}

/// Error bodies can be whole HTML pages; keep the first line, bounded.
fn error_preview(body: &str) -> String {
    let line = body.lines().next().unwrap_or_default().trim();
    line.chars().take(MAX_ERROR_CHARS).collect()
}
