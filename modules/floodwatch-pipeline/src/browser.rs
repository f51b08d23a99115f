// Headless browser sessions for the news scraper.
//
// A session is acquired per scrape and must be closed by the caller on every
// path. Two backends: a local Chromium (`--dump-dom`, one process per page,
// shared temporary profile for the session) and a remote Browserless instance.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use browserless_client::BrowserlessClient;
use floodwatch_common::BrowserConfig;

/// Max concurrent Chromium sessions. Each page spawns a full browser
/// (~100MB+ RSS, several child processes).
const MAX_CONCURRENT_CHROME: usize = 2;

/// Desktop Chrome user agent; the default headless UA is blocked by most news sites.
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and return the rendered HTML, giving up after `timeout`.
    async fn open(&mut self, url: &str, timeout: Duration) -> Result<String>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
    fn name(&self) -> &str;
}

/// Build the browser backend selected by configuration.
pub fn build_browser(config: &BrowserConfig) -> Arc<dyn Browser> {
    match config {
        BrowserConfig::Chrome { binary } => Arc::new(ChromeBrowser::new(binary)),
        BrowserConfig::Browserless { base_url, token } => {
            Arc::new(BrowserlessBrowser::new(base_url, token.as_deref()))
        }
    }
}

fn ensure_http(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).context("Invalid URL")?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        bail!("Only http/https URLs are allowed, got: {}", parsed.scheme());
    }
    Ok(())
}

// --- Chrome ---

pub struct ChromeBrowser {
    binary: String,
    semaphore: Arc<Semaphore>,
}

impl ChromeBrowser {
    pub fn new(binary: &str) -> Self {
        info!(binary, max_concurrent = MAX_CONCURRENT_CHROME, "Using ChromeBrowser");
        Self {
            binary: binary.to_string(),
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_CHROME)),
        }
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| anyhow::anyhow!("Chrome semaphore closed"))?;
        let profile = tempfile::tempdir().context("Failed to create temp profile dir")?;
        debug!(profile = %profile.path().display(), "Chrome session started");

        Ok(Box::new(ChromeSession {
            binary: self.binary.clone(),
            profile: Some(profile),
            permit: Some(permit),
        }))
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

struct ChromeSession {
    binary: String,
    profile: Option<TempDir>,
    permit: Option<OwnedSemaphorePermit>,
}

impl ChromeSession {
    fn args(profile: &TempDir, url: &str) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--lang=en-US".to_string(),
            "--window-size=1366,768".to_string(),
            format!("--user-agent={DESKTOP_USER_AGENT}"),
            format!("--user-data-dir={}", profile.path().display()),
            "--dump-dom".to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn open(&mut self, url: &str, timeout: Duration) -> Result<String> {
        ensure_http(url)?;
        let Some(profile) = self.profile.as_ref() else {
            bail!("Chrome session already closed");
        };

        let mut command = tokio::process::Command::new(&self.binary);
        command.args(Self::args(profile, url)).kill_on_drop(true);

        match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!("Chrome exited with {} for {url}: {}", output.status, stderr.trim())
            }
            Ok(Err(e)) => Err(e).with_context(|| format!("Failed to run Chrome for {url}")),
            Err(_) => bail!("Chrome timed out after {}s for {url}", timeout.as_secs()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.permit.take();
        if let Some(profile) = self.profile.take() {
            let path = profile.path().display().to_string();
            profile
                .close()
                .with_context(|| format!("Failed to remove Chrome profile {path}"))?;
            debug!(profile = %path, "Chrome session closed");
        }
        Ok(())
    }
}

// --- Browserless ---

pub struct BrowserlessBrowser {
    client: Arc<BrowserlessClient>,
}

impl BrowserlessBrowser {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        info!(base_url, "Using BrowserlessBrowser");
        Self {
            client: Arc::new(BrowserlessClient::new(base_url, token)),
        }
    }
}

#[async_trait]
impl Browser for BrowserlessBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(BrowserlessSession {
            client: Some(self.client.clone()),
        }))
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

struct BrowserlessSession {
    client: Option<Arc<BrowserlessClient>>,
}

#[async_trait]
impl BrowserSession for BrowserlessSession {
    async fn open(&mut self, url: &str, timeout: Duration) -> Result<String> {
        ensure_http(url)?;
        let Some(client) = self.client.as_ref() else {
            bail!("Browserless session already closed");
        };
        client
            .content(url, timeout)
            .await
            .with_context(|| format!("Browserless content request failed for {url}"))
    }

    async fn close(&mut self) -> Result<()> {
        self.client.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        assert!(ensure_http("https://example.com/a").is_ok());
        assert!(ensure_http("file:///etc/passwd").is_err());
        assert!(ensure_http("not a url").is_err());
    }

    #[test]
    fn chrome_args_disable_automation_flag_and_end_with_url() {
        let profile = tempfile::tempdir().unwrap();
        let args = ChromeSession::args(&profile, "https://news.example.com/a");
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
        assert_eq!(args.last().map(String::as_str), Some("https://news.example.com/a"));
    }

    #[tokio::test]
    async fn chrome_session_close_removes_profile_and_is_idempotent() {
        let browser = ChromeBrowser::new("chromium");
        let mut session = browser.launch().await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        let err = session
            .open("https://example.com", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn closed_browserless_session_refuses_to_navigate() {
        let browser = BrowserlessBrowser::new("http://localhost:3000", None);
        let mut session = browser.launch().await.unwrap();
        session.close().await.unwrap();
        assert!(session
            .open("https://example.com", Duration::from_secs(1))
            .await
            .is_err());
    }
}
