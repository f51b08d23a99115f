use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// Nominatim's usage policy allows at most one request per second.
pub const MIN_GEOCODER_DELAY: Duration = Duration::from_millis(1000);

/// Which headless browser the news scraper drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserConfig {
    /// Local Chromium binary, run with `--dump-dom`.
    Chrome { binary: String },
    /// Remote Browserless instance.
    Browserless {
        base_url: String,
        token: Option<String>,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Web server
    pub host: String,
    pub port: u16,

    // Event extraction (Groq)
    pub groq_api_key: String,
    pub extractor_model: String,
    pub extractor_base_url: String,

    // Relevance gate (search-augmented, Perplexity)
    pub perplexity_api_key: String,
    pub gatekeeper_model: String,
    pub gatekeeper_base_url: String,

    // Scraping
    pub browser: BrowserConfig,

    // Geocoding
    pub nominatim_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_delay: Duration,

    // Pipeline
    pub excluded_location_terms: Vec<String>,
    pub max_events: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset,
    /// except `EXCLUDED_LOCATION_TERMS` where empty means no exclusions.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow!("{key} environment variable is required"))
        };

        let browser = match get("BROWSERLESS_URL") {
            Some(base_url) => BrowserConfig::Browserless {
                base_url,
                token: get("BROWSERLESS_TOKEN"),
            },
            None => BrowserConfig::Chrome {
                binary: get("CHROME_BIN").unwrap_or_else(|| "chromium".to_string()),
            },
        };

        let delay_ms: u64 = get("GEOCODER_DELAY_MS")
            .map(|v| v.parse::<u64>().context("GEOCODER_DELAY_MS must be a number"))
            .transpose()?
            .unwrap_or(1000);

        Ok(Self {
            host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: get("PORT")
                .map(|v| v.parse::<u16>().context("PORT must be a number"))
                .transpose()?
                .unwrap_or(5000),
            groq_api_key: required("GROQ_API_KEY")?,
            extractor_model: get("EXTRACTOR_MODEL")
                .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
            extractor_base_url: get("EXTRACTOR_BASE_URL")
                .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
            perplexity_api_key: required("PERPLEXITY_API_KEY")?,
            gatekeeper_model: get("GATEKEEPER_MODEL").unwrap_or_else(|| "sonar".to_string()),
            gatekeeper_base_url: get("GATEKEEPER_BASE_URL")
                .unwrap_or_else(|| "https://api.perplexity.ai".to_string()),
            browser,
            nominatim_url: get("NOMINATIM_URL")
                .unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string()),
            geocoder_user_agent: get("GEOCODER_USER_AGENT")
                .unwrap_or_else(|| "DisasterResponseHub/2.0".to_string()),
            geocoder_delay: Duration::from_millis(delay_ms).max(MIN_GEOCODER_DELAY),
            // Set but empty disables the denylist
            excluded_location_terms: parse_terms(
                &lookup("EXCLUDED_LOCATION_TERMS").unwrap_or_else(|| "Raichur,Yadgir".to_string()),
            ),
            max_events: get("MAX_EVENTS")
                .map(|v| v.parse::<usize>().context("MAX_EVENTS must be a number"))
                .transpose()?
                .unwrap_or(8),
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.char_indices().nth(5).map_or(val.len(), |(i, _)| i);
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  GROQ_API_KEY: {}", preview(&self.groq_api_key));
        tracing::info!("  PERPLEXITY_API_KEY: {}", preview(&self.perplexity_api_key));
        tracing::info!("  EXTRACTOR_MODEL: {}", self.extractor_model);
        tracing::info!("  GATEKEEPER_MODEL: {}", self.gatekeeper_model);
        match &self.browser {
            BrowserConfig::Chrome { binary } => tracing::info!("  BROWSER: chrome ({binary})"),
            BrowserConfig::Browserless { base_url, .. } => {
                tracing::info!("  BROWSER: browserless ({base_url})")
            }
        }
        tracing::info!(
            "  GEOCODER: {} (delay {}ms)",
            self.nominatim_url,
            self.geocoder_delay.as_millis()
        );
        tracing::info!("  EXCLUDED_LOCATION_TERMS: {:?}", self.excluded_location_terms);
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
