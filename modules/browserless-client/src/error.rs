use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Browserless unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid Browserless endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Page did not load within {0}ms")]
    Timeout(u64),

    #[error("Browserless returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Browserless returned an empty document for {0}")]
    EmptyContent(String),
}
