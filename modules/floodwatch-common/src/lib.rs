pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, BrowserConfig};
pub use error::ValidationError;
pub use types::*;
