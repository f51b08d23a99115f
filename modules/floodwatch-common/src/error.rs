use thiserror::Error;

/// A flood query is missing something it cannot run without.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}
