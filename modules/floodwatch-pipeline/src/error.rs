use thiserror::Error;

/// The event extractor could not produce a list of candidates.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Request(#[source] anyhow::Error),

    #[error("model output is not valid event JSON: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
