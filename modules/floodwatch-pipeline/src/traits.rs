// Trait seams for the flood pipeline stages.
//
// FloodPipeline only sees these four traits, so each stage can be swapped for
// a mock (see `testing`) without network, browser, or API keys.

use anyhow::Result;
use async_trait::async_trait;

use floodwatch_common::{CandidateEvent, FloodQuery, GeocodeMatch};

use crate::error::ExtractionError;
use crate::news::ScrapedContext;

// ---------------------------------------------------------------------------
// FloodGate: is there an actual ongoing flood?
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FloodGate: Send + Sync {
    /// `Ok(true)` only for a confirmed, ongoing flood in the query's district.
    /// Errors are treated as a negative verdict by the caller.
    async fn is_active_flood(&self, query: &FloodQuery) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// NewsSource: search + fetch + readable text
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Never fails: an unusable search yields an empty context.
    async fn scrape(&self, query: &str) -> ScrapedContext;
}

// ---------------------------------------------------------------------------
// EventExtractor: text → candidate locations
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EventExtractor: Send + Sync {
    async fn extract(
        &self,
        context: &str,
        district: &str,
    ) -> std::result::Result<Vec<CandidateEvent>, ExtractionError>;
}

// ---------------------------------------------------------------------------
// PlaceResolver: place name → coordinates
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PlaceResolver: Send + Sync {
    /// `None` means "drop this candidate"; it is not an error.
    async fn resolve(&self, place: &str, district: &str, state: &str) -> Option<GeocodeMatch>;
}
