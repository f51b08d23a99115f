pub mod browser;
pub mod error;
pub mod extractor;
pub mod gatekeeper;
pub mod geocoder;
pub mod news;
pub mod pipeline;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use browser::{build_browser, Browser, BrowserSession};
pub use error::{ExtractionError, PipelineError};
pub use extractor::Extractor;
pub use gatekeeper::Gatekeeper;
pub use geocoder::{GeocodeLookup, Geocoder, NominatimClient};
pub use news::{NewsScraper, ScrapedContext, ScraperConfig};
pub use pipeline::{FloodOutcome, FloodPipeline, LocationExclusions, PipelineConfig};
pub use traits::{EventExtractor, FloodGate, NewsSource, PlaceResolver};
