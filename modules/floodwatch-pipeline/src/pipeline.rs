// Flood pipeline: gate → scrape → extract → filter → geocode.
//
// RECEIVED → GATE_CHECK → (REJECTED | SCRAPING → EXTRACTING → GEOCODING → DONE)
//
// Only extraction failures abort a request. A failed or negative gate ends it
// early with a no-flood outcome; a thin scrape falls back to a canned context;
// geocode misses drop single candidates.

use std::sync::Arc;

use tracing::{info, warn};

use floodwatch_common::{FloodQuery, ResolvedEvent};

use crate::error::PipelineError;
use crate::traits::{EventExtractor, FloodGate, NewsSource, PlaceResolver};

pub const NO_FLOOD_MESSAGE: &str =
    "no flood events detected: no confirmed, ongoing flood for this district and date";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Candidates beyond this count are discarded before geocoding.
    pub max_events: usize,
    /// Scraped context shorter than this (in characters) counts as a failed scrape.
    pub min_context_chars: usize,
    pub fallback_context: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_events: 8,
            min_context_chars: 100,
            fallback_context:
                "Search failed. Use internal knowledge for specific river-bank villages.".to_string(),
        }
    }
}

/// Case-insensitive substring denylist applied to candidate names.
#[derive(Debug, Clone, Default)]
pub struct LocationExclusions {
    terms: Vec<String>,
}

impl LocationExclusions {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// The first term contained in `name`, if any.
    pub fn matching_term(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.terms
            .iter()
            .find(|term| name.contains(term.as_str()))
            .map(String::as_str)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.matching_term(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FloodOutcome {
    /// The gate did not confirm a flood. Nothing else ran.
    NoFlood { message: String },
    /// Flood confirmed. May be empty when nothing could be geocoded.
    Events(Vec<ResolvedEvent>),
}

/// Search phrase handed to the news source.
pub fn search_query(query: &FloodQuery) -> String {
    format!(
        "villages submerged in {} district {} flood {} list",
        query.district, query.state, query.date
    )
}

pub struct FloodPipeline {
    gate: Arc<dyn FloodGate>,
    news: Arc<dyn NewsSource>,
    extractor: Arc<dyn EventExtractor>,
    resolver: Arc<dyn PlaceResolver>,
    exclusions: LocationExclusions,
    config: PipelineConfig,
}

impl FloodPipeline {
    pub fn new(
        gate: Arc<dyn FloodGate>,
        news: Arc<dyn NewsSource>,
        extractor: Arc<dyn EventExtractor>,
        resolver: Arc<dyn PlaceResolver>,
    ) -> Self {
        Self {
            gate,
            news,
            extractor,
            resolver,
            exclusions: LocationExclusions::default(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: LocationExclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn run(&self, query: &FloodQuery) -> Result<FloodOutcome, PipelineError> {
        // GATE_CHECK
        let confirmed = match self.gate.is_active_flood(query).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(district = %query.district, error = %e, "Gatekeeper failed, treating as no flood");
                false
            }
        };
        if !confirmed {
            info!(district = %query.district, date = %query.date, "Gate rejected query");
            return Ok(FloodOutcome::NoFlood {
                message: NO_FLOOD_MESSAGE.to_string(),
            });
        }

        // SCRAPING
        let search = search_query(query);
        let scraped = self.news.scrape(&search).await;
        let context = if scraped.char_len() < self.config.min_context_chars {
            warn!(
                query = %search,
                chars = scraped.char_len(),
                "Scrape too thin, using fallback context"
            );
            self.config.fallback_context.clone()
        } else {
            scraped.render()
        };

        // EXTRACTING
        let mut candidates = self.extractor.extract(&context, &query.district).await?;
        if candidates.len() > self.config.max_events {
            info!(
                returned = candidates.len(),
                kept = self.config.max_events,
                "Discarding extra candidates"
            );
            candidates.truncate(self.config.max_events);
        }

        // GEOCODING, one candidate at a time
        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(term) = self.exclusions.matching_term(&candidate.location_name) {
                info!(location = %candidate.location_name, term, "Excluded candidate");
                continue;
            }
            match self
                .resolver
                .resolve(&candidate.location_name, &query.district, &query.state)
                .await
            {
                Some(found) => resolved.push(ResolvedEvent::from_match(candidate, found)),
                None => info!(location = %candidate.location_name, "Dropped unresolved candidate"),
            }
        }

        info!(district = %query.district, events = resolved.len(), "Flood query complete");
        Ok(FloodOutcome::Events(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> FloodQuery {
        FloodQuery::new(Some("Karnataka"), Some("Kalaburagi"), Some("August 2019")).unwrap()
    }

    #[test]
    fn search_query_follows_pattern() {
        assert_eq!(
            search_query(&query()),
            "villages submerged in Kalaburagi district Karnataka flood August 2019 list"
        );
    }

    #[test]
    fn exclusions_match_substrings_case_insensitively() {
        let exclusions = LocationExclusions::new(["Raichur", "Yadgir", " "]);
        assert!(exclusions.is_excluded("Yadgir Bridge"));
        assert!(exclusions.is_excluded("near RAICHUR town"));
        assert_eq!(exclusions.matching_term("Shahapur (Yadgir)"), Some("yadgir"));
        assert!(!exclusions.is_excluded("Kattisangavi"));
    }

    #[test]
    fn empty_exclusions_exclude_nothing() {
        assert!(!LocationExclusions::default().is_excluded("Yadgir"));
    }

    #[test]
    fn no_flood_message_is_explanatory() {
        assert!(NO_FLOOD_MESSAGE.contains("no flood events detected"));
    }
}
