// Place name → coordinates via Nominatim, trying progressively looser phrasings.
//
// Calls are strictly sequential with a fixed pause before each one: the public
// Nominatim instance allows one request per second.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use floodwatch_common::{config::MIN_GEOCODER_DELAY, GeocodeMatch};

use crate::traits::PlaceResolver;

static RE_INFRASTRUCTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Bridge|Dam|Barrage|Road|Highway|Circle)\b").unwrap()
});

/// Longest place name sent to the geocoder.
const MAX_PLACE_CHARS: usize = 200;

// --- Lookup seam ---

/// A free-text geocoding search. Returns ranked matches, best first.
#[async_trait]
pub trait GeocodeLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeMatch>>;
}

#[derive(Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl GeocodeLookup for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeMatch>> {
        let results: Vec<NominatimResult> = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .context("Nominatim request failed")?
            .error_for_status()
            .context("Nominatim returned an error status")?
            .json()
            .await
            .context("Failed to parse Nominatim response")?;

        Ok(results.into_iter().filter_map(into_match).collect())
    }
}

fn into_match(result: NominatimResult) -> Option<GeocodeMatch> {
    match (result.lat.parse::<f64>(), result.lon.parse::<f64>()) {
        (Ok(lat), Ok(lng)) => Some(GeocodeMatch {
            lat,
            lng,
            display_name: result.display_name,
        }),
        _ => {
            warn!(lat = %result.lat, lon = %result.lon, "Unparseable Nominatim coordinates");
            None
        }
    }
}

// --- Geocoder ---

pub struct Geocoder {
    lookup: Arc<dyn GeocodeLookup>,
    delay: Duration,
}

impl Geocoder {
    pub fn new(lookup: Arc<dyn GeocodeLookup>) -> Self {
        Self {
            lookup,
            delay: MIN_GEOCODER_DELAY,
        }
    }

    /// Override the pause before each lookup. Tests use `Duration::ZERO`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PlaceResolver for Geocoder {
    async fn resolve(&self, place: &str, district: &str, state: &str) -> Option<GeocodeMatch> {
        let place = place.trim();
        if place.is_empty() || place.chars().count() > MAX_PLACE_CHARS {
            warn!(location = place, "Place name rejected before geocoding");
            return None;
        }

        for variant in query_variants(place, district, state) {
            tokio::time::sleep(self.delay).await;
            match self.lookup.search(&variant).await {
                Ok(matches) => match matches.into_iter().next() {
                    Some(found) => {
                        info!(location = place, query = %variant, address = %found.display_name, "Geocoded");
                        return Some(found);
                    }
                    None => debug!(location = place, query = %variant, "No geocode match"),
                },
                Err(e) => warn!(location = place, query = %variant, error = %e, "Geocode lookup failed"),
            }
        }

        info!(location = place, district, state, "Geocode miss, dropping candidate");
        None
    }
}

/// Query strings to try, most specific first. Identical strings appear once.
pub fn query_variants(place: &str, district: &str, state: &str) -> Vec<String> {
    let place = place.trim();
    let mut variants = vec![
        format!("{place}, {district}, {state}, India"),
        format!("{place}, {state}, India"),
    ];

    let stripped = strip_infrastructure_suffixes(place);
    if !stripped.is_empty() {
        variants.push(format!("{stripped}, {district}, {state}, India"));
    }

    let lower = place.to_lowercase();
    if !lower.contains("village") && !lower.contains("bridge") {
        variants.push(format!("{place} Village, {district}, {state}, India"));
    }

    let mut seen = HashSet::new();
    variants.retain(|v| seen.insert(v.clone()));
    variants
}

/// Remove infrastructure words (Bridge, Dam, Barrage, Road, Highway, Circle) so
/// the underlying village or town name can be found on its own.
pub fn strip_infrastructure_suffixes(place: &str) -> String {
    RE_INFRASTRUCTURE
        .replace_all(place, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
