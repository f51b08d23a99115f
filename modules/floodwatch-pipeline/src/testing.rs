// Test doubles for the flood pipeline.
//
// One mock per trait boundary, each counting its calls:
// - MockGate (FloodGate): fixed verdict or error
// - MockNewsSource (NewsSource): fixed context, records queries
// - MockExtractor (EventExtractor): fixed candidates or a malformed-output error
// - MockResolver (PlaceResolver): name → match map
//
// Plus lower-level doubles for the concrete stages:
// - MockBrowser (Browser): search HTML + URL → page HTML, counts closes
// - MockGeocodeLookup (GeocodeLookup): query → matches, records queries
// - ScriptedAgent (ChatAgent): fixed reply or error, records the last request

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_client::{ChatAgent, ChatOptions, Message};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use floodwatch_common::{CandidateEvent, FloodQuery, GeocodeMatch, Severity};

use crate::browser::{Browser, BrowserSession};
use crate::error::ExtractionError;
use crate::geocoder::GeocodeLookup;
use crate::news::ScrapedContext;
use crate::traits::{EventExtractor, FloodGate, NewsSource, PlaceResolver};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Karnataka / Kalaburagi / August 2019, the query used throughout the tests.
pub fn kalaburagi_query() -> FloodQuery {
    FloodQuery {
        state: "Karnataka".to_string(),
        district: "Kalaburagi".to_string(),
        date: "August 2019".to_string(),
    }
}

pub fn candidate(name: &str) -> CandidateEvent {
    CandidateEvent::new(name, format!("{name} submerged by Bhima floodwaters"), Severity::High)
}

pub fn geocoded(lat: f64, lng: f64, display_name: &str) -> GeocodeMatch {
    GeocodeMatch {
        lat,
        lng,
        display_name: display_name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockGate
// ---------------------------------------------------------------------------

pub struct MockGate {
    verdict: std::result::Result<bool, String>,
    calls: AtomicUsize,
}

impl MockGate {
    pub fn confirming() -> Self {
        Self::with(Ok(true))
    }

    pub fn rejecting() -> Self {
        Self::with(Ok(false))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Err(message.to_string()))
    }

    fn with(verdict: std::result::Result<bool, String>) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FloodGate for MockGate {
    async fn is_active_flood(&self, _query: &FloodQuery) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone().map_err(|e| anyhow!(e))
    }
}

// ---------------------------------------------------------------------------
// MockNewsSource
// ---------------------------------------------------------------------------

pub struct MockNewsSource {
    context: ScrapedContext,
    queries: Mutex<Vec<String>>,
}

impl MockNewsSource {
    pub fn new(text: &str) -> Self {
        Self {
            context: ScrapedContext::from_text(text),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            context: ScrapedContext::default(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    async fn scrape(&self, query: &str) -> ScrapedContext {
        self.queries.lock().unwrap().push(query.to_string());
        self.context.clone()
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

pub struct MockExtractor {
    events: Option<Vec<CandidateEvent>>,
    contexts: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn returning(events: Vec<CandidateEvent>) -> Self {
        Self {
            events: Some(events),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as if the model returned unparseable output.
    pub fn malformed() -> Self {
        Self {
            events: None,
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    /// Context text received by each call.
    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventExtractor for MockExtractor {
    async fn extract(
        &self,
        context: &str,
        _district: &str,
    ) -> std::result::Result<Vec<CandidateEvent>, ExtractionError> {
        self.contexts.lock().unwrap().push(context.to_string());
        self.events
            .clone()
            .ok_or_else(|| ExtractionError::Malformed("not json".to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockResolver
// ---------------------------------------------------------------------------

/// Returns `None` for unregistered place names.
#[derive(Default)]
pub struct MockResolver {
    places: HashMap<String, GeocodeMatch>,
    resolved: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_place(mut self, place: &str, found: GeocodeMatch) -> Self {
        self.places.insert(place.to_string(), found);
        self
    }

    pub fn calls(&self) -> usize {
        self.resolved.lock().unwrap().len()
    }

    /// Place names passed to `resolve`, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceResolver for MockResolver {
    async fn resolve(&self, place: &str, _district: &str, _state: &str) -> Option<GeocodeMatch> {
        self.resolved.lock().unwrap().push(place.to_string());
        self.places.get(place).cloned()
    }
}

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

/// Serves `search_html` for any URL on the search host and registered pages
/// by exact URL. Everything else fails like a navigation error.
#[derive(Default)]
pub struct MockBrowser {
    search_html: Option<String>,
    pages: HashMap<String, String>,
    launch_fails: bool,
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(mut self, html: &str) -> Self {
        self.search_html = Some(html.to_string());
        self
    }

    pub fn on_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.launch_fails = true;
        self
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Every URL navigated to, search page included.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        if self.launch_fails {
            bail!("browser failed to start");
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            search_html: self.search_html.clone(),
            pages: self.pages.clone(),
            closes: self.closes.clone(),
            opened: self.opened.clone(),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockSession {
    search_html: Option<String>,
    pages: HashMap<String, String>,
    closes: Arc<AtomicUsize>,
    opened: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn open(&mut self, url: &str, _timeout: Duration) -> Result<String> {
        if self.closed {
            bail!("session closed");
        }
        self.opened.lock().unwrap().push(url.to_string());
        if url.starts_with("https://www.google.com/search") {
            return self
                .search_html
                .clone()
                .ok_or_else(|| anyhow!("search blocked"));
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("navigation timeout: {url}"))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockGeocodeLookup
// ---------------------------------------------------------------------------

/// Exact query → matches. Unregistered queries return no matches; queries
/// marked failing return an error.
#[derive(Default)]
pub struct MockGeocodeLookup {
    results: HashMap<String, Vec<GeocodeMatch>>,
    failing: HashSet<String>,
    queries: Mutex<Vec<String>>,
}

impl MockGeocodeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, found: GeocodeMatch) -> Self {
        self.results.insert(query.to_string(), vec![found]);
        self
    }

    pub fn failing_query(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeocodeLookup for MockGeocodeLookup {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeMatch>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing.contains(query) {
            bail!("HTTP 503");
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// ScriptedAgent
// ---------------------------------------------------------------------------

pub struct ScriptedAgent {
    reply: std::result::Result<String, String>,
    last: Mutex<Option<(Vec<Message>, ChatOptions)>>,
}

impl ScriptedAgent {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            last: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            last: Mutex::new(None),
        }
    }

    pub fn last_messages(&self) -> Option<Vec<Message>> {
        self.last.lock().unwrap().as_ref().map(|(m, _)| m.clone())
    }

    pub fn last_options(&self) -> Option<ChatOptions> {
        self.last.lock().unwrap().as_ref().map(|(_, o)| o.clone())
    }
}

#[async_trait]
impl ChatAgent for ScriptedAgent {
    async fn chat(&self, messages: Vec<Message>, options: ChatOptions) -> Result<String> {
        *self.last.lock().unwrap() = Some((messages, options));
        self.reply.clone().map_err(|e| anyhow!(e))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
