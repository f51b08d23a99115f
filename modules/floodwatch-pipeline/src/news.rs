// News scraping: search results page → top links → readable paragraph text.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{Browser, BrowserSession};
use crate::traits::NewsSource;

/// Elements whose text is never article content.
const BOILERPLATE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript"];

// --- ScrapedContext ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub url: String,
    pub text: String,
}

/// Text gathered for one request, tagged per source URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedContext {
    sources: Vec<SourceText>,
}

impl ScrapedContext {
    /// A context holding a single untagged blob. Used by test doubles.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            sources: vec![SourceText {
                url: String::new(),
                text: text.into(),
            }],
        }
    }

    /// Add a source, keeping at most `max_chars` characters of its text.
    pub fn push(&mut self, url: &str, text: &str, max_chars: usize) {
        self.sources.push(SourceText {
            url: url.to_string(),
            text: text.chars().take(max_chars).collect(),
        });
    }

    pub fn sources(&self) -> &[SourceText] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.iter().all(|s| s.text.trim().is_empty())
    }

    /// Concatenated text in the form the extractor prompt expects.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for source in &self.sources {
            if source.url.is_empty() {
                out.push_str(&source.text);
            } else {
                out.push_str(&format!("\nSOURCE ({}):\n{}\n", source.url, source.text));
            }
        }
        out
    }

    /// Length of the rendered text, in characters, ignoring surrounding whitespace.
    pub fn char_len(&self) -> usize {
        self.render().trim().chars().count()
    }
}

// --- Scraper ---

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub search_url: String,
    /// Result links on this domain (or its subdomains) are skipped.
    pub excluded_domain: String,
    pub max_links: usize,
    pub search_timeout: Duration,
    pub page_timeout: Duration,
    /// Paragraphs must be strictly longer than this many characters.
    pub min_paragraph_chars: usize,
    pub max_chars_per_source: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.google.com/search".to_string(),
            excluded_domain: "google.com".to_string(),
            max_links: 3,
            search_timeout: Duration::from_secs(30),
            page_timeout: Duration::from_secs(15),
            min_paragraph_chars: 60,
            max_chars_per_source: 2000,
        }
    }
}

pub struct NewsScraper {
    browser: Arc<dyn Browser>,
    config: ScraperConfig,
}

impl NewsScraper {
    pub fn new(browser: Arc<dyn Browser>) -> Self {
        Self {
            browser,
            config: ScraperConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// News-vertical search URL for `query`.
    pub fn search_url(&self, query: &str) -> Option<Url> {
        Url::parse_with_params(&self.config.search_url, &[("q", query), ("tbm", "nws")]).ok()
    }

    async fn collect(&self, session: &mut dyn BrowserSession, query: &str) -> ScrapedContext {
        let mut context = ScrapedContext::default();

        let Some(search_url) = self.search_url(query) else {
            warn!(search_url = %self.config.search_url, "Invalid search URL");
            return context;
        };

        let results_html = match session
            .open(search_url.as_str(), self.config.search_timeout)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                warn!(query, error = %e, "News search failed");
                return context;
            }
        };

        let links = extract_result_links(
            &results_html,
            &self.config.search_url,
            &self.config.excluded_domain,
            self.config.max_links,
        );
        info!(query, links = links.len(), "News search results");

        for link in links {
            match session.open(&link, self.config.page_timeout).await {
                Ok(html) => {
                    let text = readable_paragraphs(&html, self.config.min_paragraph_chars);
                    if text.is_empty() {
                        debug!(url = %link, "No readable paragraphs");
                        continue;
                    }
                    context.push(&link, &text, self.config.max_chars_per_source);
                }
                Err(e) => warn!(url = %link, error = %e, "Skipping source"),
            }
        }

        context
    }
}

#[async_trait]
impl NewsSource for NewsScraper {
    async fn scrape(&self, query: &str) -> ScrapedContext {
        let mut session = match self.browser.launch().await {
            Ok(session) => session,
            Err(e) => {
                warn!(browser = self.browser.name(), error = %e, "Failed to launch browser");
                return ScrapedContext::default();
            }
        };

        let context = self.collect(session.as_mut(), query).await;

        if let Err(e) = session.close().await {
            warn!(browser = self.browser.name(), error = %e, "Failed to close browser session");
        }

        info!(
            query,
            sources = context.sources().len(),
            chars = context.char_len(),
            "Scrape complete"
        );
        context
    }
}

// --- HTML helpers ---

/// Outbound result links from a search results page, in document order.
///
/// Relative `/url?q=<target>` redirects are unwrapped, links to
/// `excluded_domain` are dropped, duplicates are removed, at most `cap` returned.
pub fn extract_result_links(
    html: &str,
    search_url: &str,
    excluded_domain: &str,
    cap: usize,
) -> Vec<String> {
    let Ok(base) = Url::parse(search_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").unwrap();

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchors) {
        if links.len() >= cap {
            break;
        }
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        let Some(target) = result_target(&base, href) else {
            continue;
        };
        if target.scheme() != "http" && target.scheme() != "https" {
            continue;
        }
        if on_domain(&target, excluded_domain) {
            continue;
        }
        let target = target.to_string();
        if seen.insert(target.clone()) {
            links.push(target);
        }
    }

    links
}

fn result_target(base: &Url, href: &str) -> Option<Url> {
    if href.starts_with("/url?") {
        let redirect = base.join(href).ok()?;
        let target = redirect
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        return Url::parse(&target).ok();
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Url::parse(href).ok();
    }
    None
}

fn on_domain(url: &Url, domain: &str) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        }
        None => false,
    }
}

/// Paragraph text outside boilerplate containers, one paragraph per line.
pub fn readable_paragraphs(html: &str, min_chars: usize) -> String {
    let document = Html::parse_document(html);
    let paragraphs = Selector::parse("p").unwrap();

    document
        .select(&paragraphs)
        .filter(|p| !inside_boilerplate(p))
        .map(|p| collapse_whitespace(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| text.chars().count() > min_chars)
        .collect::<Vec<_>>()
        .join("\n")
}

fn inside_boilerplate(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BOILERPLATE_TAGS.contains(&ancestor.value().name()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = "https://www.google.com/search";

    #[test]
    fn links_skip_search_engine_and_unwrap_redirects() {
        let html = r#"
            <a href="https://www.google.com/preferences">Settings</a>
            <a href="/url?q=https://www.thehindu.com/news/flood-kalaburagi&sa=U">Hindu</a>
            <a href="https://news.google.com/articles/abc">Google News</a>
            <a href="https://www.deccanherald.com/state/bhima-floods">DH</a>
            <a href="/search?q=next">Next</a>
        "#;
        let links = extract_result_links(html, SEARCH, "google.com", 5);
        assert_eq!(
            links,
            vec![
                "https://www.thehindu.com/news/flood-kalaburagi",
                "https://www.deccanherald.com/state/bhima-floods",
            ]
        );
    }

    #[test]
    fn links_are_deduplicated_and_capped() {
        let html = r#"
            <a href="https://a.example.com/1">1</a>
            <a href="https://a.example.com/1">1 again</a>
            <a href="https://b.example.com/2">2</a>
            <a href="https://c.example.com/3">3</a>
            <a href="https://d.example.com/4">4</a>
        "#;
        let links = extract_result_links(html, SEARCH, "google.com", 3);
        assert_eq!(
            links,
            vec![
                "https://a.example.com/1",
                "https://b.example.com/2",
                "https://c.example.com/3",
            ]
        );
    }

    #[test]
    fn domain_match_does_not_catch_lookalikes() {
        let html = r#"<a href="https://notgoogle.com/story">x</a>"#;
        assert_eq!(extract_result_links(html, SEARCH, "google.com", 3).len(), 1);
    }

    #[test]
    fn paragraphs_drop_short_and_boilerplate_text() {
        let long = "Several villages along the Bhima river were submerged after heavy discharge from the Sonna barrage.";
        let html = format!(
            r#"<html><body>
                <header><p>{long} (header)</p></header>
                <nav><p>{long} (nav)</p></nav>
                <article>
                    <p>{long}</p>
                    <p>Photo: PTI</p>
                    <p>  Rescue   teams evacuated
                       families from Kattisangavi and nearby hamlets on Tuesday night.</p>
                </article>
                <footer><p>{long} (footer)</p></footer>
            </body></html>"#
        );
        let text = readable_paragraphs(&html, 60);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], long);
        assert_eq!(
            lines[1],
            "Rescue teams evacuated families from Kattisangavi and nearby hamlets on Tuesday night."
        );
    }

    #[test]
    fn context_truncates_per_source_and_labels_urls() {
        let mut context = ScrapedContext::default();
        context.push("https://a.example.com", &"x".repeat(2500), 2000);
        context.push("https://b.example.com", "short text", 2000);

        assert_eq!(context.sources()[0].text.chars().count(), 2000);
        let rendered = context.render();
        assert!(rendered.contains("SOURCE (https://a.example.com):\n"));
        assert!(rendered.contains("SOURCE (https://b.example.com):\nshort text\n"));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let mut context = ScrapedContext::default();
        context.push("https://kn.example.com", &"ಪ್ರವಾಹ".repeat(10), 5);
        assert_eq!(context.sources()[0].text.chars().count(), 5);
    }

    #[test]
    fn empty_context_has_zero_length() {
        let context = ScrapedContext::default();
        assert!(context.is_empty());
        assert_eq!(context.char_len(), 0);
    }

    #[test]
    fn search_url_targets_news_vertical() {
        let browser = Arc::new(crate::testing::MockBrowser::new());
        let scraper = NewsScraper::new(browser);
        let url = scraper.search_url("villages submerged in Kalaburagi").unwrap();
        assert_eq!(url.host_str(), Some("www.google.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".into(), "villages submerged in Kalaburagi".into())));
        assert!(pairs.contains(&("tbm".into(), "nws".into())));
    }
}
