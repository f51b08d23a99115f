//! Concrete stages driven through their low-level doubles:
//! NewsScraper over MockBrowser, Geocoder over MockGeocodeLookup.

use std::sync::Arc;
use std::time::Duration;

use floodwatch_pipeline::testing::{geocoded, MockBrowser, MockGeocodeLookup};
use floodwatch_pipeline::{Geocoder, NewsScraper, NewsSource, PlaceResolver};

const SEARCH_RESULTS: &str = r#"
    <div>
        <a href="https://www.google.com/intl/en/about">About</a>
        <a href="https://www.thehindu.com/news/kalaburagi-floods">The Hindu</a>
        <a href="/url?q=https://www.deccanherald.com/bhima-villages&sa=U">Deccan Herald</a>
        <a href="https://timesofindia.indiatimes.com/city/kalaburagi">TOI</a>
        <a href="https://www.ndtv.com/never-fetched">NDTV</a>
    </div>
"#;

const ARTICLE: &str = r#"
    <html><body>
        <nav><p>Home | India | Karnataka | Kalaburagi | Weather | Sports | Business | Opinion</p></nav>
        <p>Kattisangavi bridge across the Bhima was submerged on Tuesday as discharge from Sonna barrage rose.</p>
        <p>Advertisement</p>
        <p>Officials shifted families from Dandoti and Ganagapur villages to relief centres in Jevargi taluk.</p>
        <script>var p = "<p>not a paragraph</p>";</script>
    </body></html>
"#;

// ---------------------------------------------------------------------------
// NewsScraper
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scraper_reads_top_three_links_and_skips_failures() {
    // Deccan Herald is not registered: its navigation fails and is skipped.
    let browser = Arc::new(
        MockBrowser::new()
            .on_search(SEARCH_RESULTS)
            .on_page("https://www.thehindu.com/news/kalaburagi-floods", ARTICLE)
            .on_page("https://timesofindia.indiatimes.com/city/kalaburagi", ARTICLE),
    );
    let scraper = NewsScraper::new(browser.clone());

    let context = scraper.scrape("villages submerged in Kalaburagi").await;

    let urls: Vec<&str> = context.sources().iter().map(|s| s.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.thehindu.com/news/kalaburagi-floods",
            "https://timesofindia.indiatimes.com/city/kalaburagi",
        ]
    );
    assert!(context.render().contains("Kattisangavi bridge"));
    assert!(!context.render().contains("Advertisement"));
    assert!(!context.render().contains("Home | India"));

    let opened = browser.opened();
    assert_eq!(opened.len(), 4);
    assert!(!opened.iter().any(|u| u.contains("ndtv")));
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn scraper_closes_session_when_search_fails() {
    let browser = Arc::new(MockBrowser::new());
    let scraper = NewsScraper::new(browser.clone());

    let context = scraper.scrape("villages submerged in Kalaburagi").await;

    assert!(context.is_empty());
    assert_eq!(browser.launches(), 1);
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn scraper_closes_session_when_every_page_fails() {
    let browser = Arc::new(MockBrowser::new().on_search(SEARCH_RESULTS));
    let scraper = NewsScraper::new(browser.clone());

    let context = scraper.scrape("villages submerged in Kalaburagi").await;

    assert!(context.is_empty());
    assert_eq!(browser.closes(), 1);
}

#[tokio::test]
async fn scraper_returns_empty_when_browser_cannot_start() {
    let browser = Arc::new(MockBrowser::new().failing_launch());
    let scraper = NewsScraper::new(browser.clone());

    let context = scraper.scrape("villages submerged in Kalaburagi").await;

    assert!(context.is_empty());
    assert_eq!(browser.closes(), 0);
}

#[tokio::test]
async fn scraper_caps_each_source() {
    let long_paragraph = format!("<p>{}</p>", "Bhima floodwaters ".repeat(400));
    let browser = Arc::new(
        MockBrowser::new()
            .on_search(r#"<a href="https://www.thehindu.com/a">a</a>"#)
            .on_page("https://www.thehindu.com/a", &long_paragraph),
    );
    let scraper = NewsScraper::new(browser);

    let context = scraper.scrape("q").await;

    assert_eq!(context.sources()[0].text.chars().count(), 2000);
}

// ---------------------------------------------------------------------------
// Geocoder
// ---------------------------------------------------------------------------

fn geocoder(lookup: Arc<MockGeocodeLookup>) -> Geocoder {
    Geocoder::new(lookup).with_delay(Duration::ZERO)
}

#[tokio::test]
async fn geocoder_first_variant_hit_stops_search() {
    let lookup = Arc::new(MockGeocodeLookup::new().on_query(
        "Dandoti, Kalaburagi, Karnataka, India",
        geocoded(17.05, 76.97, "Dandoti, Chittapur, Kalaburagi, Karnataka, India"),
    ));

    let found = geocoder(lookup.clone())
        .resolve("Dandoti", "Kalaburagi", "Karnataka")
        .await
        .unwrap();

    assert_eq!(found.lat, 17.05);
    assert_eq!(lookup.queries().len(), 1);
}

#[tokio::test]
async fn geocoder_third_variant_has_bridge_removed() {
    let lookup = Arc::new(MockGeocodeLookup::new().on_query(
        "Kattisangavi, Kalaburagi, Karnataka, India",
        geocoded(17.04, 76.69, "Kattisangavi, Jevargi, Kalaburagi, Karnataka, India"),
    ));

    let found = geocoder(lookup.clone())
        .resolve("Kattisangavi Bridge", "Kalaburagi", "Karnataka")
        .await;

    assert!(found.is_some());
    assert_eq!(
        lookup.queries(),
        vec![
            "Kattisangavi Bridge, Kalaburagi, Karnataka, India",
            "Kattisangavi Bridge, Karnataka, India",
            "Kattisangavi, Kalaburagi, Karnataka, India",
        ]
    );
}

#[tokio::test]
async fn geocoder_miss_on_every_variant_returns_none() {
    let lookup = Arc::new(MockGeocodeLookup::new());

    let found = geocoder(lookup.clone())
        .resolve("Atlantis Dam", "Kalaburagi", "Karnataka")
        .await;

    assert!(found.is_none());
    assert_eq!(lookup.queries().len(), 4);
}

#[tokio::test]
async fn geocoder_lookup_error_moves_to_next_variant() {
    let lookup = Arc::new(
        MockGeocodeLookup::new()
            .failing_query("Dandoti, Kalaburagi, Karnataka, India")
            .on_query(
                "Dandoti, Karnataka, India",
                geocoded(17.05, 76.97, "Dandoti, Karnataka, India"),
            ),
    );

    let found = geocoder(lookup.clone())
        .resolve("Dandoti", "Kalaburagi", "Karnataka")
        .await;

    assert_eq!(found.map(|m| m.display_name).as_deref(), Some("Dandoti, Karnataka, India"));
}

#[tokio::test(start_paused = true)]
async fn geocoder_waits_before_each_lookup() {
    let lookup = Arc::new(MockGeocodeLookup::new());
    let geocoder = Geocoder::new(lookup.clone());

    let started = tokio::time::Instant::now();
    geocoder.resolve("Dandoti", "Kalaburagi", "Karnataka").await;

    assert_eq!(lookup.queries().len(), 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
}
