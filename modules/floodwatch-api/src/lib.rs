pub mod error;
pub mod rest;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use floodwatch_common::AppConfig;
use floodwatch_pipeline::{
    build_browser, Extractor, FloodPipeline, Gatekeeper, Geocoder, LocationExclusions,
    NewsScraper, NominatimClient, PipelineConfig,
};

/// Crate targets logged at info unless `RUST_LOG` says otherwise.
pub const DEFAULT_LOG_DIRECTIVES: &[&str] =
    &["floodwatch=info", "ai_client=info", "browserless_client=info"];

pub fn log_filter(base: EnvFilter) -> anyhow::Result<EnvFilter> {
    DEFAULT_LOG_DIRECTIVES
        .iter()
        .try_fold(base, |filter, directive| Ok(filter.add_directive(directive.parse()?)))
}

pub struct AppState {
    pub pipeline: FloodPipeline,
}

/// Wire the production stages from configuration. No network calls are made here.
pub fn build_pipeline(config: &AppConfig) -> FloodPipeline {
    let gatekeeper_agent = OpenAi::perplexity(&config.perplexity_api_key, &config.gatekeeper_model)
        .with_base_url(&config.gatekeeper_base_url);
    let extractor_agent = OpenAi::groq(&config.groq_api_key, &config.extractor_model)
        .with_base_url(&config.extractor_base_url);

    let browser = build_browser(&config.browser);
    let lookup = NominatimClient::new(&config.nominatim_url, &config.geocoder_user_agent);

    FloodPipeline::new(
        Arc::new(Gatekeeper::new(Arc::new(gatekeeper_agent))),
        Arc::new(NewsScraper::new(browser)),
        Arc::new(Extractor::new(Arc::new(extractor_agent))),
        Arc::new(Geocoder::new(Arc::new(lookup)).with_delay(config.geocoder_delay)),
    )
    .with_exclusions(LocationExclusions::new(&config.excluded_location_terms))
    .with_config(PipelineConfig {
        max_events: config.max_events,
        ..PipelineConfig::default()
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        .route("/api/floods", post(rest::api_floods))
        .with_state(state)
        // The map frontend is served from another origin
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Method + path only
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}
