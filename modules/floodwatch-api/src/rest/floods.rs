use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use floodwatch_common::{FloodQuery, FloodResponse};
use floodwatch_pipeline::FloodOutcome;

use crate::error::ApiError;
use crate::AppState;

/// Fields are optional here so a missing one becomes a validation error
/// listing every absent field, not a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct FloodRequest {
    state: Option<String>,
    district: Option<String>,
    date: Option<String>,
}

pub async fn api_floods(
    State(state): State<Arc<AppState>>,
    body: Result<Json<FloodRequest>, JsonRejection>,
) -> Result<Json<FloodResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = FloodQuery::new(
        body.state.as_deref(),
        body.district.as_deref(),
        body.date.as_deref(),
    )?;

    let request_id = Uuid::new_v4();
    let span = info_span!(
        "flood_query",
        %request_id,
        district = %query.district,
        state = %query.state,
        date = %query.date,
    );

    async move {
        info!("Analyzing flood query");
        let response = match state.pipeline.run(&query).await? {
            FloodOutcome::NoFlood { message } => FloodResponse::no_flood(message),
            FloodOutcome::Events(events) => {
                info!(events = events.len(), "Sending verified locations");
                FloodResponse::events(events)
            }
        };
        Ok::<_, ApiError>(Json(response))
    }
    .instrument(span)
    .await
}
