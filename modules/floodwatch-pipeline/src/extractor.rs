// Event extraction: scraped news text → candidate flood locations (JSON).

use std::sync::Arc;

use ai_client::{strip_code_blocks, truncate_to_char_boundary, ChatAgent, ChatOptions, Message};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use floodwatch_common::CandidateEvent;

use crate::error::ExtractionError;
use crate::traits::EventExtractor;

/// Upper bound on the context sent to the model, in bytes.
const MAX_CONTEXT_BYTES: usize = 12_000;

pub fn system_prompt(district: &str) -> String {
    format!(
        "You are a strict flood data analyst.\n\
         1. Analyze the news text provided.\n\
         2. Extract ONLY locations that are inside {district} district.\n\
         3. IGNORE locations in neighbouring districts, even when the text names them.\n\
         4. Prefer specific named villages, bridges and landmarks (e.g. \"Kattisangavi Bridge\", \"Dandoti\") over generic area names.\n\
         5. If the text is vague (e.g. \"villages along the Bhima river in {district}\"), list the specific villages on that river inside {district} that you know of.\n\
         Respond with JSON only."
    )
}

pub fn user_prompt(context: &str, district: &str) -> String {
    format!(
        "NEWS TEXT:\n{context}\n\n\
         TASK: List 5-8 specific flood-hit locations inside {district} ONLY.\n\
         JSON Output: {{ \"events\": [{{ \"location_name\": \"Name\", \"context\": \"Snippet\", \"severity\": \"High|Medium|Low\" }}] }}"
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventsPayload {
    Wrapped { events: Vec<CandidateEvent> },
    Bare(Vec<CandidateEvent>),
}

/// Parse model output into candidates.
///
/// Accepts `{"events": [...]}` or a bare array, optionally inside a markdown
/// fence. Blank names are dropped and names are trimmed. Anything else is
/// `ExtractionError::Malformed`.
pub fn parse_events(raw: &str) -> Result<Vec<CandidateEvent>, ExtractionError> {
    let json = strip_code_blocks(raw);
    let payload: EventsPayload = serde_json::from_str(json).map_err(|e| {
        let preview = truncate_to_char_boundary(json, 200);
        ExtractionError::Malformed(format!("{e} (output: {preview})"))
    })?;

    let events = match payload {
        EventsPayload::Wrapped { events } | EventsPayload::Bare(events) => events,
    };

    Ok(events
        .into_iter()
        .filter_map(|mut event| {
            let name = event.location_name.trim();
            if name.is_empty() {
                return None;
            }
            event.location_name = name.to_string();
            Some(event)
        })
        .collect())
}

pub struct Extractor {
    agent: Arc<dyn ChatAgent>,
}

impl Extractor {
    pub fn new(agent: Arc<dyn ChatAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl EventExtractor for Extractor {
    async fn extract(
        &self,
        context: &str,
        district: &str,
    ) -> Result<Vec<CandidateEvent>, ExtractionError> {
        let bounded = truncate_to_char_boundary(context, MAX_CONTEXT_BYTES);
        if bounded.len() < context.len() {
            info!(from = context.len(), to = bounded.len(), "Truncated extraction context");
        }

        let messages = vec![
            Message::system(system_prompt(district)),
            Message::user(user_prompt(bounded, district)),
        ];
        let options = ChatOptions::default().temperature(0.1).json_object();

        let raw = self
            .agent
            .chat(messages, options)
            .await
            .map_err(ExtractionError::Request)?;

        let events = parse_events(&raw).inspect_err(|e| {
            warn!(district, model = self.agent.model(), error = %e, "Extraction output rejected");
        })?;

        info!(
            district,
            count = events.len(),
            names = %events.iter().map(|e| e.location_name.as_str()).collect::<Vec<_>>().join(", "),
            "Extracted candidate locations"
        );
        Ok(events)
    }
}
