// Relevance gate: ask a search-augmented model whether a real flood is under
// way in the district around the requested date. Strict YES/NO.

use std::sync::Arc;

use ai_client::{ChatAgent, ChatOptions, Message};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Months, NaiveDate};
use tracing::info;

use floodwatch_common::FloodQuery;

use crate::traits::FloodGate;

const SYSTEM_PROMPT: &str = "You are a strict disaster verification analyst with live web search. \
You confirm only physical flooding that actually happened. You answer with a single word: YES or NO.";

const FALSE_POSITIVES: &str = "\
Answer NO for any of these, even if the word \"flood\" appears:
- Financial or compensation news: relief packages, crop-loss compensation, insurance claims, budget allocations.
- Weather forecasts or alerts (orange/red alerts, IMD warnings) without reports of actual flooding.
- Infrastructure planning: proposed dams, embankment tenders, flood-control projects, drainage plans.
- Trivial rainfall: waterlogged streets, brief showers, traffic disruption only.";

const TRUE_POSITIVES: &str = "\
Answer YES only if reports show at least one of these, specifically in the named district:
- Physical impact on property: houses, crops, roads or bridges submerged or washed away.
- Human impact: evacuation, rescue operations, relief camps, people stranded, deaths.
- The reports name the district itself or places inside it, not only the state or a neighbouring district.";

/// Period to search, derived from the free-text request date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloodWindow {
    Dates { start: NaiveDate, end: NaiveDate },
    Text(String),
}

impl FloodWindow {
    /// Exact dates give two days before to one day after. A month gives the
    /// whole month widened the same way. Anything else is kept as text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(day) = parse_day(raw) {
            return Self::widened(day, day);
        }
        if let Some(first) = parse_month(raw) {
            if let Some(last) = first
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
            {
                return Self::widened(first, last);
            }
        }
        Self::Text(raw.to_string())
    }

    fn widened(start: NaiveDate, end: NaiveDate) -> Self {
        match (
            start.checked_sub_signed(Duration::days(2)),
            end.checked_add_signed(Duration::days(1)),
        ) {
            (Some(start), Some(end)) => Self::Dates { start, end },
            _ => Self::Text(start.to_string()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Dates { start, end } => format!(
                "between {} and {}",
                start.format("%-d %B %Y"),
                end.format("%-d %B %Y")
            ),
            Self::Text(text) => format!(
                "around \"{text}\" (from about 2 days before to 1 day after; if only a month is given, anywhere in that month)"
            ),
        }
    }
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%d-%m-%Y",
        "%d/%m/%Y",
        "%d %B %Y",
        "%d %b %Y",
        "%B %d, %Y",
        "%b %d, %Y",
        "%B %d %Y",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_month(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("1 {raw}"), "%d %B %Y")
        .or_else(|_| NaiveDate::parse_from_str(&format!("1 {raw}"), "%d %b %Y"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .ok()
}

/// `true` only when the answer, upper-cased with every non-letter removed, is exactly `YES`.
pub fn parse_verdict(raw: &str) -> bool {
    let letters: String = raw
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_uppercase)
        .collect();
    letters == "YES"
}

pub fn build_prompt(query: &FloodQuery) -> String {
    let window = FloodWindow::parse(&query.date);
    format!(
        "Was there an actual, ongoing flood in {district} district, {state}, India {window}?\n\n\
         {FALSE_POSITIVES}\n\n\
         {TRUE_POSITIVES}\n\n\
         Output exactly YES or NO. No punctuation, no explanation.",
        district = query.district,
        state = query.state,
        window = window.describe(),
    )
}

pub struct Gatekeeper {
    agent: Arc<dyn ChatAgent>,
}

impl Gatekeeper {
    pub fn new(agent: Arc<dyn ChatAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl FloodGate for Gatekeeper {
    async fn is_active_flood(&self, query: &FloodQuery) -> Result<bool> {
        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(build_prompt(query))];
        let options = ChatOptions::default().temperature(0.0).max_tokens(10);

        let raw = self.agent.chat(messages, options).await?;
        let verdict = parse_verdict(&raw);
        info!(
            district = %query.district,
            state = %query.state,
            model = self.agent.model(),
            raw = raw.trim(),
            verdict,
            "Gatekeeper verdict"
        );
        Ok(verdict)
    }
}
