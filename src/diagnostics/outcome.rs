//! Session events and the terminal outcome of a run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::{RuleEvent, RuleResult};

/// Event type carried by a compiled rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A confirmed solution; the symptom leaves working memory.
    #[serde(rename = "solved")]
    Solved,
    /// A solution presented without confirmation.
    #[serde(rename = "deferred")]
    Deferred,
    /// A root cause was found; its symptom joins working memory.
    #[serde(rename = "addSymptom")]
    AddSymptom,
}

impl EventKind {
    /// Event type string carried by compiled rules.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Solved => "solved",
            EventKind::Deferred => "deferred",
            EventKind::AddSymptom => "addSymptom",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solved" => Ok(EventKind::Solved),
            "deferred" => Ok(EventKind::Deferred),
            "addSymptom" => Ok(EventKind::AddSymptom),
            _ => Err(format!("Unknown event type: {}", s)),
        }
    }
}

/// Event parameter keys.
pub(crate) mod params {
    pub const SYMPTOM_ID: &str = "symptomId";
    pub const SOLUTION_ID: &str = "solutionId";
    pub const CAUSE_ID: &str = "causeId";
    pub const MESSAGE: &str = "message";
}

/// A rule that fired during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiredEvent {
    /// Event type.
    pub kind: EventKind,
    /// Name of the rule that fired.
    pub rule: String,
    /// Symptom the rule belongs to.
    pub symptom_id: String,
    /// Solution presented or confirmed, for `solved` and `deferred`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_id: Option<String>,
    /// Symptom brought into play, for `addSymptom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_id: Option<String>,
    /// Solution or cause name.
    pub message: String,
}

impl FiredEvent {
    /// Interpret a substrate event. Returns `None` for foreign event types.
    pub fn from_rule_event(event: &RuleEvent, rule: &str) -> Option<Self> {
        let kind: EventKind = event.event_type.parse().ok()?;
        Some(Self {
            kind,
            rule: rule.to_string(),
            symptom_id: event.param_str(params::SYMPTOM_ID)?.to_string(),
            solution_id: event.param_str(params::SOLUTION_ID).map(str::to_string),
            cause_id: event.param_str(params::CAUSE_ID).map(str::to_string),
            message: event
                .param_str(params::MESSAGE)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Terminal result of one diagnostic session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisOutcome {
    /// Unique id of this session.
    pub session_id: Uuid,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the pass.
    pub duration_ms: u64,
    /// Fired events in firing order.
    pub events: Vec<FiredEvent>,
    /// Every rule outcome in evaluation order.
    pub rule_results: Vec<RuleResult>,
    /// Last observed value of every queried fact.
    pub facts: BTreeMap<String, serde_json::Value>,
    /// Working memory at the end of the pass.
    pub active_symptoms: Vec<String>,
}

impl DiagnosisOutcome {
    /// True when no rule fired.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Confirmed solutions.
    pub fn solved(&self) -> impl Iterator<Item = &FiredEvent> {
        self.of_kind(EventKind::Solved)
    }

    /// Solutions presented without confirmation.
    pub fn deferred(&self) -> impl Iterator<Item = &FiredEvent> {
        self.of_kind(EventKind::Deferred)
    }

    /// Root causes that added a symptom.
    pub fn added_symptoms(&self) -> impl Iterator<Item = &FiredEvent> {
        self.of_kind(EventKind::AddSymptom)
    }

    fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &FiredEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}
