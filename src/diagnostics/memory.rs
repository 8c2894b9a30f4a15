//! Working memory: the set of symptoms active in a session.
//!
//! Only the session's event dispatch loop writes to it, through
//! [`apply_solved`] and [`apply_add_symptom`]. The `symptoms` fact reads it
//! live on every reference.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::FactResult;
use crate::rules::FactProvider;

/// Working memory shared between the dispatch loop and the `symptoms` fact.
pub type SharedWorkingMemory = Arc<RwLock<WorkingMemory>>;

/// Ordered active-symptom ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkingMemory {
    symptoms: Vec<String>,
}

impl WorkingMemory {
    /// Seed from the caller's initial symptoms, kept as given.
    pub fn seed<I, S>(symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symptoms: symptoms.into_iter().map(Into::into).collect(),
        }
    }

    /// Active ids in insertion order.
    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    /// Whether `symptom_id` is active.
    pub fn contains(&self, symptom_id: &str) -> bool {
        self.symptoms.iter().any(|s| s == symptom_id)
    }

    /// Number of active ids.
    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    /// True when no symptom is active.
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    /// JSON array of the active ids.
    pub fn to_value(&self) -> Value {
        Value::Array(self.symptoms.iter().cloned().map(Value::String).collect())
    }

    /// Wrap for sharing with the `symptoms` fact.
    pub fn into_shared(self) -> SharedWorkingMemory {
        Arc::new(RwLock::new(self))
    }
}

/// A symptom was solved: drop it from the active set.
///
/// Returns whether the memory changed. Absent ids are a no-op.
pub fn apply_solved(state: &mut WorkingMemory, symptom_id: &str) -> bool {
    let before = state.symptoms.len();
    state.symptoms.retain(|s| s != symptom_id);
    state.symptoms.len() != before
}

/// A root cause was found: make its symptom active.
///
/// Returns whether the memory changed. Ids already present are a no-op.
pub fn apply_add_symptom(state: &mut WorkingMemory, cause_id: &str) -> bool {
    if state.contains(cause_id) {
        return false;
    }
    state.symptoms.push(cause_id.to_string());
    true
}

/// The `symptoms` fact: current working memory at query time.
pub(crate) struct ActiveSymptoms {
    memory: SharedWorkingMemory,
}

impl ActiveSymptoms {
    pub(crate) fn new(memory: SharedWorkingMemory) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl FactProvider for ActiveSymptoms {
    async fn resolve(&self) -> FactResult<Value> {
        Ok(self.memory.read().await.to_value())
    }
}
