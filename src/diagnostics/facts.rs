//! Fact resolver: binds question, confirmation and session facts.
//!
//! Question facts are cached for the session, so each question is asked at
//! most once. Confirmation facts are never cached: every reference is a new
//! real-world check and asks again.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::callbacks::{Callbacks, ConfirmationPrompt, DiagnosticCallback, SolutionCallback};
use super::memory::{ActiveSymptoms, SharedWorkingMemory};
use super::observer::SessionObserver;
use crate::config::EngineConfig;
use crate::error::{FactError, FactResult};
use crate::knowledge::{KnowledgeBase, Solution};
use crate::rules::{FactDefinition, FactOptions, FactProvider};

/// Fact id of the live active-symptom set.
pub const SYMPTOMS_FACT: &str = "symptoms";
/// Fact id of the session's active system types.
pub const SYSTEM_TYPES_FACT: &str = "systemTypes";

/// Resolves a diagnostic question through the diagnostic callback.
struct QuestionFact {
    fact_id: String,
    knowledge: Arc<KnowledgeBase>,
    callback: Option<Arc<dyn DiagnosticCallback>>,
    observer: Arc<dyn SessionObserver>,
}

#[async_trait]
impl FactProvider for QuestionFact {
    async fn resolve(&self) -> FactResult<Value> {
        let Some(callback) = &self.callback else {
            return Err(FactError::MissingCallback {
                fact_id: self.fact_id.clone(),
            });
        };
        let Some(diagnostic) = self.knowledge.diagnostic(&self.fact_id) else {
            return Err(FactError::Rejected {
                fact_id: self.fact_id.clone(),
                message: "no such diagnostic question".to_string(),
            });
        };

        self.observer.on_question(diagnostic);
        callback
            .ask(diagnostic)
            .await
            .map(|answer| answer.to_value())
            .map_err(|e| FactError::Rejected {
                fact_id: self.fact_id.clone(),
                message: e.message,
            })
    }
}

/// Asks the solution callback to confirm a solution.
struct ConfirmationFact {
    fact_id: String,
    solution: Solution,
    prompt: ConfirmationPrompt,
    callback: Option<Arc<dyn SolutionCallback>>,
    observer: Arc<dyn SessionObserver>,
}

#[async_trait]
impl FactProvider for ConfirmationFact {
    async fn resolve(&self) -> FactResult<Value> {
        let Some(callback) = &self.callback else {
            return Err(FactError::MissingCallback {
                fact_id: self.fact_id.clone(),
            });
        };

        self.observer.on_confirmation(&self.solution, self.prompt);
        callback
            .confirm(&self.solution, self.prompt)
            .await
            .map(|answer| answer.to_value())
            .map_err(|e| FactError::Rejected {
                fact_id: self.fact_id.clone(),
                message: e.message,
            })
    }
}

/// Registry of the facts a compiled rule set needs.
///
/// Dynamic facts get strictly decreasing priorities in registration order,
/// starting at [`EngineConfig::fact_priority_start`].
pub struct FactResolver {
    knowledge: Arc<KnowledgeBase>,
    callbacks: Callbacks,
    observer: Arc<dyn SessionObserver>,
    facts: HashMap<String, FactDefinition>,
    next_priority: i64,
    session_priority: i64,
}

impl FactResolver {
    /// Empty resolver numbering dynamic facts from `config`.
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        callbacks: Callbacks,
        observer: Arc<dyn SessionObserver>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            knowledge,
            callbacks,
            observer,
            facts: HashMap::new(),
            next_priority: config.fact_priority_start,
            session_priority: config.session_fact_priority,
        }
    }

    /// Bind a constant, replacing any previous binding for `fact_id`.
    pub fn register_static(&mut self, fact_id: &str, value: impl Into<Value>) {
        self.facts.insert(
            fact_id.to_string(),
            FactDefinition::constant(fact_id, value, self.session_priority),
        );
    }

    /// Bind a diagnostic question, unless `diagnostic_id` is already bound.
    ///
    /// Returns true when a new binding was created.
    pub fn register_question(&mut self, diagnostic_id: &str) -> bool {
        match self.facts.entry(diagnostic_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let priority = self.next_priority;
                self.next_priority -= 1;
                let provider = QuestionFact {
                    fact_id: diagnostic_id.to_string(),
                    knowledge: Arc::clone(&self.knowledge),
                    callback: self.callbacks.diagnostic.clone(),
                    observer: Arc::clone(&self.observer),
                };
                slot.insert(FactDefinition::dynamic(
                    diagnostic_id,
                    Arc::new(provider),
                    FactOptions {
                        cache: true,
                        priority,
                    },
                ));
                true
            }
        }
    }

    /// Bind a fresh, uncached confirmation fact for `solution`.
    ///
    /// Always rebinds, taking the next priority. Returns the fact id.
    pub fn register_confirmation(
        &mut self,
        solution: &Solution,
        prompt: ConfirmationPrompt,
    ) -> String {
        let fact_id = prompt.fact_id(&solution.id);
        let priority = self.next_priority;
        self.next_priority -= 1;
        let provider = ConfirmationFact {
            fact_id: fact_id.clone(),
            solution: solution.clone(),
            prompt,
            callback: self.callbacks.solution.clone(),
            observer: Arc::clone(&self.observer),
        };
        self.facts.insert(
            fact_id.clone(),
            FactDefinition::dynamic(
                fact_id.as_str(),
                Arc::new(provider),
                FactOptions {
                    cache: false,
                    priority,
                },
            ),
        );
        fact_id
    }

    /// Per-session facts: live `symptoms` (uncached) and static `systemTypes`.
    pub fn session_facts(
        &self,
        memory: SharedWorkingMemory,
        system_types: &[String],
    ) -> Vec<FactDefinition> {
        vec![
            FactDefinition::dynamic(
                SYMPTOMS_FACT,
                Arc::new(ActiveSymptoms::new(memory)),
                FactOptions {
                    cache: false,
                    priority: self.session_priority,
                },
            ),
            FactDefinition::constant(
                SYSTEM_TYPES_FACT,
                Value::Array(system_types.iter().cloned().map(Value::String).collect()),
                self.session_priority,
            ),
        ]
    }

    /// Whether `fact_id` is bound.
    pub fn is_registered(&self, fact_id: &str) -> bool {
        self.facts.contains_key(fact_id)
    }

    /// Binding for `fact_id`, if any.
    pub fn definition(&self, fact_id: &str) -> Option<&FactDefinition> {
        self.facts.get(fact_id)
    }

    /// Every binding, in no particular order.
    pub fn definitions(&self) -> impl Iterator<Item = &FactDefinition> {
        self.facts.values()
    }

    /// Number of bound facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
