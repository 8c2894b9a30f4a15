//! Diagnostic engine: compiles a knowledge base once and runs sessions.
//!
//! A session seeds working memory with the caller's symptoms, runs the rule
//! substrate once, and applies each fired event to working memory from a
//! single dispatch loop:
//!
//! - `solved` removes the event's symptom
//! - `addSymptom` adds the event's cause if absent
//! - `deferred` leaves memory alone
//!
//! Rules are evaluated once each, so a symptom added by a root cause can only
//! match rules that have not been evaluated yet.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::callbacks::Callbacks;
use super::compiler::{self, CONTAINS_ONE_OF};
use super::facts::FactResolver;
use super::memory::{apply_add_symptom, apply_solved, SharedWorkingMemory, WorkingMemory};
use super::observer::{SessionObserver, TracingObserver};
use super::outcome::{DiagnosisOutcome, EventKind, FiredEvent};
use crate::config::EngineConfig;
use crate::error::{AppResult, EngineError};
use crate::knowledge::KnowledgeBase;
use crate::rules::{contains_one_of, EngineOptions, EventListener, Rule, RuleEvent, RuleResult, RulesEngine};

/// Compiled state produced by [`DiagnosticEngine::initialize`].
struct Compiled {
    knowledge: Arc<KnowledgeBase>,
    resolver: FactResolver,
    rules: RulesEngine,
}

/// Interactive diagnostic advisor.
///
/// # Example
///
/// ```ignore
/// let mut engine = DiagnosticEngine::new(EngineConfig::default());
/// engine.initialize(knowledge, Callbacks::new(questions, confirmations))?;
/// let outcome = engine.run(&["Symptom1"], &["Type1"]).await?;
/// for event in outcome.solved() {
///     println!("{}", event.message);
/// }
/// ```
pub struct DiagnosticEngine {
    config: EngineConfig,
    observer: Arc<dyn SessionObserver>,
    compiled: Option<Compiled>,
}

impl DiagnosticEngine {
    /// Uninitialized engine with the default tracing observer.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver),
            compiled: None,
        }
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Compile the rule set.
    ///
    /// # Errors
    /// Returns error if the engine is already initialized or its fact
    /// priorities are misordered.
    pub fn initialize(
        &mut self,
        knowledge: KnowledgeBase,
        callbacks: Callbacks,
    ) -> AppResult<&mut Self> {
        if self.compiled.is_some() {
            return Err(EngineError::AlreadyInitialized.into());
        }
        self.config.validate()?;

        let dangling = knowledge.dangling_references();
        if !dangling.is_empty() {
            debug!(count = dangling.len(), references = ?dangling, "Knowledge base has dangling references");
        }

        let knowledge = Arc::new(knowledge);
        let mut resolver = FactResolver::new(
            Arc::clone(&knowledge),
            callbacks,
            Arc::clone(&self.observer),
            &self.config,
        );
        let compiled_rules = compiler::compile(&knowledge, &mut resolver);

        let mut rules = RulesEngine::new(EngineOptions {
            allow_undefined_facts: self.config.allow_undefined_facts,
        });
        rules.add_operator(CONTAINS_ONE_OF, contains_one_of);
        for definition in resolver.definitions() {
            rules.add_fact(definition.clone());
        }
        let rule_count = compiled_rules.len();
        for rule in compiled_rules {
            rules.add_rule(rule)?;
        }

        info!(
            symptoms = knowledge.symptoms().len(),
            rules = rule_count,
            facts = resolver.len(),
            "Diagnostic engine initialized"
        );

        self.compiled = Some(Compiled {
            knowledge,
            resolver,
            rules,
        });
        Ok(self)
    }

    /// Whether [`initialize`](Self::initialize) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compiled rules in compile order. Empty before initialization.
    pub fn rules(&self) -> &[Rule] {
        self.compiled
            .as_ref()
            .map(|c| c.rules.rules())
            .unwrap_or_default()
    }

    /// Knowledge base the rules were compiled from.
    pub fn knowledge(&self) -> Option<&KnowledgeBase> {
        self.compiled.as_ref().map(|c| c.knowledge.as_ref())
    }

    /// Pre-answer a fact, replacing any previous binding.
    ///
    /// # Errors
    /// Returns error if the engine is not initialized.
    pub fn set_fact(&mut self, fact_id: &str, value: impl Into<Value>) -> Result<(), EngineError> {
        let compiled = self.compiled.as_mut().ok_or(EngineError::NotInitialized)?;
        compiled.resolver.register_static(fact_id, value);
        if let Some(definition) = compiled.resolver.definition(fact_id) {
            compiled.rules.add_fact(definition.clone());
        }
        Ok(())
    }

    /// Run one diagnostic session.
    ///
    /// Each call is independent: questions are asked afresh and working
    /// memory starts from `symptoms`.
    ///
    /// # Errors
    /// Returns error if the engine is not initialized.
    pub async fn run<S, T>(
        &self,
        symptoms: &[S],
        system_types: &[T],
    ) -> Result<DiagnosisOutcome, EngineError>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let compiled = self.compiled.as_ref().ok_or(EngineError::NotInitialized)?;

        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let memory = WorkingMemory::seed(symptoms.iter().map(|s| s.as_ref().to_string()))
            .into_shared();
        let system_types: Vec<String> = system_types
            .iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        let session_facts = compiled
            .resolver
            .session_facts(Arc::clone(&memory), &system_types);

        let dispatcher = SessionDispatcher {
            memory: Arc::clone(&memory),
            observer: Arc::clone(&self.observer),
            fired: Mutex::new(Vec::new()),
        };

        let seeded = memory.read().await.symptoms().to_vec();
        let span = info_span!("diagnosis", session_id = %session_id);
        let result = async {
            info!(symptoms = ?seeded, system_types = ?system_types, "Diagnosis started");
            compiled.rules.run(session_facts, &dispatcher).await
        }
        .instrument(span.clone())
        .await;

        let events = dispatcher.fired.into_inner();
        let active_symptoms = memory.read().await.symptoms().to_vec();

        span.in_scope(|| {
            info!(
                fired = events.len(),
                evaluated = result.results.len(),
                active = ?active_symptoms,
                duration_ms = start.elapsed().as_millis(),
                "Diagnosis completed"
            )
        });

        Ok(DiagnosisOutcome {
            session_id,
            started_at,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            events,
            rule_results: result.results,
            facts: result.facts,
            active_symptoms,
        })
    }
}

impl std::fmt::Debug for DiagnosticEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticEngine")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("rules", &self.rules().len())
            .finish()
    }
}

/// Applies fired events to working memory, one at a time.
struct SessionDispatcher {
    memory: SharedWorkingMemory,
    observer: Arc<dyn SessionObserver>,
    fired: Mutex<Vec<FiredEvent>>,
}

#[async_trait]
impl EventListener for SessionDispatcher {
    async fn on_success(&self, event: &RuleEvent, result: &RuleResult) {
        self.observer.on_rule_result(result);

        let Some(fired) = FiredEvent::from_rule_event(event, &result.name) else {
            warn!(rule = %result.name, event_type = %event.event_type, "Ignoring unrecognized event");
            return;
        };

        {
            let mut memory = self.memory.write().await;
            let changed = match fired.kind {
                EventKind::Solved => apply_solved(&mut memory, &fired.symptom_id),
                EventKind::AddSymptom => fired
                    .cause_id
                    .as_deref()
                    .map(|cause| apply_add_symptom(&mut memory, cause))
                    .unwrap_or(false),
                EventKind::Deferred => false,
            };
            if changed {
                self.observer.on_memory_changed(&memory);
            }
        }

        self.observer.on_event(&fired);
        self.fired.lock().await.push(fired);
    }

    async fn on_failure(&self, _event: &RuleEvent, result: &RuleResult) {
        self.observer.on_rule_result(result);
    }
}
