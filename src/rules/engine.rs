//! Prioritized forward-chaining evaluator.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::almanac::{Almanac, FactDefinition};
use super::operators::OperatorRegistry;
use super::types::{Condition, ConditionResult, Rule, RuleEvent, RuleResult, RunResult};
use crate::error::{RulesError, RulesResult};

/// Receives rule outcomes while a run is in progress.
///
/// Calls are made one at a time from the run loop, after the priority group
/// that produced them has finished evaluating and before the next group starts.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// A rule matched and its event fired.
    async fn on_success(&self, _event: &RuleEvent, _result: &RuleResult) {}

    /// A rule did not match.
    async fn on_failure(&self, _event: &RuleEvent, _result: &RuleResult) {}
}

/// Listener that ignores every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl EventListener for NoopListener {}

/// Engine-wide options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Treat unregistered facts as `null` instead of failing the rule.
    pub allow_undefined_facts: bool,
}

/// Rule engine holding rules, facts and operators.
///
/// A run never mutates the engine: per-run state lives in a fresh [`Almanac`].
#[derive(Debug, Default)]
pub struct RulesEngine {
    rules: Vec<Rule>,
    facts: HashMap<String, FactDefinition>,
    operators: OperatorRegistry,
    options: EngineOptions,
}

impl RulesEngine {
    /// Empty engine with the built-in operators.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            rules: Vec::new(),
            facts: HashMap::new(),
            operators: OperatorRegistry::new(),
            options,
        }
    }

    /// Add a rule.
    ///
    /// # Errors
    /// Returns error if the rule has no name or references an unknown operator.
    pub fn add_rule(&mut self, rule: Rule) -> RulesResult<()> {
        if rule.name.is_empty() {
            return Err(RulesError::InvalidRule {
                message: "rule name is required".to_string(),
            });
        }
        if let Some(unknown) = rule
            .conditions
            .iter()
            .find(|c| !self.operators.contains(&c.operator))
        {
            return Err(RulesError::UnknownOperator {
                rule: rule.name.clone(),
                operator: unknown.operator.clone(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Register a fact, replacing any fact with the same id.
    pub fn add_fact(&mut self, definition: FactDefinition) {
        self.facts.insert(definition.id.clone(), definition);
    }

    /// Register a custom operator.
    pub fn add_operator<F>(&mut self, name: impl Into<String>, op: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.operators.register(name, op);
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Registered fact by id.
    pub fn fact(&self, id: &str) -> Option<&FactDefinition> {
        self.facts.get(id)
    }

    /// Engine-wide options.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Run every rule once, highest priority first.
    ///
    /// `runtime_facts` shadow engine facts for this run only. Rules sharing a
    /// priority are evaluated concurrently; their outcomes are reported to
    /// `listener` in insertion order once the whole group is done.
    pub async fn run(
        &self,
        runtime_facts: Vec<FactDefinition>,
        listener: &dyn EventListener,
    ) -> RunResult {
        let mut facts = self.facts.clone();
        for definition in runtime_facts {
            facts.insert(definition.id.clone(), definition);
        }
        let almanac = Almanac::new(facts, self.options.allow_undefined_facts);

        let mut ordered: Vec<&Rule> = self.rules.iter().collect();
        ordered.sort_by_key(|r| Reverse(r.priority));

        let mut result = RunResult::default();
        for group in ordered.chunk_by(|a, b| a.priority == b.priority) {
            let outcomes = join_all(group.iter().map(|rule| self.evaluate(rule, &almanac))).await;

            for outcome in outcomes {
                if outcome.result {
                    debug!(rule = %outcome.name, priority = outcome.priority, "Rule matched");
                    listener.on_success(&outcome.event, &outcome).await;
                    result.events.push(outcome.event.clone());
                } else {
                    debug!(rule = %outcome.name, priority = outcome.priority, "Rule did not match");
                    listener.on_failure(&outcome.event, &outcome).await;
                    result.failure_events.push(outcome.event.clone());
                }
                result.results.push(outcome);
            }
        }

        result.facts = almanac.observed_facts().await;
        result
    }

    /// Evaluate one rule's conjunction against the almanac.
    ///
    /// Conditions are checked in descending fact priority (stable) and the
    /// first false or failed condition ends the evaluation.
    async fn evaluate(&self, rule: &Rule, almanac: &Almanac) -> RuleResult {
        let mut conditions: Vec<&Condition> = rule.conditions.iter().collect();
        conditions.sort_by_key(|c| Reverse(almanac.priority_of(&c.fact)));

        let mut checked = Vec::with_capacity(conditions.len());
        let mut error = None;
        let mut matched = true;

        for condition in conditions {
            let fact_value = match almanac.fact_value(&condition.fact).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(rule = %rule.name, fact = %condition.fact, error = %e, "Condition failed to resolve");
                    checked.push(ConditionResult {
                        fact: condition.fact.clone(),
                        operator: condition.operator.clone(),
                        value: condition.value.clone(),
                        fact_value: None,
                        result: false,
                    });
                    error = Some(e.to_string());
                    matched = false;
                    break;
                }
            };

            let passed = match self.operators.get(&condition.operator) {
                Some(op) => op(&fact_value, &condition.value),
                None => {
                    error = Some(format!("Unknown operator '{}'", condition.operator));
                    false
                }
            };

            checked.push(ConditionResult {
                fact: condition.fact.clone(),
                operator: condition.operator.clone(),
                value: condition.value.clone(),
                fact_value: Some(fact_value),
                result: passed,
            });

            if !passed {
                matched = false;
                break;
            }
        }

        RuleResult {
            name: rule.name.clone(),
            priority: rule.priority,
            result: matched,
            conditions: checked,
            event: rule.event.clone(),
            error,
        }
    }
}
