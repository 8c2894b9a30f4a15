//! Data types for the rule substrate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One conjunct of a rule: `fact <operator> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Fact to query.
    pub fact: String,
    /// Operator name (built-in or registered).
    pub operator: String,
    /// Value the fact is compared against.
    pub value: serde_json::Value,
}

impl Condition {
    /// Create a condition.
    pub fn new(
        fact: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            fact: fact.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Event emitted when every condition of a rule holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvent {
    /// Event type (e.g. "solved").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Free-form event parameters.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl RuleEvent {
    /// Create an event with no parameters.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Read a string parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }
}

/// A production rule with an all-of condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name, unique by convention.
    pub name: String,
    /// Evaluation priority; higher runs first.
    pub priority: i64,
    /// Conditions that must all hold.
    pub conditions: Vec<Condition>,
    /// Event fired on success.
    pub event: RuleEvent,
}

impl Rule {
    /// Create a rule with priority 1 and no conditions.
    pub fn new(name: impl Into<String>, event: RuleEvent) -> Self {
        Self {
            name: name.into(),
            priority: 1,
            conditions: Vec::new(),
            event,
        }
    }

    /// Append a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

/// Outcome of a single condition check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    /// Fact id.
    pub fact: String,
    /// Operator name.
    pub operator: String,
    /// Value compared against.
    pub value: serde_json::Value,
    /// Value the fact resolved to, if it resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_value: Option<serde_json::Value>,
    /// Whether the condition held.
    pub result: bool,
}

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule name.
    pub name: String,
    /// Rule priority.
    pub priority: i64,
    /// True when every condition held and the event fired.
    pub result: bool,
    /// Conditions checked, in evaluation order. Stops at the first failure.
    pub conditions: Vec<ConditionResult>,
    /// Event the rule carries.
    pub event: RuleEvent,
    /// Fact resolution failure that ended evaluation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Events of rules that matched, in firing order.
    pub events: Vec<RuleEvent>,
    /// Events of rules that did not match.
    pub failure_events: Vec<RuleEvent>,
    /// Every rule outcome, in evaluation order.
    pub results: Vec<RuleResult>,
    /// Last observed value of every fact that was queried.
    pub facts: BTreeMap<String, serde_json::Value>,
}
