//! User-facing callbacks that answer questions and confirm solutions.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CallbackError;
use crate::knowledge::{Diagnostic, Solution};

/// An answer given by the user.
///
/// Answers are compared literally against rule conditions, so anything other
/// than exactly `"yes"`/`"no"` simply fails a yes/no condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Free-form or choice answer.
    Text(String),
    /// Numeric answer.
    Number(f64),
}

impl Answer {
    /// The literal `"yes"` answer.
    pub fn yes() -> Self {
        Answer::Text("yes".to_string())
    }

    /// The literal `"no"` answer.
    pub fn no() -> Self {
        Answer::Text("no".to_string())
    }

    /// Parse raw user input: numbers become [`Answer::Number`], everything
    /// else is trimmed text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Answer::Number(n),
            _ => Answer::Text(trimmed.to_string()),
        }
    }

    /// JSON form used as a fact value.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Answer::Text(s) => serde_json::Value::String(s.clone()),
            Answer::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Answer::Text(s.to_string())
    }
}

impl From<String> for Answer {
    fn from(s: String) -> Self {
        Answer::Text(s)
    }
}

impl From<f64> for Answer {
    fn from(n: f64) -> Self {
        Answer::Number(n)
    }
}

/// Which confirmation a solution prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPrompt {
    /// "Are you able to do this?" asked before the solution is attempted.
    AreYouAble,
    /// "Did it work?" asked after the solution is attempted.
    DidItWork,
}

impl ConfirmationPrompt {
    /// Fact id under which this confirmation is registered for a solution.
    pub fn fact_id(&self, solution_id: &str) -> String {
        match self {
            ConfirmationPrompt::DidItWork => solution_id.to_string(),
            ConfirmationPrompt::AreYouAble => format!("{}:able", solution_id),
        }
    }

    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationPrompt::AreYouAble => "are_you_able",
            ConfirmationPrompt::DidItWork => "did_it_work",
        }
    }
}

impl std::fmt::Display for ConfirmationPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answers diagnostic questions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiagnosticCallback: Send + Sync {
    /// Ask the user a question.
    async fn ask(&self, diagnostic: &Diagnostic) -> Result<Answer, CallbackError>;
}

/// Confirms solutions with the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SolutionCallback: Send + Sync {
    /// Ask the user to confirm a solution. Expected answers are "yes" or "no".
    async fn confirm(
        &self,
        solution: &Solution,
        prompt: ConfirmationPrompt,
    ) -> Result<Answer, CallbackError>;
}

/// Callbacks supplied at initialization. A missing callback makes every fact
/// that needs it fail to resolve.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// Answers diagnostic questions.
    pub diagnostic: Option<Arc<dyn DiagnosticCallback>>,
    /// Confirms solutions.
    pub solution: Option<Arc<dyn SolutionCallback>>,
}

impl Callbacks {
    /// Callbacks with both handlers set.
    pub fn new(
        diagnostic: Arc<dyn DiagnosticCallback>,
        solution: Arc<dyn SolutionCallback>,
    ) -> Self {
        Self {
            diagnostic: Some(diagnostic),
            solution: Some(solution),
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("diagnostic", &self.diagnostic.is_some())
            .field("solution", &self.solution.is_some())
            .finish()
    }
}
