use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or inconsistent configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong.
        message: String,
    },

    /// Knowledge base could not be loaded.
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(#[from] KnowledgeBaseError),

    /// Engine used out of order.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Rule set could not be built.
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),

    /// Unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

/// Knowledge base loading errors
#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    /// The file could not be read.
    #[error("Failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not a valid knowledge base.
    #[error("Malformed knowledge base: {0}")]
    Json(#[from] serde_json::Error),

    /// Two records of one kind share an id.
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId {
        /// Record kind: `symptom`, `solution` or `diagnostic`.
        kind: &'static str,
        /// The repeated id.
        id: String,
    },
}

/// Diagnostic engine lifecycle errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// `run` or `set_fact` called before `initialize`.
    #[error("Diagnostic engine has not been initialized")]
    NotInitialized,

    /// `initialize` called twice.
    #[error("Diagnostic engine is already initialized")]
    AlreadyInitialized,
}

/// Rule substrate errors raised while building the rule set
#[derive(Debug, Error)]
pub enum RulesError {
    /// A condition names an operator that is not registered.
    #[error("Unknown operator '{operator}' in rule '{rule}'")]
    UnknownOperator {
        /// Rule name.
        rule: String,
        /// Operator name.
        operator: String,
    },

    /// The rule is structurally invalid.
    #[error("Invalid rule: {message}")]
    InvalidRule {
        /// What is wrong.
        message: String,
    },
}

/// Fact resolution errors.
///
/// These are local to the condition that asked for the fact. They are `Clone`
/// so that a memoized failure can be handed to every later reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactError {
    /// No fact is registered under this id and undefined facts are not allowed.
    #[error("Undefined fact: {fact_id}")]
    Undefined {
        /// Requested fact id.
        fact_id: String,
    },

    /// The resolver or its callback failed.
    #[error("Fact '{fact_id}' could not be resolved: {message}")]
    Rejected {
        /// Requested fact id.
        fact_id: String,
        /// Failure reason.
        message: String,
    },

    /// The fact needs a callback that was not supplied.
    #[error("No callback registered to resolve fact '{fact_id}'")]
    MissingCallback {
        /// Requested fact id.
        fact_id: String,
    },
}

/// Error returned by a question or confirmation callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CallbackError {
    /// Human-readable reason.
    pub message: String,
}

impl CallbackError {
    /// Create a callback error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for knowledge base operations
pub type KnowledgeBaseResult<T> = Result<T, KnowledgeBaseError>;

/// Result type alias for rule substrate operations
pub type RulesResult<T> = Result<T, RulesError>;

/// Result type alias for fact resolution
pub type FactResult<T> = Result<T, FactError>;
