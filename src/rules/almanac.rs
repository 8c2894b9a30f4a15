//! Fact definitions and the per-run fact store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use tracing::trace;

use crate::error::{FactError, FactResult};

/// Priority of a fact nobody registered.
pub const UNDEFINED_FACT_PRIORITY: i64 = 1;

/// Asynchronously computed fact.
#[async_trait]
pub trait FactProvider: Send + Sync {
    /// Compute the current value of the fact.
    async fn resolve(&self) -> FactResult<Value>;
}

/// Where a fact's value comes from.
#[derive(Clone)]
pub enum FactSource {
    /// A constant.
    Static(Value),
    /// A provider invoked on reference.
    Dynamic(Arc<dyn FactProvider>),
}

impl std::fmt::Debug for FactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactSource::Static(v) => f.debug_tuple("Static").field(v).finish(),
            FactSource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Caching and ordering options for a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactOptions {
    /// Memoize the first resolution for the rest of the run.
    pub cache: bool,
    /// Conditions on higher-priority facts are checked first.
    pub priority: i64,
}

impl Default for FactOptions {
    fn default() -> Self {
        Self {
            cache: true,
            priority: UNDEFINED_FACT_PRIORITY,
        }
    }
}

/// A named fact registered with the engine.
#[derive(Debug, Clone)]
pub struct FactDefinition {
    /// Fact id referenced by conditions.
    pub id: String,
    /// Where the value comes from.
    pub source: FactSource,
    /// Caching and priority.
    pub options: FactOptions,
}

impl FactDefinition {
    /// A constant fact.
    pub fn constant(id: impl Into<String>, value: impl Into<Value>, priority: i64) -> Self {
        Self {
            id: id.into(),
            source: FactSource::Static(value.into()),
            options: FactOptions {
                cache: true,
                priority,
            },
        }
    }

    /// A provider-backed fact.
    pub fn dynamic(
        id: impl Into<String>,
        provider: Arc<dyn FactProvider>,
        options: FactOptions,
    ) -> Self {
        Self {
            id: id.into(),
            source: FactSource::Dynamic(provider),
            options,
        }
    }

    /// Whether values are memoized per run.
    pub fn is_cached(&self) -> bool {
        self.options.cache
    }

    /// Condition-ordering priority.
    pub fn priority(&self) -> i64 {
        self.options.priority
    }
}

type Memo = Arc<OnceCell<FactResult<Value>>>;

/// Fact store for a single engine run.
///
/// Cached dynamic facts resolve at most once per almanac: the first reference
/// creates a once-cell under the fact id and every later or concurrent
/// reference awaits the same cell. Failures are memoized too.
pub struct Almanac {
    facts: HashMap<String, FactDefinition>,
    allow_undefined_facts: bool,
    memo: Mutex<HashMap<String, Memo>>,
    observed: Mutex<BTreeMap<String, Value>>,
}

impl Almanac {
    /// Almanac over `facts` for one run.
    pub fn new(facts: HashMap<String, FactDefinition>, allow_undefined_facts: bool) -> Self {
        Self {
            facts,
            allow_undefined_facts,
            memo: Mutex::new(HashMap::new()),
            observed: Mutex::new(BTreeMap::new()),
        }
    }

    /// Whether a fact with this id is registered.
    pub fn has_fact(&self, fact_id: &str) -> bool {
        self.facts.contains_key(fact_id)
    }

    /// Priority of a fact, or [`UNDEFINED_FACT_PRIORITY`] if unregistered.
    pub fn priority_of(&self, fact_id: &str) -> i64 {
        self.facts
            .get(fact_id)
            .map(FactDefinition::priority)
            .unwrap_or(UNDEFINED_FACT_PRIORITY)
    }

    /// Resolve a fact.
    ///
    /// An unregistered fact is an error in strict mode and `null` otherwise.
    pub async fn fact_value(&self, fact_id: &str) -> FactResult<Value> {
        let Some(definition) = self.facts.get(fact_id) else {
            if self.allow_undefined_facts {
                return Ok(Value::Null);
            }
            return Err(FactError::Undefined {
                fact_id: fact_id.to_string(),
            });
        };

        let value = match &definition.source {
            FactSource::Static(value) => value.clone(),
            FactSource::Dynamic(provider) if definition.options.cache => {
                let cell = {
                    let mut memo = self.memo.lock().await;
                    memo.entry(fact_id.to_string()).or_default().clone()
                };
                cell.get_or_init(|| async {
                    trace!(fact = %fact_id, "Resolving cached fact");
                    provider.resolve().await
                })
                .await
                .clone()?
            }
            FactSource::Dynamic(provider) => {
                trace!(fact = %fact_id, "Resolving uncached fact");
                provider.resolve().await?
            }
        };

        self.observed
            .lock()
            .await
            .insert(fact_id.to_string(), value.clone());
        Ok(value)
    }

    /// Last observed value of every fact resolved so far.
    pub async fn observed_facts(&self) -> BTreeMap<String, Value> {
        self.observed.lock().await.clone()
    }
}
