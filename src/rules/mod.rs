//! Generic prioritized forward-chaining rule substrate.
//!
//! This module provides:
//! - `Rule`/`Condition`/`RuleEvent`: all-of production rules
//! - `Almanac`: per-run fact store with memoized and live facts
//! - `OperatorRegistry`: built-in and custom condition operators
//! - `RulesEngine`: single-pass evaluator that reports to an `EventListener`
//!
//! Nothing here knows about symptoms or solutions.

mod almanac;
mod engine;
mod operators;
mod types;

pub use almanac::{
    Almanac, FactDefinition, FactOptions, FactProvider, FactSource, UNDEFINED_FACT_PRIORITY,
};
pub use engine::{EngineOptions, EventListener, NoopListener, RulesEngine};
pub use operators::{contains_one_of, OperatorFn, OperatorRegistry};
pub use types::*;
