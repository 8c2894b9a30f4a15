//! Knowledge compiler and self-modifying inference session.
//!
//! This module provides:
//! - `compile`: turns the symptom graph into prioritized rules
//! - `FactResolver`: question, confirmation and session facts
//! - `WorkingMemory`: the active-symptom set and its transitions
//! - `DiagnosticEngine`: initialization and single-pass sessions
//! - `SessionObserver`: injectable observability hook

mod callbacks;
mod compiler;
mod facts;
mod memory;
mod observer;
mod outcome;
mod session;

pub use callbacks::{Answer, Callbacks, ConfirmationPrompt, DiagnosticCallback, SolutionCallback};
pub use compiler::{compile, CONTAINS_ONE_OF};
pub use facts::{FactResolver, SYMPTOMS_FACT, SYSTEM_TYPES_FACT};
pub use memory::{apply_add_symptom, apply_solved, SharedWorkingMemory, WorkingMemory};
pub use observer::{SessionObserver, SilentObserver, TracingObserver};
pub use outcome::{DiagnosisOutcome, EventKind, FiredEvent};
pub use session::DiagnosticEngine;
