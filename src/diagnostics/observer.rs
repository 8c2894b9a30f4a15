//! Observability hook for diagnostic sessions.

use tracing::{debug, info};

use super::callbacks::ConfirmationPrompt;
use super::memory::WorkingMemory;
use super::outcome::FiredEvent;
use crate::knowledge::{Diagnostic, Solution};
use crate::rules::RuleResult;

/// Receives notifications while a session runs. All methods default to no-ops.
pub trait SessionObserver: Send + Sync {
    /// A diagnostic question is about to be asked.
    fn on_question(&self, _diagnostic: &Diagnostic) {}

    /// A solution confirmation is about to be requested.
    fn on_confirmation(&self, _solution: &Solution, _prompt: ConfirmationPrompt) {}

    /// A rule finished evaluating.
    fn on_rule_result(&self, _result: &RuleResult) {}

    /// A rule fired.
    fn on_event(&self, _event: &FiredEvent) {}

    /// Working memory changed.
    fn on_memory_changed(&self, _memory: &WorkingMemory) {}
}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_question(&self, diagnostic: &Diagnostic) {
        info!(diagnostic_id = %diagnostic.id, question = %diagnostic.prompt(), "Asking question");
    }

    fn on_confirmation(&self, solution: &Solution, prompt: ConfirmationPrompt) {
        info!(solution_id = %solution.id, prompt = %prompt, "Requesting confirmation");
    }

    fn on_rule_result(&self, result: &RuleResult) {
        debug!(
            rule = %result.name,
            priority = result.priority,
            matched = result.result,
            error = ?result.error,
            "Rule evaluated"
        );
    }

    fn on_event(&self, event: &FiredEvent) {
        info!(
            kind = %event.kind,
            symptom_id = %event.symptom_id,
            solution_id = ?event.solution_id,
            cause_id = ?event.cause_id,
            message = %event.message,
            "Rule fired"
        );
    }

    fn on_memory_changed(&self, memory: &WorkingMemory) {
        debug!(active = ?memory.symptoms(), "Working memory changed");
    }
}

/// Observer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl SessionObserver for SilentObserver {}
