//! # Diagnostic Advisor
//!
//! An interactive diagnostic advisor. Given a knowledge base of symptoms,
//! candidate solutions, root causes and diagnostic questions, it works out
//! through a guided question-and-answer session which solutions apply to the
//! observed symptoms, chasing root causes that bring new symptoms into play.
//!
//! ## Features
//!
//! - **Rule Compiler**: one prioritized rule per symptom/solution and
//!   symptom/root-cause link, with all-of conditions
//! - **Fact Resolver**: questions asked at most once per session, solution
//!   confirmations asked on every reference
//! - **Working Memory**: active symptoms, mutated as rules fire
//! - **Rule Substrate**: generic single-pass prioritized evaluator
//!
//! ## Architecture
//!
//! ```text
//! Knowledge Base → Rule Compiler → Rules + Facts
//!                                     ↓
//!     Working Memory ⇄ Session ⇄ Rule Substrate → callbacks (user)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use diagnostic_advisor::{Callbacks, DiagnosticEngine, EngineConfig, KnowledgeBase};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let knowledge = KnowledgeBase::load("knowledge.json")?;
//!     let mut engine = DiagnosticEngine::new(EngineConfig::default());
//!     engine.initialize(knowledge, Callbacks::new(Arc::new(MyQuestions), Arc::new(MyConfirmations)))?;
//!     let outcome = engine.run(&["Symptom1"], &["Type1"]).await?;
//!     println!("{} solution(s) confirmed", outcome.solved().count());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command-line front end.
pub mod cli;
/// Configuration loaded from environment variables.
pub mod config;
/// Knowledge compiler and inference session.
pub mod diagnostics;
/// Error types and result aliases.
pub mod error;
/// Knowledge base model and loading.
pub mod knowledge;
/// Generic prioritized rule substrate.
pub mod rules;

pub use config::{Config, EngineConfig};
pub use diagnostics::{Answer, Callbacks, DiagnosisOutcome, DiagnosticEngine, EventKind, FiredEvent};
pub use error::{AppError, AppResult};
pub use knowledge::KnowledgeBase;
