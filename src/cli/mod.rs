//! Command-line front end: argument parsing and an interactive console
//! prompter for questions and confirmations.

use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::diagnostics::{Answer, ConfirmationPrompt, DiagnosticCallback, SolutionCallback};
use crate::error::CallbackError;
use crate::knowledge::{Diagnostic, QuestionType, Solution};

/// Interactive diagnostic advisor.
#[derive(Parser, Debug, Clone)]
#[command(name = "diagnostic-advisor", version, about)]
pub struct Cli {
    /// Knowledge base JSON file (falls back to KNOWLEDGE_BASE_PATH)
    #[arg(long, short = 'k')]
    pub knowledge_base: Option<PathBuf>,

    /// Active symptom id (repeatable)
    #[arg(long = "symptom", short = 's', required = true)]
    pub symptoms: Vec<String>,

    /// Active system type id (repeatable)
    #[arg(long = "system-type", short = 't')]
    pub system_types: Vec<String>,

    /// Pre-set answer as `id=value` (repeatable)
    #[arg(long = "answer", short = 'a', value_parser = parse_answer_arg)]
    pub answers: Vec<(String, Answer)>,
}

/// Parse an `id=value` pair.
pub fn parse_answer_arg(raw: &str) -> Result<(String, Answer), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=value, got '{}'", raw))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing fact id in '{}'", raw));
    }
    Ok((id.to_string(), Answer::parse(value)))
}

/// Asks questions on stdout and reads answers from stdin.
pub struct ConsolePrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsolePrompter {
    /// Prompter reading from the process's stdin.
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn prompt(&self, text: &str) -> Result<Answer, CallbackError> {
        // Hold the reader for the whole exchange so prompts never interleave.
        let mut lines = self.lines.lock().await;

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{} ", text).as_bytes())
            .await
            .map_err(|e| CallbackError::new(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| CallbackError::new(e.to_string()))?;

        match lines.next_line().await {
            Ok(Some(line)) => Ok(normalize(&line)),
            Ok(None) => Err(CallbackError::new("input closed")),
            Err(e) => Err(CallbackError::new(e.to_string())),
        }
    }
}

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiagnosticCallback for ConsolePrompter {
    async fn ask(&self, diagnostic: &Diagnostic) -> Result<Answer, CallbackError> {
        let hint = match diagnostic.question_type {
            QuestionType::YesNo => "[yes/no]",
            QuestionType::ChooseOne => "[choice]",
            QuestionType::Number => "[number]",
        };
        self.prompt(&format!("{} {}", diagnostic.prompt(), hint)).await
    }
}

#[async_trait]
impl SolutionCallback for ConsolePrompter {
    async fn confirm(
        &self,
        solution: &Solution,
        prompt: ConfirmationPrompt,
    ) -> Result<Answer, CallbackError> {
        let text = match prompt {
            ConfirmationPrompt::AreYouAble => {
                format!("Are you able to: {}? [yes/no]", solution.name)
            }
            ConfirmationPrompt::DidItWork => {
                let steps = solution
                    .instructions
                    .as_deref()
                    .map(|s| format!("\n  {}\n", s))
                    .unwrap_or_default();
                format!("Try: {}{}Did it work? [yes/no]", solution.name, steps)
            }
        };
        self.prompt(&text).await
    }
}

/// Map y/n shorthands to the literal answers rules compare against.
fn normalize(line: &str) -> Answer {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Answer::yes(),
        "n" | "no" => Answer::no(),
        _ => Answer::parse(line),
    }
}
