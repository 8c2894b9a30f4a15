//! Knowledge base model: symptoms, solutions, root causes and diagnostic questions.
//!
//! The JSON layout uses camelCase keys so existing knowledge bases load as-is.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KnowledgeBaseError, KnowledgeBaseResult};

/// An observable problem that can be active in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    /// Unique symptom identifier.
    pub id: String,
    /// Human-readable name, used to build rule names.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Candidate solutions, in preference order.
    #[serde(default)]
    pub rules: Vec<SolutionLink>,
    /// Symptoms that may be the underlying cause of this one.
    #[serde(default)]
    pub root_causes: Vec<RootCauseLink>,
}

/// Guard shared by solution and root-cause links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkConditions {
    /// The link applies only if one of these system types is active.
    /// Empty means any system type.
    #[serde(default)]
    pub system_types: Vec<String>,
    /// Diagnostic ids that must be answered "yes".
    #[serde(default)]
    pub must_be_yes: Vec<String>,
    /// Diagnostic ids that must be answered "no".
    #[serde(default)]
    pub must_be_no: Vec<String>,
}

/// Link from a symptom to a candidate solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionLink {
    /// Solution to offer.
    pub solution_id: String,
    /// Guards on the link.
    #[serde(flatten)]
    pub conditions: LinkConditions,
}

/// Link from a symptom to the symptom that may be causing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCauseLink {
    /// Symptom that may be causing this one.
    pub symptom_id: String,
    /// Guards on the link.
    #[serde(flatten)]
    pub conditions: LinkConditions,
}

/// A remedial action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// Unique solution id.
    pub id: String,
    /// Short name, used in rule names and messages.
    pub name: String,
    /// Symptom this solution was written for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom_id: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Steps shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Ask the user to confirm the solution worked before treating it as solved.
    #[serde(default)]
    pub ask_did_it_work: bool,
    /// Ask the user whether they are able to carry out the solution.
    #[serde(default)]
    pub ask_are_you_able: bool,
}

/// Kind of answer a diagnostic question expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    /// Answered `yes` or `no`.
    #[default]
    YesNo,
    /// One of a fixed set of choices.
    ChooseOne,
    /// A number.
    Number,
}

/// A question the session asks the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Unique question id, referenced by `mustBeYes`/`mustBeNo`.
    pub id: String,
    /// Short name, asked when there is no question text.
    pub name: String,
    /// Symptom this question was written for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom_id: Option<String>,
    /// Expected answer kind.
    #[serde(default)]
    pub question_type: QuestionType,
    /// Question text shown to the user; falls back to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
}

impl Diagnostic {
    /// The text to present when asking this question.
    pub fn prompt(&self) -> &str {
        self.question_text.as_deref().unwrap_or(&self.name)
    }
}

/// A link the rule compiler will drop because its target does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingReference {
    /// A candidate-solution link to an unknown solution.
    Solution {
        /// Symptom holding the link.
        symptom_id: String,
        /// Missing solution id.
        solution_id: String,
    },
    /// A root-cause link to an unknown symptom.
    RootCause {
        /// Symptom holding the link.
        symptom_id: String,
        /// Missing symptom id.
        cause_id: String,
    },
    /// A `mustBeYes`/`mustBeNo` id with no diagnostic question.
    Diagnostic {
        /// Symptom holding the link.
        symptom_id: String,
        /// Missing diagnostic id.
        diagnostic_id: String,
    },
}

/// Serialized form of a knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseFile {
    #[serde(default)]
    symptoms: Vec<Symptom>,
    #[serde(default)]
    solutions: Vec<Solution>,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

/// Immutable knowledge base with id lookups.
///
/// Symptom order is significant: it drives rule priority.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    symptoms: Vec<Symptom>,
    solutions: Vec<Solution>,
    diagnostics: Vec<Diagnostic>,
    symptom_index: HashMap<String, usize>,
    solution_index: HashMap<String, usize>,
    diagnostic_index: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Build a knowledge base, rejecting duplicate ids.
    pub fn new(
        symptoms: Vec<Symptom>,
        solutions: Vec<Solution>,
        diagnostics: Vec<Diagnostic>,
    ) -> KnowledgeBaseResult<Self> {
        let symptom_index = index_by_id("symptom", &symptoms, |s| &s.id)?;
        let solution_index = index_by_id("solution", &solutions, |s| &s.id)?;
        let diagnostic_index = index_by_id("diagnostic", &diagnostics, |d| &d.id)?;

        Ok(Self {
            symptoms,
            solutions,
            diagnostics,
            symptom_index,
            solution_index,
            diagnostic_index,
        })
    }

    /// Parse a knowledge base from a JSON document with `symptoms`,
    /// `solutions` and `diagnostics` arrays.
    pub fn from_json_str(json: &str) -> KnowledgeBaseResult<Self> {
        let file: KnowledgeBaseFile = serde_json::from_str(json)?;
        Self::new(file.symptoms, file.solutions, file.diagnostics)
    }

    /// Load a knowledge base from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> KnowledgeBaseResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let kb = Self::from_json_str(&raw)?;
        debug!(
            path = %path.display(),
            symptoms = kb.symptoms.len(),
            solutions = kb.solutions.len(),
            diagnostics = kb.diagnostics.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// Symptoms in declaration order.
    pub fn symptoms(&self) -> &[Symptom] {
        &self.symptoms
    }

    /// Solutions in declaration order.
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Diagnostic questions in declaration order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Symptom by id.
    pub fn symptom(&self, id: &str) -> Option<&Symptom> {
        self.symptom_index.get(id).map(|&i| &self.symptoms[i])
    }

    /// Solution by id.
    pub fn solution(&self, id: &str) -> Option<&Solution> {
        self.solution_index.get(id).map(|&i| &self.solutions[i])
    }

    /// Diagnostic question by id.
    pub fn diagnostic(&self, id: &str) -> Option<&Diagnostic> {
        self.diagnostic_index.get(id).map(|&i| &self.diagnostics[i])
    }

    /// Links whose targets are missing.
    ///
    /// Missing solutions and root-cause symptoms make the compiler skip the
    /// link. A missing diagnostic still compiles, but its question can never
    /// be answered, so the rule can never fire.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for symptom in &self.symptoms {
            for link in &symptom.rules {
                if self.solution(&link.solution_id).is_none() {
                    dangling.push(DanglingReference::Solution {
                        symptom_id: symptom.id.clone(),
                        solution_id: link.solution_id.clone(),
                    });
                }
            }
            for cause in &symptom.root_causes {
                if self.symptom(&cause.symptom_id).is_none() {
                    dangling.push(DanglingReference::RootCause {
                        symptom_id: symptom.id.clone(),
                        cause_id: cause.symptom_id.clone(),
                    });
                }
            }

            let mut seen = HashSet::new();
            let guards = symptom
                .rules
                .iter()
                .map(|l| &l.conditions)
                .chain(symptom.root_causes.iter().map(|c| &c.conditions));
            for guard in guards {
                for id in guard.must_be_yes.iter().chain(&guard.must_be_no) {
                    if self.diagnostic(id).is_none() && seen.insert(id.clone()) {
                        dangling.push(DanglingReference::Diagnostic {
                            symptom_id: symptom.id.clone(),
                            diagnostic_id: id.clone(),
                        });
                    }
                }
            }
        }
        dangling
    }
}

fn index_by_id<T>(
    kind: &'static str,
    items: &[T],
    id: impl Fn(&T) -> &String,
) -> KnowledgeBaseResult<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if index.insert(id(item).clone(), i).is_some() {
            return Err(KnowledgeBaseError::DuplicateId {
                kind,
                id: id(item).clone(),
            });
        }
    }
    Ok(index)
}
