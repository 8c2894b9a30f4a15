//! Compiles the symptom graph into prioritized production rules.

use serde_json::Value;
use tracing::debug;

use super::callbacks::ConfirmationPrompt;
use super::facts::{FactResolver, SYMPTOMS_FACT, SYSTEM_TYPES_FACT};
use super::outcome::{params, EventKind};
use crate::knowledge::{KnowledgeBase, LinkConditions, RootCauseLink, Solution, SolutionLink, Symptom};
use crate::rules::{Condition, Rule, RuleEvent};

/// Name of the system-type intersection operator.
pub const CONTAINS_ONE_OF: &str = "containsOneOf";

const YES: &str = "yes";
const NO: &str = "no";

/// Compile every rule in one deterministic pass.
///
/// For each symptom in knowledge-base order, candidate-solution rules come
/// first and root-cause rules second. Links to unknown solutions or symptoms
/// are skipped. Priorities run from `count + 1` downwards in compile order.
pub fn compile(knowledge: &KnowledgeBase, resolver: &mut FactResolver) -> Vec<Rule> {
    let mut rules = Vec::new();

    for symptom in knowledge.symptoms() {
        for link in &symptom.rules {
            match knowledge.solution(&link.solution_id) {
                Some(solution) => rules.push(solution_rule(symptom, link, solution, resolver)),
                None => debug!(
                    symptom_id = %symptom.id,
                    solution_id = %link.solution_id,
                    "Skipping link to unknown solution"
                ),
            }
        }
        for cause in &symptom.root_causes {
            match knowledge.symptom(&cause.symptom_id) {
                Some(root) => rules.push(root_cause_rule(symptom, cause, root, resolver)),
                None => debug!(
                    symptom_id = %symptom.id,
                    cause_id = %cause.symptom_id,
                    "Skipping link to unknown root cause"
                ),
            }
        }
    }

    assign_priorities(&mut rules);
    rules
}

fn solution_rule(
    symptom: &Symptom,
    link: &SolutionLink,
    solution: &Solution,
    resolver: &mut FactResolver,
) -> Rule {
    let kind = if solution.ask_did_it_work {
        EventKind::Solved
    } else {
        EventKind::Deferred
    };
    let event = RuleEvent::new(kind.as_str())
        .with_param(params::SYMPTOM_ID, symptom.id.as_str())
        .with_param(params::SOLUTION_ID, solution.id.as_str())
        .with_param(params::MESSAGE, solution.name.as_str());

    let mut rule = guarded_rule(symptom, &solution.name, &link.conditions, event, resolver);

    if solution.ask_are_you_able {
        let fact = resolver.register_confirmation(solution, ConfirmationPrompt::AreYouAble);
        rule.conditions.push(Condition::new(fact, "equal", YES));
    }
    if solution.ask_did_it_work {
        let fact = resolver.register_confirmation(solution, ConfirmationPrompt::DidItWork);
        rule.conditions.push(Condition::new(fact, "equal", YES));
    }
    rule
}

fn root_cause_rule(
    symptom: &Symptom,
    cause: &RootCauseLink,
    root: &Symptom,
    resolver: &mut FactResolver,
) -> Rule {
    let event = RuleEvent::new(EventKind::AddSymptom.as_str())
        .with_param(params::SYMPTOM_ID, symptom.id.as_str())
        .with_param(params::CAUSE_ID, root.id.as_str())
        .with_param(params::MESSAGE, root.name.as_str());

    guarded_rule(symptom, &root.name, &cause.conditions, event, resolver)
}

/// Rule named `"<symptom>: <target>"` whose conjunction starts with the
/// symptom being active, then the system-type and diagnostic guards.
fn guarded_rule(
    symptom: &Symptom,
    target_name: &str,
    guard: &LinkConditions,
    event: RuleEvent,
    resolver: &mut FactResolver,
) -> Rule {
    let mut rule = Rule::new(format!("{}: {}", symptom.name, target_name), event)
        .with_condition(Condition::new(SYMPTOMS_FACT, "contains", symptom.id.as_str()));

    if !guard.system_types.is_empty() {
        let required = Value::Array(
            guard
                .system_types
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
        );
        rule.conditions
            .push(Condition::new(SYSTEM_TYPES_FACT, CONTAINS_ONE_OF, required));
    }

    for id in &guard.must_be_yes {
        rule.conditions.push(Condition::new(id.as_str(), "equal", YES));
        resolver.register_question(id);
    }
    for id in &guard.must_be_no {
        rule.conditions.push(Condition::new(id.as_str(), "equal", NO));
        resolver.register_question(id);
    }
    rule
}

fn assign_priorities(rules: &mut [Rule]) {
    let mut priority = rules.len() as i64 + 1;
    for rule in rules.iter_mut() {
        rule.priority = priority;
        priority -= 1;
    }
}
