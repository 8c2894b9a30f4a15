//! End-to-end diagnostic session tests.
//!
//! Callbacks are scripted per id and record every invocation, so the tests
//! can check both the outcome and how often the user was asked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use diagnostic_advisor::diagnostics::{
    Answer, Callbacks, ConfirmationPrompt, DiagnosticCallback, DiagnosticEngine, EventKind,
    SilentObserver, SolutionCallback,
};
use diagnostic_advisor::error::CallbackError;
use diagnostic_advisor::knowledge::{Diagnostic, KnowledgeBase, Solution};
use diagnostic_advisor::{AppError, EngineConfig};
use pretty_assertions::assert_eq;

/// Scripted user: answers by id, falling back to a default, and logs calls.
struct ScriptedUser {
    default: Answer,
    overrides: HashMap<String, Result<Answer, CallbackError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedUser {
    fn answering(default: &str) -> Arc<Self> {
        Arc::new(Self {
            default: Answer::from(default),
            overrides: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn with_overrides(default: &str, overrides: Vec<(&str, Result<Answer, CallbackError>)>) -> Arc<Self> {
        Arc::new(Self {
            default: Answer::from(default),
            overrides: overrides
                .into_iter()
                .map(|(id, a)| (id.to_string(), a))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn answer(&self, id: String) -> Result<Answer, CallbackError> {
        let result = self
            .overrides
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Ok(self.default.clone()));
        self.calls.lock().unwrap().push(id);
        result
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| *c == id).count()
    }
}

#[async_trait]
impl DiagnosticCallback for ScriptedUser {
    async fn ask(&self, diagnostic: &Diagnostic) -> Result<Answer, CallbackError> {
        self.answer(diagnostic.id.clone())
    }
}

#[async_trait]
impl SolutionCallback for ScriptedUser {
    async fn confirm(
        &self,
        solution: &Solution,
        prompt: ConfirmationPrompt,
    ) -> Result<Answer, CallbackError> {
        self.answer(prompt.fact_id(&solution.id))
    }
}

const WATER_KB: &str = r#"{
    "symptoms": [{
        "id": "Symptom1",
        "name": "Water tastes bad",
        "rules": [{
            "solutionId": "Solution1",
            "systemTypes": ["Type1", "Type2"],
            "mustBeYes": ["Question1"],
            "mustBeNo": []
        }],
        "rootCauses": []
    }],
    "solutions": [
        {"id": "Solution1", "symptomId": "Symptom1", "name": "Change the filter",
         "instructions": "Take out the old and put in the new", "askDidItWork": true},
        {"id": "Solution2", "symptomId": "Symptom1", "name": "Do something else",
         "instructions": "Just try anything", "askDidItWork": false}
    ],
    "diagnostics": [
        {"id": "Question1", "symptomId": "Symptom1", "name": "Do you have spare filters?"},
        {"id": "Question2", "symptomId": "Symptom1", "name": "Is this question relevant?"}
    ]
}"#;

fn engine_for(
    kb: &str,
    diagnostic: Arc<ScriptedUser>,
    solution: Arc<ScriptedUser>,
) -> DiagnosticEngine {
    let mut engine =
        DiagnosticEngine::new(EngineConfig::default()).with_observer(Arc::new(SilentObserver));
    engine
        .initialize(
            KnowledgeBase::from_json_str(kb).unwrap(),
            Callbacks::new(diagnostic, solution),
        )
        .unwrap();
    engine
}

#[tokio::test]
async fn test_confirmed_solution_solves_symptom() {
    let questions = ScriptedUser::answering("yes");
    let confirmations = ScriptedUser::answering("yes");
    let engine = engine_for(WATER_KB, questions.clone(), confirmations.clone());

    let outcome = engine.run(&["Symptom1"], &["Type1"]).await.unwrap();

    assert_eq!(outcome.events.len(), 1);
    let event = &outcome.events[0];
    assert_eq!(event.kind, EventKind::Solved);
    assert_eq!(event.symptom_id, "Symptom1");
    assert_eq!(event.solution_id.as_deref(), Some("Solution1"));
    assert_eq!(event.message, "Change the filter");
    assert_eq!(event.rule, "Water tastes bad: Change the filter");
    assert!(outcome.active_symptoms.is_empty());
    assert_eq!(questions.calls(), vec!["Question1"]);
    assert_eq!(confirmations.calls(), vec!["Solution1"]);
    assert_eq!(outcome.facts.get("Question1"), Some(&serde_json::json!("yes")));
}

#[tokio::test]
async fn test_diagnostic_answered_no_fires_nothing() {
    let confirmations = ScriptedUser::answering("yes");
    let engine = engine_for(WATER_KB, ScriptedUser::answering("no"), confirmations.clone());

    let outcome = engine.run(&["Symptom1"], &["Type1"]).await.unwrap();

    assert!(outcome.is_empty());
    assert_eq!(outcome.active_symptoms, vec!["Symptom1"]);
    // Short-circuit: the confirmation is never requested.
    assert!(confirmations.calls().is_empty());
}

#[tokio::test]
async fn test_confirmation_answered_no_fires_nothing() {
    let engine = engine_for(
        WATER_KB,
        ScriptedUser::answering("yes"),
        ScriptedUser::answering("no"),
    );

    let outcome = engine.run(&["Symptom1"], &["Type1"]).await.unwrap();

    assert_eq!(outcome.solved().count(), 0);
    assert!(outcome.is_empty());
    assert_eq!(outcome.active_symptoms, vec!["Symptom1"]);
    assert_eq!(outcome.rule_results.len(), 1);
    assert!(!outcome.rule_results[0].result);
}

#[tokio::test]
async fn test_unmatched_system_type_fires_nothing() {
    let questions = ScriptedUser::answering("yes");
    let engine = engine_for(WATER_KB, questions.clone(), ScriptedUser::answering("yes"));

    let outcome = engine.run(&["Symptom1"], &["TypeB"]).await.unwrap();

    assert!(outcome.is_empty());
    assert!(questions.calls().is_empty());
}

#[test]
fn test_questions_cannot_outrank_symptom_check() {
    let questions = ScriptedUser::answering("yes");
    let confirmations = ScriptedUser::answering("yes");
    let mut engine = DiagnosticEngine::new(EngineConfig {
        fact_priority_start: 200_000,
        ..EngineConfig::default()
    })
    .with_observer(Arc::new(SilentObserver));

    let err = engine
        .initialize(
            KnowledgeBase::from_json_str(WATER_KB).unwrap(),
            Callbacks::new(questions.clone(), confirmations.clone()),
        )
        .unwrap_err();

    assert!(matches!(err, AppError::Config { .. }));
    assert!(!engine.is_initialized());
    assert!(questions.calls().is_empty());
    assert!(confirmations.calls().is_empty());
}

#[tokio::test]
async fn test_inactive_symptom_asks_nothing_with_custom_priorities() {
    let questions = ScriptedUser::answering("yes");
    let confirmations = ScriptedUser::answering("yes");
    let mut engine = DiagnosticEngine::new(EngineConfig {
        fact_priority_start: 50,
        session_fact_priority: 100,
        ..EngineConfig::default()
    })
    .with_observer(Arc::new(SilentObserver));
    engine
        .initialize(
            KnowledgeBase::from_json_str(WATER_KB).unwrap(),
            Callbacks::new(questions.clone(), confirmations.clone()),
        )
        .unwrap();

    let outcome = engine.run(&["Other"], &["Type1"]).await.unwrap();

    assert!(outcome.is_empty());
    assert!(questions.calls().is_empty());
    assert!(confirmations.calls().is_empty());
}

#[tokio::test]
async fn test_inactive_symptom_asks_nothing() {
    let questions = ScriptedUser::answering("yes");
    let engine = engine_for(WATER_KB, questions.clone(), ScriptedUser::answering("yes"));

    let outcome = engine.run(&["SymptomX"], &["Type1"]).await.unwrap();

    assert!(outcome.is_empty());
    assert!(questions.calls().is_empty());
    assert_eq!(outcome.active_symptoms, vec!["SymptomX"]);
}

const ROOT_CAUSE_KB: &str = r#"{
    "symptoms": [
        {"id": "Symptom1", "name": "Water tastes bad", "rootCauses": [{"symptomId": "Symptom2"}]},
        {"id": "Symptom2", "name": "Filter clogged"}
    ]
}"#;

#[tokio::test]
async fn test_root_cause_adds_symptom() {
    let engine = engine_for(
        ROOT_CAUSE_KB,
        ScriptedUser::answering("yes"),
        ScriptedUser::answering("yes"),
    );

    let outcome = engine.run(&["Symptom1"], &["Type1"]).await.unwrap();

    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].kind, EventKind::AddSymptom);
    assert_eq!(outcome.events[0].cause_id.as_deref(), Some("Symptom2"));
    assert_eq!(outcome.events[0].message, "Filter clogged");
    assert_eq!(outcome.active_symptoms, vec!["Symptom1", "Symptom2"]);
}

#[tokio::test]
async fn test_added_symptom_matches_later_rules_in_same_pass() {
    let kb = r#"{
        "symptoms": [
            {"id": "Symptom1", "name": "Water tastes bad", "rootCauses": [{"symptomId": "Symptom2"}]},
            {"id": "Symptom2", "name": "Filter clogged", "rules": [{"solutionId": "Solution2"}]}
        ],
        "solutions": [{"id": "Solution2", "name": "Flush the filter", "askDidItWork": false}]
    }"#;
    let engine = engine_for(kb, ScriptedUser::answering("yes"), ScriptedUser::answering("yes"));

    let outcome = engine.run(&["Symptom1"], &[] as &[&str]).await.unwrap();

    let kinds: Vec<_> = outcome.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::AddSymptom, EventKind::Deferred]);
    assert_eq!(outcome.deferred().next().unwrap().solution_id.as_deref(), Some("Solution2"));
    // Deferred does not remove the symptom.
    assert_eq!(outcome.active_symptoms, vec!["Symptom1", "Symptom2"]);
}

#[tokio::test]
async fn test_added_symptom_does_not_revisit_earlier_rules() {
    // Symptom2 is declared first, so its rule is evaluated before Symptom1's
    // root cause adds it.
    let kb = r#"{
        "symptoms": [
            {"id": "Symptom2", "name": "Filter clogged", "rules": [{"solutionId": "Solution2"}]},
            {"id": "Symptom1", "name": "Water tastes bad", "rootCauses": [{"symptomId": "Symptom2"}]}
        ],
        "solutions": [{"id": "Solution2", "name": "Flush the filter", "askDidItWork": false}]
    }"#;
    let engine = engine_for(kb, ScriptedUser::answering("yes"), ScriptedUser::answering("yes"));

    let outcome = engine.run(&["Symptom1"], &[] as &[&str]).await.unwrap();

    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].kind, EventKind::AddSymptom);
    assert_eq!(outcome.active_symptoms, vec!["Symptom1", "Symptom2"]);
}

#[tokio::test]
async fn test_root_cause_cycle_terminates() {
    let kb = r#"{
        "symptoms": [
            {"id": "A", "name": "Low pressure", "rootCauses": [{"symptomId": "B"}]},
            {"id": "B", "name": "Pump failing", "rootCauses": [{"symptomId": "A"}]}
        ]
    }"#;
    let engine = engine_for(kb, ScriptedUser::answering("yes"), ScriptedUser::answering("yes"));

    let outcome = engine.run(&["A"], &[] as &[&str]).await.unwrap();

    let causes: Vec<_> = outcome
        .added_symptoms()
        .map(|e| e.cause_id.clone().unwrap())
        .collect();
    assert_eq!(causes, vec!["B", "A"]);
    assert_eq!(outcome.active_symptoms, vec!["A", "B"]);
    assert_eq!(outcome.rule_results.len(), 2);
}

#[tokio::test]
async fn test_solved_symptom_stops_matching_later_rules() {
    let kb = r#"{
        "symptoms": [{
            "id": "Symptom1",
            "name": "Water tastes bad",
            "rules": [{"solutionId": "Solution1"}, {"solutionId": "Solution2"}]
        }],
        "solutions": [
            {"id": "Solution1", "name": "Change the filter", "askDidItWork": true},
            {"id": "Solution2", "name": "Call a plumber", "askDidItWork": true}
        ]
    }"#;
    let confirmations = ScriptedUser::answering("yes");
    let engine = engine_for(kb, ScriptedUser::answering("yes"), confirmations.clone());

    let outcome = engine.run(&["Symptom1"], &[] as &[&str]).await.unwrap();

    assert_eq!(outcome.solved().count(), 1);
    assert_eq!(confirmations.calls(), vec!["Solution1"]);
    assert!(outcome.active_symptoms.is_empty());
}

#[tokio::test]
async fn test_question_asked_once_across_rules() {
    let kb = r#"{
        "symptoms": [
            {"id": "Symptom1", "name": "Water tastes bad",
             "rules": [{"solutionId": "Solution1", "mustBeYes": ["Question1"]}]},
            {"id": "Symptom2", "name": "Water smells",
             "rules": [{"solutionId": "Solution2", "mustBeYes": ["Question1"]}]}
        ],
        "solutions": [
            {"id": "Solution1", "name": "Change the filter"},
            {"id": "Solution2", "name": "Shock the well"}
        ],
        "diagnostics": [{"id": "Question1", "name": "Do you have spare filters?"}]
    }"#;
    let questions = ScriptedUser::answering("yes");
    let engine = engine_for(kb, questions.clone(), ScriptedUser::answering("yes"));

    let outcome = engine
        .run(&["Symptom1", "Symptom2"], &[] as &[&str])
        .await
        .unwrap();

    assert_eq!(outcome.deferred().count(), 2);
    assert_eq!(questions.count("Question1"), 1);
}

#[tokio::test]
async fn test_confirmation_asked_per_reference() {
    let kb = r#"{
        "symptoms": [
            {"id": "Symptom1", "name": "Water tastes bad", "rules": [{"solutionId": "Solution1"}]},
            {"id": "Symptom2", "name": "Water smells", "rules": [{"solutionId": "Solution1"}]}
        ],
        "solutions": [{"id": "Solution1", "name": "Change the filter", "askDidItWork": true}]
    }"#;
    let confirmations = ScriptedUser::answering("no");
    let engine = engine_for(kb, ScriptedUser::answering("yes"), confirmations.clone());

    let outcome = engine
        .run(&["Symptom1", "Symptom2"], &[] as &[&str])
        .await
        .unwrap();

    assert!(outcome.is_empty());
    assert_eq!(confirmations.count("Solution1"), 2);
}

#[tokio::test]
async fn test_are_you_able_gates_solution() {
    let kb = r#"{
        "symptoms": [{"id": "S", "name": "Leak", "rules": [{"solutionId": "K"}]}],
        "solutions": [{"id": "K", "name": "Tighten the fitting", "askDidItWork": true, "askAreYouAble": true}]
    }"#;
    let confirmations = ScriptedUser::with_overrides("yes", vec![("K:able", Ok(Answer::no()))]);
    let engine = engine_for(kb, ScriptedUser::answering("yes"), confirmations.clone());

    let outcome = engine.run(&["S"], &[] as &[&str]).await.unwrap();

    assert!(outcome.is_empty());
    assert_eq!(confirmations.calls(), vec!["K:able"]);
}

#[tokio::test]
async fn test_rejected_question_only_fails_its_rule() {
    let kb = r#"{
        "symptoms": [{
            "id": "Symptom1",
            "name": "Water tastes bad",
            "rules": [
                {"solutionId": "Solution1", "mustBeYes": ["Question1"]},
                {"solutionId": "Solution2", "mustBeNo": ["Question2"]}
            ]
        }],
        "solutions": [
            {"id": "Solution1", "name": "Change the filter"},
            {"id": "Solution2", "name": "Do something else"}
        ],
        "diagnostics": [
            {"id": "Question1", "name": "Do you have spare filters?"},
            {"id": "Question2", "name": "Is this question relevant?"}
        ]
    }"#;
    let questions = ScriptedUser::with_overrides(
        "no",
        vec![("Question1", Err(CallbackError::new("dialog dismissed")))],
    );
    let engine = engine_for(kb, questions, ScriptedUser::answering("yes"));

    let outcome = engine.run(&["Symptom1"], &[] as &[&str]).await.unwrap();

    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].solution_id.as_deref(), Some("Solution2"));
    let failed = &outcome.rule_results[0];
    assert!(!failed.result);
    assert!(failed.error.as_deref().unwrap().contains("dialog dismissed"));
}

#[tokio::test]
async fn test_missing_callbacks_fail_only_dependent_rules() {
    let mut engine =
        DiagnosticEngine::new(EngineConfig::default()).with_observer(Arc::new(SilentObserver));
    engine
        .initialize(
            KnowledgeBase::from_json_str(ROOT_CAUSE_KB).unwrap(),
            Callbacks::default(),
        )
        .unwrap();

    let outcome = engine.run(&["Symptom1"], &[] as &[&str]).await.unwrap();
    assert_eq!(outcome.added_symptoms().count(), 1);

    let mut engine =
        DiagnosticEngine::new(EngineConfig::default()).with_observer(Arc::new(SilentObserver));
    engine
        .initialize(KnowledgeBase::from_json_str(WATER_KB).unwrap(), Callbacks::default())
        .unwrap();
    let outcome = engine.run(&["Symptom1"], &["Type1"]).await.unwrap();
    assert!(outcome.is_empty());
    assert!(outcome.rule_results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("No callback registered"));
}

#[tokio::test]
async fn test_outcome_serializes_to_json() {
    let engine = engine_for(
        WATER_KB,
        ScriptedUser::answering("yes"),
        ScriptedUser::answering("yes"),
    );
    let outcome = engine.run(&["Symptom1"], &["Type1"]).await.unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["events"][0]["kind"], "solved");
    assert_eq!(json["events"][0]["solutionId"], "Solution1");
    assert_eq!(json["activeSymptoms"], serde_json::json!([]));
    assert!(json["sessionId"].is_string());
    assert!(json["durationMs"].is_u64());
    assert!(json.get("active_symptoms").is_none());
}
