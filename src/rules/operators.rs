//! Condition operators.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Operator: `(fact_value, condition_value) -> bool`.
///
/// An undefined fact is passed as `Value::Null`.
pub type OperatorFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Named operators available to rule conditions.
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    /// Create a registry with the built-in operators.
    pub fn new() -> Self {
        let mut registry = Self {
            operators: HashMap::new(),
        };
        registry.register("equal", |a, b| a == b);
        registry.register("notEqual", |a, b| a != b);
        registry.register("in", |a, b| b.as_array().is_some_and(|list| list.contains(a)));
        registry.register("notIn", |a, b| {
            b.as_array().is_some_and(|list| !list.contains(a))
        });
        registry.register("contains", |a, b| a.as_array().is_some_and(|list| list.contains(b)));
        registry.register("doesNotContain", |a, b| {
            a.as_array().is_some_and(|list| !list.contains(b))
        });
        registry.register("lessThan", |a, b| compare(a, b, |x, y| x < y));
        registry.register("lessThanInclusive", |a, b| compare(a, b, |x, y| x <= y));
        registry.register("greaterThan", |a, b| compare(a, b, |x, y| x > y));
        registry.register("greaterThanInclusive", |a, b| compare(a, b, |x, y| x >= y));
        registry
    }

    /// Register an operator, replacing any operator with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, op: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.operators.insert(name.into(), Arc::new(op));
    }

    /// Operator by name.
    pub fn get(&self, name: &str) -> Option<&OperatorFn> {
        self.operators.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.operators.keys().collect();
        names.sort();
        f.debug_struct("OperatorRegistry")
            .field("operators", &names)
            .finish()
    }
}

fn compare(a: &Value, b: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => cmp(x, y),
        _ => false,
    }
}

/// True iff both sides are non-empty arrays sharing at least one element.
pub fn contains_one_of(fact_value: &Value, required: &Value) -> bool {
    let (Some(active), Some(required)) = (fact_value.as_array(), required.as_array()) else {
        return false;
    };
    if active.is_empty() || required.is_empty() {
        return false;
    }
    required.iter().any(|r| active.contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(name: &str, a: Value, b: Value) -> bool {
        let registry = OperatorRegistry::new();
        let op = registry.get(name).unwrap();
        op(&a, &b)
    }

    #[test]
    fn test_equal_is_literal() {
        assert!(apply("equal", json!("yes"), json!("yes")));
        assert!(!apply("equal", json!("Yes"), json!("yes")));
        assert!(!apply("equal", json!(1), json!("1")));
        assert!(!apply("equal", Value::Null, json!("yes")));
    }

    #[test]
    fn test_contains_and_in() {
        assert!(apply("contains", json!(["Symptom1", "Symptom2"]), json!("Symptom2")));
        assert!(!apply("contains", json!(["Symptom1"]), json!("Symptom2")));
        assert!(!apply("contains", Value::Null, json!("Symptom1")));
        assert!(apply("in", json!("b"), json!(["a", "b"])));
        assert!(apply("notIn", json!("c"), json!(["a", "b"])));
        assert!(apply("doesNotContain", json!(["a"]), json!("b")));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(apply("greaterThan", json!(45), json!(40)));
        assert!(apply("lessThanInclusive", json!(40), json!(40)));
        assert!(!apply("lessThan", json!("low"), json!(40)));
    }

    #[test]
    fn test_contains_one_of() {
        assert!(contains_one_of(&json!(["Type1"]), &json!(["Type1", "Type2"])));
        assert!(!contains_one_of(&json!(["TypeB"]), &json!(["Type1", "Type2"])));
        assert!(!contains_one_of(&json!([]), &json!(["Type1"])));
        assert!(!contains_one_of(&json!(["Type1"]), &json!([])));
        assert!(!contains_one_of(&Value::Null, &json!(["Type1"])));
        assert!(!contains_one_of(&json!("Type1"), &json!(["Type1"])));
    }

    #[test]
    fn test_register_custom_operator() {
        let mut registry = OperatorRegistry::new();
        assert!(!registry.contains("containsOneOf"));
        registry.register("containsOneOf", contains_one_of);
        assert!(registry.contains("containsOneOf"));
        let op = registry.get("containsOneOf").unwrap();
        assert!(op(&json!(["Type2"]), &json!(["Type1", "Type2"])));
    }
}
