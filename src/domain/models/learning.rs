//! Learning domain model: outcomes observed from past decisions, and the
//! patterns extracted from clusters of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One observed outcome of a past action or decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: Uuid,
    pub decision_id: Option<Uuid>,
    pub action_type: String,
    pub expected: Value,
    pub actual: Value,
    pub success: bool,
    /// In `[-1.0, 1.0]`.
    pub feedback_score: f32,
    pub context: Value,
    pub created_at: DateTime<Utc>,
}

impl Outcome {
    /// Derive `success`/`feedback_score` by comparing `expected` to
    /// `actual`. See `derive_success`/`derive_feedback` for the formulas.
    pub fn observe(
        decision_id: Option<Uuid>,
        action_type: impl Into<String>,
        expected: Value,
        actual: Value,
        context: Value,
    ) -> Self {
        let success = derive_success(&expected, &actual);
        let feedback_score = derive_feedback(&expected, &actual, success);
        Self {
            id: Uuid::new_v4(),
            decision_id,
            action_type: action_type.into(),
            expected,
            actual,
            success,
            feedback_score,
            context,
            created_at: Utc::now(),
        }
    }
}

const NUMERIC_SUCCESS_FIELDS: [&str; 3] = ["score", "value", "result"];

/// An explicit error on `actual` is always a failure; an explicit
/// `actual.success` flag is taken verbatim; otherwise fall back to
/// comparing the first numeric field in `{score, value, result}` present
/// on both sides, succeeding if it's within 20% of `expected`'s value.
/// With no such field on either side, fall back to structural equality.
fn derive_success(expected: &Value, actual: &Value) -> bool {
    if actual.get("error").is_some() {
        return false;
    }
    if let Some(success) = actual.get("success").and_then(Value::as_bool) {
        return success;
    }
    for field in NUMERIC_SUCCESS_FIELDS {
        if let (Some(expected_n), Some(actual_n)) = (
            expected.get(field).and_then(Value::as_f64),
            actual.get(field).and_then(Value::as_f64),
        ) {
            return within_tolerance(expected_n, actual_n, 0.2);
        }
    }
    expected == actual
}

fn within_tolerance(expected: f64, actual: f64, tolerance: f64) -> bool {
    if expected == 0.0 {
        return actual == 0.0;
    }
    ((actual - expected) / expected).abs() <= tolerance
}

/// Mean of `clamp(1 - |diff_ratio|, -1, 1)` across every numeric key common
/// to both objects; non-numeric keys contribute 1.0 if equal, 0.0 if not.
/// An explicit `actual.error` is always -1.0. Objects with no common keys
/// fall back to 0.5 if `success`, else -0.5.
fn derive_feedback(expected: &Value, actual: &Value, success: bool) -> f32 {
    if actual.get("error").is_some() {
        return -1.0;
    }

    let (Some(expected_obj), Some(actual_obj)) = (expected.as_object(), actual.as_object()) else {
        return if success { 0.5 } else { -0.5 };
    };

    let mut total = 0.0_f64;
    let mut count = 0_u32;
    for (key, expected_value) in expected_obj {
        let Some(actual_value) = actual_obj.get(key) else {
            continue;
        };
        let contribution = match (expected_value.as_f64(), actual_value.as_f64()) {
            (Some(e), Some(a)) => diff_ratio_score(e, a),
            _ => {
                if expected_value == actual_value {
                    1.0
                } else {
                    0.0
                }
            }
        };
        total += contribution;
        count += 1;
    }

    if count == 0 {
        return if success { 0.5 } else { -0.5 };
    }
    (total / f64::from(count)) as f32
}

fn diff_ratio_score(expected: f64, actual: f64) -> f64 {
    let diff_ratio = if expected == 0.0 {
        if actual == 0.0 {
            0.0
        } else {
            1.0
        }
    } else {
        ((actual - expected) / expected).abs()
    };
    (1.0 - diff_ratio).clamp(-1.0, 1.0)
}

/// Category a pattern was clustered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Successful,
    Anomalous,
    Behavioral,
    Temporal,
    Causal,
}

impl PatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::Anomalous => "anomalous",
            Self::Behavioral => "behavioral",
            Self::Temporal => "temporal",
            Self::Causal => "causal",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "successful" => Some(Self::Successful),
            "anomalous" => Some(Self::Anomalous),
            "behavioral" => Some(Self::Behavioral),
            "temporal" => Some(Self::Temporal),
            "causal" => Some(Self::Causal),
            _ => None,
        }
    }
}

/// A pattern extracted from a cluster of outcomes sharing an `action_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: Uuid,
    pub category: PatternCategory,
    pub conditions: Value,
    pub confidence: f32,
    pub occurrence_count: u64,
    pub last_seen: DateTime<Utc>,
}

impl Pattern {
    pub fn new(category: PatternCategory, conditions: Value, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            conditions,
            confidence,
            occurrence_count: 1,
            last_seen: Utc::now(),
        }
    }

    pub fn reinforce(&mut self) {
        self.occurrence_count += 1;
        self.last_seen = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_marks_matching_expected_actual_as_success() {
        let outcome = Outcome::observe(
            None,
            "provider_selection",
            serde_json::json!({"provider": "openai"}),
            serde_json::json!({"provider": "openai"}),
            serde_json::json!({}),
        );
        assert!(outcome.success);
        assert_eq!(outcome.feedback_score, 1.0);
    }

    #[test]
    fn observe_marks_mismatch_as_failure() {
        let outcome = Outcome::observe(
            None,
            "provider_selection",
            serde_json::json!({"provider": "openai"}),
            serde_json::json!({"provider": "anthropic"}),
            serde_json::json!({}),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.feedback_score, 0.0);
    }

    #[test]
    fn observe_respects_explicit_error_field() {
        let outcome = Outcome::observe(
            None,
            "provider_selection",
            serde_json::json!({"score": 10}),
            serde_json::json!({"error": "timeout"}),
            serde_json::json!({}),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.feedback_score, -1.0);
    }

    #[test]
    fn observe_respects_explicit_success_flag() {
        let outcome = Outcome::observe(
            None,
            "goal_check",
            serde_json::json!({"anything": "irrelevant"}),
            serde_json::json!({"success": true}),
            serde_json::json!({}),
        );
        assert!(outcome.success);
    }

    #[test]
    fn observe_numeric_field_within_tolerance_succeeds() {
        let outcome = Outcome::observe(
            None,
            "latency_check",
            serde_json::json!({"score": 100.0}),
            serde_json::json!({"score": 110.0}),
            serde_json::json!({}),
        );
        assert!(outcome.success);
        assert!(outcome.feedback_score > 0.85);
    }

    #[test]
    fn observe_numeric_field_outside_tolerance_fails() {
        let outcome = Outcome::observe(
            None,
            "latency_check",
            serde_json::json!({"score": 100.0}),
            serde_json::json!({"score": 200.0}),
            serde_json::json!({}),
        );
        assert!(!outcome.success);
    }

    #[test]
    fn observe_mixed_key_feedback_is_the_mean_across_common_keys() {
        let outcome = Outcome::observe(
            None,
            "mixed",
            serde_json::json!({"value": 10.0, "label": "ok"}),
            serde_json::json!({"value": 10.0, "label": "ok"}),
            serde_json::json!({}),
        );
        assert_eq!(outcome.feedback_score, 1.0);
    }

    #[test]
    fn observe_with_no_common_keys_falls_back_by_success() {
        let success_case = Outcome::observe(
            None,
            "empty",
            serde_json::json!({"foo": 1}),
            serde_json::json!({"success": true}),
            serde_json::json!({}),
        );
        assert_eq!(success_case.feedback_score, 0.5);

        let failure_case = Outcome::observe(
            None,
            "empty",
            serde_json::json!({"foo": 1}),
            serde_json::json!({"success": false}),
            serde_json::json!({}),
        );
        assert_eq!(failure_case.feedback_score, -0.5);
    }

    #[test]
    fn reinforce_bumps_occurrence_count() {
        let mut pattern = Pattern::new(PatternCategory::Successful, serde_json::json!({}), 0.5);
        pattern.reinforce();
        assert_eq!(pattern.occurrence_count, 2);
    }

    use proptest::prelude::*;
    use test_strategy::proptest;

    #[proptest]
    fn identical_score_fields_always_succeed(#[strategy(-1e6f64..1e6)] score: f64) {
        let expected = serde_json::json!({"score": score});
        let actual = serde_json::json!({"score": score});
        prop_assert!(derive_success(&expected, &actual));
    }

    #[proptest]
    fn explicit_error_is_never_a_success(#[strategy(".*")] message: String) {
        let expected = serde_json::json!({"score": 1});
        let actual = serde_json::json!({"error": message});
        prop_assert!(!derive_success(&expected, &actual));
        prop_assert_eq!(derive_feedback(&expected, &actual, false), -1.0);
    }

    #[proptest]
    fn feedback_is_always_within_unit_range(
        #[strategy(-1e6f64..1e6)] expected_score: f64,
        #[strategy(-1e6f64..1e6)] actual_score: f64,
    ) {
        let expected = serde_json::json!({"score": expected_score});
        let actual = serde_json::json!({"score": actual_score});
        let feedback = derive_feedback(&expected, &actual, true);
        prop_assert!((-1.0..=1.0).contains(&feedback));
    }
}
