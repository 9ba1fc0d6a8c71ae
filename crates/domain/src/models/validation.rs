//! Verdict types produced by group validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::group::{Group, GroupStatus};
use super::member::MemberProfile;
use super::rule::RuleSpec;
use super::use_case::UseCaseSummary;

/// Which rule family a verdict entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    UseCase,
    Legacy,
}

/// Outcome of evaluating a single rule against a member set.
///
/// An unmet rule is `passed = false`, never an error: rule evaluation has no
/// failure mode besides its verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleVerdict {
    pub passed: bool,
    pub current_value: serde_json::Value,
    pub expected_value: serde_json::Value,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    #[serde(default)]
    pub details: serde_json::Value,
}

impl RuleVerdict {
    /// A failed verdict with no meaningful current/expected values, used for
    /// unknown rule types and malformed stored values.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            current_value: serde_json::Value::Null,
            expected_value: serde_json::Value::Null,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }
}

/// A rule verdict annotated with the rule's identity, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleCheck {
    pub rule_id: Uuid,
    pub source: RuleSource,
    pub rule_type: String,
    pub description: String,
    pub is_required: bool,
    pub verdict: RuleVerdict,
}

/// Aggregate verdict for a group against its selected use case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupVerdict {
    pub group_id: Uuid,
    pub group_name: String,
    pub status: GroupStatus,
    pub has_use_case: bool,
    pub use_case: Option<UseCaseSummary>,
    pub member_count: i64,
    pub validations: Vec<RuleCheck>,
    pub all_required_passed: bool,
    pub can_lock: bool,
}

/// Everything the verdict aggregation needs, loaded in one consistent read.
///
/// When the group has no use case selected, `use_case` is `None` and
/// `rules`/`members` are left empty; aggregation short-circuits without
/// looking at them.
#[derive(Debug, Clone)]
pub struct ValidationSnapshot {
    pub group: Group,
    pub use_case: Option<UseCaseSummary>,
    pub rules: Vec<RuleSpec>,
    pub members: Vec<MemberProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_verdict() {
        let verdict = RuleVerdict::invalid("Unknown rule type: min_gpa");
        assert!(!verdict.passed);
        assert!(verdict.current_value.is_null());
        assert!(verdict.expected_value.is_null());
        assert_eq!(verdict.message, "Unknown rule type: min_gpa");
    }

    #[test]
    fn test_verdict_details_omitted_when_null() {
        let verdict = RuleVerdict::invalid("nope");
        let json = serde_json::to_value(&verdict).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_verdict_details_serialized_when_present() {
        let verdict = RuleVerdict {
            passed: true,
            current_value: serde_json::json!(3),
            expected_value: serde_json::json!(3),
            message: "ok".to_string(),
            details: serde_json::json!({"largest_university": "Univ X"}),
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["details"]["largest_university"], "Univ X");
    }
}
