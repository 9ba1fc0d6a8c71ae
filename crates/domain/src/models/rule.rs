//! Rule definitions: the tagged union over both rule families.
//!
//! Two rule systems evolved independently in this platform: use-case rules
//! (typed by `rule_type`, assigned to use cases) and legacy batch rules
//! (criteria + operator over a named user attribute). Both are predicates
//! over a member set, so they share one `RuleSpec` union and one evaluator
//! dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Rule types of the use-case rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCaseRuleType {
    GroupSize,
    MaxSameUniversity,
    RequiredLearningPaths,
}

impl UseCaseRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UseCaseRuleType::GroupSize => "group_size",
            UseCaseRuleType::MaxSameUniversity => "max_same_university",
            UseCaseRuleType::RequiredLearningPaths => "required_learning_paths",
        }
    }

    /// Rank used for the presentation-significant ordering of verdicts.
    pub fn display_rank(&self) -> u8 {
        match self {
            UseCaseRuleType::GroupSize => 0,
            UseCaseRuleType::MaxSameUniversity => 1,
            UseCaseRuleType::RequiredLearningPaths => 2,
        }
    }

    /// Parses a stored rule value according to this rule type.
    ///
    /// Creation-time validation uses this to reject malformed values before
    /// they are persisted; the evaluator re-parses defensively so a bad
    /// stored value fails its own rule rather than the whole run.
    pub fn parse_value(&self, raw: &str) -> Result<RuleValue, RuleValueError> {
        match self {
            UseCaseRuleType::GroupSize | UseCaseRuleType::MaxSameUniversity => {
                match raw.trim().parse::<i64>() {
                    Ok(n) if n > 0 => Ok(RuleValue::Count(n)),
                    _ => Err(RuleValueError::NotAPositiveInteger(raw.to_string())),
                }
            }
            UseCaseRuleType::RequiredLearningPaths => {
                let entries: Vec<String> = raw
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect();
                if entries.is_empty() {
                    Err(RuleValueError::EmptyList(raw.to_string()))
                } else {
                    Ok(RuleValue::NameList(entries))
                }
            }
        }
    }
}

impl FromStr for UseCaseRuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "group_size" => Ok(UseCaseRuleType::GroupSize),
            "max_same_university" => Ok(UseCaseRuleType::MaxSameUniversity),
            "required_learning_paths" => Ok(UseCaseRuleType::RequiredLearningPaths),
            _ => Err(format!("Invalid rule type: {}", s)),
        }
    }
}

impl fmt::Display for UseCaseRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rule value parsed by rule type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    Count(i64),
    NameList(Vec<String>),
}

/// Errors from parsing a stored rule value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleValueError {
    #[error("rule value {0:?} is not a positive integer")]
    NotAPositiveInteger(String),

    #[error("rule value {0:?} is not a non-empty comma-separated list")]
    EmptyList(String),
}

/// Criteria of the legacy batch rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyCriteria {
    GroupSize,
    UserAttributeCount,
    SameUserAttribute,
    UserAttributeUnique,
    MinUserAttributeCount,
    MaxUserAttributeCount,
}

impl LegacyCriteria {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyCriteria::GroupSize => "group_size",
            LegacyCriteria::UserAttributeCount => "user_attribute_count",
            LegacyCriteria::SameUserAttribute => "same_user_attribute",
            LegacyCriteria::UserAttributeUnique => "user_attribute_unique",
            LegacyCriteria::MinUserAttributeCount => "min_user_attribute_count",
            LegacyCriteria::MaxUserAttributeCount => "max_user_attribute_count",
        }
    }
}

impl FromStr for LegacyCriteria {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "group_size" => Ok(LegacyCriteria::GroupSize),
            "user_attribute_count" => Ok(LegacyCriteria::UserAttributeCount),
            "same_user_attribute" => Ok(LegacyCriteria::SameUserAttribute),
            "user_attribute_unique" => Ok(LegacyCriteria::UserAttributeUnique),
            "min_user_attribute_count" => Ok(LegacyCriteria::MinUserAttributeCount),
            "max_user_attribute_count" => Ok(LegacyCriteria::MaxUserAttributeCount),
            _ => Err(format!("Invalid criteria: {}", s)),
        }
    }
}

impl fmt::Display for LegacyCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison operators for legacy rules. `at_least` and `at_most` are
/// accepted as aliases of the inclusive comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::EqualTo => "equal_to",
            CompareOp::NotEqualTo => "not_equal_to",
            CompareOp::GreaterThan => "greater_than",
            CompareOp::GreaterThanOrEqual => "greater_than_or_equal",
            CompareOp::LessThan => "less_than",
            CompareOp::LessThanOrEqual => "less_than_or_equal",
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equal_to" => Ok(CompareOp::EqualTo),
            "not_equal_to" => Ok(CompareOp::NotEqualTo),
            "greater_than" => Ok(CompareOp::GreaterThan),
            "greater_than_or_equal" | "at_least" => Ok(CompareOp::GreaterThanOrEqual),
            "less_than" => Ok(CompareOp::LessThan),
            "less_than_or_equal" | "at_most" => Ok(CompareOp::LessThanOrEqual),
            _ => Err(format!("Invalid operator: {}", s)),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A use-case rule as loaded for evaluation.
///
/// `rule_type` stays raw here: unknown stored types must fail their own
/// verdict instead of aborting the evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UseCaseRuleSpec {
    pub rule_id: Uuid,
    pub rule_type: String,
    pub rule_value: String,
    pub description: String,
    pub is_required: bool,
}

/// A legacy batch rule as loaded for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LegacyRuleSpec {
    pub rule_id: Uuid,
    pub criteria: String,
    pub operator: String,
    pub user_attribute: String,
    pub attribute_value: Option<String>,
    pub value: i64,
    pub is_required: bool,
}

impl LegacyRuleSpec {
    /// Human-readable label shown in verdict lists.
    pub fn label(&self) -> String {
        match self.attribute_value.as_deref() {
            Some(av) => format!(
                "{} {} {} ({} = {})",
                self.criteria, self.operator, self.value, self.user_attribute, av
            ),
            None => format!(
                "{} {} {} ({})",
                self.criteria, self.operator, self.value, self.user_attribute
            ),
        }
    }
}

/// A single rule from either family: one predicate over a member set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum RuleSpec {
    UseCase(UseCaseRuleSpec),
    Legacy(LegacyRuleSpec),
}

impl RuleSpec {
    pub fn rule_id(&self) -> Uuid {
        match self {
            RuleSpec::UseCase(r) => r.rule_id,
            RuleSpec::Legacy(r) => r.rule_id,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            RuleSpec::UseCase(r) => r.is_required,
            RuleSpec::Legacy(r) => r.is_required,
        }
    }

    pub fn rule_type(&self) -> &str {
        match self {
            RuleSpec::UseCase(r) => &r.rule_type,
            RuleSpec::Legacy(r) => &r.criteria,
        }
    }

    pub fn description(&self) -> String {
        match self {
            RuleSpec::UseCase(r) => r.description.clone(),
            RuleSpec::Legacy(r) => r.label(),
        }
    }
}

/// Request payload for creating a use-case rule definition.
///
/// `rule_value` is validated against `rule_type` at creation time; malformed
/// values never reach storage.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateRuleRequest {
    pub rule_type: String,
    pub rule_value: String,

    #[validate(length(
        min = 1,
        max = 500,
        message = "Description must be between 1 and 500 characters"
    ))]
    pub description: String,
}

/// Request payload for creating a legacy batch rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateLegacyRuleRequest {
    pub batch_id: Uuid,
    pub criteria: String,
    pub operator: String,
    pub user_attribute: String,
    pub attribute_value: Option<String>,
    pub value: i64,
    pub is_required: bool,
}

/// A rule definition as returned by the admin listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleDefinition {
    pub id: Uuid,
    pub rule_type: String,
    pub rule_value: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_type_from_str() {
        assert_eq!(
            UseCaseRuleType::from_str("group_size").unwrap(),
            UseCaseRuleType::GroupSize
        );
        assert_eq!(
            UseCaseRuleType::from_str("GROUP_SIZE").unwrap(),
            UseCaseRuleType::GroupSize
        );
        assert_eq!(
            UseCaseRuleType::from_str("MAX_SAME_UNIVERSITY").unwrap(),
            UseCaseRuleType::MaxSameUniversity
        );
        assert_eq!(
            UseCaseRuleType::from_str("required_learning_paths").unwrap(),
            UseCaseRuleType::RequiredLearningPaths
        );
        assert!(UseCaseRuleType::from_str("min_gpa").is_err());
    }

    #[test]
    fn test_rule_type_display_rank_order() {
        assert!(
            UseCaseRuleType::GroupSize.display_rank()
                < UseCaseRuleType::MaxSameUniversity.display_rank()
        );
        assert!(
            UseCaseRuleType::MaxSameUniversity.display_rank()
                < UseCaseRuleType::RequiredLearningPaths.display_rank()
        );
    }

    #[test]
    fn test_parse_value_integer_types() {
        assert_eq!(
            UseCaseRuleType::GroupSize.parse_value("4").unwrap(),
            RuleValue::Count(4)
        );
        assert_eq!(
            UseCaseRuleType::MaxSameUniversity.parse_value(" 2 ").unwrap(),
            RuleValue::Count(2)
        );
        assert!(matches!(
            UseCaseRuleType::GroupSize.parse_value("four"),
            Err(RuleValueError::NotAPositiveInteger(_))
        ));
        assert!(matches!(
            UseCaseRuleType::GroupSize.parse_value("0"),
            Err(RuleValueError::NotAPositiveInteger(_))
        ));
        assert!(matches!(
            UseCaseRuleType::GroupSize.parse_value("-1"),
            Err(RuleValueError::NotAPositiveInteger(_))
        ));
    }

    #[test]
    fn test_parse_value_list_type() {
        assert_eq!(
            UseCaseRuleType::RequiredLearningPaths
                .parse_value("ML, Cloud ,Mobile")
                .unwrap(),
            RuleValue::NameList(vec![
                "ML".to_string(),
                "Cloud".to_string(),
                "Mobile".to_string()
            ])
        );
        assert!(matches!(
            UseCaseRuleType::RequiredLearningPaths.parse_value("  ,  , "),
            Err(RuleValueError::EmptyList(_))
        ));
        assert!(matches!(
            UseCaseRuleType::RequiredLearningPaths.parse_value(""),
            Err(RuleValueError::EmptyList(_))
        ));
    }

    #[test]
    fn test_compare_op_aliases() {
        assert_eq!(
            CompareOp::from_str("at_least").unwrap(),
            CompareOp::GreaterThanOrEqual
        );
        assert_eq!(
            CompareOp::from_str("AT_MOST").unwrap(),
            CompareOp::LessThanOrEqual
        );
        assert_eq!(
            CompareOp::from_str("LESS_THAN_OR_EQUAL").unwrap(),
            CompareOp::LessThanOrEqual
        );
        assert!(CompareOp::from_str("approximately").is_err());
    }

    #[test]
    fn test_legacy_criteria_from_str() {
        assert_eq!(
            LegacyCriteria::from_str("USER_ATTRIBUTE_UNIQUE").unwrap(),
            LegacyCriteria::UserAttributeUnique
        );
        assert_eq!(
            LegacyCriteria::from_str("same_user_attribute").unwrap(),
            LegacyCriteria::SameUserAttribute
        );
        assert!(LegacyCriteria::from_str("median_age").is_err());
    }

    #[test]
    fn test_legacy_rule_label() {
        let rule = LegacyRuleSpec {
            rule_id: Uuid::new_v4(),
            criteria: "user_attribute_count".to_string(),
            operator: "at_least".to_string(),
            user_attribute: "learning_path".to_string(),
            attribute_value: Some("ML".to_string()),
            value: 2,
            is_required: true,
        };
        assert_eq!(
            rule.label(),
            "user_attribute_count at_least 2 (learning_path = ML)"
        );
    }

    #[test]
    fn test_rule_spec_accessors() {
        let id = Uuid::new_v4();
        let spec = RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id: id,
            rule_type: "group_size".to_string(),
            rule_value: "4".to_string(),
            description: "Teams of four".to_string(),
            is_required: true,
        });
        assert_eq!(spec.rule_id(), id);
        assert!(spec.is_required());
        assert_eq!(spec.rule_type(), "group_size");
        assert_eq!(spec.description(), "Teams of four");
    }
}
