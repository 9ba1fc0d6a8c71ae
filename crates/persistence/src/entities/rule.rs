//! Rule definition entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::rule::{LegacyRuleSpec, RuleSpec, UseCaseRuleSpec};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the rules table.
#[derive(Debug, Clone, FromRow)]
pub struct RuleEntity {
    pub id: Uuid,
    pub rule_type: String,
    pub rule_value: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<RuleEntity> for domain::models::rule::RuleDefinition {
    fn from(entity: RuleEntity) -> Self {
        Self {
            id: entity.id,
            rule_type: entity.rule_type,
            rule_value: entity.rule_value,
            description: entity.description,
        }
    }
}

/// A rule joined with its use-case assignment row.
#[derive(Debug, Clone, FromRow)]
pub struct AssignedRuleEntity {
    pub rule_id: Uuid,
    pub rule_type: String,
    pub rule_value: String,
    pub description: String,
    pub is_required: bool,
    pub position: i32,
}

impl From<AssignedRuleEntity> for RuleSpec {
    fn from(entity: AssignedRuleEntity) -> Self {
        RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id: entity.rule_id,
            rule_type: entity.rule_type,
            rule_value: entity.rule_value,
            description: entity.description,
            is_required: entity.is_required,
        })
    }
}

impl From<AssignedRuleEntity> for domain::models::use_case::AssignedRuleView {
    fn from(entity: AssignedRuleEntity) -> Self {
        Self {
            rule_id: entity.rule_id,
            rule_type: entity.rule_type,
            rule_value: entity.rule_value,
            description: entity.description,
            is_required: entity.is_required,
            position: entity.position,
        }
    }
}

/// Database row mapping for the legacy_rules table.
#[derive(Debug, Clone, FromRow)]
pub struct LegacyRuleEntity {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub criteria: String,
    pub operator: String,
    pub user_attribute: String,
    pub attribute_value: Option<String>,
    pub value: i64,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
}

impl From<LegacyRuleEntity> for LegacyRuleSpec {
    fn from(entity: LegacyRuleEntity) -> Self {
        LegacyRuleSpec {
            rule_id: entity.id,
            criteria: entity.criteria,
            operator: entity.operator,
            user_attribute: entity.user_attribute,
            attribute_value: entity.attribute_value,
            value: entity.value,
            is_required: entity.is_required,
        }
    }
}

impl From<LegacyRuleEntity> for RuleSpec {
    fn from(entity: LegacyRuleEntity) -> Self {
        RuleSpec::Legacy(entity.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_rule_into_spec() {
        let entity = AssignedRuleEntity {
            rule_id: Uuid::new_v4(),
            rule_type: "group_size".to_string(),
            rule_value: "4".to_string(),
            description: "Teams of four".to_string(),
            is_required: true,
            position: 0,
        };
        let spec: RuleSpec = entity.clone().into();
        assert_eq!(spec.rule_id(), entity.rule_id);
        assert_eq!(spec.rule_type(), "group_size");
        assert!(spec.is_required());
    }

    #[test]
    fn test_legacy_rule_into_spec() {
        let entity = LegacyRuleEntity {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            criteria: "user_attribute_unique".to_string(),
            operator: "equal_to".to_string(),
            user_attribute: "university".to_string(),
            attribute_value: None,
            value: 0,
            is_required: false,
            created_at: Utc::now(),
        };
        let spec: RuleSpec = entity.clone().into();
        assert_eq!(spec.rule_id(), entity.id);
        assert!(!spec.is_required());
        assert_eq!(spec.rule_type(), "user_attribute_unique");
    }
}
