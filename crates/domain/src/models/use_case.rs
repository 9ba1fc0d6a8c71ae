//! Use case domain models (capstone project briefs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A project brief that groups select and are validated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UseCase {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal use case info embedded in verdicts and group responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UseCaseSummary {
    pub id: Uuid,
    pub title: String,
}

/// Request payload for creating a use case.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateUseCaseRequest {
    pub batch_id: Uuid,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(max = 2000, message = "Summary must be at most 2000 characters"))]
    pub summary: Option<String>,
}

/// Request payload for updating a use case.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateUseCaseRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Summary must be at most 2000 characters"))]
    pub summary: Option<String>,

    pub is_active: Option<bool>,
}

/// Request to attach a rule to a use case.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttachRuleRequest {
    pub rule_id: Uuid,
    pub is_required: bool,
    pub position: Option<i32>,
}

/// A rule as assigned to a use case, for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AssignedRuleView {
    pub rule_id: Uuid,
    pub rule_type: String,
    pub rule_value: String,
    pub description: String,
    pub is_required: bool,
    pub position: i32,
}

/// Use case with its assigned rules, for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UseCaseWithRules {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub is_active: bool,
    pub rules: Vec<AssignedRuleView>,
}

/// Response after deactivating a use case.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DeactivateUseCaseResponse {
    pub use_case_id: Uuid,
    /// Draft groups whose selection was cleared as part of the deactivation.
    pub cleared_group_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_use_case_request_validation() {
        let valid = CreateUseCaseRequest {
            batch_id: Uuid::new_v4(),
            title: "Smart Campus Energy Dashboard".to_string(),
            summary: Some("Realtime metering for campus buildings".to_string()),
        };
        assert!(valid.validate().is_ok());

        let empty_title = CreateUseCaseRequest {
            batch_id: Uuid::new_v4(),
            title: String::new(),
            summary: None,
        };
        assert!(empty_title.validate().is_err());

        let long_title = CreateUseCaseRequest {
            batch_id: Uuid::new_v4(),
            title: "t".repeat(201),
            summary: None,
        };
        assert!(long_title.validate().is_err());
    }

    #[test]
    fn test_update_use_case_request_validation() {
        let all_none = UpdateUseCaseRequest {
            title: None,
            summary: None,
            is_active: None,
        };
        assert!(all_none.validate().is_ok());

        let bad_title = UpdateUseCaseRequest {
            title: Some(String::new()),
            summary: None,
            is_active: Some(false),
        };
        assert!(bad_title.validate().is_err());
    }
}
