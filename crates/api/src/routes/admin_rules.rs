//! Admin rule management routes, for both rule families.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use domain::models::rule::{
    CompareOp, CreateLegacyRuleRequest, CreateRuleRequest, LegacyCriteria, LegacyRuleSpec,
    RuleDefinition, UseCaseRuleType,
};
use persistence::repositories::RuleRepository;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthContext;

/// Response for rule listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListRulesResponse {
    pub data: Vec<RuleDefinition>,
}

/// Query parameters for the legacy rule listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListLegacyRulesQuery {
    pub batch_id: Uuid,
}

/// Response for the legacy rule listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListLegacyRulesResponse {
    pub data: Vec<LegacyRuleSpec>,
}

/// Create a use-case rule definition.
///
/// POST /api/v1/admin/rules
///
/// The rule value is parsed against the rule type here; malformed values
/// never reach storage.
pub async fn create_rule(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<RuleDefinition>), ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let rule_type: UseCaseRuleType = request
        .rule_type
        .parse()
        .map_err(ApiError::Validation)?;
    rule_type
        .parse_value(&request.rule_value)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let rule = RuleRepository::new(state.pool.clone())
        .create_rule(rule_type.as_str(), &request.rule_value, &request.description)
        .await?;

    info!(
        rule_id = %rule.id,
        rule_type = %rule_type,
        admin_id = %auth.user_id,
        "Rule created"
    );

    Ok((StatusCode::CREATED, Json(rule.into())))
}

/// List all use-case rule definitions.
///
/// GET /api/v1/admin/rules
pub async fn list_rules(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ListRulesResponse>, ApiError> {
    auth.require_admin()?;

    let data = RuleRepository::new(state.pool.clone())
        .list_rules()
        .await?
        .into_iter()
        .map(RuleDefinition::from)
        .collect();

    Ok(Json(ListRulesResponse { data }))
}

/// Create a legacy batch rule.
///
/// POST /api/v1/admin/legacy-rules
pub async fn create_legacy_rule(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateLegacyRuleRequest>,
) -> Result<(StatusCode, Json<LegacyRuleSpec>), ApiError> {
    auth.require_admin()?;

    let criteria: LegacyCriteria = request
        .criteria
        .parse()
        .map_err(ApiError::Validation)?;
    let operator: CompareOp = request
        .operator
        .parse()
        .map_err(ApiError::Validation)?;

    let rule = RuleRepository::new(state.pool.clone())
        .create_legacy_rule(
            request.batch_id,
            criteria.as_str(),
            operator.as_str(),
            &request.user_attribute,
            request.attribute_value.as_deref(),
            request.value,
            request.is_required,
        )
        .await?;

    info!(
        rule_id = %rule.id,
        batch_id = %request.batch_id,
        criteria = %criteria,
        admin_id = %auth.user_id,
        "Legacy rule created"
    );

    Ok((StatusCode::CREATED, Json(rule.into())))
}

/// List legacy rules for a batch.
///
/// GET /api/v1/admin/legacy-rules?batch_id=
pub async fn list_legacy_rules(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListLegacyRulesQuery>,
) -> Result<Json<ListLegacyRulesResponse>, ApiError> {
    auth.require_admin()?;

    let data = RuleRepository::new(state.pool.clone())
        .legacy_rules_for_batch(query.batch_id)
        .await?
        .into_iter()
        .map(LegacyRuleSpec::from)
        .collect();

    Ok(Json(ListLegacyRulesResponse { data }))
}
