//! Admin use case management routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::use_case::{
    AssignedRuleView, AttachRuleRequest, CreateUseCaseRequest, DeactivateUseCaseResponse,
    UpdateUseCaseRequest, UseCaseWithRules,
};
use domain::models::UseCase;
use persistence::repositories::{DeactivateOutcome, RuleRepository, UseCaseRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthContext;

/// Create a use case.
///
/// POST /api/v1/admin/use-cases
pub async fn create_use_case(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateUseCaseRequest>,
) -> Result<(StatusCode, Json<UseCase>), ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let use_case = UseCaseRepository::new(state.pool.clone())
        .create(
            request.batch_id,
            &request.title,
            request.summary.as_deref(),
            auth.user_id,
        )
        .await?;

    info!(
        use_case_id = %use_case.id,
        batch_id = %use_case.batch_id,
        admin_id = %auth.user_id,
        "Use case created"
    );

    Ok((StatusCode::CREATED, Json(use_case.into())))
}

/// Get a use case with its assigned rules.
///
/// GET /api/v1/admin/use-cases/:use_case_id
pub async fn get_use_case(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(use_case_id): Path<Uuid>,
) -> Result<Json<UseCaseWithRules>, ApiError> {
    auth.require_admin()?;

    let use_case = UseCaseRepository::new(state.pool.clone())
        .find_by_id(use_case_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Use case not found".to_string()))?;

    let rules: Vec<AssignedRuleView> = RuleRepository::new(state.pool.clone())
        .rules_for_use_case(use_case_id)
        .await?
        .into_iter()
        .map(AssignedRuleView::from)
        .collect();

    Ok(Json(UseCaseWithRules {
        id: use_case.id,
        batch_id: use_case.batch_id,
        title: use_case.title,
        summary: use_case.summary,
        is_active: use_case.is_active,
        rules,
    }))
}

/// Update a use case.
///
/// PUT /api/v1/admin/use-cases/:use_case_id
pub async fn update_use_case(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(use_case_id): Path<Uuid>,
    Json(request): Json<UpdateUseCaseRequest>,
) -> Result<Json<UseCase>, ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let updated = UseCaseRepository::new(state.pool.clone())
        .update(
            use_case_id,
            request.title.as_deref(),
            request.summary.as_deref(),
            request.is_active,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Use case not found".to_string()))?;

    info!(
        use_case_id = %use_case_id,
        admin_id = %auth.user_id,
        "Use case updated"
    );

    Ok(Json(updated.into()))
}

/// Deactivate a use case.
///
/// DELETE /api/v1/admin/use-cases/:use_case_id
///
/// Refused while locked or approved groups reference it; draft groups get
/// their selection cleared in the same transaction.
pub async fn deactivate_use_case(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(use_case_id): Path<Uuid>,
) -> Result<Json<DeactivateUseCaseResponse>, ApiError> {
    auth.require_admin()?;

    match UseCaseRepository::new(state.pool.clone())
        .deactivate(use_case_id)
        .await?
    {
        DeactivateOutcome::NotFound => {
            Err(ApiError::NotFound("Use case not found".to_string()))
        }
        DeactivateOutcome::InUse { referencing_groups } => Err(ApiError::InvalidState(format!(
            "Use case is referenced by {} locked or approved group(s)",
            referencing_groups
        ))),
        DeactivateOutcome::Deactivated { cleared_group_ids } => {
            info!(
                use_case_id = %use_case_id,
                admin_id = %auth.user_id,
                cleared_groups = cleared_group_ids.len(),
                "Use case deactivated"
            );
            Ok(Json(DeactivateUseCaseResponse {
                use_case_id,
                cleared_group_ids,
            }))
        }
    }
}

/// Attach a rule to a use case.
///
/// POST /api/v1/admin/use-cases/:use_case_id/rules
pub async fn attach_rule(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(use_case_id): Path<Uuid>,
    Json(request): Json<AttachRuleRequest>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;

    let use_case_repo = UseCaseRepository::new(state.pool.clone());
    if use_case_repo.find_by_id(use_case_id).await?.is_none() {
        return Err(ApiError::NotFound("Use case not found".to_string()));
    }

    let rule_repo = RuleRepository::new(state.pool.clone());
    if rule_repo.find_rule(request.rule_id).await?.is_none() {
        return Err(ApiError::NotFound("Rule not found".to_string()));
    }

    rule_repo
        .attach_to_use_case(
            use_case_id,
            request.rule_id,
            request.is_required,
            request.position.unwrap_or(0),
        )
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                ApiError::Conflict("Rule is already attached to this use case".to_string())
            }
            _ => ApiError::from(e),
        })?;

    info!(
        use_case_id = %use_case_id,
        rule_id = %request.rule_id,
        is_required = request.is_required,
        admin_id = %auth.user_id,
        "Rule attached to use case"
    );

    Ok(StatusCode::CREATED)
}
