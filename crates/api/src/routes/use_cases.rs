//! Use case listing for students.

use axum::{extract::State, Json};
use domain::models::use_case::{AssignedRuleView, UseCaseWithRules};
use persistence::repositories::{RuleRepository, UseCaseRepository};
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthContext;
use crate::routes::groups::load_directory_user;

/// Response for the use case listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListUseCasesResponse {
    pub data: Vec<UseCaseWithRules>,
}

/// Active use cases for the caller's batch, with their assigned rules.
///
/// GET /api/v1/use-cases
pub async fn list_use_cases(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ListUseCasesResponse>, ApiError> {
    let user = load_directory_user(&state, auth.user_id).await?;
    let Some(batch_id) = user.batch_id else {
        return Ok(Json(ListUseCasesResponse { data: Vec::new() }));
    };

    let use_case_repo = UseCaseRepository::new(state.pool.clone());
    let rule_repo = RuleRepository::new(state.pool.clone());

    let mut data = Vec::new();
    for use_case in use_case_repo.list_active_for_batch(batch_id).await? {
        let rules: Vec<AssignedRuleView> = rule_repo
            .rules_for_use_case(use_case.id)
            .await?
            .into_iter()
            .map(AssignedRuleView::from)
            .collect();
        data.push(UseCaseWithRules {
            id: use_case.id,
            batch_id: use_case.batch_id,
            title: use_case.title,
            summary: use_case.summary,
            is_active: use_case.is_active,
            rules,
        });
    }

    info!(
        user_id = %auth.user_id,
        batch_id = %batch_id,
        use_case_count = data.len(),
        "Listed use cases"
    );

    Ok(Json(ListUseCasesResponse { data }))
}
