//! Admin group routes: review queue, decisions, and member management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::group::{
    AdminAddMemberResponse, AddMemberRequest, BatchValidateRequest, BatchValidateResponse,
    DecideGroupRequest, DecideGroupResponse, GroupStatus, GroupSummary, ListGroupsQuery,
    ListGroupsResponse, RemoveMemberResponse,
};
use domain::services::notification::{GroupEventPayload, NotificationType};
use persistence::entities::GroupStatusDb;
use persistence::repositories::{
    AddMemberOutcome, AdminDecision, DecideOutcome, GroupRepository, RemoveMemberOutcome,
    ValidationRepository,
};
use shared::pagination::Pagination;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthContext;

/// List groups for the admin review queue.
///
/// GET /api/v1/admin/groups?status=ready
pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListGroupsQuery>,
) -> Result<Json<ListGroupsResponse>, ApiError> {
    auth.require_admin()?;

    let status_filter: Option<GroupStatusDb> = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            raw.parse::<GroupStatus>()
                .map_err(ApiError::Validation)?
                .into(),
        ),
    };

    let params = query.page_params();
    let repo = GroupRepository::new(state.pool.clone());
    let total = repo.count_groups(status_filter).await?;
    let data: Vec<GroupSummary> = repo
        .list_summaries(status_filter, params.per_page(), params.offset())
        .await?
        .into_iter()
        .map(GroupSummary::from)
        .collect();

    Ok(Json(ListGroupsResponse {
        data,
        pagination: Pagination::new(params, total),
    }))
}

/// Apply an admin decision to a ready group.
///
/// PUT /api/v1/admin/groups/:group_id/validate
///
/// Only `approved` and `rejected` are accepted. Rejection permanently
/// records the use case against the creator and returns the group to draft
/// with its selection cleared.
pub async fn validate_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(group_id): Path<Uuid>,
    Json(request): Json<DecideGroupRequest>,
) -> Result<Json<DecideGroupResponse>, ApiError> {
    auth.require_admin()?;

    let decision = match request.status.to_lowercase().as_str() {
        "approved" => AdminDecision::Approve,
        "rejected" => AdminDecision::Reject,
        other => {
            return Err(ApiError::Validation(format!(
                "Unsupported status {:?}; expected approved or rejected",
                other
            )))
        }
    };

    let repo = ValidationRepository::new(state.pool.clone());
    match repo
        .decide_group(group_id, decision, request.rejection_reason.as_deref())
        .await?
    {
        DecideOutcome::GroupNotFound => Err(ApiError::NotFound("Group not found".to_string())),
        DecideOutcome::NotReady(status) => Err(ApiError::InvalidState(format!(
            "Group must be ready for a decision, current status is {}",
            status
        ))),
        DecideOutcome::Approved(group) => {
            info!(group_id = %group.id, admin_id = %auth.user_id, "Group approved");
            state
                .notifier
                .notify(
                    GroupEventPayload::new(
                        NotificationType::GroupApproved,
                        group.id,
                        group.name.clone(),
                        auth.user_id,
                    )
                    .for_recipient(group.created_by),
                )
                .await
                .ok();
            Ok(Json(DecideGroupResponse {
                group_id: group.id,
                status: group.status.into(),
                use_case_id: group.use_case_id,
                rejection_recorded: false,
            }))
        }
        DecideOutcome::Rejected {
            group,
            rejected_use_case_id,
        } => {
            info!(
                group_id = %group.id,
                admin_id = %auth.user_id,
                rejected_use_case_id = ?rejected_use_case_id,
                "Group rejected, returned to draft"
            );
            state
                .notifier
                .notify(
                    GroupEventPayload::new(
                        NotificationType::GroupRejected,
                        group.id,
                        group.name.clone(),
                        auth.user_id,
                    )
                    .for_recipient(group.created_by),
                )
                .await
                .ok();
            Ok(Json(DecideGroupResponse {
                group_id: group.id,
                status: group.status.into(),
                use_case_id: group.use_case_id,
                rejection_recorded: rejected_use_case_id.is_some(),
            }))
        }
    }
}

/// Approve a batch of ready groups; others are skipped silently.
///
/// POST /api/v1/admin/groups/batch-validate
pub async fn batch_validate(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<BatchValidateRequest>,
) -> Result<Json<BatchValidateResponse>, ApiError> {
    auth.require_admin()?;

    if request.status.to_lowercase() != "approved" {
        return Err(ApiError::Validation(
            "Batch validation only supports status approved".to_string(),
        ));
    }
    if request.group_ids.len() > state.config.limits.max_batch_validate {
        return Err(ApiError::Validation(format!(
            "At most {} groups per batch",
            state.config.limits.max_batch_validate
        )));
    }

    let repo = ValidationRepository::new(state.pool.clone());
    let approved = repo.batch_approve(&request.group_ids).await?;
    let skipped: Vec<Uuid> = request
        .group_ids
        .iter()
        .filter(|id| !approved.contains(id))
        .copied()
        .collect();

    info!(
        admin_id = %auth.user_id,
        approved = approved.len(),
        skipped = skipped.len(),
        "Batch group approval"
    );

    Ok(Json(BatchValidateResponse { approved, skipped }))
}

/// Add a member to a group as an admin.
///
/// POST /api/v1/admin/groups/:group_id/members
///
/// The validator re-runs in the same transaction; the group is promoted to
/// approved only when every required rule passes on the new member set.
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(group_id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<AdminAddMemberResponse>), ApiError> {
    auth.require_admin()?;

    let repo = ValidationRepository::new(state.pool.clone());
    match repo.admin_add_member(group_id, request.user_id).await? {
        AddMemberOutcome::GroupNotFound => {
            Err(ApiError::NotFound("Group not found".to_string()))
        }
        AddMemberOutcome::UserNotFound => Err(ApiError::NotFound("User not found".to_string())),
        AddMemberOutcome::AlreadyMember => Err(ApiError::ConstraintViolation(
            "User is already a member of this group".to_string(),
        )),
        AddMemberOutcome::AlreadyInActiveGroup => Err(ApiError::ConstraintViolation(
            "User is already an accepted member of an active group".to_string(),
        )),
        AddMemberOutcome::Added { group, verdict } => {
            info!(
                group_id = %group.id,
                user_id = %request.user_id,
                admin_id = %auth.user_id,
                new_status = %GroupStatus::from(group.status),
                all_required_passed = verdict.all_required_passed,
                "Member added by admin"
            );
            Ok((
                StatusCode::CREATED,
                Json(AdminAddMemberResponse {
                    user_id: request.user_id,
                    group_id: group.id,
                    status: group.status.into(),
                    all_required_passed: verdict.all_required_passed,
                }),
            ))
        }
    }
}

/// Remove a member from a group as an admin.
///
/// DELETE /api/v1/admin/groups/:group_id/members/:user_id
///
/// The creator can never be removed. With a use case selected the status is
/// recomputed from the remaining members.
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RemoveMemberResponse>, ApiError> {
    auth.require_admin()?;

    let repo = ValidationRepository::new(state.pool.clone());
    match repo.admin_remove_member(group_id, user_id).await? {
        RemoveMemberOutcome::GroupNotFound => {
            Err(ApiError::NotFound("Group not found".to_string()))
        }
        RemoveMemberOutcome::MemberNotFound => Err(ApiError::NotFound(
            "User is not an accepted member of this group".to_string(),
        )),
        RemoveMemberOutcome::CreatorProtected => Err(ApiError::ConstraintViolation(
            "Cannot remove the group creator; transfer ownership first".to_string(),
        )),
        RemoveMemberOutcome::Removed { group, verdict } => {
            info!(
                group_id = %group.id,
                user_id = %user_id,
                admin_id = %auth.user_id,
                new_status = %GroupStatus::from(group.status),
                revalidated = verdict.is_some(),
                "Member removed by admin"
            );
            Ok(Json(RemoveMemberResponse {
                removed: true,
                user_id,
                group_id: group.id,
                status: group.status.into(),
            }))
        }
    }
}
