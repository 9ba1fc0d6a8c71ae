//! Group routes: creation via use-case selection, detail, use-case change,
//! lock, and the validation verdict endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::group::{
    ChangeUseCaseRequest, CreateGroupRequest, GroupDetail, GroupMemberView, LockGroupResponse,
    MemberRole, MembershipState,
};
use domain::models::{GroupVerdict, UseCaseSummary};
use domain::services::notification::{GroupEventPayload, NotificationType};
use persistence::entities::{GroupEntity, GroupStatusDb, UserEntity};
use persistence::repositories::{
    GroupRepository, LockOutcome, MemberRepository, MembershipRepository, UseCaseRepository,
    ValidationRepository,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthContext;
use crate::services::group_validation;

/// Create a group by selecting a use case.
///
/// POST /api/v1/groups
///
/// The caller becomes the group's creator and leader. Rejected when the
/// caller already belongs to an active group, when the use case is inactive
/// or from another batch, or when the use case is on the caller's permanent
/// rejection list.
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupDetail>), ApiError> {
    request.validate()?;

    let user = load_directory_user(&state, auth.user_id).await?;

    let membership_repo = MembershipRepository::new(state.pool.clone());
    if membership_repo.has_accepted_membership(auth.user_id).await? {
        return Err(ApiError::ConstraintViolation(
            "You are already a member of an active group".to_string(),
        ));
    }

    let use_case = check_use_case_selectable(&state, request.use_case_id, &user).await?;

    let name = request
        .group_name
        .map(|n| n.trim().to_string())
        .unwrap_or_else(|| use_case.title.clone());

    let group_repo = GroupRepository::new(state.pool.clone());
    let group = group_repo
        .create_with_leader(use_case.batch_id, use_case.id, &name, auth.user_id)
        .await?;

    info!(
        group_id = %group.id,
        use_case_id = %use_case.id,
        user_id = %auth.user_id,
        "Group created"
    );

    let detail = build_group_detail(&state, group).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Get group details with members.
///
/// GET /api/v1/groups/:group_id
///
/// Visible to group members and admins.
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupDetail>, ApiError> {
    let group = GroupRepository::new(state.pool.clone())
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    if !auth.is_admin() {
        let membership = MembershipRepository::new(state.pool.clone())
            .find_membership(group_id, auth.user_id)
            .await?;
        if membership.is_none() {
            return Err(ApiError::Forbidden(
                "Only group members can view this group".to_string(),
            ));
        }
    }

    let detail = build_group_detail(&state, group).await?;
    Ok(Json(detail))
}

/// Current validation verdict for a group.
///
/// GET /api/v1/groups/:group_id/validation
pub async fn get_validation(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupVerdict>, ApiError> {
    let verdict = group_validation::validate_group(&state.pool, group_id).await?;
    Ok(Json(verdict))
}

/// Change a draft group's use case.
///
/// PUT /api/v1/groups/:group_id/use-case
///
/// Leader-only, draft-only; the rejection-list and batch checks apply the
/// same way they do at group creation.
pub async fn change_use_case(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(group_id): Path<Uuid>,
    Json(request): Json<ChangeUseCaseRequest>,
) -> Result<Json<GroupDetail>, ApiError> {
    let group_repo = GroupRepository::new(state.pool.clone());
    let group = group_repo
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    require_leader(&state, group_id, auth.user_id).await?;

    if group.status != GroupStatusDb::Draft {
        return Err(ApiError::InvalidState(
            "Use case can only be changed while the group is in draft".to_string(),
        ));
    }

    let user = load_directory_user(&state, auth.user_id).await?;
    let use_case = check_use_case_selectable(&state, request.use_case_id, &user).await?;

    let updated = group_repo.set_use_case(group_id, use_case.id).await?;
    if updated == 0 {
        return Err(ApiError::InvalidState(
            "Group is no longer in draft".to_string(),
        ));
    }

    info!(
        group_id = %group_id,
        use_case_id = %use_case.id,
        user_id = %auth.user_id,
        "Group use case changed"
    );

    let group = group_repo
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::Internal("Failed to reload updated group".to_string()))?;
    let detail = build_group_detail(&state, group).await?;
    Ok(Json(detail))
}

/// Lock a draft group for admin approval.
///
/// POST /api/v1/groups/:group_id/lock
///
/// Leader-only. Rules are re-validated inside the locking transaction; on
/// failure the response carries the fresh verdict alongside the error.
pub async fn lock_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(group_id): Path<Uuid>,
) -> Result<Json<LockGroupResponse>, ApiError> {
    let repo = ValidationRepository::new(state.pool.clone());

    match repo.lock_group(group_id, auth.user_id).await? {
        LockOutcome::GroupNotFound => Err(ApiError::NotFound("Group not found".to_string())),
        LockOutcome::NotLeader => Err(ApiError::Forbidden(
            "Only the group leader can lock the group".to_string(),
        )),
        LockOutcome::NotDraft(status) => Err(ApiError::InvalidState(format!(
            "Group cannot be locked in {} status",
            status
        ))),
        LockOutcome::NoUseCase => Err(ApiError::InvalidState(
            "Group has no use case selected".to_string(),
        )),
        LockOutcome::RulesUnmet(verdict) => Err(ApiError::RulesUnmet(verdict)),
        LockOutcome::Locked { group, verdict } => {
            info!(
                group_id = %group.id,
                user_id = %auth.user_id,
                "Group locked for approval"
            );
            state
                .notifier
                .notify(GroupEventPayload::new(
                    NotificationType::GroupLocked,
                    group.id,
                    group.name.clone(),
                    auth.user_id,
                ))
                .await
                .ok();

            Ok(Json(LockGroupResponse {
                group_id: group.id,
                status: group.status.into(),
                locked_at: group.locked_at.unwrap_or_else(Utc::now),
                verdict: *verdict,
            }))
        }
    }
}

/// Load the caller's directory profile; unknown callers are rejected.
pub(crate) async fn load_directory_user(
    state: &AppState,
    user_id: Uuid,
) -> Result<UserEntity, ApiError> {
    persistence::repositories::UserRepository::new(state.pool.clone())
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))
}

/// Checks that a use case can be selected by this creator: it exists, is
/// active, belongs to the creator's batch, and was never rejected for them.
pub(crate) async fn check_use_case_selectable(
    state: &AppState,
    use_case_id: Uuid,
    user: &UserEntity,
) -> Result<persistence::entities::UseCaseEntity, ApiError> {
    let repo = UseCaseRepository::new(state.pool.clone());
    let use_case = repo
        .find_by_id(use_case_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Use case not found".to_string()))?;

    if !use_case.is_active {
        return Err(ApiError::ConstraintViolation(
            "Use case is not active".to_string(),
        ));
    }
    if user.batch_id != Some(use_case.batch_id) {
        return Err(ApiError::ConstraintViolation(
            "Use case belongs to a different batch".to_string(),
        ));
    }
    if repo.is_rejected_for_creator(user.id, use_case_id).await? {
        return Err(ApiError::ConstraintViolation(
            "Use case was previously rejected for this creator".to_string(),
        ));
    }

    Ok(use_case)
}

/// Rejects callers who are not the accepted leader of the group.
pub(crate) async fn require_leader(
    state: &AppState,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let membership = MembershipRepository::new(state.pool.clone())
        .find_membership(group_id, user_id)
        .await?;
    let is_leader = membership.is_some_and(|m| {
        MemberRole::from(m.role) == MemberRole::Leader
            && MembershipState::from(m.state) == MembershipState::Accepted
    });
    if is_leader {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the group leader can perform this action".to_string(),
        ))
    }
}

/// Assemble the group detail response: group row, use case summary, members.
pub(crate) async fn build_group_detail(
    state: &AppState,
    group: GroupEntity,
) -> Result<GroupDetail, ApiError> {
    let use_case = match group.use_case_id {
        Some(use_case_id) => UseCaseRepository::new(state.pool.clone())
            .find_by_id(use_case_id)
            .await?
            .map(|uc| UseCaseSummary::from(&uc)),
        None => None,
    };

    let members: Vec<GroupMemberView> = MemberRepository::new(state.pool.clone())
        .all_members(group.id)
        .await?
        .into_iter()
        .map(GroupMemberView::from)
        .collect();

    Ok(GroupDetail {
        id: group.id,
        batch_id: group.batch_id,
        name: group.name,
        status: group.status.into(),
        use_case,
        created_by: group.created_by,
        locked_at: group.locked_at,
        created_at: group.created_at,
        updated_at: group.updated_at,
        members,
    })
}
