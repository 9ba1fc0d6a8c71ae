//! Invitation routes: leader invites, invitee accept/decline.
//!
//! An invitation is a pending membership row. Acceptance is gated by the
//! same one-active-membership rule as every other add, and never changes
//! the group status; the leader still locks explicitly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::group::{AddMemberRequest, InvitationResponse, MembershipState};
use domain::services::notification::{GroupEventPayload, NotificationType};
use persistence::entities::GroupMembershipEntity;
use persistence::repositories::{
    AcceptOutcome, CanAddOutcome, GroupRepository, MembershipRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthContext;
use crate::routes::groups::{load_directory_user, require_leader};
use crate::services::group_validation;

fn invitation_response(membership: GroupMembershipEntity) -> InvitationResponse {
    InvitationResponse {
        id: membership.id,
        group_id: membership.group_id,
        user_id: membership.user_id,
        state: MembershipState::from(membership.state),
        invited_by: membership.invited_by,
        created_at: membership.created_at,
    }
}

/// Invite a user to a draft group.
///
/// POST /api/v1/groups/:group_id/invitations
///
/// Leader-only. The invite is refused when the user could not be added
/// anyway (already in an active group, group not draft).
pub async fn create_invitation(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(group_id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), ApiError> {
    let group = GroupRepository::new(state.pool.clone())
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    require_leader(&state, group_id, auth.user_id).await?;

    // Invitee must exist in the directory.
    let invitee = persistence::repositories::UserRepository::new(state.pool.clone())
        .find_by_id(request.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invited user not found".to_string()))?;

    let membership_repo = MembershipRepository::new(state.pool.clone());
    let gate = membership_repo
        .can_add_member(group_id, request.user_id)
        .await?;
    if let Some(reason) = gate.reason() {
        return Err(match gate {
            CanAddOutcome::GroupNotFound => ApiError::NotFound(reason),
            CanAddOutcome::GroupNotDraft(_) => ApiError::InvalidState(reason),
            _ => ApiError::ConstraintViolation(reason),
        });
    }

    let invitation = membership_repo
        .create_invitation(group_id, request.user_id, auth.user_id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                ApiError::ConstraintViolation(
                    "User already has an invitation or membership in this group".to_string(),
                )
            }
            _ => ApiError::from(e),
        })?;

    info!(
        group_id = %group_id,
        invitee_id = %invitee.id,
        invited_by = %auth.user_id,
        "Invitation created"
    );
    state
        .notifier
        .notify(
            GroupEventPayload::new(
                NotificationType::InvitationCreated,
                group_id,
                group.name.clone(),
                auth.user_id,
            )
            .for_recipient(invitee.id),
        )
        .await
        .ok();

    Ok((StatusCode::CREATED, Json(invitation_response(invitation))))
}

/// Accept an invitation.
///
/// POST /api/v1/invitations/:invitation_id/accept
///
/// Invitee-only. Membership flips to accepted; the fresh verdict is logged
/// but the group status is untouched.
pub async fn accept_invitation(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<InvitationResponse>, ApiError> {
    // Caller must be a known directory user before membership changes.
    load_directory_user(&state, auth.user_id).await?;

    let repo = MembershipRepository::new(state.pool.clone());
    match repo.accept_invitation(invitation_id, auth.user_id).await? {
        AcceptOutcome::NotFound => Err(ApiError::NotFound("Invitation not found".to_string())),
        AcceptOutcome::NotInvitee => Err(ApiError::Forbidden(
            "Only the invited user can accept this invitation".to_string(),
        )),
        AcceptOutcome::NotPending => Err(ApiError::InvalidState(
            "Invitation has already been answered".to_string(),
        )),
        AcceptOutcome::GroupNotDraft => Err(ApiError::InvalidState(
            "Group is no longer accepting members".to_string(),
        )),
        AcceptOutcome::AlreadyInActiveGroup => Err(ApiError::ConstraintViolation(
            "User is already an accepted member of an active group".to_string(),
        )),
        AcceptOutcome::Accepted(membership) => {
            let group_id = membership.group_id;
            let group_name = GroupRepository::new(state.pool.clone())
                .find_by_id(group_id)
                .await?
                .map(|g| g.name)
                .unwrap_or_default();
            // Membership changed: recompute and log the verdict for
            // observability. Acceptance never moves the status itself.
            match group_validation::validate_group(&state.pool, group_id).await {
                Ok(verdict) => info!(
                    group_id = %group_id,
                    user_id = %auth.user_id,
                    member_count = verdict.member_count,
                    all_required_passed = verdict.all_required_passed,
                    "Invitation accepted, group re-validated"
                ),
                Err(e) => tracing::warn!(
                    group_id = %group_id,
                    "Post-acceptance validation failed: {}", e
                ),
            }

            state
                .notifier
                .notify(
                    GroupEventPayload::new(
                        NotificationType::InvitationAccepted,
                        group_id,
                        group_name,
                        auth.user_id,
                    )
                    .for_recipient(membership.invited_by.unwrap_or(auth.user_id)),
                )
                .await
                .ok();

            Ok(Json(invitation_response(membership)))
        }
    }
}

/// Decline an invitation.
///
/// POST /api/v1/invitations/:invitation_id/decline
///
/// Invitee-only.
pub async fn decline_invitation(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let repo = MembershipRepository::new(state.pool.clone());

    let declined = repo
        .decline_invitation(invitation_id, auth.user_id)
        .await?;
    match declined {
        Some(membership) => {
            info!(
                invitation_id = %invitation_id,
                user_id = %auth.user_id,
                "Invitation declined"
            );
            let group_name = GroupRepository::new(state.pool.clone())
                .find_by_id(membership.group_id)
                .await?
                .map(|g| g.name)
                .unwrap_or_default();
            state
                .notifier
                .notify(
                    GroupEventPayload::new(
                        NotificationType::InvitationDeclined,
                        membership.group_id,
                        group_name,
                        auth.user_id,
                    )
                    .for_recipient(membership.invited_by.unwrap_or(auth.user_id)),
                )
                .await
                .ok();
            Ok(Json(invitation_response(membership)))
        }
        None => {
            // Distinguish missing, foreign, and already-answered invitations
            // for a precise error.
            let existing = repo.find_by_id(invitation_id).await?;
            match existing {
                None => Err(ApiError::NotFound("Invitation not found".to_string())),
                Some(m) if m.user_id != auth.user_id => Err(ApiError::Forbidden(
                    "Only the invited user can decline this invitation".to_string(),
                )),
                Some(_) => Err(ApiError::InvalidState(
                    "Invitation has already been answered".to_string(),
                )),
            }
        }
    }
}
