//! Membership repository: invitations as pending membership rows.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupMembershipEntity, GroupStatusDb};
use crate::metrics::QueryTimer;

const MEMBERSHIP_COLUMNS: &str =
    "id, group_id, user_id, role, state, invited_by, responded_at, created_at, updated_at";

/// Result of the `can_add_member` gate. Checks run in a fixed order and
/// fail closed with a reason string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanAddOutcome {
    Allowed,
    AlreadyInActiveGroup,
    GroupNotFound,
    GroupNotDraft(GroupStatusDb),
}

impl CanAddOutcome {
    /// Reason string for a refused add, `None` when allowed.
    pub fn reason(&self) -> Option<String> {
        match self {
            CanAddOutcome::Allowed => None,
            CanAddOutcome::AlreadyInActiveGroup => {
                Some("User is already an accepted member of an active group".to_string())
            }
            CanAddOutcome::GroupNotFound => Some("Group not found".to_string()),
            CanAddOutcome::GroupNotDraft(_) => {
                Some("Group is no longer accepting members".to_string())
            }
        }
    }
}

/// Result of accepting an invitation.
#[derive(Debug)]
pub enum AcceptOutcome {
    NotFound,
    NotInvitee,
    NotPending,
    GroupNotDraft,
    AlreadyInActiveGroup,
    Accepted(GroupMembershipEntity),
}

/// Repository for invitation and membership state operations.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Creates a new MembershipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a membership row by group and user.
    pub async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupMembershipEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_membership");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            "SELECT {} FROM group_memberships WHERE group_id = $1 AND user_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a membership (invitation) row by ID.
    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<GroupMembershipEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_membership_by_id");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            "SELECT {} FROM group_memberships WHERE id = $1",
            MEMBERSHIP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// True if the user holds an accepted membership in any group whose
    /// status is not `rejected`.
    pub async fn has_accepted_membership(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("has_accepted_membership");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM group_memberships gm
                JOIN groups g ON gm.group_id = g.id
                WHERE gm.user_id = $1
                  AND gm.state = 'accepted'
                  AND g.status <> 'rejected'
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Gate for adding a user to a group. Checks run in order: existing
    /// accepted membership anywhere, group existence, group status.
    pub async fn can_add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<CanAddOutcome, sqlx::Error> {
        if self.has_accepted_membership(user_id).await? {
            return Ok(CanAddOutcome::AlreadyInActiveGroup);
        }

        let timer = QueryTimer::new("can_add_member_group_status");
        let status = sqlx::query_scalar::<_, GroupStatusDb>(
            "SELECT status FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        match status? {
            None => Ok(CanAddOutcome::GroupNotFound),
            Some(GroupStatusDb::Draft) => Ok(CanAddOutcome::Allowed),
            Some(other) => Ok(CanAddOutcome::GroupNotDraft(other)),
        }
    }

    /// Create a pending membership (an invitation) for a user.
    ///
    /// The unique (group_id, user_id) constraint rejects duplicate invites.
    pub async fn create_invitation(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        invited_by: Uuid,
    ) -> Result<GroupMembershipEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_invitation");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            r#"
            INSERT INTO group_memberships (group_id, user_id, role, state, invited_by)
            VALUES ($1, $2, 'member', 'pending', $3)
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(group_id)
        .bind(user_id)
        .bind(invited_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Accept a pending invitation on behalf of the invitee.
    ///
    /// Runs the whole read-decide-write sequence in one transaction with the
    /// group row locked, so concurrent accepts cannot both pass the
    /// one-active-membership check (the partial unique index backs this up).
    pub async fn accept_invitation(
        &self,
        invitation_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        let timer = QueryTimer::new("accept_invitation");
        let mut tx = self.pool.begin().await?;

        let invitation = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            "SELECT {} FROM group_memberships WHERE id = $1 FOR UPDATE",
            MEMBERSHIP_COLUMNS
        ))
        .bind(invitation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(invitation) = invitation else {
            timer.record();
            return Ok(AcceptOutcome::NotFound);
        };
        if invitation.user_id != invitee_id {
            timer.record();
            return Ok(AcceptOutcome::NotInvitee);
        }
        if invitation.state != crate::entities::MembershipStateDb::Pending {
            timer.record();
            return Ok(AcceptOutcome::NotPending);
        }

        let status = sqlx::query_scalar::<_, GroupStatusDb>(
            "SELECT status FROM groups WHERE id = $1 FOR UPDATE",
        )
        .bind(invitation.group_id)
        .fetch_one(&mut *tx)
        .await?;
        if status != GroupStatusDb::Draft {
            timer.record();
            return Ok(AcceptOutcome::GroupNotDraft);
        }

        let already_member = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM group_memberships gm
                JOIN groups g ON gm.group_id = g.id
                WHERE gm.user_id = $1
                  AND gm.state = 'accepted'
                  AND g.status <> 'rejected'
            )
            "#,
        )
        .bind(invitee_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_member {
            timer.record();
            return Ok(AcceptOutcome::AlreadyInActiveGroup);
        }

        let accepted = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            r#"
            UPDATE group_memberships
            SET state = 'accepted', responded_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(invitation_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(AcceptOutcome::Accepted(accepted))
    }

    /// Decline a pending invitation on behalf of the invitee. Returns the
    /// updated row, or `None` when the invitation is missing, already
    /// answered, or addressed to someone else.
    pub async fn decline_invitation(
        &self,
        invitation_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<Option<GroupMembershipEntity>, sqlx::Error> {
        let timer = QueryTimer::new("decline_invitation");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(&format!(
            r#"
            UPDATE group_memberships
            SET state = 'declined', responded_at = now(), updated_at = now()
            WHERE id = $1 AND user_id = $2 AND state = 'pending'
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(invitation_id)
        .bind(invitee_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_add_outcome_reasons() {
        assert_eq!(CanAddOutcome::Allowed.reason(), None);
        assert_eq!(
            CanAddOutcome::AlreadyInActiveGroup.reason().as_deref(),
            Some("User is already an accepted member of an active group")
        );
        assert_eq!(
            CanAddOutcome::GroupNotFound.reason().as_deref(),
            Some("Group not found")
        );
        assert_eq!(
            CanAddOutcome::GroupNotDraft(GroupStatusDb::Ready)
                .reason()
                .as_deref(),
            Some("Group is no longer accepting members")
        );
    }
}
