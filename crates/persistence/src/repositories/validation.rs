//! Validation repository: snapshot loading and the transactional
//! read-decide-write status transitions.
//!
//! Every mutating operation locks the group row with `SELECT ... FOR UPDATE`
//! and re-runs the rule engine on the membership it can see inside the same
//! transaction, so concurrent admin actions serialize instead of losing
//! updates. The rule evaluation itself stays in the domain layer; this
//! module only loads consistent snapshots and persists the outcome.

use domain::models::group::GroupStatus;
use domain::models::validation::{GroupVerdict, ValidationSnapshot};
use domain::models::{MemberProfile, RuleSpec, UseCaseSummary};
use domain::services::validation::build_group_verdict;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    AssignedRuleEntity, GroupEntity, GroupStatusDb, LegacyRuleEntity, MemberRoleDb,
    MemberWithProfileEntity, MembershipStateDb,
};
use crate::metrics::QueryTimer;

const GROUP_COLUMNS: &str =
    "id, batch_id, use_case_id, name, status, created_by, locked_at, created_at, updated_at";

/// Errors from validation snapshot loading and status transitions.
#[derive(Debug, Error)]
pub enum ValidationRepoError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// A group points at a use case row that no longer exists. Selection and
    /// deactivation guards are supposed to make this impossible.
    #[error("group {group_id} references missing use case {use_case_id}")]
    DanglingUseCase { group_id: Uuid, use_case_id: Uuid },
}

/// Admin decision on a ready group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDecision {
    Approve,
    Reject,
}

/// Result of a leader lock attempt.
#[derive(Debug)]
pub enum LockOutcome {
    GroupNotFound,
    NotLeader,
    NotDraft(GroupStatus),
    NoUseCase,
    RulesUnmet(Box<GroupVerdict>),
    Locked {
        group: GroupEntity,
        verdict: Box<GroupVerdict>,
    },
}

/// Result of an admin decision.
#[derive(Debug)]
pub enum DecideOutcome {
    GroupNotFound,
    NotReady(GroupStatus),
    Approved(GroupEntity),
    Rejected {
        group: GroupEntity,
        rejected_use_case_id: Option<Uuid>,
    },
}

/// Result of an admin member add.
#[derive(Debug)]
pub enum AddMemberOutcome {
    GroupNotFound,
    UserNotFound,
    AlreadyMember,
    AlreadyInActiveGroup,
    Added {
        group: GroupEntity,
        verdict: Box<GroupVerdict>,
    },
}

/// Result of an admin member removal.
#[derive(Debug)]
pub enum RemoveMemberOutcome {
    GroupNotFound,
    MemberNotFound,
    CreatorProtected,
    Removed {
        group: GroupEntity,
        verdict: Option<Box<GroupVerdict>>,
    },
}

/// Repository orchestrating validation reads and validator-gated writes.
#[derive(Clone)]
pub struct ValidationRepository {
    pool: PgPool,
}

impl ValidationRepository {
    /// Creates a new ValidationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the validation snapshot for a group without locking. Used by the
    /// read-only verdict endpoint; mutations load their own snapshot inside
    /// a transaction.
    pub async fn load_snapshot(
        &self,
        group_id: Uuid,
    ) -> Result<Option<ValidationSnapshot>, ValidationRepoError> {
        let timer = QueryTimer::new("load_validation_snapshot");
        let mut conn = self.pool.acquire().await?;

        let Some(group) = load_group(&mut conn, group_id, false).await? else {
            timer.record();
            return Ok(None);
        };
        let snapshot = load_snapshot_parts(&mut conn, group).await?;
        timer.record();
        Ok(Some(snapshot))
    }

    /// Lock a draft group for approval on behalf of its leader.
    ///
    /// Re-validates inside the transaction; a stale client verdict is never
    /// trusted. On success the group moves to `ready` with a lock timestamp.
    pub async fn lock_group(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<LockOutcome, ValidationRepoError> {
        let timer = QueryTimer::new("lock_group");
        let mut tx = self.pool.begin().await?;

        let Some(group) = load_group(&mut tx, group_id, true).await? else {
            timer.record();
            return Ok(LockOutcome::GroupNotFound);
        };

        let leader_role = sqlx::query_scalar::<_, MemberRoleDb>(
            r#"
            SELECT role FROM group_memberships
            WHERE group_id = $1 AND user_id = $2 AND state = 'accepted'
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if leader_role != Some(MemberRoleDb::Leader) {
            timer.record();
            return Ok(LockOutcome::NotLeader);
        }

        if group.status != GroupStatusDb::Draft {
            timer.record();
            return Ok(LockOutcome::NotDraft(group.status.into()));
        }
        if group.use_case_id.is_none() {
            timer.record();
            return Ok(LockOutcome::NoUseCase);
        }

        let snapshot = load_snapshot_parts(&mut tx, group).await?;
        let verdict = build_group_verdict(&snapshot);
        if !verdict.can_lock {
            timer.record();
            return Ok(LockOutcome::RulesUnmet(Box::new(verdict)));
        }

        let locked = sqlx::query_as::<_, GroupEntity>(&format!(
            r#"
            UPDATE groups
            SET status = 'ready', locked_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(LockOutcome::Locked {
            group: locked,
            verdict: Box::new(verdict),
        })
    }

    /// Apply an admin decision to a ready group.
    ///
    /// Approval is unconditional on rules. Rejection records the use case on
    /// the creator's permanent rejection list, clears the selection and the
    /// lock timestamp, and returns the group to `draft`, all in one
    /// transaction.
    pub async fn decide_group(
        &self,
        group_id: Uuid,
        decision: AdminDecision,
        reason: Option<&str>,
    ) -> Result<DecideOutcome, ValidationRepoError> {
        let timer = QueryTimer::new("decide_group");
        let mut tx = self.pool.begin().await?;

        let Some(group) = load_group(&mut tx, group_id, true).await? else {
            timer.record();
            return Ok(DecideOutcome::GroupNotFound);
        };
        if group.status != GroupStatusDb::Ready {
            timer.record();
            return Ok(DecideOutcome::NotReady(group.status.into()));
        }

        match decision {
            AdminDecision::Approve => {
                let approved = sqlx::query_as::<_, GroupEntity>(&format!(
                    r#"
                    UPDATE groups
                    SET status = 'approved', updated_at = now()
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    GROUP_COLUMNS
                ))
                .bind(group_id)
                .fetch_one(&mut *tx)
                .await?;

                tx.commit().await?;
                timer.record();
                Ok(DecideOutcome::Approved(approved))
            }
            AdminDecision::Reject => {
                let rejected_use_case_id = group.use_case_id;
                if let Some(use_case_id) = rejected_use_case_id {
                    sqlx::query(
                        r#"
                        INSERT INTO use_case_rejections (creator_id, use_case_id, group_id, reason)
                        VALUES ($1, $2, $3, $4)
                        ON CONFLICT (creator_id, use_case_id) DO NOTHING
                        "#,
                    )
                    .bind(group.created_by)
                    .bind(use_case_id)
                    .bind(group.id)
                    .bind(reason)
                    .execute(&mut *tx)
                    .await?;
                }

                let reset = sqlx::query_as::<_, GroupEntity>(&format!(
                    r#"
                    UPDATE groups
                    SET status = 'draft', use_case_id = NULL, locked_at = NULL, updated_at = now()
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    GROUP_COLUMNS
                ))
                .bind(group_id)
                .fetch_one(&mut *tx)
                .await?;

                tx.commit().await?;
                timer.record();
                Ok(DecideOutcome::Rejected {
                    group: reset,
                    rejected_use_case_id,
                })
            }
        }
    }

    /// Approve every listed group that is currently ready; others are
    /// skipped silently. Returns the ids that changed.
    pub async fn batch_approve(&self, group_ids: &[Uuid]) -> Result<Vec<Uuid>, ValidationRepoError> {
        let timer = QueryTimer::new("batch_approve_groups");
        let approved = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE groups
            SET status = 'approved', updated_at = now()
            WHERE id = ANY($1) AND status = 'ready'
            RETURNING id
            "#,
        )
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await?;
        timer.record();
        Ok(approved)
    }

    /// Admin-add a user as an accepted member and re-validate.
    ///
    /// The group is promoted to `approved` only when every required rule
    /// passes on the new member set; otherwise it lands back in `draft`.
    pub async fn admin_add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<AddMemberOutcome, ValidationRepoError> {
        let timer = QueryTimer::new("admin_add_member");
        let mut tx = self.pool.begin().await?;

        let Some(group) = load_group(&mut tx, group_id, true).await? else {
            timer.record();
            return Ok(AddMemberOutcome::GroupNotFound);
        };

        let user_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !user_exists {
            timer.record();
            return Ok(AddMemberOutcome::UserNotFound);
        }

        let existing_state = sqlx::query_scalar::<_, MembershipStateDb>(
            r#"
            SELECT state FROM group_memberships
            WHERE group_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing_state == Some(MembershipStateDb::Accepted) {
            timer.record();
            return Ok(AddMemberOutcome::AlreadyMember);
        }

        let accepted_elsewhere = sqlx::query_scalar::<_, bool>(
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
        .fetch_one(&mut *tx)
        .await?;
        if accepted_elsewhere {
            timer.record();
            return Ok(AddMemberOutcome::AlreadyInActiveGroup);
        }

        if existing_state.is_some() {
            sqlx::query(
                r#"
                UPDATE group_memberships
                SET state = 'accepted', responded_at = now(), updated_at = now()
                WHERE group_id = $1 AND user_id = $2
                "#,
            )
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO group_memberships (group_id, user_id, role, state, responded_at)
                VALUES ($1, $2, 'member', 'accepted', now())
                "#,
            )
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let snapshot = load_snapshot_parts(&mut tx, group).await?;
        let verdict = build_group_verdict(&snapshot);

        let new_status = if verdict.has_use_case && verdict.all_required_passed {
            GroupStatusDb::Approved
        } else {
            GroupStatusDb::Draft
        };
        let updated = persist_recomputed_status(&mut tx, group_id, new_status).await?;

        tx.commit().await?;
        timer.record();
        Ok(AddMemberOutcome::Added {
            group: updated,
            verdict: Box::new(verdict),
        })
    }

    /// Admin-remove an accepted member and re-validate.
    ///
    /// The creator can never be removed. With a use case selected, the group
    /// status is recomputed: `ready` when every required rule still passes,
    /// `draft` otherwise. Removal can therefore promote or demote.
    pub async fn admin_remove_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<RemoveMemberOutcome, ValidationRepoError> {
        let timer = QueryTimer::new("admin_remove_member");
        let mut tx = self.pool.begin().await?;

        let Some(group) = load_group(&mut tx, group_id, true).await? else {
            timer.record();
            return Ok(RemoveMemberOutcome::GroupNotFound);
        };
        if user_id == group.created_by {
            timer.record();
            return Ok(RemoveMemberOutcome::CreatorProtected);
        }

        let removed = sqlx::query(
            r#"
            UPDATE group_memberships
            SET state = 'removed', responded_at = now(), updated_at = now()
            WHERE group_id = $1 AND user_id = $2 AND state = 'accepted'
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if removed == 0 {
            timer.record();
            return Ok(RemoveMemberOutcome::MemberNotFound);
        }

        let has_use_case = group.use_case_id.is_some();
        let snapshot = load_snapshot_parts(&mut tx, group).await?;

        let (updated, verdict) = if has_use_case {
            let verdict = build_group_verdict(&snapshot);
            let new_status = if verdict.all_required_passed {
                GroupStatusDb::Ready
            } else {
                GroupStatusDb::Draft
            };
            let updated = persist_recomputed_status(&mut tx, group_id, new_status).await?;
            (updated, Some(Box::new(verdict)))
        } else {
            let updated = sqlx::query_as::<_, GroupEntity>(&format!(
                "UPDATE groups SET updated_at = now() WHERE id = $1 RETURNING {}",
                GROUP_COLUMNS
            ))
            .bind(group_id)
            .fetch_one(&mut *tx)
            .await?;
            (updated, None)
        };

        tx.commit().await?;
        timer.record();
        Ok(RemoveMemberOutcome::Removed {
            group: updated,
            verdict,
        })
    }
}

/// Load a group row, optionally taking a row lock for a transition.
async fn load_group(
    conn: &mut PgConnection,
    group_id: Uuid,
    for_update: bool,
) -> Result<Option<GroupEntity>, sqlx::Error> {
    let query = if for_update {
        format!("SELECT {} FROM groups WHERE id = $1 FOR UPDATE", GROUP_COLUMNS)
    } else {
        format!("SELECT {} FROM groups WHERE id = $1", GROUP_COLUMNS)
    };
    sqlx::query_as::<_, GroupEntity>(&query)
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Load use case, rules and accepted members for a group into a snapshot.
///
/// A group without a use case yields an empty snapshot; aggregation
/// short-circuits on it without touching the rule tables.
async fn load_snapshot_parts(
    conn: &mut PgConnection,
    group: GroupEntity,
) -> Result<ValidationSnapshot, ValidationRepoError> {
    let Some(use_case_id) = group.use_case_id else {
        return Ok(ValidationSnapshot {
            group: group.into(),
            use_case: None,
            rules: Vec::new(),
            members: Vec::new(),
        });
    };

    let use_case = sqlx::query_as::<_, crate::entities::UseCaseEntity>(
        r#"
        SELECT id, batch_id, title, summary, is_active, created_by, created_at, updated_at
        FROM use_cases
        WHERE id = $1
        "#,
    )
    .bind(use_case_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(ValidationRepoError::DanglingUseCase {
        group_id: group.id,
        use_case_id,
    })?;

    let assigned = sqlx::query_as::<_, AssignedRuleEntity>(
        r#"
        SELECT
            r.id as rule_id, r.rule_type, r.rule_value, r.description,
            ucr.is_required, ucr.position
        FROM use_case_rules ucr
        JOIN rules r ON ucr.rule_id = r.id
        WHERE ucr.use_case_id = $1
        ORDER BY ucr.position, r.id
        "#,
    )
    .bind(use_case_id)
    .fetch_all(&mut *conn)
    .await?;

    let legacy = sqlx::query_as::<_, LegacyRuleEntity>(
        r#"
        SELECT id, batch_id, criteria, operator, user_attribute, attribute_value,
               value, is_required, created_at
        FROM legacy_rules
        WHERE batch_id = $1
        ORDER BY id
        "#,
    )
    .bind(group.batch_id)
    .fetch_all(&mut *conn)
    .await?;

    let members = sqlx::query_as::<_, MemberWithProfileEntity>(
        r#"
        SELECT
            u.id as user_id, u.display_name, u.university, u.learning_path,
            gm.role, gm.state, gm.created_at as joined_at
        FROM group_memberships gm
        JOIN users u ON gm.user_id = u.id
        WHERE gm.group_id = $1 AND gm.state = 'accepted'
        ORDER BY gm.created_at
        "#,
    )
    .bind(group.id)
    .fetch_all(&mut *conn)
    .await?;

    let rules: Vec<RuleSpec> = assigned
        .into_iter()
        .map(RuleSpec::from)
        .chain(legacy.into_iter().map(RuleSpec::from))
        .collect();

    Ok(ValidationSnapshot {
        use_case: Some(UseCaseSummary::from(&use_case)),
        rules,
        members: members.into_iter().map(MemberProfile::from).collect(),
        group: group.into(),
    })
}

/// Persist a recomputed status after a membership mutation. Draft clears the
/// lock timestamp; ready/approved keep an existing one or stamp now.
async fn persist_recomputed_status(
    conn: &mut PgConnection,
    group_id: Uuid,
    status: GroupStatusDb,
) -> Result<GroupEntity, sqlx::Error> {
    let locked_at_expr = match status {
        GroupStatusDb::Draft => "NULL",
        _ => "COALESCE(locked_at, now())",
    };
    sqlx::query_as::<_, GroupEntity>(&format!(
        r#"
        UPDATE groups
        SET status = $2, locked_at = {}, updated_at = now()
        WHERE id = $1
        RETURNING {}
        "#,
        locked_at_expr, GROUP_COLUMNS
    ))
    .bind(group_id)
    .bind(status)
    .fetch_one(&mut *conn)
    .await
}
