//! Group repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupEntity, GroupStatusDb, GroupSummaryEntity};
use crate::metrics::QueryTimer;

const GROUP_COLUMNS: &str =
    "id, batch_id, use_case_id, name, status, created_by, locked_at, created_at, updated_at";

/// Repository for group-related database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Creates a new GroupRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new draft group and add the creator as accepted leader.
    ///
    /// The unique index on accepted memberships makes this fail with a
    /// constraint violation when the creator already belongs to a group.
    pub async fn create_with_leader(
        &self,
        batch_id: Uuid,
        use_case_id: Uuid,
        name: &str,
        created_by: Uuid,
    ) -> Result<GroupEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_group_with_leader");

        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO groups (batch_id, use_case_id, name, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, batch_id, use_case_id, name, status, created_by, locked_at, created_at, updated_at
            "#,
        )
        .bind(batch_id)
        .bind(use_case_id)
        .bind(name)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO group_memberships (group_id, user_id, role, state, responded_at)
            VALUES ($1, $2, 'leader', 'accepted', now())
            "#,
        )
        .bind(group.id)
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(group)
    }

    /// Find a group by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(&format!(
            "SELECT {} FROM groups WHERE id = $1",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Change a draft group's use case. Returns the number of rows updated;
    /// zero means the group was not in draft (or does not exist).
    pub async fn set_use_case(
        &self,
        group_id: Uuid,
        use_case_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("set_group_use_case");
        let result = sqlx::query(
            r#"
            UPDATE groups
            SET use_case_id = $2, updated_at = now()
            WHERE id = $1 AND status = 'draft'
            "#,
        )
        .bind(group_id)
        .bind(use_case_id)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected());
        timer.record();
        result
    }

    /// List group summaries for the admin review queue, optionally filtered
    /// by status, newest first.
    pub async fn list_summaries(
        &self,
        status: Option<GroupStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GroupSummaryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_group_summaries");
        let result = sqlx::query_as::<_, GroupSummaryEntity>(
            r#"
            SELECT
                g.id, g.batch_id, g.name, g.status, g.use_case_id, g.locked_at, g.created_at,
                (SELECT COUNT(*) FROM group_memberships
                 WHERE group_id = g.id AND state = 'accepted') as member_count
            FROM groups g
            WHERE ($1::group_status IS NULL OR g.status = $1)
            ORDER BY g.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count groups, optionally filtered by status.
    pub async fn count_groups(&self, status: Option<GroupStatusDb>) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_groups");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM groups WHERE ($1::group_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
