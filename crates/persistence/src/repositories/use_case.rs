//! Use case repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UseCaseEntity;
use crate::metrics::QueryTimer;

const USE_CASE_COLUMNS: &str =
    "id, batch_id, title, summary, is_active, created_by, created_at, updated_at";

/// Result of deactivating a use case.
#[derive(Debug)]
pub enum DeactivateOutcome {
    NotFound,
    /// Refused: locked or approved groups still reference the use case.
    InUse { referencing_groups: i64 },
    Deactivated {
        /// Draft groups whose selection was cleared in the same transaction.
        cleared_group_ids: Vec<Uuid>,
    },
}

/// Repository for use-case-related database operations.
#[derive(Clone)]
pub struct UseCaseRepository {
    pool: PgPool,
}

impl UseCaseRepository {
    /// Creates a new UseCaseRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new use case.
    pub async fn create(
        &self,
        batch_id: Uuid,
        title: &str,
        summary: Option<&str>,
        created_by: Uuid,
    ) -> Result<UseCaseEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_use_case");
        let result = sqlx::query_as::<_, UseCaseEntity>(&format!(
            r#"
            INSERT INTO use_cases (batch_id, title, summary, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USE_CASE_COLUMNS
        ))
        .bind(batch_id)
        .bind(title)
        .bind(summary)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a use case by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UseCaseEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_use_case_by_id");
        let result = sqlx::query_as::<_, UseCaseEntity>(&format!(
            "SELECT {} FROM use_cases WHERE id = $1",
            USE_CASE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Active use cases for a batch, newest first.
    pub async fn list_active_for_batch(
        &self,
        batch_id: Uuid,
    ) -> Result<Vec<UseCaseEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_use_cases");
        let result = sqlx::query_as::<_, UseCaseEntity>(&format!(
            r#"
            SELECT {}
            FROM use_cases
            WHERE batch_id = $1 AND is_active = true
            ORDER BY created_at DESC
            "#,
            USE_CASE_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Update a use case. Absent fields keep their current values.
    pub async fn update(
        &self,
        id: Uuid,
        title: Option<&str>,
        summary: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Option<UseCaseEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_use_case");
        let result = sqlx::query_as::<_, UseCaseEntity>(&format!(
            r#"
            UPDATE use_cases
            SET
                title = COALESCE($2, title),
                summary = COALESCE($3, summary),
                is_active = COALESCE($4, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            USE_CASE_COLUMNS
        ))
        .bind(id)
        .bind(title)
        .bind(summary)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Deactivate a use case.
    ///
    /// Refused while any ready or approved group references it. Draft groups
    /// referencing it get their selection cleared in the same transaction,
    /// so no draft group is left pointing at a missing brief.
    pub async fn deactivate(&self, id: Uuid) -> Result<DeactivateOutcome, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_use_case");
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM use_cases WHERE id = $1) ",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            timer.record();
            return Ok(DeactivateOutcome::NotFound);
        }

        let referencing_groups = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM groups
            WHERE use_case_id = $1 AND status IN ('ready', 'approved')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referencing_groups > 0 {
            timer.record();
            return Ok(DeactivateOutcome::InUse { referencing_groups });
        }

        sqlx::query("UPDATE use_cases SET is_active = false, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let cleared_group_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE groups
            SET use_case_id = NULL, updated_at = now()
            WHERE use_case_id = $1 AND status = 'draft'
            RETURNING id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(DeactivateOutcome::Deactivated { cleared_group_ids })
    }

    /// True if the creator has this use case on their permanent rejection
    /// list. Once recorded, the use case can never be re-selected by that
    /// creator.
    pub async fn is_rejected_for_creator(
        &self,
        creator_id: Uuid,
        use_case_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("is_use_case_rejected_for_creator");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM use_case_rejections
                WHERE creator_id = $1 AND use_case_id = $2
            )
            "#,
        )
        .bind(creator_id)
        .bind(use_case_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
