//! Member repository: accepted members and their profiles.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::MemberWithProfileEntity;
use crate::metrics::QueryTimer;

/// Repository for reading group members with their user profiles.
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    /// Creates a new MemberRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All memberships of a group (any state), for detail display.
    pub async fn all_members(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<MemberWithProfileEntity>, sqlx::Error> {
        let timer = QueryTimer::new("all_members");
        let result = sqlx::query_as::<_, MemberWithProfileEntity>(
            r#"
            SELECT
                u.id as user_id, u.display_name, u.university, u.learning_path,
                gm.role, gm.state, gm.created_at as joined_at
            FROM group_memberships gm
            JOIN users u ON gm.user_id = u.id
            WHERE gm.group_id = $1
            ORDER BY gm.created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
