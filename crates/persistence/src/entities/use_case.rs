//! Use case entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the use_cases table.
#[derive(Debug, Clone, FromRow)]
pub struct UseCaseEntity {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UseCaseEntity> for domain::models::UseCase {
    fn from(entity: UseCaseEntity) -> Self {
        Self {
            id: entity.id,
            batch_id: entity.batch_id,
            title: entity.title,
            summary: entity.summary,
            is_active: entity.is_active,
            created_by: entity.created_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

impl From<&UseCaseEntity> for domain::models::UseCaseSummary {
    fn from(entity: &UseCaseEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title.clone(),
        }
    }
}
