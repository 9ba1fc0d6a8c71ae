//! Group validation orchestration.
//!
//! Loads a consistent snapshot through the validation repository and runs
//! the pure domain aggregation over it. Mutating transitions re-validate
//! inside their own transactions; this service backs the read-only verdict
//! endpoint and post-mutation observability.

use domain::models::GroupVerdict;
use domain::services::validation::build_group_verdict;
use persistence::repositories::ValidationRepository;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::metrics::record_validation_run;

/// Compute the current verdict for a group.
///
/// Fails with NotFound when the group does not exist; everything else,
/// including unmet rules, is data in the returned verdict.
pub async fn validate_group(pool: &PgPool, group_id: Uuid) -> Result<GroupVerdict, ApiError> {
    let repo = ValidationRepository::new(pool.clone());
    let snapshot = repo
        .load_snapshot(group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let verdict = build_group_verdict(&snapshot);
    record_validation_run(verdict.all_required_passed);
    Ok(verdict)
}
