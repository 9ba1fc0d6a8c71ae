//! Rule repository: rule definitions and use-case assignments.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AssignedRuleEntity, LegacyRuleEntity, RuleEntity};
use crate::metrics::QueryTimer;

const RULE_COLUMNS: &str = "id, rule_type, rule_value, description, created_at";

const LEGACY_RULE_COLUMNS: &str =
    "id, batch_id, criteria, operator, user_attribute, attribute_value, value, is_required, created_at";

/// Repository for rule definitions of both families.
#[derive(Clone)]
pub struct RuleRepository {
    pool: PgPool,
}

impl RuleRepository {
    /// Creates a new RuleRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a use-case rule definition. Callers validate the rule value
    /// against the rule type before it gets here.
    pub async fn create_rule(
        &self,
        rule_type: &str,
        rule_value: &str,
        description: &str,
    ) -> Result<RuleEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_rule");
        let result = sqlx::query_as::<_, RuleEntity>(&format!(
            r#"
            INSERT INTO rules (rule_type, rule_value, description)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(rule_type)
        .bind(rule_value)
        .bind(description)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a rule definition by ID.
    pub async fn find_rule(&self, id: Uuid) -> Result<Option<RuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_rule_by_id");
        let result = sqlx::query_as::<_, RuleEntity>(&format!(
            "SELECT {} FROM rules WHERE id = $1",
            RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// All rule definitions, oldest first.
    pub async fn list_rules(&self) -> Result<Vec<RuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_rules");
        let result = sqlx::query_as::<_, RuleEntity>(&format!(
            "SELECT {} FROM rules ORDER BY created_at, id",
            RULE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Attach a rule to a use case with a per-assignment required flag.
    pub async fn attach_to_use_case(
        &self,
        use_case_id: Uuid,
        rule_id: Uuid,
        is_required: bool,
        position: i32,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("attach_rule_to_use_case");
        let result = sqlx::query(
            r#"
            INSERT INTO use_case_rules (use_case_id, rule_id, is_required, position)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(use_case_id)
        .bind(rule_id)
        .bind(is_required)
        .bind(position)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected());
        timer.record();
        result
    }

    /// Rules assigned to a use case, in stored assignment order.
    pub async fn rules_for_use_case(
        &self,
        use_case_id: Uuid,
    ) -> Result<Vec<AssignedRuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("rules_for_use_case");
        let result = sqlx::query_as::<_, AssignedRuleEntity>(
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
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Create a legacy batch rule.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_legacy_rule(
        &self,
        batch_id: Uuid,
        criteria: &str,
        operator: &str,
        user_attribute: &str,
        attribute_value: Option<&str>,
        value: i64,
        is_required: bool,
    ) -> Result<LegacyRuleEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_legacy_rule");
        let result = sqlx::query_as::<_, LegacyRuleEntity>(&format!(
            r#"
            INSERT INTO legacy_rules
                (batch_id, criteria, operator, user_attribute, attribute_value, value, is_required)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            LEGACY_RULE_COLUMNS
        ))
        .bind(batch_id)
        .bind(criteria)
        .bind(operator)
        .bind(user_attribute)
        .bind(attribute_value)
        .bind(value)
        .bind(is_required)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Legacy rules for a batch, in stable id order.
    pub async fn legacy_rules_for_batch(
        &self,
        batch_id: Uuid,
    ) -> Result<Vec<LegacyRuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("legacy_rules_for_batch");
        let result = sqlx::query_as::<_, LegacyRuleEntity>(&format!(
            "SELECT {} FROM legacy_rules WHERE batch_id = $1 ORDER BY id",
            LEGACY_RULE_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
