//! Group verdict aggregation.
//!
//! Takes a consistent snapshot of a group (group row, selected use case,
//! applicable rules, accepted members) and produces the aggregate
//! [`GroupVerdict`]. Pure and deterministic; repositories load the snapshot,
//! this module only computes.

use crate::models::group::GroupStatus;
use crate::models::rule::{RuleSpec, UseCaseRuleType};
use crate::models::validation::{GroupVerdict, RuleCheck, RuleSource, ValidationSnapshot};
use crate::services::rule_engine;

/// Builds the aggregate verdict for a group.
///
/// A group without a selected use case short-circuits: no rules are
/// evaluated and the verdict carries an empty validation list with
/// `can_lock = false`.
pub fn build_group_verdict(snapshot: &ValidationSnapshot) -> GroupVerdict {
    let group = &snapshot.group;

    let Some(use_case) = snapshot.use_case.clone() else {
        return GroupVerdict {
            group_id: group.id,
            group_name: group.name.clone(),
            status: group.status,
            has_use_case: false,
            use_case: None,
            member_count: snapshot.members.len() as i64,
            validations: Vec::new(),
            all_required_passed: true,
            can_lock: false,
        };
    };

    let mut rules = snapshot.rules.clone();
    sort_rules_for_display(&mut rules);

    let validations: Vec<RuleCheck> = rules
        .iter()
        .map(|rule| RuleCheck {
            rule_id: rule.rule_id(),
            source: match rule {
                RuleSpec::UseCase(_) => RuleSource::UseCase,
                RuleSpec::Legacy(_) => RuleSource::Legacy,
            },
            rule_type: rule.rule_type().to_string(),
            description: rule.description(),
            is_required: rule.is_required(),
            verdict: rule_engine::evaluate(rule, &snapshot.members),
        })
        .collect();

    let all_required_passed = validations
        .iter()
        .filter(|check| check.is_required)
        .all(|check| check.verdict.passed);
    let can_lock = all_required_passed && group.status == GroupStatus::Draft;

    GroupVerdict {
        group_id: group.id,
        group_name: group.name.clone(),
        status: group.status,
        has_use_case: true,
        use_case: Some(use_case),
        member_count: snapshot.members.len() as i64,
        validations,
        all_required_passed,
        can_lock,
    }
}

/// Orders rules for display: use-case rules first (group_size, then
/// max_same_university, then required_learning_paths, then unrecognized
/// types by id), legacy rules after, by id. The ordering is
/// presentation-significant only; aggregation does not depend on it.
pub fn sort_rules_for_display(rules: &mut [RuleSpec]) {
    rules.sort_by_key(|rule| {
        let (family, type_rank) = match rule {
            RuleSpec::UseCase(r) => {
                let rank = r
                    .rule_type
                    .parse::<UseCaseRuleType>()
                    .map(|t| t.display_rank())
                    .unwrap_or(u8::MAX);
                (0u8, rank)
            }
            RuleSpec::Legacy(_) => (1u8, 0u8),
        };
        (family, type_rank, rule.rule_id())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::group::Group;
    use crate::models::member::MemberProfile;
    use crate::models::rule::{LegacyRuleSpec, UseCaseRuleSpec};
    use crate::models::use_case::UseCaseSummary;
    use chrono::Utc;
    use uuid::Uuid;

    fn group(status: GroupStatus, with_use_case: bool) -> Group {
        Group {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            use_case_id: with_use_case.then(Uuid::new_v4),
            name: "Team Rocket".to_string(),
            status,
            created_by: Uuid::new_v4(),
            locked_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn member(learning_path: Option<&str>) -> MemberProfile {
        MemberProfile {
            user_id: Uuid::new_v4(),
            display_name: None,
            university: None,
            learning_path: learning_path.map(String::from),
        }
    }

    fn size_rule(rule_id: Uuid, value: &str, is_required: bool) -> RuleSpec {
        RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id,
            rule_type: "group_size".to_string(),
            rule_value: value.to_string(),
            description: "Team size".to_string(),
            is_required,
        })
    }

    fn paths_rule(rule_id: Uuid, value: &str, is_required: bool) -> RuleSpec {
        RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id,
            rule_type: "required_learning_paths".to_string(),
            rule_value: value.to_string(),
            description: "Learning paths".to_string(),
            is_required,
        })
    }

    fn snapshot(
        status: GroupStatus,
        rules: Vec<RuleSpec>,
        members: Vec<MemberProfile>,
    ) -> ValidationSnapshot {
        ValidationSnapshot {
            group: group(status, true),
            use_case: Some(UseCaseSummary {
                id: Uuid::new_v4(),
                title: "Smart Campus".to_string(),
            }),
            rules,
            members,
        }
    }

    #[test]
    fn test_no_use_case_short_circuit() {
        let snapshot = ValidationSnapshot {
            group: group(GroupStatus::Draft, false),
            use_case: None,
            rules: Vec::new(),
            members: Vec::new(),
        };
        let verdict = build_group_verdict(&snapshot);
        assert!(!verdict.has_use_case);
        assert!(!verdict.can_lock);
        assert!(verdict.validations.is_empty());
        assert!(verdict.use_case.is_none());
    }

    #[test]
    fn test_all_required_passed_ignores_optional_failures() {
        let members = vec![member(None), member(None)];
        // Required rule passes (2 members), optional rule fails.
        let rules = vec![
            size_rule(Uuid::new_v4(), "2", true),
            paths_rule(Uuid::new_v4(), "ML", false),
        ];
        let verdict = build_group_verdict(&snapshot(GroupStatus::Draft, rules, members));
        assert!(verdict.all_required_passed);
        assert!(verdict.can_lock);
    }

    #[test]
    fn test_required_failure_blocks_lock() {
        let members = vec![member(None)];
        // Required rule fails (1 member, wants 2), optional rule also fails.
        let rules = vec![
            size_rule(Uuid::new_v4(), "2", true),
            paths_rule(Uuid::new_v4(), "ML", false),
        ];
        let verdict = build_group_verdict(&snapshot(GroupStatus::Draft, rules, members));
        assert!(!verdict.all_required_passed);
        assert!(!verdict.can_lock);
    }

    #[test]
    fn test_can_lock_requires_draft_status() {
        let members = vec![member(None), member(None)];
        for status in [
            GroupStatus::Ready,
            GroupStatus::Approved,
            GroupStatus::Rejected,
            GroupStatus::Disbanded,
        ] {
            let rules = vec![size_rule(Uuid::new_v4(), "2", true)];
            let verdict = build_group_verdict(&snapshot(status, rules, members.clone()));
            assert!(verdict.all_required_passed);
            assert!(!verdict.can_lock, "can_lock must be false in {}", status);
        }
    }

    #[test]
    fn test_empty_rule_set_is_vacuously_valid() {
        let verdict = build_group_verdict(&snapshot(GroupStatus::Draft, Vec::new(), Vec::new()));
        assert!(verdict.all_required_passed);
        assert!(verdict.can_lock);
        assert_eq!(verdict.member_count, 0);
    }

    #[test]
    fn test_verdict_is_idempotent() {
        let members = vec![member(Some("ML")), member(Some("Cloud"))];
        let rules = vec![
            size_rule(Uuid::new_v4(), "2", true),
            paths_rule(Uuid::new_v4(), "ML,Data", true),
        ];
        let snap = snapshot(GroupStatus::Draft, rules, members);
        let first = serde_json::to_value(build_group_verdict(&snap)).unwrap();
        let second = serde_json::to_value(build_group_verdict(&snap)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_display_ordering() {
        let size_id = Uuid::new_v4();
        let paths_id = Uuid::new_v4();
        let legacy_id = Uuid::new_v4();
        let rules = vec![
            RuleSpec::Legacy(LegacyRuleSpec {
                rule_id: legacy_id,
                criteria: "group_size".to_string(),
                operator: "at_least".to_string(),
                user_attribute: String::new(),
                attribute_value: None,
                value: 1,
                is_required: false,
            }),
            paths_rule(paths_id, "ML", false),
            size_rule(size_id, "2", true),
        ];
        let verdict = build_group_verdict(&snapshot(GroupStatus::Draft, rules, Vec::new()));
        let order: Vec<Uuid> = verdict.validations.iter().map(|c| c.rule_id).collect();
        assert_eq!(order, vec![size_id, paths_id, legacy_id]);
        assert_eq!(verdict.validations[0].source, RuleSource::UseCase);
        assert_eq!(verdict.validations[2].source, RuleSource::Legacy);
    }

    #[test]
    fn test_member_count_reported() {
        let members = vec![member(None), member(None), member(None)];
        let verdict = build_group_verdict(&snapshot(GroupStatus::Draft, Vec::new(), members));
        assert_eq!(verdict.member_count, 3);
    }
}
