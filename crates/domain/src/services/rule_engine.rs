//! Rule engine: pure evaluation of a single rule against a member set.
//!
//! Both rule families dispatch through [`evaluate`]. Evaluation is
//! deterministic, performs no I/O, and never fails: an unmet rule, an
//! unknown rule type, or a malformed stored value all produce a
//! `passed = false` verdict with an explanatory message.

use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::models::member::MemberProfile;
use crate::models::rule::{
    CompareOp, LegacyCriteria, LegacyRuleSpec, RuleSpec, RuleValue, UseCaseRuleSpec,
    UseCaseRuleType,
};
use crate::models::validation::RuleVerdict;

/// Bucket label for members without a university.
const UNKNOWN_UNIVERSITY: &str = "Unknown";

/// Bucket label for missing legacy attribute values.
const MISSING_ATTRIBUTE: &str = "null";

/// Evaluates a single rule against the accepted members of a group.
pub fn evaluate(rule: &RuleSpec, members: &[MemberProfile]) -> RuleVerdict {
    match rule {
        RuleSpec::UseCase(r) => evaluate_use_case_rule(r, members),
        RuleSpec::Legacy(r) => evaluate_legacy_rule(r, members),
    }
}

/// Integer comparison used by legacy rule dispatch.
pub fn compare_values(current: i64, op: CompareOp, expected: i64) -> bool {
    match op {
        CompareOp::EqualTo => current == expected,
        CompareOp::NotEqualTo => current != expected,
        CompareOp::GreaterThan => current > expected,
        CompareOp::GreaterThanOrEqual => current >= expected,
        CompareOp::LessThan => current < expected,
        CompareOp::LessThanOrEqual => current <= expected,
    }
}

fn evaluate_use_case_rule(rule: &UseCaseRuleSpec, members: &[MemberProfile]) -> RuleVerdict {
    let rule_type: UseCaseRuleType = match rule.rule_type.parse() {
        Ok(t) => t,
        Err(_) => return RuleVerdict::invalid(format!("Unknown rule type: {}", rule.rule_type)),
    };
    let value = match rule_type.parse_value(&rule.rule_value) {
        Ok(v) => v,
        Err(e) => return RuleVerdict::invalid(format!("Malformed rule value: {}", e)),
    };

    match rule_type {
        UseCaseRuleType::GroupSize => {
            let RuleValue::Count(expected) = value else {
                return RuleVerdict::invalid("Malformed rule value for group_size");
            };
            group_size_verdict(expected, members)
        }
        UseCaseRuleType::MaxSameUniversity => {
            let RuleValue::Count(limit) = value else {
                return RuleVerdict::invalid("Malformed rule value for max_same_university");
            };
            max_same_university_verdict(limit, members)
        }
        UseCaseRuleType::RequiredLearningPaths => {
            let RuleValue::NameList(paths) = value else {
                return RuleVerdict::invalid("Malformed rule value for required_learning_paths");
            };
            required_learning_paths_verdict(&paths, members)
        }
    }
}

/// The team must have exactly the configured number of accepted members.
fn group_size_verdict(expected: i64, members: &[MemberProfile]) -> RuleVerdict {
    let current = members.len() as i64;
    let passed = current == expected;
    let message = if passed {
        format!("Group has exactly {} accepted members", expected)
    } else {
        format!(
            "Group has {} accepted members, expected exactly {}",
            current, expected
        )
    };
    RuleVerdict {
        passed,
        current_value: json!(current),
        expected_value: json!(expected),
        message,
        details: Value::Null,
    }
}

/// No university may contribute more than the configured number of members.
/// Members without a university count toward a shared "Unknown" bucket.
fn max_same_university_verdict(limit: i64, members: &[MemberProfile]) -> RuleVerdict {
    let buckets = count_by(members, |m| m.university.as_deref(), UNKNOWN_UNIVERSITY);
    let largest = largest_bucket(&buckets);
    let largest_name = largest.map(|(name, _)| name.to_string());
    let current = largest.map(|(_, count)| count).unwrap_or(0);
    let passed = current <= limit;
    let message = match (&largest_name, passed) {
        (Some(name), false) => {
            format!("{} members are from {}, limit is {}", current, name, limit)
        }
        _ => format!("No university exceeds {} members", limit),
    };
    RuleVerdict {
        passed,
        current_value: json!(current),
        expected_value: json!(limit),
        message,
        details: json!({
            "largest_university": largest_name,
            "universities": buckets,
        }),
    }
}

/// At least one accepted member must be on one of the listed learning paths.
fn required_learning_paths_verdict(paths: &[String], members: &[MemberProfile]) -> RuleVerdict {
    let matching_members: Vec<_> = members
        .iter()
        .filter(|m| {
            m.learning_path
                .as_deref()
                .is_some_and(|p| paths.iter().any(|required| required == p))
        })
        .map(|m| m.user_id)
        .collect();
    let matching_paths: Vec<_> = paths
        .iter()
        .filter(|required| {
            members
                .iter()
                .any(|m| m.learning_path.as_deref() == Some(required.as_str()))
        })
        .cloned()
        .collect();

    let passed = !matching_members.is_empty();
    let message = if passed {
        format!(
            "{} member(s) cover the required learning paths",
            matching_members.len()
        )
    } else {
        format!(
            "No member matches any required learning path: {}",
            paths.join(", ")
        )
    };
    RuleVerdict {
        passed,
        current_value: json!(matching_members.len()),
        expected_value: json!(paths),
        message,
        details: json!({
            "matching_paths": matching_paths,
            "matching_members": matching_members,
        }),
    }
}

fn evaluate_legacy_rule(rule: &LegacyRuleSpec, members: &[MemberProfile]) -> RuleVerdict {
    let criteria: LegacyCriteria = match rule.criteria.parse() {
        Ok(c) => c,
        Err(_) => return RuleVerdict::invalid(format!("Unknown criteria: {}", rule.criteria)),
    };

    match criteria {
        LegacyCriteria::GroupSize => {
            compare_verdict(members.len() as i64, rule, "member count")
        }
        LegacyCriteria::UserAttributeCount => {
            let current = matching_count(members, &rule.user_attribute, rule.attribute_value.as_deref());
            compare_verdict(current, rule, "matching member count")
        }
        LegacyCriteria::SameUserAttribute => {
            let buckets = count_by(
                members,
                |m| m.attribute(&rule.user_attribute),
                MISSING_ATTRIBUTE,
            );
            let largest = largest_bucket(&buckets);
            let current = largest.map(|(_, count)| count).unwrap_or(0);
            let mut verdict = compare_verdict(current, rule, "largest shared attribute count");
            verdict.details = json!({
                "attribute": rule.user_attribute,
                "largest_value": largest.map(|(name, _)| name),
            });
            verdict
        }
        LegacyCriteria::UserAttributeUnique => {
            // Pass/fail is a direct all-distinct check; the configured
            // operator and value are ignored for this criteria.
            let buckets = count_by(
                members,
                |m| m.attribute(&rule.user_attribute),
                MISSING_ATTRIBUTE,
            );
            let distinct = buckets.len() as i64;
            let total = members.len() as i64;
            let passed = distinct == total;
            let message = if passed {
                format!("All members have a distinct {}", rule.user_attribute)
            } else {
                format!(
                    "Only {} distinct values of {} across {} members",
                    distinct, rule.user_attribute, total
                )
            };
            RuleVerdict {
                passed,
                current_value: json!(distinct),
                expected_value: json!(total),
                message,
                details: Value::Null,
            }
        }
        LegacyCriteria::MinUserAttributeCount => {
            // Compared >= directly, bypassing the operator dispatch.
            let current = matching_count(members, &rule.user_attribute, rule.attribute_value.as_deref());
            let passed = current >= rule.value;
            bound_verdict(current, rule, passed, "at least")
        }
        LegacyCriteria::MaxUserAttributeCount => {
            // Compared <= directly, bypassing the operator dispatch.
            let current = matching_count(members, &rule.user_attribute, rule.attribute_value.as_deref());
            let passed = current <= rule.value;
            bound_verdict(current, rule, passed, "at most")
        }
    }
}

/// Count of members whose named attribute equals the expected value.
/// A missing attribute only matches a missing expected value.
fn matching_count(members: &[MemberProfile], attribute: &str, expected: Option<&str>) -> i64 {
    members
        .iter()
        .filter(|m| m.attribute(attribute) == expected)
        .count() as i64
}

fn compare_verdict(current: i64, rule: &LegacyRuleSpec, what: &str) -> RuleVerdict {
    let op: CompareOp = match rule.operator.parse() {
        Ok(op) => op,
        Err(_) => return RuleVerdict::invalid(format!("Unknown operator: {}", rule.operator)),
    };
    let passed = compare_values(current, op, rule.value);
    let message = if passed {
        format!("{} {} is {} {}", what, current, op, rule.value)
    } else {
        format!("{} {} is not {} {}", what, current, op, rule.value)
    };
    RuleVerdict {
        passed,
        current_value: json!(current),
        expected_value: json!(rule.value),
        message,
        details: Value::Null,
    }
}

fn bound_verdict(current: i64, rule: &LegacyRuleSpec, passed: bool, bound: &str) -> RuleVerdict {
    let target = match rule.attribute_value.as_deref() {
        Some(av) => format!("{} = {}", rule.user_attribute, av),
        None => rule.user_attribute.clone(),
    };
    let message = if passed {
        format!("{} members match {} ({} {} required)", current, target, bound, rule.value)
    } else {
        format!(
            "{} members match {}, {} {} required",
            current, target, bound, rule.value
        )
    };
    RuleVerdict {
        passed,
        current_value: json!(current),
        expected_value: json!(rule.value),
        message,
        details: Value::Null,
    }
}

/// Groups members by a key, substituting `missing` for absent values.
/// BTreeMap keeps iteration (and therefore tie-breaking) deterministic.
fn count_by<'a, F>(
    members: &'a [MemberProfile],
    key: F,
    missing: &str,
) -> BTreeMap<String, i64>
where
    F: Fn(&'a MemberProfile) -> Option<&'a str>,
{
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for member in members {
        let bucket = key(member).unwrap_or(missing).to_string();
        *buckets.entry(bucket).or_insert(0) += 1;
    }
    buckets
}

/// Largest bucket by count; ties resolve to the first key in map order.
fn largest_bucket(buckets: &BTreeMap<String, i64>) -> Option<(&str, i64)> {
    let mut largest: Option<(&str, i64)> = None;
    for (name, &count) in buckets {
        match largest {
            Some((_, best)) if count <= best => {}
            _ => largest = Some((name.as_str(), count)),
        }
    }
    largest
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn member(university: Option<&str>, learning_path: Option<&str>) -> MemberProfile {
        MemberProfile {
            user_id: Uuid::new_v4(),
            display_name: None,
            university: university.map(String::from),
            learning_path: learning_path.map(String::from),
        }
    }

    fn members_with_universities(universities: &[Option<&str>]) -> Vec<MemberProfile> {
        universities.iter().map(|u| member(*u, None)).collect()
    }

    fn group_size_rule(value: &str) -> RuleSpec {
        RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id: Uuid::new_v4(),
            rule_type: "group_size".to_string(),
            rule_value: value.to_string(),
            description: "Team size".to_string(),
            is_required: true,
        })
    }

    fn university_rule(value: &str) -> RuleSpec {
        RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id: Uuid::new_v4(),
            rule_type: "max_same_university".to_string(),
            rule_value: value.to_string(),
            description: "University mix".to_string(),
            is_required: true,
        })
    }

    fn paths_rule(value: &str) -> RuleSpec {
        RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id: Uuid::new_v4(),
            rule_type: "required_learning_paths".to_string(),
            rule_value: value.to_string(),
            description: "Learning paths".to_string(),
            is_required: true,
        })
    }

    fn legacy_rule(
        criteria: &str,
        operator: &str,
        attribute: &str,
        attribute_value: Option<&str>,
        value: i64,
    ) -> RuleSpec {
        RuleSpec::Legacy(LegacyRuleSpec {
            rule_id: Uuid::new_v4(),
            criteria: criteria.to_string(),
            operator: operator.to_string(),
            user_attribute: attribute.to_string(),
            attribute_value: attribute_value.map(String::from),
            value,
            is_required: true,
        })
    }

    #[test]
    fn test_group_size_exactness() {
        let rule = group_size_rule("4");
        let three: Vec<_> = (0..3).map(|_| member(None, None)).collect();
        let four: Vec<_> = (0..4).map(|_| member(None, None)).collect();
        let five: Vec<_> = (0..5).map(|_| member(None, None)).collect();

        assert!(!evaluate(&rule, &three).passed);
        assert!(evaluate(&rule, &four).passed);
        assert!(!evaluate(&rule, &five).passed);
    }

    #[test]
    fn test_group_size_reports_values() {
        let rule = group_size_rule("4");
        let verdict = evaluate(&rule, &[member(None, None)]);
        assert_eq!(verdict.current_value, json!(1));
        assert_eq!(verdict.expected_value, json!(4));
        assert!(verdict.message.contains("expected exactly 4"));
    }

    #[test]
    fn test_max_same_university_accounting() {
        let members = members_with_universities(&[Some("UnivX"), Some("UnivX"), Some("UnivY")]);

        let verdict = evaluate(&university_rule("1"), &members);
        assert!(!verdict.passed);
        assert_eq!(verdict.current_value, json!(2));
        assert_eq!(verdict.details["largest_university"], "UnivX");

        let verdict = evaluate(&university_rule("2"), &members);
        assert!(verdict.passed);
    }

    #[test]
    fn test_max_same_university_unknown_bucket() {
        let members = members_with_universities(&[None, None, Some("UnivY")]);
        let verdict = evaluate(&university_rule("1"), &members);
        assert!(!verdict.passed);
        assert_eq!(verdict.details["largest_university"], "Unknown");
        assert_eq!(verdict.details["universities"]["Unknown"], 2);
    }

    #[test]
    fn test_max_same_university_tie_break_is_deterministic() {
        let members = members_with_universities(&[Some("Zeta"), Some("Alpha")]);
        let verdict = evaluate(&university_rule("1"), &members);
        // Both buckets have one member; the first key in map order wins.
        assert!(verdict.passed);
        assert_eq!(verdict.details["largest_university"], "Alpha");
    }

    #[test]
    fn test_max_same_university_empty_group_passes() {
        let verdict = evaluate(&university_rule("2"), &[]);
        assert!(verdict.passed);
        assert_eq!(verdict.current_value, json!(0));
    }

    #[test]
    fn test_required_learning_paths_or_semantics() {
        let rule = paths_rule("ML,Cloud");

        let no_match = vec![member(None, Some("Mobile")), member(None, Some("Mobile"))];
        let verdict = evaluate(&rule, &no_match);
        assert!(!verdict.passed);
        assert_eq!(verdict.details["matching_paths"], json!([]));

        let one_match = vec![member(None, Some("ML")), member(None, Some("Mobile"))];
        let verdict = evaluate(&rule, &one_match);
        assert!(verdict.passed);
        assert_eq!(verdict.details["matching_paths"], json!(["ML"]));
        assert_eq!(
            verdict.details["matching_members"].as_array().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_required_learning_paths_trims_entries() {
        let rule = paths_rule(" ML , Cloud ");
        let members = vec![member(None, Some("Cloud"))];
        assert!(evaluate(&rule, &members).passed);
    }

    #[test]
    fn test_required_learning_paths_exact_match_only() {
        let rule = paths_rule("ML");
        let members = vec![member(None, Some("ml")), member(None, Some("ML Ops"))];
        assert!(!evaluate(&rule, &members).passed);
    }

    #[test]
    fn test_unknown_rule_type_fails_without_error() {
        let rule = RuleSpec::UseCase(UseCaseRuleSpec {
            rule_id: Uuid::new_v4(),
            rule_type: "min_gpa".to_string(),
            rule_value: "3".to_string(),
            description: "GPA".to_string(),
            is_required: true,
        });
        let verdict = evaluate(&rule, &[]);
        assert!(!verdict.passed);
        assert!(verdict.message.contains("Unknown rule type"));
    }

    #[test]
    fn test_malformed_rule_value_fails_own_rule_only() {
        let verdict = evaluate(&group_size_rule("four"), &[]);
        assert!(!verdict.passed);
        assert!(verdict.message.contains("Malformed rule value"));
    }

    #[test]
    fn test_compare_values_table() {
        assert!(compare_values(3, CompareOp::EqualTo, 3));
        assert!(!compare_values(3, CompareOp::EqualTo, 4));
        assert!(compare_values(3, CompareOp::NotEqualTo, 4));
        assert!(compare_values(4, CompareOp::GreaterThan, 3));
        assert!(!compare_values(3, CompareOp::GreaterThan, 3));
        assert!(compare_values(3, CompareOp::GreaterThanOrEqual, 3));
        assert!(compare_values(2, CompareOp::LessThan, 3));
        assert!(compare_values(3, CompareOp::LessThanOrEqual, 3));
        assert!(!compare_values(4, CompareOp::LessThanOrEqual, 3));
    }

    #[test]
    fn test_legacy_group_size_with_operator() {
        let members: Vec<_> = (0..3).map(|_| member(None, None)).collect();

        let verdict = evaluate(&legacy_rule("group_size", "at_least", "", None, 3), &members);
        assert!(verdict.passed);

        let verdict = evaluate(&legacy_rule("GROUP_SIZE", "GREATER_THAN", "", None, 3), &members);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_legacy_user_attribute_count() {
        let members = vec![
            member(None, Some("ML")),
            member(None, Some("ML")),
            member(None, Some("Cloud")),
        ];
        let rule = legacy_rule("user_attribute_count", "equal_to", "learning_path", Some("ML"), 2);
        let verdict = evaluate(&rule, &members);
        assert!(verdict.passed);
        assert_eq!(verdict.current_value, json!(2));
    }

    #[test]
    fn test_legacy_same_user_attribute_null_bucket() {
        let members = vec![member(None, None), member(None, None), member(None, Some("ML"))];
        let rule = legacy_rule("same_user_attribute", "at_most", "learning_path", None, 1);
        let verdict = evaluate(&rule, &members);
        assert!(!verdict.passed);
        assert_eq!(verdict.current_value, json!(2));
        assert_eq!(verdict.details["largest_value"], "null");
    }

    #[test]
    fn test_legacy_user_attribute_unique() {
        let distinct = vec![member(Some("A"), None), member(Some("B"), None)];
        let rule = legacy_rule("user_attribute_unique", "equal_to", "university", None, 0);
        assert!(evaluate(&rule, &distinct).passed);

        let duplicated = vec![member(Some("A"), None), member(Some("A"), None)];
        assert!(!evaluate(&rule, &duplicated).passed);

        // Two missing values collapse into one "null" bucket: not unique.
        let missing = vec![member(None, None), member(None, None)];
        assert!(!evaluate(&rule, &missing).passed);
    }

    #[test]
    fn test_legacy_unique_ignores_operator_and_value() {
        let members = vec![member(Some("A"), None), member(Some("B"), None)];
        let rule = legacy_rule("user_attribute_unique", "bogus_op", "university", None, 999);
        assert!(evaluate(&rule, &members).passed);
    }

    #[test]
    fn test_legacy_min_max_bypass_operator_dispatch() {
        let members = vec![
            member(None, Some("ML")),
            member(None, Some("ML")),
            member(None, Some("Cloud")),
        ];

        // Operator is nonsense; min/max compare directly and never read it.
        let min_rule =
            legacy_rule("min_user_attribute_count", "bogus", "learning_path", Some("ML"), 2);
        assert!(evaluate(&min_rule, &members).passed);

        let min_rule =
            legacy_rule("min_user_attribute_count", "bogus", "learning_path", Some("ML"), 3);
        assert!(!evaluate(&min_rule, &members).passed);

        let max_rule =
            legacy_rule("max_user_attribute_count", "bogus", "learning_path", Some("ML"), 2);
        assert!(evaluate(&max_rule, &members).passed);

        let max_rule =
            legacy_rule("max_user_attribute_count", "bogus", "learning_path", Some("ML"), 1);
        assert!(!evaluate(&max_rule, &members).passed);
    }

    #[test]
    fn test_legacy_unknown_criteria_and_operator() {
        let verdict = evaluate(&legacy_rule("median_age", "equal_to", "age", None, 25), &[]);
        assert!(!verdict.passed);
        assert!(verdict.message.contains("Unknown criteria"));

        let verdict = evaluate(&legacy_rule("group_size", "roughly", "", None, 3), &[]);
        assert!(!verdict.passed);
        assert!(verdict.message.contains("Unknown operator"));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let members = vec![
            member(Some("UnivX"), Some("ML")),
            member(Some("UnivY"), Some("Cloud")),
            member(None, None),
        ];
        let rule = university_rule("2");
        let first = evaluate(&rule, &members);
        let second = evaluate(&rule, &members);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
