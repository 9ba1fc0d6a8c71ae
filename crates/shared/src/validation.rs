//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Maximum length of a group name.
pub const MAX_GROUP_NAME_LENGTH: usize = 100;

/// Maximum number of entries in a comma-separated rule value.
pub const MAX_RULE_LIST_ENTRIES: usize = 20;

lazy_static! {
    /// Comma-separated list of non-empty entries, e.g. "ML, Cloud Computing".
    /// Entries may contain letters, digits, spaces and a few separators.
    static ref RULE_LIST_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9 &/+._-]+(\s*,\s*[A-Za-z0-9 &/+._-]+)*$").unwrap();
}

/// Validates a group name: non-blank after trimming, within length limits.
pub fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("group_name_blank");
        err.message = Some("Group name must not be blank".into());
        return Err(err);
    }
    if trimmed.len() > MAX_GROUP_NAME_LENGTH {
        let mut err = ValidationError::new("group_name_length");
        err.message = Some("Group name must be at most 100 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a rule value parses as a positive integer.
pub fn validate_integer_rule_value(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(()),
        _ => {
            let mut err = ValidationError::new("rule_value_integer");
            err.message = Some("Rule value must be a positive integer".into());
            Err(err)
        }
    }
}

/// Validates that a rule value is a well-formed comma-separated list.
pub fn validate_list_rule_value(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !RULE_LIST_REGEX.is_match(trimmed) {
        let mut err = ValidationError::new("rule_value_list");
        err.message = Some("Rule value must be a comma-separated list of names".into());
        return Err(err);
    }
    let entries = trimmed.split(',').filter(|e| !e.trim().is_empty()).count();
    if entries == 0 || entries > MAX_RULE_LIST_ENTRIES {
        let mut err = ValidationError::new("rule_value_list_size");
        err.message = Some("Rule value must contain between 1 and 20 entries".into());
        return Err(err);
    }
    Ok(())
}
