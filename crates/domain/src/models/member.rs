//! Member profile model consumed by rule evaluation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile attributes of an accepted group member, as read from the user
/// directory. This is the only member data the rule engine sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemberProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub university: Option<String>,
    pub learning_path: Option<String>,
}

impl MemberProfile {
    /// Resolves a named attribute for legacy rules. Unknown attribute names
    /// read as missing.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "university" => self.university.as_deref(),
            "learning_path" => self.learning_path.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(university: Option<&str>, learning_path: Option<&str>) -> MemberProfile {
        MemberProfile {
            user_id: Uuid::new_v4(),
            display_name: None,
            university: university.map(String::from),
            learning_path: learning_path.map(String::from),
        }
    }

    #[test]
    fn test_attribute_lookup() {
        let member = profile(Some("Univ X"), Some("ML"));
        assert_eq!(member.attribute("university"), Some("Univ X"));
        assert_eq!(member.attribute("learning_path"), Some("ML"));
        assert_eq!(member.attribute("shoe_size"), None);
    }

    #[test]
    fn test_attribute_missing_values() {
        let member = profile(None, None);
        assert_eq!(member.attribute("university"), None);
        assert_eq!(member.attribute("learning_path"), None);
    }

    #[test]
    fn test_profile_serde_roundtrip() {
        use fake::faker::name::en::Name;
        use fake::Fake;

        let member = MemberProfile {
            user_id: Uuid::new_v4(),
            display_name: Some(Name().fake()),
            university: Some("Univ X".to_string()),
            learning_path: None,
        };
        let json = serde_json::to_string(&member).unwrap();
        let back: MemberProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, member.user_id);
        assert_eq!(back.display_name, member.display_name);
        assert_eq!(back.learning_path, None);
    }
}
