//! User directory entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::group::GroupMemberView;
use domain::models::MemberProfile;
use sqlx::FromRow;
use uuid::Uuid;

use super::group::{MemberRoleDb, MembershipStateDb};

/// Database row mapping for the users table. The user directory is owned by
/// an upstream system; this service only reads it.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub batch_id: Option<Uuid>,
    pub university: Option<String>,
    pub learning_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntity {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Membership row joined with the member's user profile.
#[derive(Debug, Clone, FromRow)]
pub struct MemberWithProfileEntity {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub university: Option<String>,
    pub learning_path: Option<String>,
    pub role: MemberRoleDb,
    pub state: MembershipStateDb,
    pub joined_at: DateTime<Utc>,
}

impl From<MemberWithProfileEntity> for MemberProfile {
    fn from(entity: MemberWithProfileEntity) -> Self {
        Self {
            user_id: entity.user_id,
            display_name: entity.display_name,
            university: entity.university,
            learning_path: entity.learning_path,
        }
    }
}

impl From<MemberWithProfileEntity> for GroupMemberView {
    fn from(entity: MemberWithProfileEntity) -> Self {
        Self {
            user_id: entity.user_id,
            display_name: entity.display_name,
            university: entity.university,
            learning_path: entity.learning_path,
            role: entity.role.into(),
            state: entity.state.into(),
            joined_at: entity.joined_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    #[test]
    fn test_user_is_admin() {
        let email: String = SafeEmail().fake();
        let user = UserEntity {
            id: Uuid::new_v4(),
            email,
            display_name: None,
            role: "admin".to_string(),
            batch_id: None,
            university: None,
            learning_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(user.is_admin());

        let student = UserEntity {
            role: "student".to_string(),
            ..user
        };
        assert!(!student.is_admin());
    }

    #[test]
    fn test_member_with_profile_conversions() {
        let entity = MemberWithProfileEntity {
            user_id: Uuid::new_v4(),
            display_name: Some("Dana".to_string()),
            university: Some("Univ X".to_string()),
            learning_path: Some("ML".to_string()),
            role: MemberRoleDb::Member,
            state: MembershipStateDb::Accepted,
            joined_at: Utc::now(),
        };

        let profile: MemberProfile = entity.clone().into();
        assert_eq!(profile.user_id, entity.user_id);
        assert_eq!(profile.university.as_deref(), Some("Univ X"));

        let view: GroupMemberView = entity.clone().into();
        assert_eq!(view.user_id, entity.user_id);
        assert_eq!(
            view.role,
            domain::models::group::MemberRole::Member
        );
    }
}
