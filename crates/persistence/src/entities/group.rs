//! Group and membership entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::group::{GroupStatus, MemberRole, MembershipState};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for group_status that maps to the PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "group_status", rename_all = "lowercase")]
pub enum GroupStatusDb {
    Draft,
    Ready,
    Approved,
    Rejected,
    Disbanded,
}

impl From<GroupStatusDb> for GroupStatus {
    fn from(db_status: GroupStatusDb) -> Self {
        match db_status {
            GroupStatusDb::Draft => GroupStatus::Draft,
            GroupStatusDb::Ready => GroupStatus::Ready,
            GroupStatusDb::Approved => GroupStatus::Approved,
            GroupStatusDb::Rejected => GroupStatus::Rejected,
            GroupStatusDb::Disbanded => GroupStatus::Disbanded,
        }
    }
}

impl From<GroupStatus> for GroupStatusDb {
    fn from(status: GroupStatus) -> Self {
        match status {
            GroupStatus::Draft => GroupStatusDb::Draft,
            GroupStatus::Ready => GroupStatusDb::Ready,
            GroupStatus::Approved => GroupStatusDb::Approved,
            GroupStatus::Rejected => GroupStatusDb::Rejected,
            GroupStatus::Disbanded => GroupStatusDb::Disbanded,
        }
    }
}

/// Database enum for member_role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
pub enum MemberRoleDb {
    Leader,
    Member,
}

impl From<MemberRoleDb> for MemberRole {
    fn from(db_role: MemberRoleDb) -> Self {
        match db_role {
            MemberRoleDb::Leader => MemberRole::Leader,
            MemberRoleDb::Member => MemberRole::Member,
        }
    }
}

impl From<MemberRole> for MemberRoleDb {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Leader => MemberRoleDb::Leader,
            MemberRole::Member => MemberRoleDb::Member,
        }
    }
}

/// Database enum for membership_state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "membership_state", rename_all = "lowercase")]
pub enum MembershipStateDb {
    Pending,
    Accepted,
    Declined,
    Removed,
}

impl From<MembershipStateDb> for MembershipState {
    fn from(db_state: MembershipStateDb) -> Self {
        match db_state {
            MembershipStateDb::Pending => MembershipState::Pending,
            MembershipStateDb::Accepted => MembershipState::Accepted,
            MembershipStateDb::Declined => MembershipState::Declined,
            MembershipStateDb::Removed => MembershipState::Removed,
        }
    }
}

impl From<MembershipState> for MembershipStateDb {
    fn from(state: MembershipState) -> Self {
        match state {
            MembershipState::Pending => MembershipStateDb::Pending,
            MembershipState::Accepted => MembershipStateDb::Accepted,
            MembershipState::Declined => MembershipStateDb::Declined,
            MembershipState::Removed => MembershipStateDb::Removed,
        }
    }
}

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub use_case_id: Option<Uuid>,
    pub name: String,
    pub status: GroupStatusDb,
    pub created_by: Uuid,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupEntity> for domain::models::Group {
    fn from(entity: GroupEntity) -> Self {
        Self {
            id: entity.id,
            batch_id: entity.batch_id,
            use_case_id: entity.use_case_id,
            name: entity.name,
            status: entity.status.into(),
            created_by: entity.created_by,
            locked_at: entity.locked_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the group_memberships table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMembershipEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRoleDb,
    pub state: MembershipStateDb,
    pub invited_by: Option<Uuid>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupMembershipEntity> for domain::models::GroupMembership {
    fn from(entity: GroupMembershipEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            user_id: entity.user_id,
            role: entity.role.into(),
            state: entity.state.into(),
            invited_by: entity.invited_by,
            responded_at: entity.responded_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Group row with member count, for admin listings.
#[derive(Debug, Clone, FromRow)]
pub struct GroupSummaryEntity {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub name: String,
    pub status: GroupStatusDb,
    pub use_case_id: Option<Uuid>,
    pub member_count: i64,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<GroupSummaryEntity> for domain::models::group::GroupSummary {
    fn from(entity: GroupSummaryEntity) -> Self {
        Self {
            id: entity.id,
            batch_id: entity.batch_id,
            name: entity.name,
            status: entity.status.into(),
            use_case_id: entity.use_case_id,
            member_count: entity.member_count,
            locked_at: entity.locked_at,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_status_db_roundtrip() {
        for status in [
            GroupStatus::Draft,
            GroupStatus::Ready,
            GroupStatus::Approved,
            GroupStatus::Rejected,
            GroupStatus::Disbanded,
        ] {
            let db: GroupStatusDb = status.into();
            let back: GroupStatus = db.into();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn test_membership_enums_roundtrip() {
        for role in [MemberRole::Leader, MemberRole::Member] {
            let db: MemberRoleDb = role.into();
            assert_eq!(MemberRole::from(db), role);
        }
        for state in [
            MembershipState::Pending,
            MembershipState::Accepted,
            MembershipState::Declined,
            MembershipState::Removed,
        ] {
            let db: MembershipStateDb = state.into();
            assert_eq!(MembershipState::from(db), state);
        }
    }

    #[test]
    fn test_group_entity_into_domain() {
        let entity = GroupEntity {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            use_case_id: Some(Uuid::new_v4()),
            name: "Team Rocket".to_string(),
            status: GroupStatusDb::Draft,
            created_by: Uuid::new_v4(),
            locked_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let group: domain::models::Group = entity.clone().into();
        assert_eq!(group.id, entity.id);
        assert_eq!(group.status, GroupStatus::Draft);
        assert_eq!(group.use_case_id, entity.use_case_id);
    }
}
