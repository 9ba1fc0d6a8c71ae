//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod group;
pub mod rule;
pub mod use_case;
pub mod user;

pub use group::{
    GroupEntity, GroupMembershipEntity, GroupStatusDb, GroupSummaryEntity, MemberRoleDb,
    MembershipStateDb,
};
pub use rule::{AssignedRuleEntity, LegacyRuleEntity, RuleEntity};
pub use use_case::UseCaseEntity;
pub use user::{MemberWithProfileEntity, UserEntity};
