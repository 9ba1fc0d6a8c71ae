//! Repository implementations for database operations.

pub mod group;
pub mod member;
pub mod membership;
pub mod rule;
pub mod use_case;
pub mod user;
pub mod validation;

pub use group::GroupRepository;
pub use member::MemberRepository;
pub use membership::{AcceptOutcome, CanAddOutcome, MembershipRepository};
pub use rule::RuleRepository;
pub use use_case::{DeactivateOutcome, UseCaseRepository};
pub use user::UserRepository;
pub use validation::{
    AddMemberOutcome, AdminDecision, DecideOutcome, LockOutcome, RemoveMemberOutcome,
    ValidationRepoError, ValidationRepository,
};
