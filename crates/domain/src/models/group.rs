//! Group domain models for capstone team formation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::use_case::UseCaseSummary;
use super::validation::GroupVerdict;

/// Lifecycle status of a group.
///
/// `draft -> ready` via leader lock, `ready -> approved`/`ready -> draft`
/// via admin decision. `rejected` is transient: an admin rejection records
/// the use case against the creator and immediately returns the group to
/// `draft`. `disbanded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Draft,
    Ready,
    Approved,
    Rejected,
    Disbanded,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Draft => "draft",
            GroupStatus::Ready => "ready",
            GroupStatus::Approved => "approved",
            GroupStatus::Rejected => "rejected",
            GroupStatus::Disbanded => "disbanded",
        }
    }

    /// Returns true if the group can still be edited (use case, invitations).
    pub fn is_editable(&self) -> bool {
        matches!(self, GroupStatus::Draft)
    }

    /// Returns true if the group is waiting for an admin decision.
    pub fn is_pending_decision(&self) -> bool {
        matches!(self, GroupStatus::Ready)
    }

    /// Returns true if no further transitions are defined for this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GroupStatus::Disbanded)
    }
}

impl FromStr for GroupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(GroupStatus::Draft),
            "ready" => Ok(GroupStatus::Ready),
            "approved" => Ok(GroupStatus::Approved),
            "rejected" => Ok(GroupStatus::Rejected),
            "disbanded" => Ok(GroupStatus::Disbanded),
            _ => Err(format!("Invalid group status: {}", s)),
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role within a group. Exactly one leader per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Leader,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Leader => "leader",
            MemberRole::Member => "member",
        }
    }

    /// Returns true if this role can lock the group and manage invitations.
    pub fn can_manage_group(&self) -> bool {
        matches!(self, MemberRole::Leader)
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leader" => Ok(MemberRole::Leader),
            "member" => Ok(MemberRole::Member),
            _ => Err(format!("Invalid member role: {}", s)),
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a (group, user) membership. Only `accepted` memberships count
/// toward rule validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipState {
    Pending,
    Accepted,
    Declined,
    Removed,
}

impl MembershipState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipState::Pending => "pending",
            MembershipState::Accepted => "accepted",
            MembershipState::Declined => "declined",
            MembershipState::Removed => "removed",
        }
    }

    /// Returns true if the membership can still be accepted or declined.
    pub fn is_open(&self) -> bool {
        matches!(self, MembershipState::Pending)
    }
}

impl FromStr for MembershipState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MembershipState::Pending),
            "accepted" => Ok(MembershipState::Accepted),
            "declined" => Ok(MembershipState::Declined),
            "removed" => Ok(MembershipState::Removed),
            _ => Err(format!("Invalid membership state: {}", s)),
        }
    }
}

impl fmt::Display for MembershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents a capstone project team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub use_case_id: Option<Uuid>,
    pub name: String,
    pub status: GroupStatus,
    pub created_by: Uuid,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a user's membership in a group.
///
/// Invitations are pending memberships: a leader invite creates a `pending`
/// row which the invitee accepts or declines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupMembership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub state: MembershipState,
    pub invited_by: Option<Uuid>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a group by selecting a use case.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    pub use_case_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_group_name"))]
    pub group_name: Option<String>,
}

/// Request payload for changing a draft group's use case.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChangeUseCaseRequest {
    pub use_case_id: Uuid,
}

/// A member as shown in group detail responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupMemberView {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub university: Option<String>,
    pub learning_path: Option<String>,
    pub role: MemberRole,
    pub state: MembershipState,
    pub joined_at: DateTime<Utc>,
}

/// Response for group detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupDetail {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub name: String,
    pub status: GroupStatus,
    pub use_case: Option<UseCaseSummary>,
    pub created_by: Uuid,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub members: Vec<GroupMemberView>,
}

/// Response after locking a group for approval.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LockGroupResponse {
    pub group_id: Uuid,
    pub status: GroupStatus,
    pub locked_at: DateTime<Utc>,
    pub verdict: GroupVerdict,
}

/// Request for an admin decision on a ready group.
///
/// `status` is kept stringly-typed so that unsupported values surface as a
/// 400 with a reason instead of a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DecideGroupRequest {
    pub status: String,
    pub rejection_reason: Option<String>,
}

/// Response after an admin decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DecideGroupResponse {
    pub group_id: Uuid,
    pub status: GroupStatus,
    pub use_case_id: Option<Uuid>,
    pub rejection_recorded: bool,
}

/// Request for batch approval of ready groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchValidateRequest {
    pub group_ids: Vec<Uuid>,
    pub status: String,
}

/// Response for batch approval: which groups changed, which were skipped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchValidateResponse {
    pub approved: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
}

/// Request to add a member (admin) or invite a member (leader).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// Response when removing a member, including the recomputed group status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RemoveMemberResponse {
    pub removed: bool,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub status: GroupStatus,
}

/// Response when an admin adds a member, including the recomputed status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminAddMemberResponse {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub status: GroupStatus,
    pub all_required_passed: bool,
}

/// Response for an invitation (pending membership).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationResponse {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub state: MembershipState,
    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for the admin group listing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct ListGroupsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListGroupsQuery {
    /// Effective pagination parameters for this query.
    pub fn page_params(&self) -> shared::pagination::PageParams {
        shared::pagination::PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Summary row in the admin group listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GroupSummary {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub name: String,
    pub status: GroupStatus,
    pub use_case_id: Option<Uuid>,
    pub member_count: i64,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Response for the admin group listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListGroupsResponse {
    pub data: Vec<GroupSummary>,
    pub pagination: shared::pagination::Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_status_as_str() {
        assert_eq!(GroupStatus::Draft.as_str(), "draft");
        assert_eq!(GroupStatus::Ready.as_str(), "ready");
        assert_eq!(GroupStatus::Approved.as_str(), "approved");
        assert_eq!(GroupStatus::Rejected.as_str(), "rejected");
        assert_eq!(GroupStatus::Disbanded.as_str(), "disbanded");
    }

    #[test]
    fn test_group_status_from_str() {
        assert_eq!(GroupStatus::from_str("draft").unwrap(), GroupStatus::Draft);
        assert_eq!(GroupStatus::from_str("READY").unwrap(), GroupStatus::Ready);
        assert_eq!(
            GroupStatus::from_str("Approved").unwrap(),
            GroupStatus::Approved
        );
        assert!(GroupStatus::from_str("locked").is_err());
    }

    #[test]
    fn test_group_status_predicates() {
        assert!(GroupStatus::Draft.is_editable());
        assert!(!GroupStatus::Ready.is_editable());
        assert!(!GroupStatus::Approved.is_editable());

        assert!(GroupStatus::Ready.is_pending_decision());
        assert!(!GroupStatus::Draft.is_pending_decision());

        assert!(GroupStatus::Disbanded.is_terminal());
        assert!(!GroupStatus::Approved.is_terminal());
        assert!(!GroupStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_member_role() {
        assert_eq!(MemberRole::from_str("leader").unwrap(), MemberRole::Leader);
        assert_eq!(MemberRole::from_str("MEMBER").unwrap(), MemberRole::Member);
        assert!(MemberRole::from_str("owner").is_err());

        assert!(MemberRole::Leader.can_manage_group());
        assert!(!MemberRole::Member.can_manage_group());
        assert_eq!(format!("{}", MemberRole::Leader), "leader");
    }

    #[test]
    fn test_membership_state() {
        assert_eq!(
            MembershipState::from_str("pending").unwrap(),
            MembershipState::Pending
        );
        assert_eq!(
            MembershipState::from_str("Accepted").unwrap(),
            MembershipState::Accepted
        );
        assert!(MembershipState::from_str("expired").is_err());

        assert!(MembershipState::Pending.is_open());
        assert!(!MembershipState::Accepted.is_open());
        assert!(!MembershipState::Declined.is_open());
    }

    #[test]
    fn test_create_group_request_validation() {
        let valid = CreateGroupRequest {
            use_case_id: Uuid::new_v4(),
            group_name: Some("Team Rocket".to_string()),
        };
        assert!(valid.validate().is_ok());

        let no_name = CreateGroupRequest {
            use_case_id: Uuid::new_v4(),
            group_name: None,
        };
        assert!(no_name.validate().is_ok());

        let blank_name = CreateGroupRequest {
            use_case_id: Uuid::new_v4(),
            group_name: Some("   ".to_string()),
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn test_group_status_serde_roundtrip() {
        let json = serde_json::to_string(&GroupStatus::Ready).unwrap();
        assert_eq!(json, "\"ready\"");
        let back: GroupStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GroupStatus::Ready);
    }
}
