//! Notification seam for group lifecycle events.
//!
//! Delivery (mail, push, in-app) is handled outside this service; the domain
//! only defines the payload shape and an abstraction the API layer can call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Notification type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    InvitationCreated,
    InvitationAccepted,
    InvitationDeclined,
    GroupLocked,
    GroupApproved,
    GroupRejected,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::InvitationCreated => write!(f, "invitation_created"),
            NotificationType::InvitationAccepted => write!(f, "invitation_accepted"),
            NotificationType::InvitationDeclined => write!(f, "invitation_declined"),
            NotificationType::GroupLocked => write!(f, "group_locked"),
            NotificationType::GroupApproved => write!(f, "group_approved"),
            NotificationType::GroupRejected => write!(f, "group_rejected"),
        }
    }
}

/// Payload for a group lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEventPayload {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub group_id: Uuid,
    pub group_name: String,
    pub actor_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl GroupEventPayload {
    pub fn new(notification_type: NotificationType, group_id: Uuid, group_name: impl Into<String>, actor_id: Uuid) -> Self {
        Self {
            notification_type,
            group_id,
            group_name: group_name.into(),
            actor_id,
            recipient_id: None,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn for_recipient(mut self, recipient_id: Uuid) -> Self {
        self.recipient_id = Some(recipient_id);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Errors from notification dispatch.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

pub type NotificationResult = Result<(), NotificationError>;

/// Abstraction over notification delivery.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify(&self, payload: GroupEventPayload) -> NotificationResult;
}

/// Notifier that only records events in the structured log. Used until a
/// real delivery channel is wired up, and in local development.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl NotificationService for LogNotifier {
    async fn notify(&self, payload: GroupEventPayload) -> NotificationResult {
        tracing::info!(
            notification_type = %payload.notification_type,
            group_id = %payload.group_id,
            actor_id = %payload.actor_id,
            recipient_id = ?payload.recipient_id,
            "Group event"
        );
        Ok(())
    }
}

/// Test double that records every payload it receives.
#[derive(Debug, Default)]
pub struct MockNotificationService {
    pub sent: std::sync::Mutex<Vec<GroupEventPayload>>,
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn notify(&self, payload: GroupEventPayload) -> NotificationResult {
        self.sent.lock().expect("mock lock poisoned").push(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_display() {
        assert_eq!(
            NotificationType::InvitationCreated.to_string(),
            "invitation_created"
        );
        assert_eq!(NotificationType::GroupRejected.to_string(), "group_rejected");
    }

    #[test]
    fn test_payload_builders() {
        let group_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let payload = GroupEventPayload::new(
            NotificationType::InvitationCreated,
            group_id,
            "Team Rocket",
            actor,
        )
        .for_recipient(recipient)
        .with_detail("come join us");

        assert_eq!(payload.group_id, group_id);
        assert_eq!(payload.recipient_id, Some(recipient));
        assert_eq!(payload.detail.as_deref(), Some("come join us"));
    }

    #[test]
    fn test_mock_service_records_payloads() {
        let service = MockNotificationService::default();
        let payload = GroupEventPayload::new(
            NotificationType::GroupLocked,
            Uuid::new_v4(),
            "Team Rocket",
            Uuid::new_v4(),
        );
        tokio_test::block_on(service.notify(payload)).unwrap();
        assert_eq!(service.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_payload_serializes_type_field() {
        let payload = GroupEventPayload::new(
            NotificationType::GroupApproved,
            Uuid::new_v4(),
            "Team Rocket",
            Uuid::new_v4(),
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "group_approved");
        assert!(json.get("recipient_id").is_none());
    }
}
