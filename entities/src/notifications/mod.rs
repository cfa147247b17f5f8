use crate::alerts::{Alert, AlertId, ZoneCode};
use crate::subscriptions::details::SubscriberEmail;
use crate::subscriptions::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof that a notification for `(alert_id, user_id)` was accepted for
/// delivery. Written once and never touched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub alert_id: AlertId,
    pub user_id: UserId,
    pub email: String,
    /// When the alert was issued, if the feed said so.
    pub created_at: Option<DateTime<Utc>>,
    pub sent_at: DateTime<Utc>,
    pub zone_id: ZoneCode,
    pub event: Option<String>,
    pub link: Option<String>,
}

impl DeliveryRecord {
    pub fn new(alert: &Alert, zone_id: &ZoneCode, user_id: &UserId, email: &SubscriberEmail) -> Self {
        Self {
            alert_id: alert.id.clone(),
            user_id: user_id.clone(),
            email: email.to_string(),
            created_at: alert.sent.as_deref().and_then(parse_timestamp),
            sent_at: Utc::now(),
            zone_id: zone_id.clone(),
            event: alert.event.clone(),
            link: alert.web.clone(),
        }
    }

    pub fn key(&self) -> String {
        Self::key_for(&self.alert_id, &self.user_id)
    }

    pub fn key_for(alert_id: &AlertId, user_id: &UserId) -> String {
        format!("{alert_id}-{user_id}")
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

/// Result of a create-if-absent write against the delivery ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    Created,
    AlreadyExists,
}

/// Everything the delivery stage needs to render and send one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub user_id: UserId,
    pub email: String,
    pub alert_id: AlertId,
    pub zone_id: ZoneCode,
    #[serde(rename = "areaDesc")]
    pub area_desc: Option<String>,
    pub created_at: Option<String>,
    pub effective_at: Option<String>,
    pub severity: Option<String>,
    pub certainty: Option<String>,
    pub urgency: Option<String>,
    pub event: Option<String>,
    #[serde(rename = "senderName")]
    pub sender_name: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub response: Option<String>,
    pub link: Option<String>,
}

impl NotificationMessage {
    pub fn assemble(
        alert: &Alert,
        zone_id: &ZoneCode,
        user_id: &UserId,
        email: &SubscriberEmail,
    ) -> Self {
        Self {
            user_id: user_id.clone(),
            email: email.to_string(),
            alert_id: alert.id.clone(),
            zone_id: zone_id.clone(),
            area_desc: alert.area_desc.clone(),
            created_at: alert.sent.clone(),
            effective_at: alert.effective.clone(),
            severity: alert.severity.clone(),
            certainty: alert.certainty.clone(),
            urgency: alert.urgency.clone(),
            event: alert.event.clone(),
            sender_name: alert.sender_name.clone(),
            headline: alert.headline.clone(),
            description: alert.description.clone(),
            instruction: alert.instruction.clone(),
            response: alert.response.clone(),
            link: alert.web.clone(),
        }
    }

    pub fn ledger_key(&self) -> String {
        DeliveryRecord::key_for(&self.alert_id, &self.user_id)
    }
}
