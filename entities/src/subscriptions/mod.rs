pub mod details;

use crate::alerts::ZoneCode;
use crate::subscriptions::details::{Coordinates, SubscriberEmail, SubscriberName};
use chrono::{DateTime, Utc};
use shared_kernel::string_key;

string_key!(UserId);

impl UserId {
    pub fn generate() -> Self {
        UserId(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub first_name: SubscriberName,
    pub email: SubscriberEmail,
    pub coordinates: Coordinates,
    pub zone_ids: Vec<ZoneCode>,
    pub registered_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        first_name: SubscriberName,
        email: SubscriberEmail,
        coordinates: Coordinates,
        zone_ids: Vec<ZoneCode>,
    ) -> Self {
        Self {
            id: UserId::generate(),
            first_name,
            email,
            coordinates,
            zone_ids,
            registered_at: Utc::now(),
        }
    }
}

/// What an idempotent zone subscription upsert found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSubscription {
    /// The zone had no subscribers before this one.
    Created,
    Added,
    AlreadySubscribed,
}
