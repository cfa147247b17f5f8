pub mod alerts;
pub mod notifications;
pub mod subscriptions;
