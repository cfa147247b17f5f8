pub mod client;
mod sent_alerts;
mod users;
mod zone_subscriptions;

/// Upper bound on commands sent in one pipelined round trip.
pub(crate) const PIPELINE_CHUNK_SIZE: usize = 500;
