use crate::client::Client;
use crate::PIPELINE_CHUNK_SIZE;
use anyhow::Context;
use async_trait::async_trait;
use entities::alerts::ZoneCode;
use entities::subscriptions::{UserId, ZoneSubscription};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use use_cases::fanout::ZoneIndex;
use use_cases::registration::ZoneSubscriptionRepo;

fn zone_key(zone: &ZoneCode) -> String {
    format!("zone_subscriptions:{zone}")
}

fn subscription_state(zone_existed: bool, members_added: usize) -> ZoneSubscription {
    match (zone_existed, members_added) {
        (false, _) => ZoneSubscription::Created,
        (true, 0) => ZoneSubscription::AlreadySubscribed,
        (true, _) => ZoneSubscription::Added,
    }
}

#[async_trait]
impl ZoneSubscriptionRepo for Client {
    #[tracing::instrument(err, skip(self), level = "info")]
    async fn add_subscriber(
        &self,
        zone: &ZoneCode,
        user_id: &UserId,
    ) -> anyhow::Result<ZoneSubscription> {
        let key = zone_key(zone);
        let (zone_existed, members_added): (bool, usize) = redis::pipe()
            .atomic()
            .exists(&key)
            .sadd(&key, user_id.as_ref())
            .query_async(&mut self.connection())
            .await
            .with_context(|| format!("Failed to subscribe {user_id} to zone {zone}"))?;

        Ok(subscription_state(zone_existed, members_added))
    }
}

#[async_trait]
impl ZoneIndex for Client {
    #[tracing::instrument(err, skip(self, zones), fields(zones = zones.len()), level = "info")]
    async fn lookup_subscribers(
        &self,
        zones: &HashSet<ZoneCode>,
    ) -> anyhow::Result<HashMap<ZoneCode, HashSet<UserId>>> {
        let zones = zones.iter().collect_vec();
        let mut subscribers = HashMap::new();

        for chunk in zones.chunks(PIPELINE_CHUNK_SIZE) {
            let mut pipe = redis::pipe();
            for zone in chunk {
                pipe.smembers(zone_key(zone));
            }
            let results: Vec<HashSet<String>> = pipe
                .query_async(&mut self.connection())
                .await
                .context("Failed to fetch zone subscriptions")?;

            subscribers.extend(
                chunk
                    .iter()
                    .zip(results)
                    .filter(|(_, members)| !members.is_empty())
                    .map(|(zone, members)| {
                        let members = members.into_iter().map(UserId::from).collect();
                        ((*zone).clone(), members)
                    }),
            );
        }

        Ok(subscribers)
    }
}
