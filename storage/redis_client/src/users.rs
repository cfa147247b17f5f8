use crate::client::Client;
use crate::PIPELINE_CHUNK_SIZE;
use anyhow::Context;
use async_trait::async_trait;
use chrono::SecondsFormat;
use entities::subscriptions::details::SubscriberEmail;
use entities::subscriptions::{User, UserId};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use tracing::warn;
use use_cases::fanout::UserDirectory;
use use_cases::registration::UserRepo;

fn user_key(user_id: &UserId) -> String {
    format!("users:{user_id}")
}

fn user_fields(user: &User) -> anyhow::Result<Vec<(&'static str, String)>> {
    let zone_ids = serde_json::to_string(&user.zone_ids).context("Failed to serialize zone ids")?;
    Ok(vec![
        ("id", user.id.to_string()),
        ("first_name", user.first_name.as_ref().to_owned()),
        ("email", user.email.to_string()),
        ("lat", user.coordinates.latitude().to_string()),
        ("lng", user.coordinates.longitude().to_string()),
        ("zone_ids", zone_ids),
        (
            "registered_at",
            user.registered_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
    ])
}

#[async_trait]
impl UserRepo for Client {
    #[tracing::instrument(err, skip(self, user), fields(user_id = %user.id), level = "info")]
    async fn create_user(&self, user: &User) -> anyhow::Result<()> {
        let fields = user_fields(user)?;
        redis::pipe()
            .atomic()
            .hset_multiple(user_key(&user.id), &fields)
            .ignore()
            .query_async(&mut self.connection())
            .await
            .with_context(|| format!("Failed to save user {}", user.id))
    }

    #[tracing::instrument(err, skip(self), level = "info")]
    async fn remove_user(&self, user_id: &UserId) -> anyhow::Result<()> {
        redis::Cmd::del(user_key(user_id))
            .query_async(&mut self.connection())
            .await
            .with_context(|| format!("Failed to remove user {user_id}"))
    }
}

#[async_trait]
impl UserDirectory for Client {
    #[tracing::instrument(err, skip(self, user_ids), level = "info")]
    async fn lookup_emails(
        &self,
        user_ids: &HashSet<UserId>,
    ) -> anyhow::Result<HashMap<UserId, SubscriberEmail>> {
        let user_ids = user_ids.iter().collect_vec();
        let mut emails = HashMap::with_capacity(user_ids.len());

        for chunk in user_ids.chunks(PIPELINE_CHUNK_SIZE) {
            let mut pipe = redis::pipe();
            for user_id in chunk {
                pipe.hget(user_key(user_id), "email");
            }
            let results: Vec<Option<String>> = pipe
                .query_async(&mut self.connection())
                .await
                .context("Failed to fetch user emails")?;

            for (user_id, email) in chunk.iter().zip(results) {
                let Some(email) = email else {
                    continue;
                };
                match SubscriberEmail::try_from(email) {
                    Ok(email) => {
                        emails.insert((*user_id).clone(), email);
                    }
                    Err(err) => warn!("Skipping user {user_id} with stored email: {err}"),
                }
            }
        }

        Ok(emails)
    }
}
