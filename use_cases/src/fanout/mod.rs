mod candidates;

use crate::fanout::candidates::{candidate_pairs, Candidate};
use async_trait::async_trait;
use entities::alerts::{Alert, ZoneCode};
use entities::notifications::{DeliveryRecord, LedgerWrite, NotificationMessage};
use entities::subscriptions::details::SubscriberEmail;
use entities::subscriptions::UserId;
use futures::{future, stream, StreamExt};
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertSource: Send + Sync {
    async fn fetch_active_alerts(&self) -> anyhow::Result<Vec<Alert>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ZoneIndex: Send + Sync {
    /// Only the requested zones are read. Zones nobody subscribed to may be
    /// missing from the result.
    async fn lookup_subscribers(
        &self,
        zones: &HashSet<ZoneCode>,
    ) -> anyhow::Result<HashMap<ZoneCode, HashSet<UserId>>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_emails(
        &self,
        user_ids: &HashSet<UserId>,
    ) -> anyhow::Result<HashMap<UserId, SubscriberEmail>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DedupeLedger: Send + Sync {
    /// Must be atomic per key: concurrent writes of the same record never
    /// both return `Created`.
    async fn create_if_absent(&self, record: &DeliveryRecord) -> anyhow::Result<LedgerWrite>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    async fn submit_batch(&self, messages: Vec<NotificationMessage>) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct FanoutSettings {
    /// Upper bound on ledger writes in flight during one cycle.
    pub ledger_concurrency: usize,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            ledger_concurrency: 16,
        }
    }
}

/// How a fan-out cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    AlertFeedUnavailable,
    NoAffectedZones,
    ZoneLookupFailed,
    NoSubscribers,
    UserLookupFailed,
    NothingToDeliver,
    Queued(Vec<NotificationMessage>),
    /// The messages were ledgered but the queue rejected them.
    QueueFailed(Vec<NotificationMessage>),
}

impl CycleOutcome {
    pub fn messages(&self) -> &[NotificationMessage] {
        match self {
            CycleOutcome::Queued(messages) | CycleOutcome::QueueFailed(messages) => messages,
            _ => &[],
        }
    }
}

pub struct FanoutEngine {
    alert_source: Arc<dyn AlertSource>,
    zone_index: Arc<dyn ZoneIndex>,
    user_directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn DedupeLedger>,
    delivery_queue: Arc<dyn DeliveryQueue>,
    settings: FanoutSettings,
}

impl FanoutEngine {
    pub fn new(
        alert_source: Arc<dyn AlertSource>,
        zone_index: Arc<dyn ZoneIndex>,
        user_directory: Arc<dyn UserDirectory>,
        ledger: Arc<dyn DedupeLedger>,
        delivery_queue: Arc<dyn DeliveryQueue>,
        settings: FanoutSettings,
    ) -> Self {
        Self {
            alert_source,
            zone_index,
            user_directory,
            ledger,
            delivery_queue,
            settings,
        }
    }

    /// Runs one fetch, dedupe and queue pass. Failures are logged and folded
    /// into the returned outcome; nothing propagates to the caller.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_fanout_cycle(&self) -> CycleOutcome {
        let alerts = match self.alert_source.fetch_active_alerts().await {
            Ok(alerts) => alerts,
            Err(err) => {
                error!("Failed to fetch active alerts: {err:?}");
                return CycleOutcome::AlertFeedUnavailable;
            }
        };

        let zones = Alert::affected_zones(&alerts);
        if zones.is_empty() {
            info!("No affected zones in current alerts.");
            return CycleOutcome::NoAffectedZones;
        }

        let subscribers_by_zone = match self.zone_index.lookup_subscribers(&zones).await {
            Ok(subscribers) => subscribers,
            Err(err) => {
                error!("Failed to query zone subscriptions: {err:?}");
                return CycleOutcome::ZoneLookupFailed;
            }
        };

        let user_ids = subscribers_by_zone
            .values()
            .flatten()
            .cloned()
            .collect::<HashSet<_>>();
        if user_ids.is_empty() {
            info!("No subscribers in affected zones.");
            return CycleOutcome::NoSubscribers;
        }

        let emails = match self.user_directory.lookup_emails(&user_ids).await {
            Ok(emails) => emails,
            Err(err) => {
                error!("Failed to query user emails: {err:?}");
                return CycleOutcome::UserLookupFailed;
            }
        };

        let candidates = candidate_pairs(&alerts, &subscribers_by_zone, &emails);
        let messages = self.record_deliveries(candidates).await;
        if messages.is_empty() {
            info!("No new notifications to queue.");
            return CycleOutcome::NothingToDeliver;
        }

        self.submit(messages).await
    }

    async fn record_deliveries(&self, candidates: Vec<Candidate<'_>>) -> Vec<NotificationMessage> {
        stream::iter(candidates)
            .map(|candidate| self.record_delivery(candidate))
            .buffer_unordered(self.settings.ledger_concurrency.max(1))
            .filter_map(future::ready)
            .collect()
            .await
    }

    async fn record_delivery(&self, candidate: Candidate<'_>) -> Option<NotificationMessage> {
        let Candidate {
            alert,
            zone_id,
            user_id,
            email,
        } = candidate;
        let record = DeliveryRecord::new(alert, zone_id, user_id, email);

        match self.ledger.create_if_absent(&record).await {
            Ok(LedgerWrite::Created) => Some(NotificationMessage::assemble(
                alert, zone_id, user_id, email,
            )),
            Ok(LedgerWrite::AlreadyExists) => {
                debug!("Already sent {}", record.key());
                None
            }
            Err(err) => {
                error!(
                    "Failed to record delivery of alert {} for user {}: {err:?}",
                    alert.id, user_id
                );
                None
            }
        }
    }

    async fn submit(&self, messages: Vec<NotificationMessage>) -> CycleOutcome {
        let count = messages.len();
        match self.delivery_queue.submit_batch(messages.clone()).await {
            Ok(()) => {
                info!("Queued {count} messages successfully.");
                CycleOutcome::Queued(messages)
            }
            Err(err) => {
                let keys = messages
                    .iter()
                    .map(NotificationMessage::ledger_key)
                    .join(", ");
                error!("Failed to queue {count} ledgered messages: [{keys}] {err:?}");
                CycleOutcome::QueueFailed(messages)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CycleOutcome, DedupeLedger, FanoutEngine, FanoutSettings, MockAlertSource,
        MockDedupeLedger, MockDeliveryQueue, MockUserDirectory, MockZoneIndex,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use entities::alerts::{Alert, AlertId, ZoneCode};
    use entities::notifications::{DeliveryRecord, LedgerWrite};
    use entities::subscriptions::details::SubscriberEmail;
    use entities::subscriptions::UserId;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    #[derive(Default)]
    struct InMemoryLedger(Mutex<HashSet<String>>);

    #[async_trait]
    impl DedupeLedger for InMemoryLedger {
        async fn create_if_absent(&self, record: &DeliveryRecord) -> anyhow::Result<LedgerWrite> {
            let mut keys = self.0.lock().unwrap();
            if keys.insert(record.key()) {
                return Ok(LedgerWrite::Created);
            }
            Ok(LedgerWrite::AlreadyExists)
        }
    }

    fn alert(id: &str, zones: &[&str]) -> Alert {
        Alert {
            id: AlertId::from(id),
            zones: zones.iter().map(|zone| ZoneCode::from(*zone)).collect(),
            event: Some("Flood Warning".to_string()),
            ..Default::default()
        }
    }

    fn alert_source(alerts: Vec<Alert>) -> MockAlertSource {
        let mut source = MockAlertSource::new();
        source
            .expect_fetch_active_alerts()
            .returning(move || Ok(alerts.clone()));
        source
    }

    fn zone_index(entries: &[(&str, &[&str])]) -> MockZoneIndex {
        let subscribers = entries
            .iter()
            .map(|(zone, users)| {
                (
                    ZoneCode::from(*zone),
                    users.iter().map(|user| UserId::from(*user)).collect(),
                )
            })
            .collect::<HashMap<ZoneCode, HashSet<UserId>>>();
        let mut index = MockZoneIndex::new();
        index.expect_lookup_subscribers().returning(move |zones| {
            Ok(subscribers
                .iter()
                .filter(|(zone, _)| zones.contains(*zone))
                .map(|(zone, users)| (zone.clone(), users.clone()))
                .collect())
        });
        index
    }

    fn user_directory(users: &[&str]) -> MockUserDirectory {
        let emails = users
            .iter()
            .map(|user| {
                (
                    UserId::from(*user),
                    SubscriberEmail::try_from(format!("{user}@example.com")).unwrap(),
                )
            })
            .collect::<HashMap<_, _>>();
        let mut directory = MockUserDirectory::new();
        directory.expect_lookup_emails().returning(move |ids| {
            Ok(emails
                .iter()
                .filter(|(id, _)| ids.contains(*id))
                .map(|(id, email)| (id.clone(), email.clone()))
                .collect())
        });
        directory
    }

    fn accepting_queue() -> MockDeliveryQueue {
        let mut queue = MockDeliveryQueue::new();
        queue.expect_submit_batch().returning(|_| Ok(()));
        queue
    }

    fn idle_queue() -> MockDeliveryQueue {
        let mut queue = MockDeliveryQueue::new();
        queue.expect_submit_batch().never();
        queue
    }

    fn two_alerts_two_users() -> (MockAlertSource, MockZoneIndex, MockUserDirectory) {
        (
            alert_source(vec![alert("123", &["FLC069"]), alert("456", &["FLC127"])]),
            zone_index(&[("FLC069", &["user1"]), ("FLC127", &["user2"])]),
            user_directory(&["user1", "user2"]),
        )
    }

    fn engine(
        source: MockAlertSource,
        index: MockZoneIndex,
        directory: MockUserDirectory,
        ledger: Arc<dyn DedupeLedger>,
        queue: MockDeliveryQueue,
    ) -> FanoutEngine {
        FanoutEngine::new(
            Arc::new(source),
            Arc::new(index),
            Arc::new(directory),
            ledger,
            Arc::new(queue),
            FanoutSettings::default(),
        )
    }

    #[tokio::test]
    #[traced_test]
    async fn test_each_matching_pair_is_queued_once() {
        let (source, index, directory) = two_alerts_two_users();
        let engine = engine(
            source,
            index,
            directory,
            Arc::new(InMemoryLedger::default()),
            accepting_queue(),
        );

        let outcome = engine.run_fanout_cycle().await;

        let mut messages = outcome.messages().to_vec();
        messages.sort_by(|a, b| a.alert_id.cmp(&b.alert_id));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].alert_id, AlertId::from("123"));
        assert_eq!(messages[0].user_id, UserId::from("user1"));
        assert_eq!(messages[0].email, "user1@example.com");
        assert_eq!(messages[0].zone_id, ZoneCode::from("FLC069"));
        assert_eq!(messages[1].alert_id, AlertId::from("456"));
        assert_eq!(messages[1].user_id, UserId::from("user2"));
        assert_eq!(messages[1].email, "user2@example.com");
        assert_eq!(messages[1].zone_id, ZoneCode::from("FLC127"));
        assert!(logs_contain("Queued 2 messages successfully."));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_second_run_over_unchanged_alerts_queues_nothing() {
        let ledger: Arc<dyn DedupeLedger> = Arc::new(InMemoryLedger::default());
        let (source, index, directory) = two_alerts_two_users();
        let mut queue = MockDeliveryQueue::new();
        queue.expect_submit_batch().times(1).returning(|_| Ok(()));
        let engine = engine(source, index, directory, ledger, queue);

        let first = engine.run_fanout_cycle().await;
        let second = engine.run_fanout_cycle().await;

        assert_eq!(first.messages().len(), 2);
        assert_eq!(second, CycleOutcome::NothingToDeliver);
        assert!(logs_contain("No new notifications to queue."));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_already_ledgered_pairs_are_skipped_silently() {
        let (source, index, directory) = two_alerts_two_users();
        let mut ledger = MockDedupeLedger::new();
        ledger
            .expect_create_if_absent()
            .times(2)
            .returning(|_| Ok(LedgerWrite::AlreadyExists));
        let engine = engine(source, index, directory, Arc::new(ledger), idle_queue());

        let outcome = engine.run_fanout_cycle().await;

        assert!(outcome.messages().is_empty());
        assert!(!logs_contain("ERROR"));
    }

    #[tokio::test]
    async fn test_repeated_zone_code_yields_one_message() {
        let engine = engine(
            alert_source(vec![alert("456", &["FLC127", "FLC127"])]),
            zone_index(&[("FLC127", &["user2"])]),
            user_directory(&["user2"]),
            Arc::new(InMemoryLedger::default()),
            accepting_queue(),
        );

        let outcome = engine.run_fanout_cycle().await;

        assert_eq!(outcome.messages().len(), 1);
        assert_eq!(outcome.messages()[0].user_id, UserId::from("user2"));
    }

    #[tokio::test]
    async fn test_orphaned_subscriber_does_not_block_others() {
        let engine = engine(
            alert_source(vec![alert("123", &["FLC069"])]),
            zone_index(&[("FLC069", &["user1", "ghost"])]),
            user_directory(&["user1"]),
            Arc::new(InMemoryLedger::default()),
            accepting_queue(),
        );

        let outcome = engine.run_fanout_cycle().await;

        assert_eq!(outcome.messages().len(), 1);
        assert_eq!(outcome.messages()[0].user_id, UserId::from("user1"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_ledger_write_only_drops_that_pair() {
        let (source, index, directory) = two_alerts_two_users();
        let mut ledger = MockDedupeLedger::new();
        ledger.expect_create_if_absent().returning(|record| {
            if record.alert_id.as_ref() == "123" {
                return Err(anyhow!("connection reset"));
            }
            Ok(LedgerWrite::Created)
        });
        let engine = engine(source, index, directory, Arc::new(ledger), accepting_queue());

        let outcome = engine.run_fanout_cycle().await;

        assert_eq!(outcome.messages().len(), 1);
        assert_eq!(outcome.messages()[0].alert_id, AlertId::from("456"));
        assert!(logs_contain(
            "Failed to record delivery of alert 123 for user user1"
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_feed_failure_ends_the_cycle() {
        let mut source = MockAlertSource::new();
        source
            .expect_fetch_active_alerts()
            .returning(|| Err(anyhow!("503 Service Unavailable")));
        let mut index = MockZoneIndex::new();
        index.expect_lookup_subscribers().never();
        let engine = engine(
            source,
            index,
            MockUserDirectory::new(),
            Arc::new(MockDedupeLedger::new()),
            idle_queue(),
        );

        assert_eq!(
            engine.run_fanout_cycle().await,
            CycleOutcome::AlertFeedUnavailable
        );
        assert!(logs_contain("Failed to fetch active alerts:"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_alerts_without_zones_end_the_cycle() {
        let mut index = MockZoneIndex::new();
        index.expect_lookup_subscribers().never();
        let engine = engine(
            alert_source(vec![alert("123", &[]), alert("456", &[])]),
            index,
            MockUserDirectory::new(),
            Arc::new(MockDedupeLedger::new()),
            idle_queue(),
        );

        assert_eq!(
            engine.run_fanout_cycle().await,
            CycleOutcome::NoAffectedZones
        );
        assert!(logs_contain("No affected zones in current alerts."));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_zone_lookup_failure_ends_the_cycle() {
        let mut index = MockZoneIndex::new();
        index
            .expect_lookup_subscribers()
            .returning(|_| Err(anyhow!("store unavailable")));
        let mut directory = MockUserDirectory::new();
        directory.expect_lookup_emails().never();
        let engine = engine(
            alert_source(vec![alert("123", &["FLC069"])]),
            index,
            directory,
            Arc::new(MockDedupeLedger::new()),
            idle_queue(),
        );

        assert_eq!(
            engine.run_fanout_cycle().await,
            CycleOutcome::ZoneLookupFailed
        );
        assert!(logs_contain("Failed to query zone subscriptions:"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_user_lookup_failure_ends_the_cycle() {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_lookup_emails()
            .returning(|_| Err(anyhow!("store unavailable")));
        let mut ledger = MockDedupeLedger::new();
        ledger.expect_create_if_absent().never();
        let engine = engine(
            alert_source(vec![alert("123", &["FLC069"])]),
            zone_index(&[("FLC069", &["user1"])]),
            directory,
            Arc::new(ledger),
            idle_queue(),
        );

        assert_eq!(
            engine.run_fanout_cycle().await,
            CycleOutcome::UserLookupFailed
        );
        assert!(logs_contain("Failed to query user emails:"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_zones_nobody_watches_end_the_cycle() {
        let mut directory = MockUserDirectory::new();
        directory.expect_lookup_emails().never();
        let engine = engine(
            alert_source(vec![alert("123", &["FLC069"])]),
            zone_index(&[]),
            directory,
            Arc::new(MockDedupeLedger::new()),
            idle_queue(),
        );

        assert_eq!(engine.run_fanout_cycle().await, CycleOutcome::NoSubscribers);
        assert!(logs_contain("No subscribers in affected zones."));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_queue_failure_reports_the_ledgered_keys() {
        let (source, index, directory) = two_alerts_two_users();
        let mut queue = MockDeliveryQueue::new();
        queue
            .expect_submit_batch()
            .returning(|_| Err(anyhow!("broker unreachable")));
        let engine = engine(
            source,
            index,
            directory,
            Arc::new(InMemoryLedger::default()),
            queue,
        );

        let outcome = engine.run_fanout_cycle().await;

        assert!(matches!(outcome, CycleOutcome::QueueFailed(ref messages) if messages.len() == 2));
        assert!(logs_contain("Failed to queue 2 ledgered messages:"));
        assert!(logs_contain("123-user1"));
        assert!(logs_contain("456-user2"));
    }

    #[tokio::test]
    async fn test_only_zones_named_by_alerts_are_looked_up() {
        let mut index = MockZoneIndex::new();
        index
            .expect_lookup_subscribers()
            .withf(|zones| zones.len() == 2 && zones.contains("FLC069") && zones.contains("FLC127"))
            .returning(|_| Ok(HashMap::new()));
        let engine = engine(
            alert_source(vec![
                alert("123", &["FLC069", "FLC127"]),
                alert("456", &["FLC127"]),
            ]),
            index,
            MockUserDirectory::new(),
            Arc::new(MockDedupeLedger::new()),
            idle_queue(),
        );

        assert_eq!(engine.run_fanout_cycle().await, CycleOutcome::NoSubscribers);
    }
}
