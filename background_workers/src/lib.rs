use crate::tasks::send_notifications::email::send_email_notification;
use anyhow::Context;
use celery::Celery;
use std::sync::Arc;

pub mod configuration;
pub mod producer;
pub mod tasks;
mod utils;

pub const EMAIL_NOTIFICATIONS_QUEUE: &str = "email_notifications_queue";
const DEFAULT_QUEUE: &str = "celery";

pub async fn app(broker_url: String) -> anyhow::Result<Arc<Celery>> {
    celery::app!(
        broker = RedisBroker { broker_url },
        tasks = [send_email_notification],
        task_routes = [
            "send_email_notification" => EMAIL_NOTIFICATIONS_QUEUE,
            "*" => DEFAULT_QUEUE
        ],
        prefetch_count = 2,
        heartbeat = Some(10),
        acks_late = true
    )
    .await
    .context("Failed to initialize app")
}
