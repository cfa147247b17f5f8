use crate::app;
use crate::tasks::send_notifications::email::send_email_notification;
use anyhow::bail;
use async_trait::async_trait;
use celery::Celery;
use entities::notifications::NotificationMessage;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::sync::Arc;
use tracing::error;
use use_cases::fanout::DeliveryQueue;

#[derive(Clone)]
pub struct Producer {
    pub(crate) app: Arc<Celery>,
}

impl Producer {
    pub async fn new(broker_url: String) -> anyhow::Result<Self> {
        let app = app(broker_url).await?;

        Ok(Self { app })
    }
}

#[async_trait]
impl DeliveryQueue for Producer {
    #[tracing::instrument(err, skip(self, messages), fields(messages = messages.len()), level = "info")]
    async fn submit_batch(&self, messages: Vec<NotificationMessage>) -> anyhow::Result<()> {
        let mut futures: FuturesUnordered<_> = messages
            .into_iter()
            .map(|message| self.app.send_task(send_email_notification::new(message)))
            .collect();

        let mut errors = vec![];
        while let Some(result) = futures.next().await {
            if let Err(e) = result {
                error!("Error queueing email notification: {e:?}");
                errors.push(e);
            }
        }

        if !errors.is_empty() {
            bail!(
                "There were {} errors while sending the email notification tasks {errors:?}",
                errors.len()
            )
        }

        Ok(())
    }
}
