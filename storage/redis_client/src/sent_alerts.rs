use crate::client::Client;
use anyhow::Context;
use async_trait::async_trait;
use entities::notifications::{DeliveryRecord, LedgerWrite};
use use_cases::fanout::DedupeLedger;

fn ledger_key(record: &DeliveryRecord) -> String {
    format!("sent_alerts:{}", record.key())
}

/// `SET NX` replies `OK` only to the first writer of a key and nil to the rest.
fn ledger_write(reply: Option<String>) -> LedgerWrite {
    match reply {
        Some(_) => LedgerWrite::Created,
        None => LedgerWrite::AlreadyExists,
    }
}

#[async_trait]
impl DedupeLedger for Client {
    async fn create_if_absent(&self, record: &DeliveryRecord) -> anyhow::Result<LedgerWrite> {
        let key = ledger_key(record);
        let value = serde_json::to_string(record)
            .with_context(|| format!("Failed to serialize delivery record {key}"))?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("NX")
            .query_async(&mut self.connection())
            .await
            .with_context(|| format!("Failed to write delivery record {key}"))?;

        Ok(ledger_write(reply))
    }
}
