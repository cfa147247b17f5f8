use anyhow::Context;
use redis::aio::MultiplexedConnection;

#[derive(Clone)]
pub struct Client {
    pub(crate) conn: MultiplexedConnection,
}

impl Client {
    pub async fn connect(host: &str) -> anyhow::Result<Self> {
        let conn = redis::Client::open(host)
            .with_context(|| format!("Invalid redis url {host}"))?
            .get_multiplexed_tokio_connection()
            .await
            .context("Failed to connect to redis")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}
