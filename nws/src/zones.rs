use crate::{FeatureCollection, NwsSettings};
use async_trait::async_trait;
use entities::alerts::ZoneCode;
use entities::subscriptions::details::Coordinates;
use itertools::Itertools;
use serde::Deserialize;
use shared_kernel::http_client::HttpClient;
use use_cases::registration::ZoneResolver;

#[derive(Deserialize, Debug)]
struct ZoneProperties {
    id: Option<String>,
}

pub struct NwsZoneResolver {
    client: HttpClient,
    settings: NwsSettings,
}

impl NwsZoneResolver {
    pub fn new(client: HttpClient, settings: NwsSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl ZoneResolver for NwsZoneResolver {
    #[tracing::instrument(err, skip(self), fields(point = %coordinates), level = "info")]
    async fn resolve_zones(&self, coordinates: &Coordinates) -> anyhow::Result<Vec<ZoneCode>> {
        let point = coordinates.to_string();
        let url = self.settings.url("/zones", &[("point", point.as_str())])?;
        let collection = self
            .client
            .get_json::<FeatureCollection<ZoneProperties>>(url, self.settings.headers())
            .await?;

        Ok(collection
            .features
            .into_iter()
            .filter_map(|feature| feature.properties.and_then(|properties| properties.id))
            .unique()
            .map(ZoneCode::from)
            .collect())
    }
}
