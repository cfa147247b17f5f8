use crate::{FeatureCollection, NwsSettings};
use async_trait::async_trait;
use entities::alerts::{Alert, AlertId, ZoneCode};
use serde::Deserialize;
use shared_kernel::http_client::HttpClient;
use tracing::warn;
use use_cases::fanout::AlertSource;

#[derive(Deserialize, Debug, Default)]
struct Geocode {
    #[serde(rename = "UGC", default)]
    ugc: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    id: Option<String>,
    area_desc: Option<String>,
    geocode: Option<Geocode>,
    sent: Option<String>,
    effective: Option<String>,
    severity: Option<String>,
    certainty: Option<String>,
    urgency: Option<String>,
    event: Option<String>,
    sender_name: Option<String>,
    headline: Option<String>,
    description: Option<String>,
    instruction: Option<String>,
    response: Option<String>,
    web: Option<String>,
}

impl AlertProperties {
    fn into_alert(self) -> Option<Alert> {
        let Some(id) = self.id else {
            warn!(
                "Dropping alert without an id: {}",
                self.headline.as_deref().unwrap_or("no headline")
            );
            return None;
        };
        let zones = self
            .geocode
            .unwrap_or_default()
            .ugc
            .into_iter()
            .map(ZoneCode::from)
            .collect();

        Some(Alert {
            id: AlertId::from(id),
            zones,
            area_desc: self.area_desc,
            sent: self.sent,
            effective: self.effective,
            severity: self.severity,
            certainty: self.certainty,
            urgency: self.urgency,
            event: self.event,
            sender_name: self.sender_name,
            headline: self.headline,
            description: self.description,
            instruction: self.instruction,
            response: self.response,
            web: self.web,
        })
    }
}

pub struct NwsAlertSource {
    client: HttpClient,
    settings: NwsSettings,
}

impl NwsAlertSource {
    pub fn new(client: HttpClient, settings: NwsSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl AlertSource for NwsAlertSource {
    #[tracing::instrument(err, skip(self), level = "info")]
    async fn fetch_active_alerts(&self) -> anyhow::Result<Vec<Alert>> {
        let url = self
            .settings
            .url("/alerts/active", &[("status", "actual")])?;
        let collection = self
            .client
            .get_json::<FeatureCollection<AlertProperties>>(url, self.settings.headers())
            .await?;

        Ok(collection
            .features
            .into_iter()
            .filter_map(|feature| feature.properties)
            .filter_map(AlertProperties::into_alert)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::NwsAlertSource;
    use crate::test_helpers::{settings, USER_AGENT};
    use entities::alerts::{AlertId, ZoneCode};
    use httpmock::prelude::*;
    use serde_json::json;
    use shared_kernel::http_client::HttpClient;
    use use_cases::fanout::AlertSource;

    fn source(server: &MockServer) -> NwsAlertSource {
        NwsAlertSource::new(HttpClient::new(), settings(server.base_url()))
    }

    #[tokio::test]
    async fn test_active_alerts_are_read_from_feature_properties() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/alerts/active")
                    .query_param("status", "actual")
                    .header("user-agent", USER_AGENT)
                    .header("accept", "application/geo+json");
                then.status(200).json_body(json!({
                    "type": "FeatureCollection",
                    "features": [{
                        "id": "https://api.weather.gov/alerts/urn:oid:2.49.0.1.840.0.1",
                        "properties": {
                            "id": "urn:oid:2.49.0.1.840.0.1",
                            "areaDesc": "Lake; Volusia",
                            "geocode": { "SAME": ["012069"], "UGC": ["FLC069", "FLC127"] },
                            "sent": "2024-05-01T10:00:00-04:00",
                            "effective": "2024-05-01T10:00:00-04:00",
                            "severity": "Severe",
                            "certainty": "Likely",
                            "urgency": "Immediate",
                            "event": "Severe Thunderstorm Warning",
                            "senderName": "NWS Melbourne FL",
                            "headline": "Severe Thunderstorm Warning issued May 1",
                            "description": "Damaging winds expected.",
                            "instruction": null,
                            "response": "Shelter",
                            "web": "http://www.weather.gov"
                        }
                    }]
                }));
            })
            .await;

        let alerts = source(&server).fetch_active_alerts().await.unwrap();

        mock.assert_async().await;
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.id, AlertId::from("urn:oid:2.49.0.1.840.0.1"));
        assert_eq!(
            alert.zones,
            vec![ZoneCode::from("FLC069"), ZoneCode::from("FLC127")]
        );
        assert_eq!(alert.sender_name.as_deref(), Some("NWS Melbourne FL"));
        assert_eq!(alert.area_desc.as_deref(), Some("Lake; Volusia"));
        assert_eq!(alert.instruction, None);
    }

    #[tokio::test]
    async fn test_alerts_without_geocodes_have_no_zones() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/alerts/active");
                then.status(200).json_body(json!({
                    "features": [
                        { "properties": { "id": "a" } },
                        { "properties": { "id": "b", "geocode": {} } }
                    ]
                }));
            })
            .await;

        let alerts = source(&server).fetch_active_alerts().await.unwrap();

        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|alert| alert.zones.is_empty()));
    }

    #[tokio::test]
    async fn test_alerts_without_an_id_are_dropped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/alerts/active");
                then.status(200).json_body(json!({
                    "features": [
                        { "properties": { "geocode": { "UGC": ["FLC069"] } } },
                        { "properties": { "id": "b", "geocode": { "UGC": ["FLC127"] } } }
                    ]
                }));
            })
            .await;

        let alerts = source(&server).fetch_active_alerts().await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, AlertId::from("b"));
    }

    #[tokio::test]
    async fn test_unsuccessful_responses_are_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/alerts/active");
                then.status(403).body("Forbidden");
            })
            .await;

        assert!(source(&server).fetch_active_alerts().await.is_err());
    }
}
