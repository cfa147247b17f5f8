mod alerts;
mod zones;

pub use alerts::NwsAlertSource;
pub use zones::NwsZoneResolver;

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct NwsSettings {
    pub host: String,
    pub app_name: String,
    pub contact_email: String,
}

impl NwsSettings {
    /// The API rejects anonymous clients, so every request names the app
    /// and a contact address.
    fn headers(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            (
                "User-Agent",
                format!("({}, {})", self.app_name, self.contact_email),
            ),
            ("Accept", "application/geo+json".to_string()),
        ])
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> anyhow::Result<Url> {
        let host = self.host.trim_end_matches('/');
        Url::parse_with_params(&format!("{host}{path}"), params)
            .with_context(|| format!("Invalid url {host}{path}"))
    }
}

#[derive(Deserialize, Debug)]
struct FeatureCollection<Properties> {
    #[serde(default = "Vec::new")]
    features: Vec<Feature<Properties>>,
}

#[derive(Deserialize, Debug)]
struct Feature<Properties> {
    properties: Option<Properties>,
}
