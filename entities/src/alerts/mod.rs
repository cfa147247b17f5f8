use serde::{Deserialize, Serialize};
use shared_kernel::string_key;
use std::collections::HashSet;

string_key!(AlertId);
string_key!(ZoneCode);

/// An active alert as issued by the upstream feed. Everything apart from the
/// id and the zones is carried verbatim to the recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    /// UGC geocodes, in feed order. May repeat.
    pub zones: Vec<ZoneCode>,
    pub area_desc: Option<String>,
    pub sent: Option<String>,
    pub effective: Option<String>,
    pub severity: Option<String>,
    pub certainty: Option<String>,
    pub urgency: Option<String>,
    pub event: Option<String>,
    pub sender_name: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub response: Option<String>,
    pub web: Option<String>,
}

impl Alert {
    /// Union of the zone codes referenced by `alerts`, duplicates collapsed.
    pub fn affected_zones(alerts: &[Alert]) -> HashSet<ZoneCode> {
        alerts
            .iter()
            .flat_map(|alert| alert.zones.iter().cloned())
            .collect()
    }
}
