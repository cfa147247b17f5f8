use entities::alerts::{Alert, AlertId, ZoneCode};
use entities::subscriptions::details::SubscriberEmail;
use entities::subscriptions::UserId;
use std::collections::{HashMap, HashSet};

/// One (alert, zone, user) triple that still has to go through the ledger.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
    pub alert: &'a Alert,
    pub zone_id: &'a ZoneCode,
    pub user_id: &'a UserId,
    pub email: &'a SubscriberEmail,
}

/// Expands alerts into at most one candidate per `(alert_id, user_id)`.
/// Users without a known email are dropped.
pub(crate) fn candidate_pairs<'a>(
    alerts: &'a [Alert],
    subscribers_by_zone: &'a HashMap<ZoneCode, HashSet<UserId>>,
    emails: &'a HashMap<UserId, SubscriberEmail>,
) -> Vec<Candidate<'a>> {
    let mut seen: HashSet<(&AlertId, &UserId)> = HashSet::new();
    let mut candidates = vec![];

    for alert in alerts {
        for zone_id in &alert.zones {
            let Some(subscribers) = subscribers_by_zone.get(zone_id) else {
                continue;
            };
            for user_id in subscribers {
                if !seen.insert((&alert.id, user_id)) {
                    continue;
                }
                let Some(email) = emails.get(user_id) else {
                    continue;
                };
                candidates.push(Candidate {
                    alert,
                    zone_id,
                    user_id,
                    email,
                });
            }
        }
    }
    candidates
}
