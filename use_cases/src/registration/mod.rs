use async_trait::async_trait;
use entities::alerts::ZoneCode;
use entities::subscriptions::details::{Coordinates, SubscriberEmail, SubscriberName};
use entities::subscriptions::{User, UserId, ZoneSubscription};
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RegistrationInput {
    pub first_name: String,
    pub email: String,
    pub latitude: String,
    pub longitude: String,
    pub consent: bool,
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Invalid registration: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered {
        user_id: UserId,
        zones: Vec<ZoneCode>,
    },
    NoZonesResolved,
    /// A lookup or store write failed; no active user was left behind.
    Abandoned,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    async fn resolve_zones(&self, coordinates: &Coordinates) -> anyhow::Result<Vec<ZoneCode>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, user: &User) -> anyhow::Result<()>;

    async fn remove_user(&self, user_id: &UserId) -> anyhow::Result<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ZoneSubscriptionRepo: Send + Sync {
    /// Idempotent: subscribing twice leaves a single entry.
    async fn add_subscriber(
        &self,
        zone: &ZoneCode,
        user_id: &UserId,
    ) -> anyhow::Result<ZoneSubscription>;
}

#[async_trait]
pub trait RegistrationInteractor: Send + Sync {
    async fn register(
        &self,
        input: RegistrationInput,
    ) -> Result<RegistrationOutcome, RegistrationError>;
}

struct ValidatedRegistration {
    first_name: SubscriberName,
    email: SubscriberEmail,
    coordinates: Coordinates,
}

impl TryFrom<RegistrationInput> for ValidatedRegistration {
    type Error = RegistrationError;

    fn try_from(input: RegistrationInput) -> Result<Self, Self::Error> {
        if !input.consent {
            return Err(RegistrationError::InvalidInput(
                "consent is required".to_string(),
            ));
        }
        let first_name =
            SubscriberName::try_from(input.first_name).map_err(RegistrationError::InvalidInput)?;
        let email = SubscriberEmail::try_from(input.email).map_err(RegistrationError::InvalidInput)?;
        let coordinates = Coordinates::try_from((input.latitude.as_str(), input.longitude.as_str()))
            .map_err(RegistrationError::InvalidInput)?;
        Ok(Self {
            first_name,
            email,
            coordinates,
        })
    }
}

pub struct RegistrationInteractorImpl {
    zone_resolver: Arc<dyn ZoneResolver>,
    users: Arc<dyn UserRepo>,
    zone_subscriptions: Arc<dyn ZoneSubscriptionRepo>,
}

impl RegistrationInteractorImpl {
    pub fn new(
        zone_resolver: Arc<dyn ZoneResolver>,
        users: Arc<dyn UserRepo>,
        zone_subscriptions: Arc<dyn ZoneSubscriptionRepo>,
    ) -> Self {
        Self {
            zone_resolver,
            users,
            zone_subscriptions,
        }
    }

    async fn subscribe_to_zones(&self, user: &User) -> RegistrationOutcome {
        let mut failed_zones = vec![];
        for zone in &user.zone_ids {
            if let Err(err) = self.zone_subscriptions.add_subscriber(zone, &user.id).await {
                error!("Failed to subscribe user {} to zone {zone}: {err:?}", user.id);
                failed_zones.push(zone.clone());
            }
        }

        if failed_zones.len() == user.zone_ids.len() {
            error!(
                "No zone subscription succeeded for user {}, removing the user",
                user.id
            );
            if let Err(err) = self.users.remove_user(&user.id).await {
                error!("Failed to remove user {}: {err:?}", user.id);
            }
            return RegistrationOutcome::Abandoned;
        }

        if !failed_zones.is_empty() {
            warn!(
                "User {} registered without zones [{}]",
                user.id,
                failed_zones.iter().join(", ")
            );
        }
        RegistrationOutcome::Registered {
            user_id: user.id.clone(),
            zones: user.zone_ids.clone(),
        }
    }
}

#[async_trait]
impl RegistrationInteractor for RegistrationInteractorImpl {
    #[tracing::instrument(err, skip(self, input), level = "info")]
    async fn register(
        &self,
        input: RegistrationInput,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let ValidatedRegistration {
            first_name,
            email,
            coordinates,
        } = ValidatedRegistration::try_from(input)?;

        let zones = match self.zone_resolver.resolve_zones(&coordinates).await {
            Ok(zones) => zones.into_iter().unique().collect_vec(),
            Err(err) => {
                error!("Error fetching zones for {coordinates}: {err:?}");
                return Ok(RegistrationOutcome::Abandoned);
            }
        };
        if zones.is_empty() {
            warn!("No zone ID(s) returned for coordinates {coordinates}");
            return Ok(RegistrationOutcome::NoZonesResolved);
        }

        let user = User::new(first_name, email, coordinates, zones);
        if let Err(err) = self.users.create_user(&user).await {
            error!("Failed to create user {}: {err:?}", user.id);
            return Ok(RegistrationOutcome::Abandoned);
        }

        let outcome = self.subscribe_to_zones(&user).await;
        if let RegistrationOutcome::Registered { user_id, zones } = &outcome {
            info!("Registered user {user_id} for zones [{}]", zones.iter().join(", "));
        }
        Ok(outcome)
    }
}
