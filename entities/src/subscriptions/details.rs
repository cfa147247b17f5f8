use shared_kernel::non_empty_string;
use std::fmt::{Display, Formatter};

non_empty_string!(SubscriberNameInner);
non_empty_string!(SubscriberEmailInner);

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 30;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriberName(SubscriberNameInner);

impl AsRef<str> for SubscriberName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl TryFrom<String> for SubscriberName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let name = SubscriberNameInner::try_from(value)?;
        let length = name.as_ref().chars().count();
        if (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
            return Ok(SubscriberName(name));
        }
        Err(format!(
            "name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters"
        ))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriberEmail(SubscriberEmailInner);

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Display for SubscriberEmail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl TryFrom<String> for SubscriberEmail {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        use validator::validate_email;
        let non_empty_string = SubscriberEmailInner::try_from(value)?;

        let is_valid = validate_email(non_empty_string.as_ref());
        if is_valid {
            return Ok(SubscriberEmail(non_empty_string));
        }
        Err(format!("{} is an invalid email", non_empty_string.as_ref()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<(f64, f64)> for Coordinates {
    type Error = String;

    fn try_from((latitude, longitude): (f64, f64)) -> Result<Self, Self::Error> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {latitude} is out of range"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {longitude} is out of range"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl TryFrom<(&str, &str)> for Coordinates {
    type Error = String;

    fn try_from((latitude, longitude): (&str, &str)) -> Result<Self, Self::Error> {
        let latitude = latitude
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid latitude {latitude}: {err}"))?;
        let longitude = longitude
            .trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid longitude {longitude}: {err}"))?;
        Coordinates::try_from((latitude, longitude))
    }
}

/// Formatted the way the zone lookup expects a point: `lat,lng`.
impl Display for Coordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}
