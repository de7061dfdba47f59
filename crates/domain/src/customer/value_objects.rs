//! Value objects for the customer domain.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::CustomerError;

const MAX_EMAIL_LEN: usize = 254;

/// Identity of a customer.
///
/// A freshly generated ID carries no numeric value; the store assigns one on
/// first save. Once persisted, the numeric value is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Option<i64>);

impl CustomerId {
    /// Creates an ID for a customer that has not been persisted yet.
    pub fn generate() -> Self {
        Self(None)
    }

    /// Creates an ID from a store-assigned number.
    pub fn from_number(value: i64) -> Result<Self, CustomerError> {
        if value <= 0 {
            return Err(CustomerError::InvalidId(value.to_string()));
        }
        Ok(Self(Some(value)))
    }

    /// Parses an ID from its transport form.
    pub fn from_string(value: &str) -> Result<Self, CustomerError> {
        let trimmed = value.trim();
        let parsed: i64 = trimmed
            .parse()
            .map_err(|_| CustomerError::InvalidId(value.to_string()))?;
        Self::from_number(parsed).map_err(|_| CustomerError::InvalidId(value.to_string()))
    }

    /// Returns the numeric value, if the store has assigned one.
    pub fn value(&self) -> Option<i64> {
        self.0
    }

    /// Returns true once the store has assigned a numeric value.
    pub fn is_persisted(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("unassigned"),
        }
    }
}

/// A syntactically valid email address, held in lower-cased canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Validates and canonicalizes an address.
    pub fn parse(value: &str) -> Result<Self, CustomerError> {
        let candidate = value.trim();
        if !is_valid_email(candidate) {
            return Err(CustomerError::InvalidEmail(value.to_string()));
        }
        Ok(Self(candidate.to_lowercase()))
    }

    /// Returns the canonical address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_email(candidate: &str) -> bool {
    if candidate.is_empty()
        || candidate.len() > MAX_EMAIL_LEN
        || candidate.chars().any(char::is_whitespace)
    {
        return false;
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Email {
    type Err = CustomerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Email {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
