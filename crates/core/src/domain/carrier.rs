use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::InputError;

/// Identifier typed by the caller (MC or DOT number, with or without prefix).
///
/// Only trimming and emptiness are enforced here; whether the value names a real carrier
/// is decided by the fetcher.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarrierIdentifier(String);

impl CarrierIdentifier {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyCarrierIdentifier);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CarrierIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactAddress(String);

impl ContactAddress {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyContactAddress);
        }
        if !looks_like_email(trimmed) {
            return Err(InputError::MalformedContactAddress(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingStatus {
    Active,
    Inactive,
    OutOfService,
    Other(String),
}

impl OperatingStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "ACTIVE" => Self::Active,
            "INACTIVE" | "NOT_AUTHORIZED" => Self::Inactive,
            "OUT_OF_SERVICE" | "OOS" => Self::OutOfService,
            _ => Self::Other(label.trim().to_owned()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSize {
    pub power_units: u32,
    pub drivers: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierIdentity {
    pub legal_name: String,
    pub dba_name: Option<String>,
    pub dot_number: Option<String>,
    pub mc_number: Option<String>,
    pub operating_status: OperatingStatus,
    pub entity_type: Option<String>,
    pub fleet_size: Option<FleetSize>,
    pub address: CarrierAddress,
    pub safety_rating: Option<String>,
}
