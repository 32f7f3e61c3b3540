use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::basics::{BasicCategory, BasicScoreSet};
use crate::domain::carrier::CarrierIdentity;
use crate::errors::DomainError;

/// Fixed look-back window for crash and inspection counts.
pub const CRASH_WINDOW_MONTHS: u32 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Fallback,
}

impl DataSource {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "FMCSA_SAFER" | "FMCSA" | "LIVE" => Self::Live,
            _ => Self::Fallback,
        }
    }
}

/// Out-of-service rate on one axis together with the national reference value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OosRate {
    pub rate: Option<f64>,
    pub national_average: Option<f64>,
}

impl OosRate {
    pub fn new(rate: Option<f64>, national_average: Option<f64>) -> Self {
        Self { rate, national_average }
    }

    pub fn is_above_average(&self) -> bool {
        match (self.rate, self.national_average) {
            (Some(rate), Some(average)) => rate > average,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OosRateSet {
    pub vehicle: OosRate,
    pub driver: OosRate,
}

impl OosRateSet {
    pub fn any_above_average(&self) -> bool {
        self.vehicle.is_above_average() || self.driver.is_above_average()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashBreakdown {
    pub fatal: u32,
    pub injury: u32,
    pub tow_away: u32,
}

impl CrashBreakdown {
    pub fn sum(&self) -> u32 {
        self.fatal.saturating_add(self.injury).saturating_add(self.tow_away)
    }
}

/// Crash counts over the fixed 24-month window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CrashSummaryRecord")]
pub struct CrashSummary {
    total: u32,
    breakdown: Option<CrashBreakdown>,
}

#[derive(Deserialize)]
struct CrashSummaryRecord {
    total: u32,
    #[serde(default)]
    breakdown: Option<CrashBreakdown>,
}

impl TryFrom<CrashSummaryRecord> for CrashSummary {
    type Error = DomainError;

    fn try_from(record: CrashSummaryRecord) -> Result<Self, Self::Error> {
        Self::new(record.total, record.breakdown)
    }
}

impl CrashSummary {
    pub fn new(total: u32, breakdown: Option<CrashBreakdown>) -> Result<Self, DomainError> {
        if let Some(detail) = breakdown {
            if detail.sum() > total {
                return Err(DomainError::InvariantViolation(format!(
                    "crash breakdown ({}) exceeds the {CRASH_WINDOW_MONTHS}-month total ({total})",
                    detail.sum()
                )));
            }
        }
        Ok(Self { total, breakdown })
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn breakdown(&self) -> Option<CrashBreakdown> {
        self.breakdown
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionSummary {
    pub total: u32,
    pub last_24_months: u32,
}

/// One entry of the data source's own alert list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpstreamAlert {
    pub key: String,
    pub category: Option<BasicCategory>,
    pub score: Option<f64>,
    pub threshold: Option<u8>,
}

/// Alerts as reported by the data source. Kept separate from the locally classified
/// flagged count; the two are not reconciled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamAlerts {
    pub count: u32,
    pub details: Vec<UpstreamAlert>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyProfile {
    pub identity: CarrierIdentity,
    pub basics: BasicScoreSet,
    pub oos_rates: OosRateSet,
    pub crashes: CrashSummary,
    pub inspections: InspectionSummary,
    pub upstream_alerts: UpstreamAlerts,
    pub data_source: DataSource,
    pub disclaimer: Option<String>,
    pub fetched_at: DateTime<Utc>,
}
