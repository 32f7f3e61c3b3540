//! JSON shapes of the carrier data service. Every response is wrapped in [`Envelope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carrier_risk_core::domain::basics::{BasicCategory, BasicScoreSet};
use carrier_risk_core::domain::carrier::{
    CarrierAddress, CarrierIdentity, FleetSize, OperatingStatus,
};
use carrier_risk_core::domain::profile::{
    CrashBreakdown, CrashSummary, DataSource, InspectionSummary, OosRate, OosRateSet,
    SafetyProfile, UpstreamAlert, UpstreamAlerts,
};
use carrier_risk_core::errors::GatewayError;
use carrier_risk_core::services::{GeneratedReport, PublicStats};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest<'a> {
    pub carrier_number: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest<'a> {
    pub carrier_number: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

/// Validation failure entry returned alongside HTTP 400.
#[derive(Debug, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub msg: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> Result<T, GatewayError> {
        if !self.success {
            return Err(GatewayError::Rejected(self.failure_message()));
        }
        self.data.ok_or_else(|| GatewayError::Decode("response is missing `data`".to_owned()))
    }

    pub fn failure_message(&self) -> String {
        if let Some(error) = self.error.as_deref().filter(|error| !error.trim().is_empty()) {
            return error.to_owned();
        }
        let messages: Vec<&str> =
            self.errors.iter().filter_map(|error| error.msg.as_deref()).collect();
        if messages.is_empty() {
            "the carrier data service rejected the request".to_owned()
        } else {
            messages.join("; ")
        }
    }
}

/// Accepts `12.5` as well as `"12.5"`; older payloads send rates as strings.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(from = "RawNumber")]
pub struct LooseNumber(pub Option<f64>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Missing(Option<()>),
}

impl From<RawNumber> for LooseNumber {
    fn from(raw: RawNumber) -> Self {
        let value = match raw {
            RawNumber::Number(value) => Some(value),
            RawNumber::Text(text) => text.trim().parse::<f64>().ok(),
            RawNumber::Missing(_) => None,
        };
        // "NaN" and "inf" parse as f64 but carry no score.
        Self(value.filter(|value| value.is_finite()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierDto {
    #[serde(default)]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub dba_name: Option<String>,
    #[serde(default)]
    pub dot_number: Option<String>,
    #[serde(default)]
    pub mc_number: Option<String>,
    #[serde(default)]
    pub operating_status: Option<String>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub fleet_size: Option<FleetSizeDto>,
    #[serde(default)]
    pub address: Option<AddressDto>,
    /// Preview payloads flatten the address down to the state.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub safety_rating: Option<String>,
    #[serde(default)]
    pub out_of_service_rate: Option<LegacyOosDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSizeDto {
    #[serde(default)]
    pub power_units: u32,
    #[serde(default)]
    pub drivers: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressDto {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyOosDto {
    #[serde(default)]
    pub vehicle: LooseNumber,
    #[serde(default)]
    pub driver: LooseNumber,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicsDto {
    #[serde(default)]
    pub unsafe_driving: LooseNumber,
    #[serde(default)]
    pub hos_compliance: LooseNumber,
    #[serde(default)]
    pub vehicle_maintenance: LooseNumber,
    #[serde(default)]
    pub crash_indicator: LooseNumber,
    #[serde(default)]
    pub controlled_substances: LooseNumber,
    #[serde(default)]
    pub hazmat_compliance: LooseNumber,
    #[serde(default)]
    pub driver_fitness: LooseNumber,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsDto {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub details: Vec<AlertDetailDto>,
}

#[derive(Debug, Deserialize)]
pub struct AlertDetailDto {
    pub basic: String,
    #[serde(default)]
    pub score: LooseNumber,
    #[serde(default)]
    pub threshold: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsDto {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub last24_months: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrashDetailDto {
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub fatal: u32,
    #[serde(default)]
    pub injury: u32,
    #[serde(default)]
    pub tow: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OosAxisDto {
    #[serde(default)]
    pub rate: LooseNumber,
    #[serde(default)]
    pub national_avg: LooseNumber,
}

#[derive(Debug, Default, Deserialize)]
pub struct OosRatesDto {
    #[serde(default)]
    pub vehicle: OosAxisDto,
    #[serde(default)]
    pub driver: OosAxisDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupData {
    pub carrier: CarrierDto,
    #[serde(default)]
    pub basics: BasicsDto,
    #[serde(default)]
    pub alerts: AlertsDto,
    #[serde(default)]
    pub inspections: CountsDto,
    #[serde(default)]
    pub crashes: CountsDto,
    #[serde(default)]
    pub crash_detail: Option<CrashDetailDto>,
    #[serde(default)]
    pub oos_rates: Option<OosRatesDto>,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub disclaimer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub carrier: CarrierDto,
    #[serde(default)]
    pub ai_analysis: Option<String>,
    #[serde(default)]
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendData {
    #[serde(default)]
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub checks_this_month: u64,
    #[serde(default)]
    pub total_checks: Option<u64>,
}

/// Maps both `hosCompliance` and `hos_compliance` spellings.
pub fn category_for_key(key: &str) -> Option<BasicCategory> {
    let normalized: String =
        key.chars().filter(|ch| *ch != '_').map(|ch| ch.to_ascii_lowercase()).collect();
    BasicCategory::ALL
        .into_iter()
        .find(|category| category.key().replace('_', "") == normalized)
}

impl CarrierDto {
    pub fn into_identity(self) -> CarrierIdentity {
        let address = self.address.unwrap_or_default();
        CarrierIdentity {
            legal_name: self.legal_name.unwrap_or_else(|| "Unknown carrier".to_owned()),
            dba_name: self.dba_name,
            dot_number: self.dot_number,
            mc_number: self.mc_number,
            operating_status: self
                .operating_status
                .as_deref()
                .map(OperatingStatus::from_label)
                .unwrap_or_else(|| OperatingStatus::Other("UNKNOWN".to_owned())),
            entity_type: self.entity_type,
            fleet_size: self
                .fleet_size
                .map(|fleet| FleetSize { power_units: fleet.power_units, drivers: fleet.drivers }),
            address: CarrierAddress {
                street: address.street,
                city: address.city,
                state: address.state.or(self.state),
                zip: address.zip,
            },
            safety_rating: self.safety_rating,
        }
    }
}

impl BasicsDto {
    fn into_scores(self) -> BasicScoreSet {
        BasicScoreSet {
            unsafe_driving: self.unsafe_driving.0,
            hos_compliance: self.hos_compliance.0,
            vehicle_maintenance: self.vehicle_maintenance.0,
            crash_indicator: self.crash_indicator.0,
            controlled_substances: self.controlled_substances.0,
            hazmat_compliance: self.hazmat_compliance.0,
            driver_fitness: self.driver_fitness.0,
        }
    }
}

impl LookupData {
    pub fn into_profile(self) -> Result<SafetyProfile, GatewayError> {
        let legacy_oos = self
            .carrier
            .out_of_service_rate
            .as_ref()
            .map(|legacy| (legacy.vehicle.0, legacy.driver.0));
        let oos_rates = match (self.oos_rates, legacy_oos) {
            (Some(rates), _) => OosRateSet {
                vehicle: OosRate::new(rates.vehicle.rate.0, rates.vehicle.national_avg.0),
                driver: OosRate::new(rates.driver.rate.0, rates.driver.national_avg.0),
            },
            (None, Some((vehicle, driver))) => OosRateSet {
                vehicle: OosRate::new(vehicle, None),
                driver: OosRate::new(driver, None),
            },
            (None, None) => OosRateSet::default(),
        };

        let crashes = match self.crash_detail {
            Some(detail) => CrashSummary::new(
                detail.total.unwrap_or(self.crashes.last24_months),
                Some(CrashBreakdown {
                    fatal: detail.fatal,
                    injury: detail.injury,
                    tow_away: detail.tow,
                }),
            ),
            None => CrashSummary::new(self.crashes.last24_months, None),
        }
        .map_err(|error| GatewayError::Decode(error.to_string()))?;

        let upstream_alerts = UpstreamAlerts {
            count: self.alerts.count,
            details: self
                .alerts
                .details
                .into_iter()
                .map(|detail| UpstreamAlert {
                    category: category_for_key(&detail.basic),
                    key: detail.basic,
                    score: detail.score.0,
                    threshold: detail.threshold,
                })
                .collect(),
        };

        Ok(SafetyProfile {
            identity: self.carrier.into_identity(),
            basics: self.basics.into_scores(),
            oos_rates,
            crashes,
            inspections: InspectionSummary {
                total: self.inspections.total,
                last_24_months: self.inspections.last24_months,
            },
            upstream_alerts,
            data_source: self
                .data_source
                .as_deref()
                .map(DataSource::from_tag)
                .unwrap_or(DataSource::Fallback),
            disclaimer: self.disclaimer,
            fetched_at: self.fetched_at.unwrap_or_else(Utc::now),
        })
    }
}

impl ReportData {
    pub fn into_report(self) -> GeneratedReport {
        GeneratedReport {
            ai_analysis: self.ai_analysis.unwrap_or_default(),
            carrier: self.carrier.into_identity(),
            email_sent: self.email_sent,
        }
    }
}

impl From<StatsData> for PublicStats {
    fn from(stats: StatsData) -> Self {
        Self { checks_this_month: stats.checks_this_month, total_checks: stats.total_checks }
    }
}
