//! Deterministic stand-in for the carrier data service.
//!
//! Every value is derived from the digits of the carrier number, so the same input always
//! produces the same profile. Used by the CLI `--fixture` mode and by tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::basics::BasicScoreSet;
use crate::domain::carrier::{
    CarrierAddress, CarrierIdentifier, CarrierIdentity, ContactAddress, FleetSize,
    OperatingStatus,
};
use crate::domain::profile::{
    CrashBreakdown, CrashSummary, DataSource, InspectionSummary, OosRate, OosRateSet,
    SafetyProfile, UpstreamAlert, UpstreamAlerts,
};
use crate::errors::{DomainError, GatewayError};
use crate::services::{
    GeneratedReport, PublicStats, ReportService, SafetyProfileFetcher, StatsSource,
};

pub const NATIONAL_VEHICLE_OOS_AVERAGE: f64 = 21.4;
pub const NATIONAL_DRIVER_OOS_AVERAGE: f64 = 5.5;
pub const FIXTURE_TOTAL_CHECKS: u64 = 12_500;

const FIXTURE_DISCLAIMER: &str =
    "This is simulated data for demonstration purposes. Real CSA scores are available from FMCSA SAFER.";
const INVALID_NUMBER_MESSAGE: &str =
    "Invalid carrier number format. Please enter a valid MC# or DOT#.";
const NOT_FOUND_MESSAGE: &str = "Carrier not found";

const COMPANY_PREFIXES: [&str; 26] = [
    "American", "National", "Express", "Swift", "Prime", "United", "Highway", "Interstate",
    "Central", "Western", "Eastern", "Southern", "Northern", "Midwest", "Pacific", "Atlantic",
    "Mountain", "Valley", "Blue Ridge", "Golden", "Silver", "Eagle", "Falcon", "Thunder",
    "Lightning", "Rapid",
];
const COMPANY_SUFFIXES: [&str; 12] = [
    "Trucking", "Transport", "Freight", "Logistics", "Carriers", "Express", "Hauling", "Lines",
    "Moving", "Delivery", "Shipping", "Distribution",
];
const COMPANY_TYPES: [&str; 6] = ["LLC", "Inc", "Corp", "Co", "LTD", "LP"];
const STATES: [&str; 20] = [
    "TX", "CA", "FL", "IL", "OH", "PA", "GA", "NC", "MI", "TN", "IN", "AZ", "MO", "WI", "AL",
    "SC", "LA", "KY", "OK", "AR",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarrierNumberKind {
    Mc,
    Dot,
}

/// An MC or DOT number extracted from free-form input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CarrierNumber {
    pub kind: CarrierNumberKind,
    pub digits: String,
}

impl CarrierNumber {
    /// Accepts 5 to 15 characters holding at least 5 digits. An `MC` or `DOT` marker picks
    /// the kind; otherwise up to 7 digits is read as MC and anything longer as DOT.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if !(5..=15).contains(&trimmed.chars().count()) {
            return None;
        }
        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 5 {
            return None;
        }

        let upper = trimmed.to_ascii_uppercase();
        let kind = if upper.contains("MC") {
            CarrierNumberKind::Mc
        } else if upper.contains("DOT") {
            CarrierNumberKind::Dot
        } else if digits.len() <= 7 {
            CarrierNumberKind::Mc
        } else {
            CarrierNumberKind::Dot
        };
        Some(Self { kind, digits })
    }

    pub fn seed(&self) -> u64 {
        self.digits.parse().unwrap_or(0)
    }
}

/// Roughly 30% clean, 40% middling, 20% near threshold, 10% high.
fn weighted_score(rng: &mut StdRng) -> f64 {
    let bucket: f64 = rng.gen();
    let score: u32 = if bucket < 0.3 {
        rng.gen_range(0..40)
    } else if bucket < 0.7 {
        rng.gen_range(40..70)
    } else if bucket < 0.9 {
        rng.gen_range(70..85)
    } else {
        rng.gen_range(85..100)
    };
    f64::from(score)
}

fn optional_score(rng: &mut StdRng, presence: f64) -> Option<f64> {
    let present = rng.gen_bool(presence);
    let score = weighted_score(rng);
    present.then_some(score)
}

pub fn generate_profile(
    number: &CarrierNumber,
    fetched_at: DateTime<Utc>,
) -> Result<SafetyProfile, DomainError> {
    let seed = number.seed();
    let mut rng = StdRng::seed_from_u64(seed);

    let legal_name = format!(
        "{} {} {}",
        COMPANY_PREFIXES[(seed % COMPANY_PREFIXES.len() as u64) as usize],
        COMPANY_SUFFIXES[((seed / 10) % COMPANY_SUFFIXES.len() as u64) as usize],
        COMPANY_TYPES[((seed / 100) % COMPANY_TYPES.len() as u64) as usize],
    );
    let power_units = (seed % 50) as u32 + 1;
    let drivers = power_units + rng.gen_range(0..=power_units * 3 / 10);

    let derived_number = |factor: u64, offset: u64, width: usize| -> String {
        seed.saturating_mul(factor).saturating_add(offset).to_string().chars().take(width).collect()
    };
    let dot_number = match number.kind {
        CarrierNumberKind::Dot => number.digits.clone(),
        CarrierNumberKind::Mc => derived_number(7, 1_000_000, 7),
    };
    let mc_number = match number.kind {
        CarrierNumberKind::Mc => number.digits.clone(),
        CarrierNumberKind::Dot => derived_number(3, 100_000, 6),
    };

    let rating_roll: f64 = rng.gen();
    let safety_rating = if rating_roll > 0.85 {
        "Satisfactory"
    } else if rating_roll > 0.4 {
        "None"
    } else {
        "Conditional"
    };

    let identity = CarrierIdentity {
        legal_name,
        dba_name: None,
        dot_number: Some(dot_number),
        mc_number: Some(mc_number),
        operating_status: OperatingStatus::Active,
        entity_type: Some("CARRIER".to_owned()),
        fleet_size: Some(FleetSize { power_units, drivers }),
        address: CarrierAddress {
            street: Some(format!("{} Industrial Blvd", seed % 9999 + 1)),
            city: Some("Commerce".to_owned()),
            state: Some(STATES[(seed % STATES.len() as u64) as usize].to_owned()),
            zip: Some((seed % 90_000 + 10_000).to_string()),
        },
        safety_rating: Some(safety_rating.to_owned()),
    };

    let basics = BasicScoreSet {
        unsafe_driving: Some(weighted_score(&mut rng)),
        hos_compliance: Some(weighted_score(&mut rng)),
        vehicle_maintenance: Some(weighted_score(&mut rng)),
        crash_indicator: Some(weighted_score(&mut rng)),
        controlled_substances: optional_score(&mut rng, 0.3),
        hazmat_compliance: optional_score(&mut rng, 0.2),
        driver_fitness: Some(weighted_score(&mut rng)),
    };

    let oos_rates = OosRateSet {
        vehicle: OosRate::new(
            Some(tenths(rng.gen_range(0.0..30.0))),
            Some(NATIONAL_VEHICLE_OOS_AVERAGE),
        ),
        driver: OosRate::new(
            Some(tenths(rng.gen_range(0.0..15.0))),
            Some(NATIONAL_DRIVER_OOS_AVERAGE),
        ),
    };

    let inspections_total: u32 = rng.gen_range(5..55);
    let inspections = InspectionSummary {
        total: inspections_total,
        last_24_months: rng.gen_range(3..33_u32).min(inspections_total),
    };

    let crash_total: u32 = rng.gen_range(0..5);
    let injury = rng.gen_range(0..=crash_total);
    let fatal = u32::from(injury > 0 && rng.gen_bool(0.1));
    let crashes = CrashSummary::new(
        crash_total,
        Some(CrashBreakdown { fatal, injury: injury - fatal, tow_away: crash_total - injury }),
    )?;

    Ok(SafetyProfile {
        identity,
        upstream_alerts: upstream_alerts(&basics),
        basics,
        oos_rates,
        crashes,
        inspections,
        data_source: DataSource::Fallback,
        disclaimer: Some(FIXTURE_DISCLAIMER.to_owned()),
        fetched_at,
    })
}

fn tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Alert list as the data service reports it: strictly above threshold only.
pub fn upstream_alerts(basics: &BasicScoreSet) -> UpstreamAlerts {
    let details: Vec<UpstreamAlert> = basics
        .entries()
        .filter(|entry| entry.percentile.is_some_and(|score| score > f64::from(entry.threshold)))
        .map(|entry| UpstreamAlert {
            key: entry.category.key().to_owned(),
            category: Some(entry.category),
            score: entry.percentile,
            threshold: Some(entry.threshold),
        })
        .collect();
    UpstreamAlerts { count: details.len() as u32, details }
}

/// Plain-language report body used when no generated analysis is available.
pub fn fallback_analysis(profile: &SafetyProfile) -> String {
    let alerts = &profile.upstream_alerts;
    let mut analysis = String::from("QUICK SUMMARY\n");

    match alerts.count {
        0 => analysis.push_str(
            "Good news! Your carrier has no BASICs above FMCSA intervention thresholds. \
             Staying proactive about compliance is key to maintaining this status.\n\n",
        ),
        1 => analysis.push_str(
            "Attention needed. Your carrier has 1 BASIC above the FMCSA intervention threshold. \
             This could trigger an investigation or audit. Taking action now can reduce your risk.\n\n",
        ),
        count => analysis.push_str(&format!(
            "Critical action required. Your carrier has {count} BASICs above intervention \
             thresholds. FMCSA may prioritize your company for investigation. Immediate attention \
             is recommended.\n\n"
        )),
    }

    analysis.push_str("ISSUES FOUND\n");
    if alerts.details.is_empty() {
        analysis.push_str(
            "- No critical issues found. All BASICs are below intervention thresholds.\n",
        );
    }
    for alert in &alerts.details {
        let name = alert.category.map(|category| category.name()).unwrap_or(alert.key.as_str());
        let score = alert.score.map(|score| format!("{score}%")).unwrap_or_else(|| "n/a".to_owned());
        let threshold =
            alert.threshold.map(|threshold| format!("{threshold}%")).unwrap_or_else(|| "n/a".to_owned());
        analysis.push_str(&format!(
            "- {name}: {score} (threshold: {threshold}) - Consider filing a DataQ challenge for any incorrect violations\n"
        ));
    }
    analysis.push('\n');

    analysis.push_str("YOUR 3-STEP ACTION PLAN\n");
    analysis.push_str(
        "1. Review your recent inspections and identify any violations that may be incorrectly recorded or eligible for DataQ challenge.\n",
    );
    analysis.push_str(
        "2. Set up automated alerts so you are notified when your BASIC scores change.\n",
    );
    analysis.push_str(
        "3. Implement a preventive maintenance program and ensure all drivers complete thorough pre-trip inspections.\n",
    );
    analysis
}

/// Fixed, fully populated profile with the given scores. OOS rates sit below the national
/// averages and there are no crashes, so only `basics` drives the assessment.
pub fn sample_profile(basics: BasicScoreSet) -> SafetyProfile {
    SafetyProfile {
        identity: CarrierIdentity {
            legal_name: "Prairie Line Freight LLC".to_owned(),
            dba_name: Some("Prairie Line".to_owned()),
            dot_number: Some("2841093".to_owned()),
            mc_number: Some("123456".to_owned()),
            operating_status: OperatingStatus::Active,
            entity_type: Some("CARRIER".to_owned()),
            fleet_size: Some(FleetSize { power_units: 12, drivers: 14 }),
            address: CarrierAddress {
                street: Some("410 Depot St".to_owned()),
                city: Some("Salina".to_owned()),
                state: Some("KS".to_owned()),
                zip: Some("67401".to_owned()),
            },
            safety_rating: Some("Satisfactory".to_owned()),
        },
        upstream_alerts: upstream_alerts(&basics),
        basics,
        oos_rates: OosRateSet {
            vehicle: OosRate::new(Some(10.0), Some(NATIONAL_VEHICLE_OOS_AVERAGE)),
            driver: OosRate::new(Some(2.0), Some(NATIONAL_DRIVER_OOS_AVERAGE)),
        },
        crashes: CrashSummary::default(),
        inspections: InspectionSummary { total: 18, last_24_months: 9 },
        data_source: DataSource::Fallback,
        disclaimer: None,
        fetched_at: Utc::now(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    #[default]
    Deliver,
    /// Every delivery attempt fails.
    Fail,
    /// The first delivery fails and every resend succeeds.
    FailThenDeliver,
}

/// In-process implementation of every collaborator trait.
#[derive(Debug, Default)]
pub struct FixtureGateway {
    delivery: DeliveryMode,
    resend_attempts: AtomicU32,
    stats: Option<PublicStats>,
}

impl FixtureGateway {
    pub fn new(delivery: DeliveryMode) -> Self {
        Self { delivery, ..Self::default() }
    }

    pub fn with_stats(mut self, stats: PublicStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn resend_attempts(&self) -> u32 {
        self.resend_attempts.load(Ordering::SeqCst)
    }

    fn profile_for(&self, carrier: &CarrierIdentifier) -> Result<SafetyProfile, GatewayError> {
        let number = CarrierNumber::parse(carrier.as_str())
            .ok_or_else(|| GatewayError::Rejected(INVALID_NUMBER_MESSAGE.to_owned()))?;
        if number.seed() == 0 {
            return Err(GatewayError::Rejected(NOT_FOUND_MESSAGE.to_owned()));
        }
        generate_profile(&number, Utc::now())
            .map_err(|error| GatewayError::Decode(error.to_string()))
    }
}

#[async_trait]
impl SafetyProfileFetcher for FixtureGateway {
    async fn lookup(&self, carrier: &CarrierIdentifier) -> Result<SafetyProfile, GatewayError> {
        self.profile_for(carrier)
    }
}

#[async_trait]
impl ReportService for FixtureGateway {
    async fn generate_and_deliver(
        &self,
        carrier: &CarrierIdentifier,
        _contact: &ContactAddress,
    ) -> Result<GeneratedReport, GatewayError> {
        let profile = self.profile_for(carrier)?;
        Ok(GeneratedReport {
            ai_analysis: fallback_analysis(&profile),
            carrier: profile.identity,
            email_sent: self.delivery == DeliveryMode::Deliver,
        })
    }

    async fn resend(
        &self,
        carrier: &CarrierIdentifier,
        _contact: &ContactAddress,
    ) -> Result<bool, GatewayError> {
        self.profile_for(carrier)?;
        self.resend_attempts.fetch_add(1, Ordering::SeqCst);
        Ok(self.delivery != DeliveryMode::Fail)
    }
}

#[async_trait]
impl StatsSource for FixtureGateway {
    async fn stats(&self) -> Result<PublicStats, GatewayError> {
        Ok(self.stats.unwrap_or(PublicStats {
            checks_this_month: PublicStats::DEFAULT_CHECKS_THIS_MONTH,
            total_checks: Some(FIXTURE_TOTAL_CHECKS),
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        fallback_analysis, generate_profile, sample_profile, upstream_alerts, CarrierNumber,
        CarrierNumberKind, DeliveryMode, FixtureGateway,
    };
    use crate::domain::basics::{BasicCategory, BasicScoreSet};
    use crate::domain::carrier::{CarrierIdentifier, ContactAddress};
    use crate::domain::profile::DataSource;
    use crate::errors::GatewayError;
    use crate::services::{ReportService, SafetyProfileFetcher, StatsSource};

    #[test]
    fn carrier_number_kind_follows_marker_then_length() {
        let mc = CarrierNumber::parse("MC-123456").expect("mc");
        assert_eq!(mc.kind, CarrierNumberKind::Mc);
        assert_eq!(mc.digits, "123456");

        let dot = CarrierNumber::parse("dot 1234567").expect("dot");
        assert_eq!(dot.kind, CarrierNumberKind::Dot);

        assert_eq!(CarrierNumber::parse("1234567").map(|n| n.kind), Some(CarrierNumberKind::Mc));
        assert_eq!(CarrierNumber::parse("12345678").map(|n| n.kind), Some(CarrierNumberKind::Dot));
    }

    #[test]
    fn carrier_number_rejects_short_or_oversized_input() {
        assert!(CarrierNumber::parse("1234").is_none());
        assert!(CarrierNumber::parse("MC 12a3").is_none());
        assert!(CarrierNumber::parse("1234567890123456").is_none());
    }

    #[test]
    fn generated_profile_is_deterministic_per_number() {
        let number = CarrierNumber::parse("MC 884512").expect("number");
        let at = Utc::now();
        let first = generate_profile(&number, at).expect("profile");
        let second = generate_profile(&number, at).expect("profile");

        assert_eq!(first, second);
        assert_eq!(first.identity.mc_number.as_deref(), Some("884512"));
        assert_eq!(first.data_source, DataSource::Fallback);
        let fleet = first.identity.fleet_size.expect("fleet");
        assert_eq!(fleet.power_units, (884_512 % 50) + 1);
        assert!(fleet.drivers >= fleet.power_units);
        assert!(first.inspections.last_24_months <= first.inspections.total);
    }

    #[test]
    fn generated_scores_stay_in_percentile_range() {
        for raw in ["MC 100001", "DOT 2233445", "55555", "987654321"] {
            let number = CarrierNumber::parse(raw).expect("number");
            let profile = generate_profile(&number, Utc::now()).expect("profile");
            for entry in profile.basics.entries() {
                if let Some(score) = entry.percentile {
                    assert!((0.0..100.0).contains(&score), "{raw}: {score}");
                }
            }
            let breakdown = profile.crashes.breakdown().expect("breakdown");
            assert!(breakdown.sum() <= profile.crashes.total());
        }
    }

    #[test]
    fn generated_fleet_and_rates_stay_within_bounds() {
        for raw in ["MC 100001", "DOT 2233445", "55555", "987654321", "MC 884512"] {
            let number = CarrierNumber::parse(raw).expect("number");
            let profile = generate_profile(&number, Utc::now()).expect("profile");
            let fleet = profile.identity.fleet_size.expect("fleet");
            assert!(fleet.drivers <= fleet.power_units + fleet.power_units * 3 / 10, "{raw}");
            let vehicle = profile.oos_rates.vehicle.rate.expect("vehicle rate");
            let driver = profile.oos_rates.driver.rate.expect("driver rate");
            assert!((0.0..=30.0).contains(&vehicle), "{raw}: {vehicle}");
            assert!((0.0..=15.0).contains(&driver), "{raw}: {driver}");
            assert!((5..55).contains(&profile.inspections.total), "{raw}");
            assert!(profile.crashes.total() < 5, "{raw}");
        }
    }

    #[test]
    fn upstream_alerts_use_strict_threshold() {
        let basics = BasicScoreSet::default()
            .with(BasicCategory::UnsafeDriving, Some(65.0))
            .with(BasicCategory::HosCompliance, Some(66.0));
        let alerts = upstream_alerts(&basics);

        assert_eq!(alerts.count, 1);
        assert_eq!(alerts.details[0].key, "hos_compliance");
    }

    #[test]
    fn fallback_analysis_wording_tracks_alert_count() {
        let clean = fallback_analysis(&sample_profile(BasicScoreSet::default()));
        assert!(clean.starts_with("QUICK SUMMARY\nGood news!"));
        assert!(clean.contains("No critical issues found"));
        assert!(clean.contains("YOUR 3-STEP ACTION PLAN\n1. "));

        let one = fallback_analysis(&sample_profile(
            BasicScoreSet::default().with(BasicCategory::HosCompliance, Some(70.0)),
        ));
        assert!(one.contains("1 BASIC above"));
        assert!(one.contains("- HOS Compliance: 70% (threshold: 65%)"));

        let many = fallback_analysis(&sample_profile(
            BasicScoreSet::default()
                .with(BasicCategory::HosCompliance, Some(70.0))
                .with(BasicCategory::DriverFitness, Some(91.0)),
        ));
        assert!(many.starts_with("QUICK SUMMARY\nCritical action required. Your carrier has 2 BASICs"));
    }

    #[tokio::test]
    async fn gateway_rejects_unknown_and_malformed_numbers() {
        let gateway = FixtureGateway::default();
        let zero = CarrierIdentifier::parse("00000").expect("identifier");
        let malformed = CarrierIdentifier::parse("MC12").expect("identifier");

        assert_eq!(
            gateway.lookup(&zero).await,
            Err(GatewayError::Rejected("Carrier not found".to_owned()))
        );
        assert!(matches!(
            gateway.lookup(&malformed).await,
            Err(GatewayError::Rejected(message)) if message.contains("MC# or DOT#")
        ));
    }

    #[tokio::test]
    async fn delivery_modes_drive_email_outcome() {
        let carrier = CarrierIdentifier::parse("MC 884512").expect("identifier");
        let contact = ContactAddress::parse("ops@fleet.example").expect("contact");

        let failing = FixtureGateway::new(DeliveryMode::FailThenDeliver);
        let report = failing.generate_and_deliver(&carrier, &contact).await.expect("report");
        assert!(!report.email_sent);
        assert!(report.ai_analysis.starts_with("QUICK SUMMARY"));
        assert_eq!(failing.resend(&carrier, &contact).await, Ok(true));
        assert_eq!(failing.resend_attempts(), 1);

        let broken = FixtureGateway::new(DeliveryMode::Fail);
        assert_eq!(broken.resend(&carrier, &contact).await, Ok(false));
    }

    #[tokio::test]
    async fn stats_default_to_published_counts() {
        let stats = FixtureGateway::default().stats().await.expect("stats");
        assert_eq!(stats.checks_this_month, 3247);
        assert_eq!(stats.total_checks, Some(12_500));
    }
}
