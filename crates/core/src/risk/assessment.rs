use serde::{Deserialize, Serialize};

use crate::domain::profile::SafetyProfile;
use crate::risk::aggregate::{aggregate, RiskLevel};
use crate::risk::classifier::{classify, BasicStatus, ClassifiedBasic};
use crate::risk::dataq::{estimate, DataQOpportunitySummary};

/// Everything derived from one safety profile.
///
/// `flagged_count` is computed here; `upstream_alert_count` is whatever the data source
/// reported. They can legitimately differ and are kept side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub classified: Vec<ClassifiedBasic>,
    pub risk_level: RiskLevel,
    pub data_q: DataQOpportunitySummary,
    pub flagged_count: u32,
    pub watch_count: u32,
    pub upstream_alert_count: u32,
    pub vehicle_oos_above_average: bool,
    pub driver_oos_above_average: bool,
}

impl RiskAssessment {
    pub fn derive(profile: &SafetyProfile) -> Self {
        let classified = classify(&profile.basics);
        let risk_level = aggregate(&classified, &profile.oos_rates);
        let data_q = estimate(&classified);

        Self {
            flagged_count: count_status(&classified, BasicStatus::Flagged),
            watch_count: count_status(&classified, BasicStatus::Watch),
            upstream_alert_count: profile.upstream_alerts.count,
            vehicle_oos_above_average: profile.oos_rates.vehicle.is_above_average(),
            driver_oos_above_average: profile.oos_rates.driver.is_above_average(),
            classified,
            risk_level,
            data_q,
        }
    }
}

fn count_status(classified: &[ClassifiedBasic], status: BasicStatus) -> u32 {
    classified.iter().filter(|c| c.status == status).count() as u32
}
