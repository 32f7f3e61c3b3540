use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::profile::OosRateSet;
use crate::risk::classifier::{BasicStatus, ClassifiedBasic};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall tier. Any flagged category is a hard gate to HIGH; watch categories or an
/// above-average OOS axis only lift LOW to MODERATE.
pub fn aggregate(classified: &[ClassifiedBasic], oos: &OosRateSet) -> RiskLevel {
    let flagged = classified.iter().filter(|c| c.status == BasicStatus::Flagged).count();
    if flagged >= 1 {
        return RiskLevel::High;
    }

    let any_watch = classified.iter().any(|c| c.status == BasicStatus::Watch);
    if any_watch || oos.any_above_average() {
        return RiskLevel::Moderate;
    }

    RiskLevel::Low
}
