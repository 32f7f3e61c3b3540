use serde::{Deserialize, Serialize};

use crate::domain::basics::{BasicCategory, BasicScoreSet, WATCH_BAND_WIDTH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicStatus {
    Compliant,
    Watch,
    Flagged,
    NotApplicable,
}

impl BasicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::Watch => "watch",
            Self::Flagged => "flagged",
            Self::NotApplicable => "not_applicable",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedBasic {
    pub category: BasicCategory,
    pub percentile: Option<f64>,
    pub threshold: u8,
    pub status: BasicStatus,
}

/// Status of a single percentile against a threshold.
///
/// Flagged at `p >= t`, watch on `t - 15 <= p < t`, compliant below that. Values outside
/// 0..=100 are classified as given; a non-finite value is not applicable.
pub fn classify_score(percentile: Option<f64>, threshold: u8) -> BasicStatus {
    let Some(percentile) = percentile.filter(|value| value.is_finite()) else {
        return BasicStatus::NotApplicable;
    };
    let threshold = f64::from(threshold);

    if percentile >= threshold {
        BasicStatus::Flagged
    } else if percentile >= threshold - WATCH_BAND_WIDTH {
        BasicStatus::Watch
    } else {
        BasicStatus::Compliant
    }
}

pub fn classify(basics: &BasicScoreSet) -> Vec<ClassifiedBasic> {
    basics
        .entries()
        .map(|entry| ClassifiedBasic {
            category: entry.category,
            percentile: entry.percentile,
            threshold: entry.threshold,
            status: classify_score(entry.percentile, entry.threshold),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{classify, classify_score, BasicStatus};
    use crate::domain::basics::{BasicCategory, BasicScoreSet};

    #[test]
    fn boundaries_for_both_thresholds() {
        for threshold in [65_u8, 80] {
            let t = f64::from(threshold);
            assert_eq!(classify_score(Some(t), threshold), BasicStatus::Flagged);
            assert_eq!(classify_score(Some(t - 0.5), threshold), BasicStatus::Watch);
            assert_eq!(classify_score(Some(t - 15.0), threshold), BasicStatus::Watch);
            assert_eq!(classify_score(Some(t - 15.5), threshold), BasicStatus::Compliant);
            assert_eq!(classify_score(Some(0.0), threshold), BasicStatus::Compliant);
            assert_eq!(classify_score(Some(100.0), threshold), BasicStatus::Flagged);
            assert_eq!(classify_score(None, threshold), BasicStatus::NotApplicable);
        }
    }

    #[test]
    fn out_of_range_values_are_classified_not_rejected() {
        assert_eq!(classify_score(Some(140.0), 80), BasicStatus::Flagged);
        assert_eq!(classify_score(Some(-5.0), 65), BasicStatus::Compliant);
    }

    #[test]
    fn non_finite_values_are_not_applicable() {
        assert_eq!(classify_score(Some(f64::NAN), 65), BasicStatus::NotApplicable);
        assert_eq!(classify_score(Some(f64::INFINITY), 80), BasicStatus::NotApplicable);
    }

    #[test]
    fn classify_covers_every_category_in_order() {
        let basics = BasicScoreSet::default()
            .with(BasicCategory::UnsafeDriving, Some(65.0))
            .with(BasicCategory::VehicleMaintenance, Some(65.0))
            .with(BasicCategory::DriverFitness, Some(79.0));

        let classified = classify(&basics);
        let statuses: Vec<_> = classified.iter().map(|c| (c.category, c.status)).collect();

        assert_eq!(
            statuses,
            vec![
                (BasicCategory::UnsafeDriving, BasicStatus::Flagged),
                (BasicCategory::HosCompliance, BasicStatus::NotApplicable),
                (BasicCategory::VehicleMaintenance, BasicStatus::Watch),
                (BasicCategory::CrashIndicator, BasicStatus::NotApplicable),
                (BasicCategory::ControlledSubstances, BasicStatus::NotApplicable),
                (BasicCategory::HazmatCompliance, BasicStatus::NotApplicable),
                (BasicCategory::DriverFitness, BasicStatus::Watch),
            ]
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let basics = BasicScoreSet::default().with(BasicCategory::CrashIndicator, Some(51.0));
        assert_eq!(classify(&basics), classify(&basics));
    }
}
