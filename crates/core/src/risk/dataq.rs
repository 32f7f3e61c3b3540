use serde::{Deserialize, Serialize};

use crate::domain::basics::BasicCategory;
use crate::risk::classifier::{BasicStatus, ClassifiedBasic};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityTag {
    Flagged,
    NearThreshold,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataQOpportunity {
    pub category: BasicCategory,
    pub tag: OpportunityTag,
    pub percentile: f64,
    pub threshold: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQOpportunitySummary {
    pub estimated_count: u32,
    pub has_opportunities: bool,
    pub categories: Vec<DataQOpportunity>,
}

impl DataQOpportunitySummary {
    pub fn flagged(&self) -> impl Iterator<Item = &DataQOpportunity> {
        self.categories.iter().filter(|c| c.tag == OpportunityTag::Flagged)
    }

    pub fn near_threshold(&self) -> impl Iterator<Item = &DataQOpportunity> {
        self.categories.iter().filter(|c| c.tag == OpportunityTag::NearThreshold)
    }
}

/// Heuristic dispute estimate.
///
/// Flagged and watch categories are both listed, but only flagged ones are counted:
/// a confirmed breach is presumed contestable, a near-threshold score is surfaced for
/// monitoring only.
pub fn estimate(classified: &[ClassifiedBasic]) -> DataQOpportunitySummary {
    let categories: Vec<DataQOpportunity> = classified
        .iter()
        .filter_map(|basic| {
            let tag = match basic.status {
                BasicStatus::Flagged => OpportunityTag::Flagged,
                BasicStatus::Watch => OpportunityTag::NearThreshold,
                BasicStatus::Compliant | BasicStatus::NotApplicable => return None,
            };
            let percentile = basic.percentile?;
            Some(DataQOpportunity {
                category: basic.category,
                tag,
                percentile,
                threshold: basic.threshold,
            })
        })
        .collect();

    let estimated_count =
        categories.iter().filter(|c| c.tag == OpportunityTag::Flagged).count() as u32;

    DataQOpportunitySummary {
        estimated_count,
        has_opportunities: !categories.is_empty(),
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::{estimate, OpportunityTag};
    use crate::domain::basics::{BasicCategory, BasicScoreSet};
    use crate::risk::classifier::classify;

    #[test]
    fn nothing_to_dispute_when_all_compliant() {
        let basics = BasicScoreSet::default()
            .with(BasicCategory::UnsafeDriving, Some(10.0))
            .with(BasicCategory::DriverFitness, Some(64.9));
        let summary = estimate(&classify(&basics));

        assert_eq!(summary.estimated_count, 0);
        assert!(!summary.has_opportunities);
        assert!(summary.categories.is_empty());
    }

    #[test]
    fn watch_entries_are_listed_but_not_counted() {
        let basics = BasicScoreSet::default()
            .with(BasicCategory::HosCompliance, Some(55.0))
            .with(BasicCategory::VehicleMaintenance, Some(70.0));
        let summary = estimate(&classify(&basics));

        assert_eq!(summary.estimated_count, 0);
        assert!(summary.has_opportunities);
        assert_eq!(summary.near_threshold().count(), 2);
        assert_eq!(summary.flagged().count(), 0);
    }

    #[test]
    fn count_equals_flagged_entries_only() {
        let basics = BasicScoreSet::default()
            .with(BasicCategory::UnsafeDriving, Some(91.0))
            .with(BasicCategory::HosCompliance, Some(60.0))
            .with(BasicCategory::HazmatCompliance, Some(80.0))
            .with(BasicCategory::DriverFitness, Some(5.0));
        let summary = estimate(&classify(&basics));

        assert_eq!(summary.estimated_count, 2);
        assert_eq!(summary.categories.len(), 3);
        let flagged: Vec<_> = summary.flagged().map(|c| c.category).collect();
        assert_eq!(flagged, vec![BasicCategory::UnsafeDriving, BasicCategory::HazmatCompliance]);
        let hos = summary
            .categories
            .iter()
            .find(|c| c.category == BasicCategory::HosCompliance)
            .expect("hos listed");
        assert_eq!(hos.tag, OpportunityTag::NearThreshold);
        assert_eq!(hos.percentile, 60.0);
    }
}
