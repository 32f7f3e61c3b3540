use serde::{Deserialize, Serialize};

/// Width of the "watch" band directly below a category's intervention threshold.
pub const WATCH_BAND_WIDTH: f64 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicCategory {
    UnsafeDriving,
    HosCompliance,
    VehicleMaintenance,
    CrashIndicator,
    ControlledSubstances,
    HazmatCompliance,
    DriverFitness,
}

impl BasicCategory {
    pub const ALL: [BasicCategory; 7] = [
        BasicCategory::UnsafeDriving,
        BasicCategory::HosCompliance,
        BasicCategory::VehicleMaintenance,
        BasicCategory::CrashIndicator,
        BasicCategory::ControlledSubstances,
        BasicCategory::HazmatCompliance,
        BasicCategory::DriverFitness,
    ];

    /// Intervention threshold percentile. Fixed per category.
    pub const fn threshold(self) -> u8 {
        match self {
            Self::UnsafeDriving | Self::HosCompliance | Self::CrashIndicator => 65,
            Self::VehicleMaintenance
            | Self::ControlledSubstances
            | Self::HazmatCompliance
            | Self::DriverFitness => 80,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::UnsafeDriving => "unsafe_driving",
            Self::HosCompliance => "hos_compliance",
            Self::VehicleMaintenance => "vehicle_maintenance",
            Self::CrashIndicator => "crash_indicator",
            Self::ControlledSubstances => "controlled_substances",
            Self::HazmatCompliance => "hazmat_compliance",
            Self::DriverFitness => "driver_fitness",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UnsafeDriving => "Unsafe Driving",
            Self::HosCompliance => "HOS Compliance",
            Self::VehicleMaintenance => "Vehicle Maintenance",
            Self::CrashIndicator => "Crash Indicator",
            Self::ControlledSubstances => "Controlled Substances",
            Self::HazmatCompliance => "Hazmat Compliance",
            Self::DriverFitness => "Driver Fitness",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Self::UnsafeDriving => "Unsafe Drv",
            Self::HosCompliance => "HOS",
            Self::VehicleMaintenance => "Vehicle",
            Self::CrashIndicator => "Crash",
            Self::ControlledSubstances => "Drug/Alc",
            Self::HazmatCompliance => "Hazmat",
            Self::DriverFitness => "Fitness",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::UnsafeDriving => "Dangerous or careless operation of commercial motor vehicles",
            Self::HosCompliance => "Operating while ill, fatigued, or out of hours-of-service rules",
            Self::VehicleMaintenance => "Failure to properly maintain vehicles and repair defects",
            Self::CrashIndicator => "History or pattern of high crash involvement",
            Self::ControlledSubstances => "Impairment from alcohol, illegal drugs, or misused medication",
            Self::HazmatCompliance => "Unsafe handling of hazardous materials",
            Self::DriverFitness => "Operation by drivers who are unfit due to lack of training or medical qualification",
        }
    }
}

/// Raw percentile for one category alongside its fixed threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasicScore {
    pub category: BasicCategory,
    pub percentile: Option<f64>,
    pub threshold: u8,
}

/// Percentiles for the seven BASIC categories. `None` means the carrier has no measure
/// in that category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicScoreSet {
    pub unsafe_driving: Option<f64>,
    pub hos_compliance: Option<f64>,
    pub vehicle_maintenance: Option<f64>,
    pub crash_indicator: Option<f64>,
    pub controlled_substances: Option<f64>,
    pub hazmat_compliance: Option<f64>,
    pub driver_fitness: Option<f64>,
}

impl BasicScoreSet {
    pub fn get(&self, category: BasicCategory) -> Option<f64> {
        match category {
            BasicCategory::UnsafeDriving => self.unsafe_driving,
            BasicCategory::HosCompliance => self.hos_compliance,
            BasicCategory::VehicleMaintenance => self.vehicle_maintenance,
            BasicCategory::CrashIndicator => self.crash_indicator,
            BasicCategory::ControlledSubstances => self.controlled_substances,
            BasicCategory::HazmatCompliance => self.hazmat_compliance,
            BasicCategory::DriverFitness => self.driver_fitness,
        }
    }

    pub fn with(mut self, category: BasicCategory, percentile: Option<f64>) -> Self {
        let slot = match category {
            BasicCategory::UnsafeDriving => &mut self.unsafe_driving,
            BasicCategory::HosCompliance => &mut self.hos_compliance,
            BasicCategory::VehicleMaintenance => &mut self.vehicle_maintenance,
            BasicCategory::CrashIndicator => &mut self.crash_indicator,
            BasicCategory::ControlledSubstances => &mut self.controlled_substances,
            BasicCategory::HazmatCompliance => &mut self.hazmat_compliance,
            BasicCategory::DriverFitness => &mut self.driver_fitness,
        };
        *slot = percentile;
        self
    }

    /// Entries in the fixed category order.
    pub fn entries(&self) -> impl Iterator<Item = BasicScore> + '_ {
        BasicCategory::ALL.into_iter().map(|category| BasicScore {
            category,
            percentile: self.get(category),
            threshold: category.threshold(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BasicCategory, BasicScoreSet};

    #[test]
    fn thresholds_are_fixed_per_category() {
        let thresholds: Vec<u8> = BasicCategory::ALL.iter().map(|c| c.threshold()).collect();
        assert_eq!(thresholds, vec![65, 65, 80, 65, 80, 80, 80]);
    }

    #[test]
    fn entries_follow_category_order_and_carry_thresholds() {
        let scores = BasicScoreSet::default()
            .with(BasicCategory::HosCompliance, Some(70.0))
            .with(BasicCategory::DriverFitness, Some(12.0));

        let entries: Vec<_> = scores.entries().collect();
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[1].category, BasicCategory::HosCompliance);
        assert_eq!(entries[1].percentile, Some(70.0));
        assert_eq!(entries[1].threshold, 65);
        assert_eq!(entries[6].threshold, 80);
        assert_eq!(entries[0].percentile, None);
    }

    #[test]
    fn category_keys_are_unique() {
        let mut keys: Vec<&str> = BasicCategory::ALL.iter().map(|c| c.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), BasicCategory::ALL.len());
    }
}
