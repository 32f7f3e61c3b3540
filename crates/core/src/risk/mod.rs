pub mod aggregate;
pub mod assessment;
pub mod classifier;
pub mod dataq;

pub use aggregate::{aggregate, RiskLevel};
pub use assessment::RiskAssessment;
pub use classifier::{classify, classify_score, BasicStatus, ClassifiedBasic};
pub use dataq::{estimate, DataQOpportunity, DataQOpportunitySummary, OpportunityTag};
