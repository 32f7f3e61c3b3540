pub mod audit;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod flows;
pub mod risk;
pub mod services;
pub mod timing;
pub mod workflow;

pub use audit::{AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use delivery::{DeliveryOutcome, ReportDeliveryState, ReportDeliveryTracker};
pub use domain::basics::{BasicCategory, BasicScoreSet};
pub use domain::carrier::{CarrierIdentifier, CarrierIdentity, ContactAddress};
pub use domain::profile::{DataSource, SafetyProfile};
pub use errors::{
    ApplicationError, DeliveryError, DomainError, GatewayError, InputError, InterfaceError,
};
pub use flows::{FlowEngine, FlowTransitionError, WorkflowStage, WorkflowState};
pub use risk::{BasicStatus, ClassifiedBasic, DataQOpportunitySummary, RiskAssessment, RiskLevel};
pub use services::{GeneratedReport, PublicStats, ReportService, SafetyProfileFetcher, StatsSource};
pub use timing::{Debouncer, StatsPoller};
pub use workflow::{LookupWorkflow, StepOutcome};
