use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::carrier::{CarrierIdentifier, ContactAddress};
use crate::domain::profile::SafetyProfile;
use crate::risk::RiskAssessment;
use crate::services::GeneratedReport;

/// Monotonic per-workflow request number. A result is applied only while the state is
/// still waiting on the same number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestSeq(pub u64);

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Idle,
    Searching,
    Preview,
    ReportGenerating,
    Delivered,
    DeliveryFailed,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Searching => "searching",
            Self::Preview => "preview",
            Self::ReportGenerating => "report_generating",
            Self::Delivered => "delivered",
            Self::DeliveryFailed => "delivery_failed",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Searching | Self::ReportGenerating)
    }
}

/// Profile plus everything derived from it. Built once per successful lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookupPreview {
    pub identifier: CarrierIdentifier,
    pub profile: SafetyProfile,
    pub assessment: RiskAssessment,
}

impl LookupPreview {
    pub fn new(identifier: CarrierIdentifier, profile: SafetyProfile) -> Self {
        let assessment = RiskAssessment::derive(&profile);
        Self { identifier, profile, assessment }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSession {
    pub preview: Arc<LookupPreview>,
    pub contact: ContactAddress,
    pub report: Arc<GeneratedReport>,
    pub request: RequestSeq,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle { error: Option<String> },
    Searching { identifier: CarrierIdentifier, request: RequestSeq },
    Preview { preview: Arc<LookupPreview>, error: Option<String> },
    ReportGenerating { preview: Arc<LookupPreview>, contact: ContactAddress, request: RequestSeq },
    Delivered(ReportSession),
    DeliveryFailed(ReportSession),
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::Idle { error: None }
    }
}

impl WorkflowState {
    pub fn stage(&self) -> WorkflowStage {
        match self {
            Self::Idle { .. } => WorkflowStage::Idle,
            Self::Searching { .. } => WorkflowStage::Searching,
            Self::Preview { .. } => WorkflowStage::Preview,
            Self::ReportGenerating { .. } => WorkflowStage::ReportGenerating,
            Self::Delivered(_) => WorkflowStage::Delivered,
            Self::DeliveryFailed(_) => WorkflowStage::DeliveryFailed,
        }
    }

    pub fn preview(&self) -> Option<&Arc<LookupPreview>> {
        match self {
            Self::Preview { preview, .. } | Self::ReportGenerating { preview, .. } => Some(preview),
            Self::Delivered(session) | Self::DeliveryFailed(session) => Some(&session.preview),
            Self::Idle { .. } | Self::Searching { .. } => None,
        }
    }

    pub fn profile(&self) -> Option<&SafetyProfile> {
        self.preview().map(|preview| &preview.profile)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Idle { error } | Self::Preview { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn report_session(&self) -> Option<&ReportSession> {
        match self {
            Self::Delivered(session) | Self::DeliveryFailed(session) => Some(session),
            _ => None,
        }
    }

    /// Request the state is currently waiting on, if any.
    pub fn pending_request(&self) -> Option<RequestSeq> {
        match self {
            Self::Searching { request, .. } | Self::ReportGenerating { request, .. } => {
                Some(*request)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LookupEvent {
    SubmitLookup { identifier: CarrierIdentifier, request: RequestSeq },
    LookupSucceeded { request: RequestSeq, profile: Box<SafetyProfile> },
    LookupFailed { request: RequestSeq, error: String },
    SubmitReport { contact: ContactAddress, request: RequestSeq },
    ReportGenerated { request: RequestSeq, report: GeneratedReport },
    ReportFailed { request: RequestSeq, error: String },
    ResendCompleted { request: RequestSeq, sent: bool },
    Reset,
}

impl LookupEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SubmitLookup { .. } => EventKind::SubmitLookup,
            Self::LookupSucceeded { .. } => EventKind::LookupSucceeded,
            Self::LookupFailed { .. } => EventKind::LookupFailed,
            Self::SubmitReport { .. } => EventKind::SubmitReport,
            Self::ReportGenerated { .. } => EventKind::ReportGenerated,
            Self::ReportFailed { .. } => EventKind::ReportFailed,
            Self::ResendCompleted { .. } => EventKind::ResendCompleted,
            Self::Reset => EventKind::Reset,
        }
    }

    /// Request a result event answers. `None` for caller-issued events.
    pub fn answers(&self) -> Option<RequestSeq> {
        match self {
            Self::LookupSucceeded { request, .. }
            | Self::LookupFailed { request, .. }
            | Self::ReportGenerated { request, .. }
            | Self::ReportFailed { request, .. }
            | Self::ResendCompleted { request, .. } => Some(*request),
            Self::SubmitLookup { .. } | Self::SubmitReport { .. } | Self::Reset => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SubmitLookup,
    LookupSucceeded,
    LookupFailed,
    SubmitReport,
    ReportGenerated,
    ReportFailed,
    ResendCompleted,
    Reset,
}

/// Work a transition asks the workflow to carry out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    FetchSafetyProfile,
    DeriveAssessment,
    GenerateAndDeliverReport,
    TrackDelivery,
    DiscardSession,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransitionOutcome {
    pub from: WorkflowStage,
    pub to: WorkflowState,
    pub event: EventKind,
    pub actions: Vec<FlowAction>,
}
