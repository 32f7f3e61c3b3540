use std::sync::Arc;

use thiserror::Error;

use crate::audit::{AuditContext, AuditEvent, AuditSink};
use crate::flows::states::{
    EventKind, FlowAction, LookupEvent, LookupPreview, ReportSession, RequestSeq,
    TransitionOutcome, WorkflowStage, WorkflowState,
};

#[derive(Clone, Debug, Default)]
pub struct FlowEngine;

impl FlowEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self) -> WorkflowState {
        WorkflowState::default()
    }

    pub fn apply(
        &self,
        current: &WorkflowState,
        event: &LookupEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &WorkflowState,
        event: &LookupEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => sink.emit(AuditEvent::applied(audit, outcome)),
            Err(error) => {
                sink.emit(AuditEvent::rejected(audit, current.stage(), event.kind(), error));
            }
        }
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {stage:?} using event {event:?}")]
    InvalidTransition { stage: WorkflowStage, event: EventKind },
    #[error("a request is already in flight while {stage:?}")]
    RequestInFlight { stage: WorkflowStage },
    #[error("stale response {received} while {stage:?} (waiting on {expected:?})")]
    StaleResponse { stage: WorkflowStage, expected: Option<RequestSeq>, received: RequestSeq },
}

/// Computes the next state for `event`. Pure: performs none of the returned actions.
pub fn transition(
    current: &WorkflowState,
    event: &LookupEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        DeriveAssessment, DiscardSession, FetchSafetyProfile, GenerateAndDeliverReport,
        TrackDelivery,
    };

    let stage = current.stage();
    let invalid = || FlowTransitionError::InvalidTransition { stage, event: event.kind() };

    if let Some(received) = event.answers() {
        let expected = match current {
            WorkflowState::Delivered(session) | WorkflowState::DeliveryFailed(session) => {
                Some(session.request)
            }
            other => other.pending_request(),
        };
        if expected != Some(received) {
            return Err(FlowTransitionError::StaleResponse { stage, expected, received });
        }
    }

    let (to, actions) = match (current, event) {
        (_, LookupEvent::Reset) => (WorkflowState::default(), vec![DiscardSession]),
        (WorkflowState::Idle { .. }, LookupEvent::SubmitLookup { identifier, request }) => (
            WorkflowState::Searching { identifier: identifier.clone(), request: *request },
            vec![FetchSafetyProfile],
        ),
        (
            WorkflowState::Searching { .. } | WorkflowState::ReportGenerating { .. },
            LookupEvent::SubmitLookup { .. } | LookupEvent::SubmitReport { .. },
        ) => return Err(FlowTransitionError::RequestInFlight { stage }),
        (
            WorkflowState::Searching { identifier, .. },
            LookupEvent::LookupSucceeded { profile, .. },
        ) => {
            let preview = LookupPreview::new(identifier.clone(), profile.as_ref().clone());
            (WorkflowState::Preview { preview: Arc::new(preview), error: None }, vec![DeriveAssessment])
        }
        (WorkflowState::Searching { .. }, LookupEvent::LookupFailed { error, .. }) => {
            (WorkflowState::Idle { error: Some(error.clone()) }, Vec::new())
        }
        (WorkflowState::Preview { preview, .. }, LookupEvent::SubmitReport { contact, request }) => (
            WorkflowState::ReportGenerating {
                preview: Arc::clone(preview),
                contact: contact.clone(),
                request: *request,
            },
            vec![GenerateAndDeliverReport],
        ),
        (
            WorkflowState::ReportGenerating { preview, contact, request },
            LookupEvent::ReportGenerated { report, .. },
        ) => {
            let session = ReportSession {
                preview: Arc::clone(preview),
                contact: contact.clone(),
                report: Arc::new(report.clone()),
                request: *request,
            };
            let to = if report.email_sent {
                WorkflowState::Delivered(session)
            } else {
                WorkflowState::DeliveryFailed(session)
            };
            (to, vec![TrackDelivery])
        }
        (WorkflowState::ReportGenerating { preview, .. }, LookupEvent::ReportFailed { error, .. }) => (
            WorkflowState::Preview { preview: Arc::clone(preview), error: Some(error.clone()) },
            Vec::new(),
        ),
        (
            WorkflowState::Delivered(session) | WorkflowState::DeliveryFailed(session),
            LookupEvent::ResendCompleted { sent, .. },
        ) => {
            let to = if *sent {
                WorkflowState::Delivered(session.clone())
            } else {
                WorkflowState::DeliveryFailed(session.clone())
            };
            (to, vec![TrackDelivery])
        }
        _ => return Err(invalid()),
    };

    Ok(TransitionOutcome { from: stage, to, event: event.kind(), actions })
}
