//! Audit trail of workflow transitions, one event per applied or rejected event.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::carrier::CarrierIdentifier;
use crate::flows::{EventKind, FlowTransitionError, TransitionOutcome, WorkflowStage};

pub const TRANSITION_APPLIED: &str = "lookup.transition_applied";
pub const TRANSITION_REJECTED: &str = "lookup.transition_rejected";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Lookup,
    Report,
    Delivery,
    Session,
}

impl AuditCategory {
    pub fn for_event(event: EventKind) -> Self {
        match event {
            EventKind::SubmitLookup | EventKind::LookupSucceeded | EventKind::LookupFailed => {
                Self::Lookup
            }
            EventKind::SubmitReport | EventKind::ReportGenerated | EventKind::ReportFailed => {
                Self::Report
            }
            EventKind::ResendCompleted => Self::Delivery,
            EventKind::Reset => Self::Session,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Applied,
    Rejected,
}

/// Who and what a batch of audit events belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditContext {
    pub carrier: Option<CarrierIdentifier>,
    pub workflow_id: String,
    pub correlation_id: String,
}

impl AuditContext {
    pub fn new(
        carrier: Option<CarrierIdentifier>,
        workflow_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self { carrier, workflow_id: workflow_id.into(), correlation_id: correlation_id.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub carrier: Option<CarrierIdentifier>,
    pub workflow_id: String,
    pub correlation_id: String,
    pub category: AuditCategory,
    pub outcome: AuditOutcome,
    pub event: EventKind,
    pub from: WorkflowStage,
    /// Stage reached; absent when the event was rejected.
    pub to: Option<WorkflowStage>,
    /// Rejection reason.
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn applied(context: &AuditContext, outcome: &TransitionOutcome) -> Self {
        let to = Some(outcome.to.stage());
        Self::build(context, AuditOutcome::Applied, outcome.event, outcome.from, to, None)
    }

    pub fn rejected(
        context: &AuditContext,
        from: WorkflowStage,
        event: EventKind,
        error: &FlowTransitionError,
    ) -> Self {
        Self::build(context, AuditOutcome::Rejected, event, from, None, Some(error.to_string()))
    }

    fn build(
        context: &AuditContext,
        outcome: AuditOutcome,
        event: EventKind,
        from: WorkflowStage,
        to: Option<WorkflowStage>,
        detail: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            carrier: context.carrier.clone(),
            workflow_id: context.workflow_id.clone(),
            correlation_id: context.correlation_id.clone(),
            category: AuditCategory::for_event(event),
            outcome,
            event,
            from,
            to,
            detail,
            occurred_at: Utc::now(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self.outcome {
            AuditOutcome::Applied => TRANSITION_APPLIED,
            AuditOutcome::Rejected => TRANSITION_REJECTED,
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Drops every event. Default sink for callers that do not collect an audit trail.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

/// Collects events in memory; clones share the same trail.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().iter().map(|event| event.event_type().to_owned()).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
