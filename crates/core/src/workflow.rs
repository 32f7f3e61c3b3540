use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::audit::{AuditContext, AuditSink, NoopAuditSink};
use crate::delivery::{DeliveryOutcome, ReportDeliveryState, ReportDeliveryTracker};
use crate::domain::carrier::{CarrierIdentifier, ContactAddress};
use crate::errors::{DeliveryError, DomainError, InputError};
use crate::flows::{
    FlowAction, FlowEngine, FlowTransitionError, LookupEvent, RequestSeq, TransitionOutcome,
    WorkflowStage, WorkflowState,
};
use crate::services::{ReportService, SafetyProfileFetcher};

/// What a caller-issued step amounted to once its request settled.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// The result was applied; carries the state it produced.
    Completed(WorkflowState),
    /// Ignored because a request was already running in this stage.
    AlreadyInFlight(WorkflowStage),
    /// The request finished after a reset or a newer request; its result was dropped.
    Superseded,
}

struct Session {
    state: WorkflowState,
    next_request: u64,
    tracker: Option<ReportDeliveryTracker>,
}

/// One lookup-to-report session.
///
/// Methods take `&self`; the session lock is released before every collaborator call, so a
/// duplicate or late call is resolved by the transition rules rather than by blocking.
pub struct LookupWorkflow {
    id: String,
    engine: FlowEngine,
    fetcher: Arc<dyn SafetyProfileFetcher>,
    reports: Arc<dyn ReportService>,
    audit: Arc<dyn AuditSink>,
    session: Mutex<Session>,
}

impl LookupWorkflow {
    pub fn new(fetcher: Arc<dyn SafetyProfileFetcher>, reports: Arc<dyn ReportService>) -> Self {
        let engine = FlowEngine::new();
        Self {
            id: Uuid::new_v4().to_string(),
            session: Mutex::new(Session {
                state: engine.initial_state(),
                next_request: 1,
                tracker: None,
            }),
            engine,
            fetcher,
            reports,
            audit: Arc::new(NoopAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    pub fn stage(&self) -> WorkflowStage {
        self.lock().state.stage()
    }

    pub fn delivery_state(&self) -> Option<ReportDeliveryState> {
        self.lock().tracker.as_ref().map(ReportDeliveryTracker::state)
    }

    pub async fn submit_lookup(&self, raw_identifier: &str) -> Result<StepOutcome, DomainError> {
        let identifier = CarrierIdentifier::parse(raw_identifier)?;
        let correlation_id = Uuid::new_v4().to_string();

        let request = {
            let mut session = self.lock();
            let request = issue_request(&mut session);
            let event = LookupEvent::SubmitLookup { identifier: identifier.clone(), request };
            let outcome = match self.apply(&mut session, &event, &correlation_id) {
                Ok(outcome) => outcome,
                Err(FlowTransitionError::RequestInFlight { stage }) => {
                    return Ok(StepOutcome::AlreadyInFlight(stage));
                }
                Err(error) => return Err(error.into()),
            };
            require_action(&outcome, FlowAction::FetchSafetyProfile)?;
            request
        };

        tracing::info!(
            event_name = "lookup.fetch_started",
            correlation_id = %correlation_id,
            carrier = %identifier,
            request = %request,
            "fetching safety profile"
        );
        let event = match self.fetcher.lookup(&identifier).await {
            Ok(profile) => LookupEvent::LookupSucceeded { request, profile: Box::new(profile) },
            Err(error) => {
                tracing::warn!(
                    event_name = "lookup.fetch_failed",
                    correlation_id = %correlation_id,
                    carrier = %identifier,
                    error = %error,
                    "safety profile lookup failed"
                );
                LookupEvent::LookupFailed { request, error: error.to_string() }
            }
        };

        let mut session = self.lock();
        self.settle(&mut session, &event, &correlation_id)
    }

    pub async fn submit_report(
        &self,
        raw_contact: &str,
        consent: bool,
    ) -> Result<StepOutcome, DomainError> {
        let contact = ContactAddress::parse(raw_contact)?;
        if !consent {
            return Err(InputError::ConsentRequired.into());
        }
        let correlation_id = Uuid::new_v4().to_string();

        let (request, identifier) = {
            let mut session = self.lock();
            let request = issue_request(&mut session);
            let event = LookupEvent::SubmitReport { contact: contact.clone(), request };
            let outcome = match self.apply(&mut session, &event, &correlation_id) {
                Ok(outcome) => outcome,
                Err(FlowTransitionError::RequestInFlight { stage }) => {
                    return Ok(StepOutcome::AlreadyInFlight(stage));
                }
                Err(error) => return Err(error.into()),
            };
            require_action(&outcome, FlowAction::GenerateAndDeliverReport)?;
            let identifier = outcome.to.preview().map(|preview| preview.identifier.clone());
            match identifier {
                Some(identifier) => (request, identifier),
                None => {
                    return Err(DomainError::InvariantViolation(
                        "report generation started without a preview".to_owned(),
                    ));
                }
            }
        };

        tracing::info!(
            event_name = "report.generation_started",
            correlation_id = %correlation_id,
            carrier = %identifier,
            request = %request,
            "generating carrier report"
        );
        let event = match self.reports.generate_and_deliver(&identifier, &contact).await {
            Ok(report) => LookupEvent::ReportGenerated { request, report },
            Err(error) => {
                tracing::warn!(
                    event_name = "report.generation_failed",
                    correlation_id = %correlation_id,
                    carrier = %identifier,
                    error = %error,
                    "report generation failed"
                );
                LookupEvent::ReportFailed { request, error: error.to_string() }
            }
        };

        let mut session = self.lock();
        self.settle(&mut session, &event, &correlation_id)
    }

    /// Resends the generated report. Only valid once a report exists.
    pub async fn resend(&self) -> Result<DeliveryOutcome, DomainError> {
        let correlation_id = Uuid::new_v4().to_string();
        let (tracker, identifier, contact, request) = {
            let mut session = self.lock();
            let Some(report_session) = session.state.report_session().cloned() else {
                return Err(DeliveryError::NoReport { stage: session.state.stage() }.into());
            };
            let Some(tracker) = session.tracker.clone() else {
                return Err(DomainError::InvariantViolation(
                    "report session has no delivery tracker".to_owned(),
                ));
            };
            (
                tracker,
                report_session.preview.identifier.clone(),
                report_session.contact,
                report_session.request,
            )
        };

        let outcome = tracker.resend(&identifier, &contact).await;
        if outcome == DeliveryOutcome::RetryInFlight {
            return Ok(outcome);
        }

        let mut session = self.lock();
        let event = LookupEvent::ResendCompleted { request, sent: outcome.is_sent() };
        match self.settle(&mut session, &event, &correlation_id)? {
            StepOutcome::Superseded => {
                tracing::debug!(
                    event_name = "delivery.resend_superseded",
                    correlation_id = %correlation_id,
                    "resend finished after the session was reset"
                );
            }
            StepOutcome::Completed(_) | StepOutcome::AlreadyInFlight(_) => {}
        }
        Ok(outcome)
    }

    /// Discards the profile, any report and the delivery tracker. Pending results become stale.
    pub fn reset(&self) -> WorkflowState {
        let correlation_id = Uuid::new_v4().to_string();
        let mut session = self.lock();
        if let Err(error) = self.apply(&mut session, &LookupEvent::Reset, &correlation_id) {
            tracing::error!(
                event_name = "lookup.reset_rejected",
                correlation_id = %correlation_id,
                error = %error,
                "reset rejected, forcing idle"
            );
            session.state = self.engine.initial_state();
            session.tracker = None;
        }
        session.state.clone()
    }

    fn settle(
        &self,
        session: &mut Session,
        event: &LookupEvent,
        correlation_id: &str,
    ) -> Result<StepOutcome, DomainError> {
        match self.apply(session, event, correlation_id) {
            Ok(outcome) => Ok(StepOutcome::Completed(outcome.to)),
            Err(FlowTransitionError::StaleResponse { .. }) => Ok(StepOutcome::Superseded),
            Err(error) => Err(error.into()),
        }
    }

    fn apply(
        &self,
        session: &mut Session,
        event: &LookupEvent,
        correlation_id: &str,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let audit =
            AuditContext::new(carrier_of(&session.state, event), self.id.clone(), correlation_id);
        let result =
            self.engine.apply_with_audit(&session.state, event, self.audit.as_ref(), &audit);
        match &result {
            Ok(outcome) => {
                tracing::info!(
                    event_name = "lookup.transition_applied",
                    correlation_id = %correlation_id,
                    workflow_id = %self.id,
                    from = outcome.from.as_str(),
                    to = outcome.to.stage().as_str(),
                    "workflow transition"
                );
                session.state = outcome.to.clone();
                self.perform(session, outcome, correlation_id);
            }
            Err(error) => {
                tracing::debug!(
                    event_name = "lookup.transition_rejected",
                    correlation_id = %correlation_id,
                    workflow_id = %self.id,
                    error = %error,
                    "workflow transition rejected"
                );
            }
        }
        result
    }

    /// Session-side effects of an applied transition. Collaborator calls are made by the
    /// step methods once the lock is released.
    fn perform(&self, session: &mut Session, outcome: &TransitionOutcome, correlation_id: &str) {
        for action in &outcome.actions {
            match action {
                FlowAction::DiscardSession => session.tracker = None,
                FlowAction::TrackDelivery => {
                    if session.tracker.is_none() {
                        session.tracker = outcome.to.report_session().map(|report_session| {
                            ReportDeliveryTracker::new(
                                Arc::clone(&self.reports),
                                report_session.report.email_sent,
                            )
                        });
                    }
                }
                FlowAction::DeriveAssessment => {
                    if let Some(preview) = outcome.to.preview() {
                        tracing::info!(
                            event_name = "lookup.assessment_derived",
                            correlation_id = %correlation_id,
                            workflow_id = %self.id,
                            risk_level = ?preview.assessment.risk_level,
                            flagged_count = preview.assessment.flagged_count,
                            "risk assessment derived"
                        );
                    }
                }
                FlowAction::FetchSafetyProfile | FlowAction::GenerateAndDeliverReport => {}
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        match self.session.lock() {
            Ok(session) => session,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn issue_request(session: &mut Session) -> RequestSeq {
    let request = RequestSeq(session.next_request);
    session.next_request += 1;
    request
}

fn require_action(outcome: &TransitionOutcome, action: FlowAction) -> Result<(), DomainError> {
    if outcome.actions.contains(&action) {
        Ok(())
    } else {
        Err(DomainError::InvariantViolation(format!(
            "transition to {} did not request {action:?}",
            outcome.to.stage().as_str()
        )))
    }
}

fn carrier_of(state: &WorkflowState, event: &LookupEvent) -> Option<CarrierIdentifier> {
    if let LookupEvent::SubmitLookup { identifier, .. } = event {
        return Some(identifier.clone());
    }
    match state {
        WorkflowState::Searching { identifier, .. } => Some(identifier.clone()),
        other => other.preview().map(|preview| preview.identifier.clone()),
    }
}
