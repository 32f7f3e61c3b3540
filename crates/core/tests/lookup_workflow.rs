use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use carrier_risk_core::delivery::{DeliveryOutcome, ReportDeliveryState};
use carrier_risk_core::domain::basics::{BasicCategory, BasicScoreSet};
use carrier_risk_core::domain::carrier::{CarrierIdentifier, ContactAddress};
use carrier_risk_core::domain::profile::SafetyProfile;
use carrier_risk_core::errors::{DeliveryError, DomainError, GatewayError, InputError};
use carrier_risk_core::fixtures::sample_profile;
use carrier_risk_core::flows::{WorkflowStage, WorkflowState};
use carrier_risk_core::risk::{BasicStatus, OpportunityTag, RiskLevel};
use carrier_risk_core::services::{GeneratedReport, ReportService, SafetyProfileFetcher};
use carrier_risk_core::{InMemoryAuditSink, LookupWorkflow, StepOutcome};

/// Fetcher that answers from a fixed script, optionally waiting on a gate first.
struct ScriptedFetcher {
    answer: Result<BasicScoreSet, GatewayError>,
    gate: Option<Notify>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn answering(scores: BasicScoreSet) -> Arc<Self> {
        Arc::new(Self { answer: Ok(scores), gate: None, calls: AtomicUsize::new(0) })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(GatewayError::Rejected(message.to_owned())),
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn gated(scores: BasicScoreSet) -> Arc<Self> {
        Arc::new(Self { answer: Ok(scores), gate: Some(Notify::new()), calls: AtomicUsize::new(0) })
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SafetyProfileFetcher for ScriptedFetcher {
    async fn lookup(&self, _carrier: &CarrierIdentifier) -> Result<SafetyProfile, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.answer.clone().map(sample_profile)
    }
}

struct ScriptedReports {
    generation: Result<bool, GatewayError>,
    generation_gate: Option<Notify>,
    generation_calls: AtomicUsize,
    resend_answers: Mutex<Vec<bool>>,
    resend_gate: Option<Notify>,
    resend_calls: AtomicUsize,
}

impl ScriptedReports {
    fn new(generation: Result<bool, GatewayError>, resend_answers: Vec<bool>) -> Arc<Self> {
        Arc::new(Self {
            generation,
            generation_gate: None,
            generation_calls: AtomicUsize::new(0),
            resend_answers: Mutex::new(resend_answers),
            resend_gate: None,
            resend_calls: AtomicUsize::new(0),
        })
    }

    fn gated_generation(generation: Result<bool, GatewayError>) -> Arc<Self> {
        Arc::new(Self {
            generation,
            generation_gate: Some(Notify::new()),
            generation_calls: AtomicUsize::new(0),
            resend_answers: Mutex::new(Vec::new()),
            resend_gate: None,
            resend_calls: AtomicUsize::new(0),
        })
    }

    fn gated_resend(generation: Result<bool, GatewayError>, resend_answers: Vec<bool>) -> Arc<Self> {
        Arc::new(Self {
            generation,
            generation_gate: None,
            generation_calls: AtomicUsize::new(0),
            resend_answers: Mutex::new(resend_answers),
            resend_gate: Some(Notify::new()),
            resend_calls: AtomicUsize::new(0),
        })
    }

    fn release_generation(&self) {
        if let Some(gate) = &self.generation_gate {
            gate.notify_one();
        }
    }

    fn release_resend(&self) {
        if let Some(gate) = &self.resend_gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl ReportService for ScriptedReports {
    async fn generate_and_deliver(
        &self,
        _carrier: &CarrierIdentifier,
        _contact: &ContactAddress,
    ) -> Result<GeneratedReport, GatewayError> {
        self.generation_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.generation_gate {
            gate.notified().await;
        }
        let email_sent = self.generation.clone()?;
        Ok(GeneratedReport {
            ai_analysis: "QUICK SUMMARY\nGood news!".to_owned(),
            carrier: sample_profile(BasicScoreSet::default()).identity,
            email_sent,
        })
    }

    async fn resend(
        &self,
        _carrier: &CarrierIdentifier,
        _contact: &ContactAddress,
    ) -> Result<bool, GatewayError> {
        self.resend_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.resend_gate {
            gate.notified().await;
        }
        let mut answers = self.resend_answers.lock().expect("answers lock");
        if answers.is_empty() {
            Ok(false)
        } else {
            Ok(answers.remove(0))
        }
    }
}

fn workflow(fetcher: Arc<ScriptedFetcher>, reports: Arc<ScriptedReports>) -> Arc<LookupWorkflow> {
    Arc::new(LookupWorkflow::new(fetcher, reports))
}

fn scenario_a_scores() -> BasicScoreSet {
    BasicScoreSet {
        unsafe_driving: Some(15.0),
        hos_compliance: Some(42.0),
        vehicle_maintenance: Some(8.0),
        crash_indicator: Some(28.0),
        controlled_substances: Some(0.0),
        hazmat_compliance: None,
        driver_fitness: Some(12.0),
    }
}

async fn wait_for_stage(workflow: &LookupWorkflow, stage: WorkflowStage) {
    while workflow.stage() != stage {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn clean_carrier_previews_as_low_risk() {
    let flow = workflow(
        ScriptedFetcher::answering(scenario_a_scores()),
        ScriptedReports::new(Ok(true), Vec::new()),
    );

    let outcome = flow.submit_lookup("  MC 123456 ").await.expect("lookup");
    let state = match outcome {
        StepOutcome::Completed(state) => state,
        other => panic!("lookup should complete, got {other:?}"),
    };

    let preview = state.preview().expect("preview");
    assert_eq!(preview.identifier.as_str(), "MC 123456");
    assert_eq!(preview.assessment.risk_level, RiskLevel::Low);
    assert_eq!(preview.assessment.data_q.estimated_count, 0);
    assert!(!preview.assessment.data_q.has_opportunities);
    for classified in &preview.assessment.classified {
        let expected = if classified.category == BasicCategory::HazmatCompliance {
            BasicStatus::NotApplicable
        } else {
            BasicStatus::Compliant
        };
        assert_eq!(classified.status, expected, "{:?}", classified.category);
    }
}

#[tokio::test]
async fn single_flagged_category_makes_carrier_high_risk() {
    let scores = scenario_a_scores().with(BasicCategory::HosCompliance, Some(70.0));
    let flow =
        workflow(ScriptedFetcher::answering(scores), ScriptedReports::new(Ok(true), Vec::new()));

    flow.submit_lookup("DOT 2233445").await.expect("lookup");
    let state = flow.state();
    let assessment = &state.preview().expect("preview").assessment;

    assert_eq!(assessment.risk_level, RiskLevel::High);
    assert!(assessment.data_q.estimated_count >= 1);
    assert!(assessment
        .data_q
        .categories
        .iter()
        .any(|entry| entry.category == BasicCategory::HosCompliance
            && entry.tag == OpportunityTag::Flagged));
}

#[tokio::test]
async fn lookup_failure_returns_to_idle_with_message() {
    let flow = workflow(
        ScriptedFetcher::failing("Carrier not found"),
        ScriptedReports::new(Ok(true), Vec::new()),
    );

    let outcome = flow.submit_lookup("MC 000001").await.expect("lookup settles");

    assert_eq!(
        outcome,
        StepOutcome::Completed(WorkflowState::Idle { error: Some("Carrier not found".to_owned()) })
    );
    assert!(flow.state().profile().is_none());
}

#[tokio::test]
async fn failed_delivery_can_be_resent() {
    let reports = ScriptedReports::new(Ok(false), vec![true]);
    let flow = workflow(ScriptedFetcher::answering(scenario_a_scores()), reports.clone());

    flow.submit_lookup("MC 123456").await.expect("lookup");
    flow.submit_report("Ops@Fleet.Example", true).await.expect("report");
    assert_eq!(flow.stage(), WorkflowStage::DeliveryFailed);
    assert_eq!(
        flow.delivery_state(),
        Some(ReportDeliveryState { sent: false, retry_in_flight: false })
    );

    let resent = flow.resend().await.expect("resend");

    assert_eq!(resent, DeliveryOutcome::Sent);
    assert_eq!(flow.stage(), WorkflowStage::Delivered);
    assert_eq!(
        flow.delivery_state(),
        Some(ReportDeliveryState { sent: true, retry_in_flight: false })
    );
    let state = flow.state();
    let session = state.report_session().expect("session");
    assert_eq!(session.contact.as_str(), "ops@fleet.example");
    assert_eq!(reports.resend_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delivered_report_reaches_delivered_directly() {
    let flow = workflow(
        ScriptedFetcher::answering(scenario_a_scores()),
        ScriptedReports::new(Ok(true), Vec::new()),
    );

    flow.submit_lookup("MC 123456").await.expect("lookup");
    flow.submit_report("ops@fleet.example", true).await.expect("report");

    assert_eq!(flow.stage(), WorkflowStage::Delivered);
    assert_eq!(flow.delivery_state().map(|state| state.sent), Some(true));
}

#[tokio::test]
async fn generation_failure_returns_to_preview_with_profile() {
    let flow = workflow(
        ScriptedFetcher::answering(scenario_a_scores()),
        ScriptedReports::new(Err(GatewayError::Transport("502 bad gateway".to_owned())), Vec::new()),
    );

    flow.submit_lookup("MC 123456").await.expect("lookup");
    flow.submit_report("ops@fleet.example", true).await.expect("report settles");

    let state = flow.state();
    assert_eq!(state.stage(), WorkflowStage::Preview);
    assert!(state.error().is_some_and(|error| error.contains("502 bad gateway")));
    assert!(state.profile().is_some());
    assert!(flow.delivery_state().is_none());
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_request() {
    let fetcher = ScriptedFetcher::answering(scenario_a_scores());
    let flow = workflow(fetcher.clone(), ScriptedReports::new(Ok(true), Vec::new()));

    assert_eq!(
        flow.submit_lookup("   ").await,
        Err(DomainError::Input(InputError::EmptyCarrierIdentifier))
    );
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(flow.stage(), WorkflowStage::Idle);

    flow.submit_lookup("MC 123456").await.expect("lookup");
    assert_eq!(
        flow.submit_report("", true).await,
        Err(DomainError::Input(InputError::EmptyContactAddress))
    );
    assert_eq!(
        flow.submit_report("ops@fleet.example", false).await,
        Err(DomainError::Input(InputError::ConsentRequired))
    );
    assert!(matches!(
        flow.submit_report("not-an-email", true).await,
        Err(DomainError::Input(InputError::MalformedContactAddress(_)))
    ));
    assert_eq!(flow.stage(), WorkflowStage::Preview);
}

#[tokio::test]
async fn duplicate_lookup_while_searching_is_ignored() {
    let fetcher = ScriptedFetcher::gated(scenario_a_scores());
    let flow = workflow(fetcher.clone(), ScriptedReports::new(Ok(true), Vec::new()));

    let first = {
        let flow = Arc::clone(&flow);
        tokio::spawn(async move { flow.submit_lookup("MC 123456").await })
    };
    wait_for_stage(&flow, WorkflowStage::Searching).await;

    let duplicate = flow.submit_lookup("MC 654321").await.expect("duplicate");
    assert_eq!(duplicate, StepOutcome::AlreadyInFlight(WorkflowStage::Searching));

    fetcher.release();
    let settled = first.await.expect("join").expect("lookup");
    assert!(matches!(settled, StepOutcome::Completed(WorkflowState::Preview { .. })));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        flow.state().preview().map(|preview| preview.identifier.as_str().to_owned()),
        Some("MC 123456".to_owned())
    );
}

#[tokio::test]
async fn result_arriving_after_reset_is_discarded() {
    let fetcher = ScriptedFetcher::gated(scenario_a_scores());
    let flow = workflow(fetcher.clone(), ScriptedReports::new(Ok(true), Vec::new()));

    let pending = {
        let flow = Arc::clone(&flow);
        tokio::spawn(async move { flow.submit_lookup("MC 123456").await })
    };
    wait_for_stage(&flow, WorkflowStage::Searching).await;

    assert_eq!(flow.reset(), WorkflowState::Idle { error: None });
    fetcher.release();

    assert_eq!(pending.await.expect("join"), Ok(StepOutcome::Superseded));
    assert_eq!(flow.state(), WorkflowState::Idle { error: None });
}

#[tokio::test]
async fn duplicate_report_while_generating_is_ignored() {
    let reports = ScriptedReports::gated_generation(Ok(true));
    let flow = workflow(ScriptedFetcher::answering(scenario_a_scores()), reports.clone());
    flow.submit_lookup("MC 123456").await.expect("lookup");

    let first = {
        let flow = Arc::clone(&flow);
        tokio::spawn(async move { flow.submit_report("ops@fleet.example", true).await })
    };
    wait_for_stage(&flow, WorkflowStage::ReportGenerating).await;

    let duplicate = flow.submit_report("ops@fleet.example", true).await.expect("duplicate");
    assert_eq!(duplicate, StepOutcome::AlreadyInFlight(WorkflowStage::ReportGenerating));

    reports.release_generation();
    let settled = first.await.expect("join").expect("report");
    assert!(matches!(settled, StepOutcome::Completed(WorkflowState::Delivered(_))));
    assert_eq!(reports.generation_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn report_arriving_after_reset_and_new_lookup_is_discarded() {
    let reports = ScriptedReports::gated_generation(Ok(true));
    let flow = workflow(ScriptedFetcher::answering(scenario_a_scores()), reports.clone());
    flow.submit_lookup("MC 123456").await.expect("lookup");

    let pending = {
        let flow = Arc::clone(&flow);
        tokio::spawn(async move { flow.submit_report("ops@fleet.example", true).await })
    };
    wait_for_stage(&flow, WorkflowStage::ReportGenerating).await;

    flow.reset();
    flow.submit_lookup("MC 654321").await.expect("second lookup");
    reports.release_generation();

    assert_eq!(pending.await.expect("join"), Ok(StepOutcome::Superseded));
    let state = flow.state();
    assert_eq!(state.stage(), WorkflowStage::Preview);
    assert_eq!(state.preview().map(|preview| preview.identifier.as_str()), Some("MC 654321"));
    assert!(flow.delivery_state().is_none());
}

#[tokio::test]
async fn resend_finishing_after_reset_leaves_the_new_report_alone() {
    let reports = ScriptedReports::gated_resend(Ok(true), vec![false]);
    let flow = workflow(ScriptedFetcher::answering(scenario_a_scores()), reports.clone());
    flow.submit_lookup("MC 123456").await.expect("lookup");
    flow.submit_report("ops@fleet.example", true).await.expect("report");

    let stale = {
        let flow = Arc::clone(&flow);
        tokio::spawn(async move { flow.resend().await })
    };
    while !flow.delivery_state().is_some_and(|state| state.retry_in_flight) {
        tokio::task::yield_now().await;
    }

    flow.reset();
    flow.submit_lookup("MC 654321").await.expect("second lookup");
    flow.submit_report("dispatch@fleet.example", true).await.expect("second report");
    assert_eq!(
        flow.delivery_state(),
        Some(ReportDeliveryState { sent: true, retry_in_flight: false })
    );

    reports.release_resend();
    let outcome = stale.await.expect("join").expect("stale resend settles");

    assert!(matches!(outcome, DeliveryOutcome::NotSent { .. }));
    assert_eq!(flow.stage(), WorkflowStage::Delivered);
    assert_eq!(
        flow.delivery_state(),
        Some(ReportDeliveryState { sent: true, retry_in_flight: false })
    );
    assert_eq!(
        flow.state().report_session().map(|session| session.contact.as_str().to_owned()),
        Some("dispatch@fleet.example".to_owned())
    );
}

#[tokio::test]
async fn reset_discards_profile_and_report() {
    let flow = workflow(
        ScriptedFetcher::answering(scenario_a_scores()),
        ScriptedReports::new(Ok(true), Vec::new()),
    );

    flow.submit_lookup("MC 123456").await.expect("lookup");
    flow.submit_report("ops@fleet.example", true).await.expect("report");
    assert_eq!(flow.stage(), WorkflowStage::Delivered);

    let state = flow.reset();

    assert_eq!(state, WorkflowState::Idle { error: None });
    assert!(flow.state().profile().is_none());
    assert!(flow.delivery_state().is_none());
    assert_eq!(
        flow.resend().await,
        Err(DomainError::Delivery(DeliveryError::NoReport { stage: WorkflowStage::Idle }))
    );
}

#[tokio::test]
async fn resend_while_retry_in_flight_is_a_no_op() {
    let reports = ScriptedReports::gated_resend(Ok(false), vec![true]);
    let flow = workflow(ScriptedFetcher::answering(scenario_a_scores()), reports.clone());
    flow.submit_lookup("MC 123456").await.expect("lookup");
    flow.submit_report("ops@fleet.example", true).await.expect("report");

    let first = {
        let flow = Arc::clone(&flow);
        tokio::spawn(async move { flow.resend().await })
    };
    while !flow.delivery_state().is_some_and(|state| state.retry_in_flight) {
        tokio::task::yield_now().await;
    }

    assert_eq!(flow.resend().await, Ok(DeliveryOutcome::RetryInFlight));
    assert_eq!(reports.resend_calls.load(Ordering::SeqCst), 1);

    reports.release_resend();
    assert_eq!(first.await.expect("join"), Ok(DeliveryOutcome::Sent));
    assert_eq!(
        flow.delivery_state(),
        Some(ReportDeliveryState { sent: true, retry_in_flight: false })
    );
    assert_eq!(flow.stage(), WorkflowStage::Delivered);
}

#[tokio::test]
async fn resend_before_any_report_is_rejected() {
    let flow = workflow(
        ScriptedFetcher::answering(scenario_a_scores()),
        ScriptedReports::new(Ok(true), Vec::new()),
    );
    flow.submit_lookup("MC 123456").await.expect("lookup");

    assert_eq!(
        flow.resend().await,
        Err(DomainError::Delivery(DeliveryError::NoReport { stage: WorkflowStage::Preview }))
    );
}

#[tokio::test]
async fn transitions_are_written_to_the_audit_sink() {
    let sink = InMemoryAuditSink::default();
    let flow = LookupWorkflow::new(
        ScriptedFetcher::answering(scenario_a_scores()),
        ScriptedReports::new(Ok(true), Vec::new()),
    )
    .with_audit_sink(Arc::new(sink.clone()));

    flow.submit_lookup("MC 123456").await.expect("lookup");
    flow.reset();

    let events = sink.events();
    assert_eq!(
        sink.event_types(),
        vec!["lookup.transition_applied".to_owned(); 3],
        "submit, success and reset"
    );
    assert!(events.iter().all(|event| event.workflow_id == flow.id()));
    assert_eq!(events[0].carrier.as_ref().map(|id| id.as_str()), Some("MC 123456"));
}
