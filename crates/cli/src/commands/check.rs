use std::sync::Arc;

use carrier_risk_core::audit::InMemoryAuditSink;
use carrier_risk_core::config::{AppConfig, LoadOptions};
use carrier_risk_core::delivery::{DeliveryOutcome, ReportDeliveryState};
use carrier_risk_core::domain::carrier::CarrierIdentity;
use carrier_risk_core::domain::profile::DataSource;
use carrier_risk_core::errors::{ApplicationError, DomainError};
use carrier_risk_core::fixtures::{DeliveryMode, FixtureGateway};
use carrier_risk_core::flows::{WorkflowStage, WorkflowState};
use carrier_risk_core::risk::RiskAssessment;
use carrier_risk_core::services::{ReportService, SafetyProfileFetcher};
use carrier_risk_core::workflow::{LookupWorkflow, StepOutcome};
use carrier_risk_gateway::HttpGateway;
use serde::Serialize;

use crate::commands::{
    config_failure, current_thread_runtime, gateway_failure, CommandResult, EXIT_DELIVERY,
    EXIT_INPUT, EXIT_LOOKUP, EXIT_REPORT, EXIT_RUNTIME,
};

const COMMAND: &str = "check";

#[derive(Clone, Debug, Default)]
pub struct CheckRequest {
    pub carrier: String,
    pub email: Option<String>,
    pub consent: bool,
    pub resend: bool,
    pub fixture: bool,
    pub fail_delivery: bool,
}

#[derive(Debug, Serialize)]
struct ReportSummary {
    email_sent: bool,
    ai_analysis: String,
}

#[derive(Debug, Serialize)]
struct CheckPayload {
    command: &'static str,
    status: &'static str,
    error_class: Option<&'static str>,
    message: String,
    workflow_id: String,
    stage: &'static str,
    carrier: Option<CarrierIdentity>,
    data_source: Option<DataSource>,
    assessment: Option<RiskAssessment>,
    report: Option<ReportSummary>,
    delivery: Option<ReportDeliveryState>,
    resend: Option<DeliveryOutcome>,
    audit_events: Vec<String>,
}

pub fn run(options: LoadOptions, request: CheckRequest) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return config_failure(COMMAND, error),
    };
    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    if request.fixture {
        let mode = match (request.fail_delivery, request.resend) {
            (false, _) => DeliveryMode::Deliver,
            (true, false) => DeliveryMode::Fail,
            (true, true) => DeliveryMode::FailThenDeliver,
        };
        let gateway = Arc::new(FixtureGateway::new(mode));
        return runtime.block_on(execute(&request, gateway.clone(), gateway));
    }

    match HttpGateway::new(&config.api) {
        Ok(gateway) => {
            let gateway = Arc::new(gateway);
            runtime.block_on(execute(&request, gateway.clone(), gateway))
        }
        Err(error) => gateway_failure(COMMAND, error),
    }
}

/// Drives one workflow session: lookup, then optionally report and a single resend.
pub async fn execute(
    request: &CheckRequest,
    fetcher: Arc<dyn SafetyProfileFetcher>,
    reports: Arc<dyn ReportService>,
) -> CommandResult {
    let audit = Arc::new(InMemoryAuditSink::default());
    let workflow = LookupWorkflow::new(fetcher, reports).with_audit_sink(audit.clone());

    let outcome = workflow.submit_lookup(&request.carrier).await;
    if let Err(result) = settled(outcome, workflow.id()) {
        return result;
    }

    let mut resend = None;
    if let Some(email) = request.email.as_deref() {
        if workflow.stage() == WorkflowStage::Preview {
            let outcome = workflow.submit_report(email, request.consent).await;
            if let Err(result) = settled(outcome, workflow.id()) {
                return result;
            }
        }
        if request.resend && workflow.stage() == WorkflowStage::DeliveryFailed {
            match workflow.resend().await {
                Ok(outcome) => resend = Some(outcome),
                Err(error) => return domain_failure(error, workflow.id()),
            }
        }
    }

    let state = workflow.state();
    let (exit_code, error_class, message) = classify_final(&state, request.email.is_some());
    let payload = CheckPayload {
        command: COMMAND,
        status: if exit_code == 0 { "ok" } else { "error" },
        error_class,
        message,
        workflow_id: workflow.id().to_owned(),
        stage: state.stage().as_str(),
        carrier: state.profile().map(|profile| profile.identity.clone()),
        data_source: state.profile().map(|profile| profile.data_source),
        assessment: state.preview().map(|preview| preview.assessment.clone()),
        report: state.report_session().map(|session| ReportSummary {
            email_sent: session.report.email_sent,
            ai_analysis: session.report.ai_analysis.clone(),
        }),
        delivery: workflow.delivery_state(),
        resend,
        audit_events: audit.event_types(),
    };
    CommandResult::payload(exit_code, &payload)
}

fn settled(
    outcome: Result<StepOutcome, DomainError>,
    workflow_id: &str,
) -> Result<(), CommandResult> {
    match outcome {
        Ok(StepOutcome::Completed(_)) => Ok(()),
        Ok(other) => Err(CommandResult::failure(
            COMMAND,
            "workflow",
            format!("request did not settle: {other:?}"),
            EXIT_RUNTIME,
        )),
        Err(error) => Err(domain_failure(error, workflow_id)),
    }
}

/// Rejected domain operations surface through the interface tier, keyed by the workflow id.
fn domain_failure(error: DomainError, workflow_id: &str) -> CommandResult {
    let (error_class, exit_code) = match error {
        DomainError::Input(_) => ("input_validation", EXIT_INPUT),
        _ => ("workflow", EXIT_RUNTIME),
    };
    let interface = ApplicationError::from(error).into_interface(workflow_id);
    CommandResult::interface_failure(COMMAND, error_class, &interface, exit_code)
}

fn classify_final(
    state: &WorkflowState,
    report_requested: bool,
) -> (u8, Option<&'static str>, String) {
    match state {
        WorkflowState::Idle { error: Some(error) } => {
            (EXIT_LOOKUP, Some("lookup_failed"), error.clone())
        }
        WorkflowState::Preview { error: Some(error), .. } if report_requested => {
            (EXIT_REPORT, Some("report_failed"), error.clone())
        }
        WorkflowState::DeliveryFailed(_) => (
            EXIT_DELIVERY,
            Some("delivery_failed"),
            "report generated but the email was not delivered; rerun with --resend".to_owned(),
        ),
        WorkflowState::Delivered(_) => (0, None, "report generated and emailed".to_owned()),
        _ => (0, None, "safety profile retrieved".to_owned()),
    }
}
