use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use carrier_risk_core::config::{AppConfig, LoadOptions};
use carrier_risk_core::fixtures::FixtureGateway;
use carrier_risk_core::flows::WorkflowState;
use carrier_risk_core::risk::RiskLevel;
use carrier_risk_core::services::{ReportService, SafetyProfileFetcher, StatsSource};
use carrier_risk_core::timing::{Debouncer, StatsPoller};
use carrier_risk_core::workflow::{LookupWorkflow, StepOutcome};
use carrier_risk_gateway::HttpGateway;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::commands::{config_failure, current_thread_runtime, CommandResult, EXIT_RUNTIME};

const COMMAND: &str = "watch";

#[derive(Debug, Serialize)]
struct PreviewLine<'a> {
    identifier: &'a str,
    stage: &'static str,
    legal_name: Option<&'a str>,
    risk_level: Option<RiskLevel>,
    flagged_count: Option<u32>,
    upstream_alert_count: Option<u32>,
    error: Option<&'a str>,
    checks_this_month: u64,
}

/// Reads carrier identifiers from stdin, one per line, and prints a preview for each
/// identifier that stays unchanged for the configured debounce period.
pub fn run(options: LoadOptions, fixture: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return config_failure(COMMAND, error),
    };
    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let outcome = runtime.block_on(session(&config, fixture));

    match outcome {
        Ok(previews) => CommandResult::success(COMMAND, format!("printed {previews} preview(s)")),
        Err(error) => CommandResult::failure(COMMAND, "runtime", format!("{error:#}"), EXIT_RUNTIME),
    }
}

async fn session(config: &AppConfig, fixture: bool) -> anyhow::Result<u32> {
    let (fetcher, reports, stats): (
        Arc<dyn SafetyProfileFetcher>,
        Arc<dyn ReportService>,
        Arc<dyn StatsSource>,
    ) = if fixture {
        let gateway = Arc::new(FixtureGateway::default());
        (gateway.clone(), gateway.clone(), gateway)
    } else {
        let gateway = Arc::new(HttpGateway::new(&config.api)?);
        (gateway.clone(), gateway.clone(), gateway)
    };

    let workflow = LookupWorkflow::new(fetcher, reports);
    let poller = StatsPoller::spawn(
        stats,
        Duration::from_secs(config.workflow.stats_poll_secs),
        config.workflow.stats_fallback_checks,
    );
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    drive(
        stdin,
        &mut stdout,
        &workflow,
        &poller,
        Duration::from_millis(config.workflow.lookup_debounce_ms),
    )
    .await
}

/// Returns the number of preview lines written. Stops at end of input or on Ctrl-C.
pub async fn drive<R, W>(
    input: R,
    out: &mut W,
    workflow: &LookupWorkflow,
    stats: &StatsPoller,
    quiet: Duration,
) -> anyhow::Result<u32>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let (mut debouncer, mut settled) = Debouncer::new(quiet);
    let mut lines = input.lines();
    let mut input_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut printed = 0;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("failed to read carrier identifiers from input")? {
                    Some(line) if !line.trim().is_empty() => {
                        debouncer.push(line.trim().to_owned());
                    }
                    Some(_) => {}
                    None => {
                        input_open = false;
                        debouncer.close();
                    }
                }
            }
            identifier = settled.recv() => match identifier {
                Some(identifier) => {
                    preview(out, workflow, stats, &identifier).await?;
                    printed += 1;
                }
                // Input ended and the last pending identifier has been previewed.
                None => break,
            },
            result = &mut shutdown => {
                result.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    Ok(printed)
}

async fn preview<W: Write>(
    out: &mut W,
    workflow: &LookupWorkflow,
    stats: &StatsPoller,
    identifier: &str,
) -> anyhow::Result<()> {
    workflow.reset();
    let state = match workflow.submit_lookup(identifier).await {
        Ok(StepOutcome::Completed(state)) => state,
        Ok(_) => workflow.state(),
        Err(error) => WorkflowState::Idle { error: Some(error.to_string()) },
    };

    let line = PreviewLine {
        identifier,
        stage: state.stage().as_str(),
        legal_name: state.profile().map(|profile| profile.identity.legal_name.as_str()),
        risk_level: state.preview().map(|preview| preview.assessment.risk_level),
        flagged_count: state.preview().map(|preview| preview.assessment.flagged_count),
        upstream_alert_count: state.preview().map(|preview| preview.assessment.upstream_alert_count),
        error: state.error(),
        checks_this_month: stats.latest().checks_this_month,
    };
    writeln!(out, "{}", serde_json::to_string(&line)?).context("failed to write preview")?;
    Ok(())
}
