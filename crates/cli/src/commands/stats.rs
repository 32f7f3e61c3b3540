use std::sync::Arc;

use carrier_risk_core::config::{AppConfig, LoadOptions};
use carrier_risk_core::fixtures::FixtureGateway;
use carrier_risk_core::services::{stats_or_default, StatsSource};
use carrier_risk_gateway::HttpGateway;
use serde::Serialize;

use crate::commands::{config_failure, current_thread_runtime, gateway_failure, CommandResult};

const COMMAND: &str = "stats";

#[derive(Debug, Serialize)]
struct StatsPayload {
    command: &'static str,
    status: &'static str,
    source: &'static str,
    checks_this_month: u64,
    total_checks: Option<u64>,
}

/// Never fails on an unreachable service; the configured fallback counter is printed instead.
pub fn run(options: LoadOptions, fixture: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return config_failure(COMMAND, error),
    };
    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let (source, label): (Arc<dyn StatsSource>, &'static str) = if fixture {
        (Arc::new(FixtureGateway::default()), "fixture")
    } else {
        match HttpGateway::new(&config.api) {
            Ok(gateway) => (Arc::new(gateway), "service"),
            Err(error) => return gateway_failure(COMMAND, error),
        }
    };

    let stats = runtime
        .block_on(stats_or_default(source.as_ref(), config.workflow.stats_fallback_checks));
    CommandResult::payload(
        0,
        &StatsPayload {
            command: COMMAND,
            status: "ok",
            source: label,
            checks_this_month: stats.checks_this_month,
            total_checks: stats.total_checks,
        },
    )
}
