pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use carrier_risk_core::config::{AppConfig, LoadOptions, LoggingConfig};
use clap::{Args, Parser, Subcommand};

use crate::commands::check::CheckRequest;

#[derive(Debug, Parser)]
#[command(
    name = "carrier-risk",
    about = "Carrier safety risk lookup CLI",
    long_about = "Look up a carrier's safety profile, derive its risk assessment, and request the emailed report.",
    after_help = "Examples:\n  carrier-risk check MC-884512 --fixture\n  carrier-risk check 2233445 --email ops@example.com --consent\n  carrier-risk config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a carrier-risk.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Look up a carrier, print its risk assessment, optionally request the report")]
    Check(CheckArgs),
    #[command(about = "Print the public checks-this-month counter")]
    Stats {
        #[arg(long, help = "Use the deterministic in-process data source")]
        fixture: bool,
    },
    #[command(
        about = "Read carrier numbers from stdin and print a debounced preview for each settled one"
    )]
    Watch {
        #[arg(long, help = "Use the deterministic in-process data source")]
        fixture: bool,
    },
    #[command(about = "List the seven BASIC categories with their intervention thresholds")]
    Categories,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(help = "MC or DOT number, with or without prefix")]
    carrier: String,
    #[arg(long, help = "Email address that receives the full report")]
    email: Option<String>,
    #[arg(long, requires = "email", help = "Confirm consent to be contacted about the report")]
    consent: bool,
    #[arg(long, requires = "email", help = "Resend once if the first email delivery failed")]
    resend: bool,
    #[arg(long, help = "Use the deterministic in-process data source")]
    fixture: bool,
    #[arg(long, requires = "fixture", help = "Make the fixture's first email delivery fail")]
    fail_delivery: bool,
}

impl CheckArgs {
    fn into_request(self) -> CheckRequest {
        CheckRequest {
            carrier: self.carrier,
            email: self.email,
            consent: self.consent,
            resend: self.resend,
            fixture: self.fixture,
            fail_delivery: self.fail_delivery,
        }
    }
}

fn init_logging(config: &LoggingConfig) {
    use carrier_risk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    // stdout carries the command payload.
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);
    let installed = match config.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    // Config errors are reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Check(args) => commands::check::run(options, args.into_request()),
        Command::Stats { fixture } => commands::stats::run(options, fixture),
        Command::Watch { fixture } => commands::watch::run(options, fixture),
        Command::Categories => commands::categories::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
