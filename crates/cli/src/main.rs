use std::process::ExitCode;

fn main() -> ExitCode {
    carrier_risk_cli::run()
}
