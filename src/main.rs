// src/main.rs

use std::process::ExitCode;

use sitedag::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("sitedag error: {err:?}");
        return ExitCode::from(1);
    }

    match run(args).await {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(report)) if report.is_success() => ExitCode::SUCCESS,
        Ok(Some(_)) => ExitCode::from(1),
        Err(err) if err.is_validation() => {
            eprintln!("sitedag: {err}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("sitedag error: {err:?}");
            ExitCode::from(1)
        }
    }
}
