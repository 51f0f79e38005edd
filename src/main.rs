//! Command-line entry point for docfetch.
//!
//! Exit status is 0 when the documentation is in place and 1 for usage
//! errors or any failed run.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docfetch::{
    Cli, Config, ExtractOutcome, FetchError, PackageRef, Report, Workflow, failure_hint,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version go to stdout and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.log_level());

    let package = cli.package();
    let config = cli.config();

    let result = match Workflow::new(config.clone()) {
        Ok(workflow) => workflow.run(&package).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            print_success(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_failure(&e, &package, &config);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `-q`/`-v`.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn print_success(report: &Report) {
    let dir = report.extract_dir.display();

    println!();
    if let ExtractOutcome::Degraded { reason } = &report.extraction {
        println!("Documentation archive could not be extracted: {reason}");
    } else {
        println!("Documentation ready!");
    }
    println!("Location: {dir}");
    println!();
    println!("To view locally:");
    println!("   cd \"{dir}\"");
    println!("   python -m http.server 8000");
    println!("   # Then visit: http://localhost:8000");
}

fn print_failure(err: &FetchError, package: &PackageRef, config: &Config) {
    eprintln!("Error: {err}");

    if let Some(hint) = failure_hint(err, &package.name, &config.docs_site) {
        eprintln!();
        eprintln!("{hint}");
    }
}
