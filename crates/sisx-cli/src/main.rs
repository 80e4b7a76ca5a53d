//! 🚀 sisx-cli: the front door. Reads the job name, loads config, runs it, reports.
//!
//! 🎬 *[narrator voice]* "It was 2am. The scheduler fired. Somewhere, an Oracle
//! listener sighed and opened one more cursor."
//! 📦 Thin on purpose: the library does the work, this binary picks the job,
//! wires up logging and turns errors into exit codes. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 📦 Nightly SIS extracts: Oracle → gzip → every configured S3 bucket.
#[derive(Parser, Debug)]
#[command(name = "sisx", version, about)]
struct Cli {
    /// Job to run: upload_advisors, upload_recent_refresh or upload_snapshot.
    #[arg(long, env = "JOB")]
    job: Option<String>,

    /// Dotenv file to layer into the config. Repeatable, later files win.
    #[arg(long = "dotenv", value_name = "PATH", default_values = sisx::app_config::DEFAULT_DOTENV_FILES)]
    dotenv_files: Vec<PathBuf>,
}

/// 🚀 main(), where it all begins. One thread, one job, one exit code.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // 📡 RUST_LOG if you've got opinions, info if you don't
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // 🎯 No job, no run. The scheduler forgot to tell us what to do.
    let Some(job_name) = cli.job.as_deref().map(str::trim).filter(|name| !name.is_empty()) else {
        error!("💀 No job specified, aborting. Pass --job or set JOB.");
        std::process::exit(1);
    };

    if let Err(err) = run(job_name, &cli.dotenv_files).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("dispatch failure")
                || cause_str.contains("error sending request")
                || cause_str.contains("Connection refused")
                || cause_str.contains("connection refused")
                || cause_str.contains("ORA-12541")
                || cause_str.contains("ORA-12170")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like something isn't reachable. \
                Check SISEDO_HOST/SISEDO_PORT for the database, and AWS_REGION or \
                AWS_ENDPOINT_URL for the buckets. VPNs have feelings too. ☕"
            );
        }

        std::process::exit(1);
    }
}

async fn run(job_name: &str, dotenv_files: &[PathBuf]) -> Result<()> {
    let config = sisx::app_config::load_config(dotenv_files)
        .context("💀 sisx-cli couldn't load its configuration. Check the dotenv files and the environment.")?;

    let summary = sisx::run(&config, job_name).await?;
    if summary.skipped {
        return Ok(());
    }

    // 🍽️ the receipt
    println!("{}", summary.render());
    info!(
        "🏁 {} done: {} row(s) in {} artifact(s)",
        summary.job,
        summary.total_rows(),
        summary.artifacts.len()
    );
    Ok(())
}
