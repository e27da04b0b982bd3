mod backup;
mod calc;
mod db;
mod ipc;
mod listing;
mod model;
mod pastdue;
mod schedule;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CLASSTRACKD_LOG";

/// Class and assignment tracker sidecar. Reads one JSON request per line on
/// stdin and writes one JSON response per line on stdout.
#[derive(Parser)]
#[command(name = "classtrackd", version, about)]
struct Cli {
    /// Workspace directory to open at startup
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Log filter, e.g. "info" or "classtrackd=debug" (overrides CLASSTRACKD_LOG)
    #[arg(long)]
    log: Option<String>,
}

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // stdout carries responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let mut state = ipc::AppState::default();
    if let Some(path) = cli.workspace.as_deref() {
        if let Err(e) = ipc::select_workspace(&mut state, path) {
            tracing::error!(workspace = %path.display(), error = %e, "failed to open workspace");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => {
                tracing::debug!(id = %req.id, method = %req.method, "request");
                ipc::handle_request(&mut state, req)
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                ipc::bad_json(e.to_string())
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
