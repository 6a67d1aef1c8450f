mod bridge;
mod calc;
mod db;
mod ipc;
mod logging;
mod reportcard;
mod roster;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Roster file the web bridge expects next to the workspace database.
const DEFAULT_ROSTER_FILE: &str = "sample_se1.csv";

#[derive(Parser)]
#[command(
    name = "resultd",
    version,
    about = "Student result calculation sidecar (JSON lines on stdin/stdout)"
)]
struct Cli {
    /// Workspace directory holding results.sqlite3.
    #[arg(long)]
    workspace: Option<PathBuf>,
    /// Classmate roster CSV (PRN,Name,Percentage) to load at startup.
    #[arg(long)]
    roster: Option<PathBuf>,
    /// Answer one pipe-delimited bridge command read from stdin, then exit.
    #[arg(long)]
    web: bool,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut state = ipc::AppState::new();

    let workspace = match (&cli.workspace, cli.web) {
        (Some(p), _) => Some(p.clone()),
        (None, true) => Some(PathBuf::from(".")),
        (None, false) => None,
    };
    if let Some(ws) = &workspace {
        state
            .select_workspace(ws)
            .with_context(|| format!("failed to open workspace {}", ws.display()))?;
    }

    match (&cli.roster, &workspace) {
        (Some(path), _) => {
            state
                .load_roster(path)
                .with_context(|| format!("failed to load roster {}", path.display()))?;
        }
        (None, Some(ws)) if cli.web => load_default_roster(&mut state, ws),
        _ => {}
    }

    if cli.web {
        return serve_bridge_command(&mut state);
    }
    serve_lines(&mut state)
}

fn load_default_roster(state: &mut ipc::AppState, workspace: &Path) {
    let path = workspace.join(DEFAULT_ROSTER_FILE);
    if !path.is_file() {
        return;
    }
    if let Err(e) = state.load_roster(&path) {
        tracing::warn!(path = %path.display(), error = %e, "default roster not loaded");
    }
}

fn serve_bridge_command(state: &mut ipc::AppState) -> anyhow::Result<()> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read command")?;

    let out = bridge::run_command(state, &line);
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", out)?;
    stdout.flush()?;
    Ok(())
}

fn serve_lines(state: &mut ipc::AppState) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                writeln!(stdout, "{}", resp)?;
                stdout.flush()?;
                continue;
            }
        };

        let resp = ipc::handle_request(state, req);
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }
    Ok(())
}
