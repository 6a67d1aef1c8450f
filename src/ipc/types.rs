use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;

use crate::calc::GradingConfig;
use crate::db;
use crate::roster::{self, Roster};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Per-process session state. Handlers receive it explicitly; nothing here
/// is global.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub roster: Option<Roster>,
    pub grading: GradingConfig,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        // A bad stored config must not keep the workspace from opening.
        self.grading = match db::load_grading_config(&conn) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring stored grading config");
                GradingConfig::default()
            }
        };
        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        tracing::info!(workspace = %path.display(), "workspace selected");
        Ok(())
    }

    pub fn load_roster(&mut self, path: &Path) -> anyhow::Result<usize> {
        let roster = roster::load_roster(path)?;
        let count = roster.len();
        self.roster = Some(roster);
        tracing::info!(path = %path.display(), count, "roster loaded");
        Ok(count)
    }
}
