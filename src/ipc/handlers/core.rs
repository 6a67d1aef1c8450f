use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "rosterLoaded": state.roster.is_some(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    if let Err(e) = state.select_workspace(&path) {
        return err(&req.id, "db_open_failed", format!("{e:?}"), None);
    }

    // Optional roster alongside the workspace; failure here is reported but
    // leaves the workspace open.
    let mut roster_count = None;
    if let Some(roster_path) = req.params.get("rosterPath").and_then(|v| v.as_str()) {
        match state.load_roster(&PathBuf::from(roster_path)) {
            Ok(n) => roster_count = Some(n),
            Err(e) => {
                return err(
                    &req.id,
                    "io_failed",
                    e.to_string(),
                    Some(json!({ "path": roster_path, "workspacePath": path.to_string_lossy() })),
                )
            }
        }
    }

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "rosterCount": roster_count,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
