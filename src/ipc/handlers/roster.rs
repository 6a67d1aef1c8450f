use crate::calc;
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::helpers::{required_str, roster};
use crate::ipc::types::{AppState, Request};
use crate::roster::ClassmateView;
use serde_json::json;
use std::path::PathBuf;

fn handle_roster_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.load_roster(&PathBuf::from(&path)) {
        Ok(count) => ok(&req.id, json!({ "count": count })),
        Err(e) => err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": path })),
        ),
    }
}

fn handle_roster_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = match roster(state, req) {
        Ok(r) => r,
        Err(e) => return e,
    };
    let entries: Vec<ClassmateView> = roster
        .entries()
        .iter()
        .map(|e| ClassmateView::new(e, &state.grading.scale))
        .collect();
    ok(&req.id, json!({ "entries": entries }))
}

fn handle_roster_classmate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = match roster(state, req) {
        Ok(r) => r,
        Err(e) => return e,
    };
    let prn = match required_str(req, "prn") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match roster.find(&prn) {
        Some(entry) => ok(&req.id, json!(ClassmateView::new(entry, &state.grading.scale))),
        None => err(
            &req.id,
            "not_found",
            "PRN not found",
            Some(json!({ "prn": calc::normalize_id(&prn) })),
        ),
    }
}

fn handle_roster_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = match roster(state, req) {
        Ok(r) => r,
        Err(e) => return e,
    };
    let pass_mark = state.grading.scale.pass_mark();
    match calc::roster_statistics(roster.entries(), pass_mark) {
        Ok(stats) => {
            let mut v = json!(stats);
            v["passMark"] = json!(pass_mark);
            ok(&req.id, v)
        }
        Err(e) => calc_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.load" => Some(handle_roster_load(state, req)),
        "roster.list" => Some(handle_roster_list(state, req)),
        "roster.classmate" => Some(handle_roster_classmate(state, req)),
        "roster.stats" => Some(handle_roster_stats(state, req)),
        _ => None,
    }
}
