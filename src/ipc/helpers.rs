use rusqlite::Connection;

use crate::calc::{self, Course};
use crate::ipc::error::{calc_err, err};
use crate::ipc::types::{AppState, Request};
use crate::roster::Roster;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn roster<'a>(state: &'a AppState, req: &Request) -> Result<&'a Roster, serde_json::Value> {
    state
        .roster
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_roster", "load a roster first", None))
}

/// `params.courses`, shape-checked and validated against the active
/// bonus-marks policy. An empty list is passed through; the engine rejects it.
pub fn parse_courses(state: &AppState, req: &Request) -> Result<Vec<Course>, serde_json::Value> {
    let Some(raw) = req.params.get("courses") else {
        return Err(err(&req.id, "bad_params", "missing courses", None));
    };
    let courses: Vec<Course> = serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("courses must be a list of {{code, name, marksObtained, maxMarks}}: {e}"),
            None,
        )
    })?;
    for c in &courses {
        calc::validate_course(c, state.grading.allow_bonus_marks)
            .map_err(|e| calc_err(&req.id, &e))?;
    }
    Ok(courses)
}
