use crate::calc;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::reportcard;
use serde_json::json;
use std::path::PathBuf;

/// Load a legacy `reportcards.txt` into the workspace. Records whose courses
/// fail validation are skipped and reported back by PRN.
fn handle_reportcards_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = match reportcard::read_report_cards(&PathBuf::from(&path)) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": path })),
            )
        }
    };

    let mut imported = 0usize;
    let mut skipped: Vec<String> = Vec::new();
    for r in &records {
        let valid = r
            .courses
            .iter()
            .all(|c| calc::validate_course(c, state.grading.allow_bonus_marks).is_ok());
        if !valid {
            skipped.push(r.id.clone());
            continue;
        }
        if let Err(e) = db::student_upsert(conn, r) {
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "prn": r.id, "imported": imported })),
            );
        }
        imported += 1;
    }

    ok(
        &req.id,
        json!({
            "imported": imported,
            "skipped": skipped,
        }),
    )
}

fn handle_reportcards_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = match db::students_list(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    match reportcard::write_report_cards(&PathBuf::from(&path), &records, &state.grading.scale) {
        Ok(n) => ok(&req.id, json!({ "exported": n, "path": path })),
        Err(e) => err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": path })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reportcards.import" => Some(handle_reportcards_import(state, req)),
        "reportcards.export" => Some(handle_reportcards_export(state, req)),
        _ => None,
    }
}
