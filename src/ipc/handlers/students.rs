use crate::calc::{normalize_id, StudentRecord};
use crate::db;
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::helpers::{db_conn, parse_courses, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_students_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let prn = match required_str(req, "prn") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let courses = match parse_courses(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let record = StudentRecord::new(&prn, &name, courses);
    // Compute before writing so a failing record is never stored.
    let view = match record.view(&state.grading.scale) {
        Ok(v) => v,
        Err(e) => return calc_err(&req.id, &e),
    };
    if let Err(e) = db::student_upsert(conn, &record) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(&req.id, json!(view))
}

fn handle_students_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let prn = match required_str(req, "prn") {
        Ok(v) => normalize_id(&v),
        Err(e) => return e,
    };

    let record = match db::student_get(conn, &prn) {
        Ok(Some(r)) => r,
        Ok(None) => {
            return err(
                &req.id,
                "not_found",
                "student not found",
                Some(json!({ "prn": prn })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    match record.view(&state.grading.scale) {
        Ok(v) => ok(&req.id, json!(v)),
        Err(e) => calc_err(&req.id, &e),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let records = match db::students_list(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut students = Vec::with_capacity(records.len());
    for r in &records {
        match r.view(&state.grading.scale) {
            Ok(v) => students.push(v),
            Err(e) => tracing::warn!(prn = %r.id, error = %e, "skipping unreadable result"),
        }
    }

    ok(&req.id, json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.add" => Some(handle_students_add(state, req)),
        "students.search" => Some(handle_students_search(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        _ => None,
    }
}
