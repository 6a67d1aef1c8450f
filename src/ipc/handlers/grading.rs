use crate::calc::{self, GradingConfig};
use crate::db;
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::helpers::parse_courses;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_grading_compute(state: &mut AppState, req: &Request) -> serde_json::Value {
    let courses = match parse_courses(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match calc::compute_result(&courses, &state.grading.scale) {
        Ok(out) => ok(
            &req.id,
            json!({
                "totalObtained": out.total_obtained,
                "totalMax": out.total_max,
                "percentage": calc::round_off_2_decimals(out.percentage),
                "percentageExact": out.percentage,
                "grade": out.grade.to_string(),
            }),
        ),
        Err(e) => calc_err(&req.id, &e),
    }
}

fn handle_grading_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "config": state.grading,
            "passMark": state.grading.scale.pass_mark(),
        }),
    )
}

fn handle_grading_config_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg: GradingConfig = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("expected {{scale, allowBonusMarks}}: {e}"),
                None,
            )
        }
    };
    if let Err(e) = cfg.scale.validate() {
        return calc_err(&req.id, &e);
    }

    // Without a workspace the policy applies to this session only.
    let mut persisted = false;
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = db::save_grading_config(conn, &cfg) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
        persisted = true;
    }
    state.grading = cfg;

    ok(
        &req.id,
        json!({
            "config": state.grading,
            "passMark": state.grading.scale.pass_mark(),
            "persisted": persisted,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grading.compute" => Some(handle_grading_compute(state, req)),
        "grading.config.get" => Some(handle_grading_config_get(state, req)),
        "grading.config.set" => Some(handle_grading_config_set(state, req)),
        _ => None,
    }
}
