//! Single-shot command mode used by the web bridge.
//!
//! The bridge spawns `resultd --web`, writes one pipe-delimited command to
//! stdin and relays whatever JSON comes back:
//!
//! ```text
//! ADD|PRN|Name|CourseCount|Code1|Name1|Marks1|Max1|...
//! GET_ALL
//! SEARCH|PRN
//! CLASSMATE|PRN
//! STATS
//! ```
//!
//! Commands are translated to regular IPC requests, so both modes share the
//! same handlers. Only the response shapes differ.

use crate::calc::Course;
use crate::ipc::{self, AppState, Request};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("Invalid command format")]
    InvalidFormat,
    #[error("Invalid course count")]
    InvalidCourseCount,
    #[error("Invalid course count format")]
    CourseCountFormat,
    #[error("Missing course data")]
    MissingCourseData,
    #[error("Invalid marks format")]
    MarksFormat,
    #[error("Invalid command")]
    UnknownCommand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    Add {
        prn: String,
        name: String,
        courses: Vec<Course>,
    },
    GetAll,
    Search(String),
    Classmate(String),
    Stats,
}

pub fn parse_command(line: &str) -> Result<BridgeCommand, BridgeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let parts: Vec<&str> = line.split('|').collect();
    match parts[0] {
        "ADD" => parse_add(&parts),
        "GET_ALL" => Ok(BridgeCommand::GetAll),
        "STATS" => Ok(BridgeCommand::Stats),
        "SEARCH" => single_arg(line).map(BridgeCommand::Search),
        "CLASSMATE" => single_arg(line).map(BridgeCommand::Classmate),
        _ => Err(BridgeError::UnknownCommand),
    }
}

/// Everything after the first `|`, so a PRN may itself contain pipes.
fn single_arg(line: &str) -> Result<String, BridgeError> {
    match line.split_once('|') {
        Some((_, arg)) if !arg.trim().is_empty() => Ok(arg.trim().to_string()),
        _ => Err(BridgeError::InvalidFormat),
    }
}

fn parse_add(parts: &[&str]) -> Result<BridgeCommand, BridgeError> {
    if parts.len() < 4 {
        return Err(BridgeError::InvalidFormat);
    }
    let count: i64 = parts[3]
        .trim()
        .parse()
        .map_err(|_| BridgeError::CourseCountFormat)?;
    if count <= 0 {
        return Err(BridgeError::InvalidCourseCount);
    }
    // Bound the count by the fields actually present before sizing anything.
    let available = (parts.len() - 4) / 4;
    let count = match usize::try_from(count) {
        Ok(n) if n <= available => n,
        _ => return Err(BridgeError::MissingCourseData),
    };

    let courses = parts[4..4 + count * 4]
        .chunks(4)
        .map(|chunk| {
            let marks = parse_mark(chunk[2])?;
            let max = parse_mark(chunk[3])?;
            Ok(Course::new(chunk[0], chunk[1], marks, max))
        })
        .collect::<Result<Vec<_>, BridgeError>>()?;

    Ok(BridgeCommand::Add {
        prn: parts[1].to_string(),
        name: parts[2].to_string(),
        courses,
    })
}

fn parse_mark(raw: &str) -> Result<f64, BridgeError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(BridgeError::MarksFormat),
    }
}

fn error_body(message: impl Into<String>) -> serde_json::Value {
    json!({ "error": message.into() })
}

fn error_code(resp: &serde_json::Value) -> Option<&str> {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn error_message(resp: &serde_json::Value) -> String {
    resp.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or("Data processing error")
        .to_string()
}

fn dispatch(state: &mut AppState, method: &str, params: serde_json::Value) -> serde_json::Value {
    ipc::handle_request(
        state,
        Request {
            id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            params,
        },
    )
}

fn is_ok(resp: &serde_json::Value) -> bool {
    resp.get("ok").and_then(|v| v.as_bool()) == Some(true)
}

fn result_of(resp: serde_json::Value) -> serde_json::Value {
    resp.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Run one bridge command and build the JSON document to print.
pub fn run_command(state: &mut AppState, line: &str) -> serde_json::Value {
    let cmd = match parse_command(line) {
        Ok(c) => c,
        Err(e) => return error_body(e.to_string()),
    };

    match cmd {
        BridgeCommand::Add { prn, name, courses } => {
            let resp = dispatch(
                state,
                "students.add",
                json!({ "prn": prn, "name": name, "courses": courses }),
            );
            if is_ok(&resp) {
                return result_of(resp);
            }
            match error_code(&resp) {
                Some("invalid_input") => error_body("Invalid marks range"),
                Some("bad_params") => error_body(BridgeError::InvalidFormat.to_string()),
                _ => error_body(error_message(&resp)),
            }
        }
        BridgeCommand::GetAll => {
            let resp = dispatch(state, "students.list", json!({}));
            if !is_ok(&resp) {
                return error_body(error_message(&resp));
            }
            result_of(resp)
                .get("students")
                .cloned()
                .unwrap_or_else(|| json!([]))
        }
        BridgeCommand::Search(prn) => {
            let resp = dispatch(state, "students.search", json!({ "prn": prn }));
            if is_ok(&resp) {
                return result_of(resp);
            }
            match error_code(&resp) {
                Some("not_found") => error_body("Student not found"),
                _ => error_body(error_message(&resp)),
            }
        }
        BridgeCommand::Classmate(prn) => {
            let resp = dispatch(state, "roster.classmate", json!({ "prn": prn }));
            if !is_ok(&resp) {
                return json!({ "success": false, "error": "PRN not found" });
            }
            let mut body = result_of(resp);
            body["success"] = json!(true);
            body
        }
        BridgeCommand::Stats => {
            let resp = dispatch(state, "roster.stats", json!({}));
            if is_ok(&resp) {
                result_of(resp)
            } else {
                error_body(error_message(&resp))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_courses() {
        let cmd = parse_command("ADD|se01|Asha Rao|2|CS101|Programming|80|100|MA101|Maths|45|50\n")
            .expect("parse");
        let BridgeCommand::Add { prn, name, courses } = cmd else {
            panic!("expected ADD");
        };
        assert_eq!(prn, "se01");
        assert_eq!(name, "Asha Rao");
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[1], Course::new("MA101", "Maths", 45.0, 50.0));
    }

    #[test]
    fn add_errors_match_bridge_strings() {
        let cases = [
            ("ADD|X|Y", BridgeError::InvalidFormat),
            ("ADD|X|Y|0", BridgeError::InvalidCourseCount),
            ("ADD|X|Y|-2", BridgeError::InvalidCourseCount),
            ("ADD|X|Y|two", BridgeError::CourseCountFormat),
            ("ADD|X|Y|2|A|a|1|2", BridgeError::MissingCourseData),
            ("ADD|X|Y|1|A|a|ten|20", BridgeError::MarksFormat),
            ("ADD|X|Y|5000000000000000000", BridgeError::MissingCourseData),
            ("ADD|X|Y|9223372036854775807", BridgeError::MissingCourseData),
            ("ADD|X|Y|4611686018427387904|A|a|1|2", BridgeError::MissingCourseData),
        ];
        for (line, want) in cases {
            assert_eq!(parse_command(line), Err(want), "{line}");
        }
        assert_eq!(
            BridgeError::MissingCourseData.to_string(),
            "Missing course data"
        );
    }

    #[test]
    fn parses_lookups() {
        assert_eq!(parse_command("GET_ALL"), Ok(BridgeCommand::GetAll));
        assert_eq!(parse_command("STATS\r\n"), Ok(BridgeCommand::Stats));
        assert_eq!(
            parse_command("SEARCH|prn001"),
            Ok(BridgeCommand::Search("prn001".into()))
        );
        assert_eq!(
            parse_command("CLASSMATE|SE2301"),
            Ok(BridgeCommand::Classmate("SE2301".into()))
        );
        assert_eq!(parse_command("SEARCH|"), Err(BridgeError::InvalidFormat));
        assert_eq!(parse_command("DELETE|X"), Err(BridgeError::UnknownCommand));
        assert_eq!(parse_command(""), Err(BridgeError::UnknownCommand));
    }

    #[test]
    fn run_command_without_roster_reports_missing_prn() {
        let mut state = AppState::new();
        let out = run_command(&mut state, "CLASSMATE|SE1");
        assert_eq!(out["success"], json!(false));
        assert_eq!(out["error"], json!("PRN not found"));
    }

    #[test]
    fn run_command_add_search_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut state = AppState::new();
        state.select_workspace(dir.path()).expect("workspace");

        let added = run_command(&mut state, "ADD|prn7|Isha Desai|1|CS101|Programming|45|50");
        assert_eq!(added["prn"], json!("PRN7"));
        assert_eq!(added["percentage"], json!(90.0));
        assert_eq!(added["grade"], json!("A"));

        let found = run_command(&mut state, "SEARCH|Prn7");
        assert_eq!(found, added);

        let missing = run_command(&mut state, "SEARCH|nobody");
        assert_eq!(missing, json!({ "error": "Student not found" }));

        let bad = run_command(&mut state, "ADD|prn8|Over|1|CS101|Programming|60|50");
        assert_eq!(bad, json!({ "error": "Invalid marks range" }));

        let no_prn = run_command(&mut state, "ADD||Nameless|1|CS101|Programming|40|50");
        assert_eq!(no_prn, json!({ "error": "Invalid command format" }));

        let huge = run_command(&mut state, "ADD|X|Y|9223372036854775807");
        assert_eq!(huge, json!({ "error": "Missing course data" }));
    }
}
