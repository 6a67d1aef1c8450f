use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_resultd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn resultd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = tempfile::tempdir().expect("temp dir");
    let out_dir = tempfile::tempdir().expect("temp dir");
    let cards_out = out_dir.path().join("reportcards.txt");
    let roster = fixture_path("fixtures/sample_se1.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "grading.compute",
        json!({ "courses": [{ "code": "A", "name": "a", "marksObtained": 1, "maxMarks": 2 }] }),
    );
    let _ = request(&mut stdin, &mut reader, "4", "grading.config.get", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "5",
        "grading.config.set",
        json!({ "allowBonusMarks": false }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "6",
        "students.add",
        json!({
            "prn": "smoke1",
            "name": "Smoke Student",
            "courses": [{ "code": "CS101", "name": "Programming", "marks": 70, "maxMarks": 100 }]
        }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "7",
        "students.search",
        json!({ "prn": "SMOKE1" }),
    );
    let _ = request(&mut stdin, &mut reader, "8", "students.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "9",
        "roster.load",
        json!({ "path": roster.to_string_lossy() }),
    );
    let _ = request(&mut stdin, &mut reader, "10", "roster.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "11",
        "roster.classmate",
        json!({ "prn": "SE2301" }),
    );
    let _ = request(&mut stdin, &mut reader, "12", "roster.stats", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "13",
        "reportcards.export",
        json!({ "path": cards_out.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "14",
        "reportcards.import",
        json!({ "path": cards_out.to_string_lossy() }),
    );

    let health = request(&mut stdin, &mut reader, "15", "health", json!({}));
    assert_eq!(health["result"]["rosterLoaded"], json!(true));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_method_and_bad_json_are_reported() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(v["ok"], json!(false));
    assert_eq!(v["error"]["code"], json!("bad_json"));

    writeln!(
        stdin,
        "{}",
        json!({ "id": "x", "method": "students.delete", "params": {} })
    )
    .expect("write");
    stdin.flush().expect("flush");
    line.clear();
    reader.read_line(&mut line).expect("read");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(v["id"], json!("x"));
    assert_eq!(v["error"]["code"], json!("not_implemented"));

    drop(stdin);
    let _ = child.wait();
}
