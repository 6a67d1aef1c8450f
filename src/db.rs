use crate::calc::{Course, GradingConfig, StudentRecord};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "results.sqlite3";
pub const GRADING_CONFIG_KEY: &str = "grading.config";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Percentage and grade are never stored; they are derived from these rows.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_courses(
            student_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            marks_obtained REAL NOT NULL,
            max_marks REAL NOT NULL,
            PRIMARY KEY(student_id, sort_order),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

/// Insert or replace a student's result. An existing PRN keeps its
/// `created_at` and has its course list replaced wholesale.
pub fn student_upsert(conn: &Connection, record: &StudentRecord) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO students(id, name, created_at, updated_at) VALUES(?1, ?2, ?3, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at",
        params![record.id, record.name, now],
    )
    .context("failed to upsert student")?;
    tx.execute(
        "DELETE FROM student_courses WHERE student_id = ?",
        [&record.id],
    )?;
    for (i, c) in record.courses.iter().enumerate() {
        tx.execute(
            "INSERT INTO student_courses(student_id, sort_order, code, name, marks_obtained, max_marks)
             VALUES(?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                i as i64,
                c.code,
                c.name,
                c.marks_obtained,
                c.max_marks
            ],
        )
        .context("failed to insert course")?;
    }
    tx.commit()?;
    Ok(())
}

pub fn student_get(conn: &Connection, id: &str) -> anyhow::Result<Option<StudentRecord>> {
    let name: Option<String> = conn
        .query_row("SELECT name FROM students WHERE id = ?", [id], |r| r.get(0))
        .optional()?;
    let Some(name) = name else {
        return Ok(None);
    };
    let courses = student_courses(conn, id)?;
    Ok(Some(StudentRecord {
        id: id.to_string(),
        name,
        courses,
    }))
}

pub fn students_list(conn: &Connection) -> anyhow::Result<Vec<StudentRecord>> {
    let mut stmt = conn.prepare("SELECT id, name FROM students ORDER BY id")?;
    let heads = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(heads.len());
    for (id, name) in heads {
        let courses = student_courses(conn, &id)?;
        out.push(StudentRecord { id, name, courses });
    }
    Ok(out)
}

fn student_courses(conn: &Connection, student_id: &str) -> anyhow::Result<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT code, name, marks_obtained, max_marks
         FROM student_courses
         WHERE student_id = ?
         ORDER BY sort_order",
    )?;
    let rows = stmt
        .query_map([student_id], |row| {
            Ok(Course {
                code: row.get(0)?,
                name: row.get(1)?,
                marks_obtained: row.get(2)?,
                max_marks: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value_json FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("setting {key} is invalid JSON"))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

/// Stored grading policy, or the default scale when none was saved.
pub fn load_grading_config(conn: &Connection) -> anyhow::Result<GradingConfig> {
    let Some(v) = settings_get_json(conn, GRADING_CONFIG_KEY)? else {
        return Ok(GradingConfig::default());
    };
    let cfg: GradingConfig =
        serde_json::from_value(v).context("stored grading config has the wrong shape")?;
    cfg.scale.validate()?;
    Ok(cfg)
}

pub fn save_grading_config(conn: &Connection, cfg: &GradingConfig) -> anyhow::Result<()> {
    settings_set_json(conn, GRADING_CONFIG_KEY, &serde_json::to_value(cfg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{GradeBand, GradeScale};

    #[test]
    fn upsert_replaces_courses_and_keeps_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = open_db(dir.path()).expect("open db");

        let first = StudentRecord::new(
            "prn1",
            "Asha",
            vec![
                Course::new("B", "Second listed first", 10.0, 20.0),
                Course::new("A", "Then this", 5.0, 10.0),
            ],
        );
        student_upsert(&conn, &first).expect("insert");
        let got = student_get(&conn, "PRN1").expect("get").expect("present");
        assert_eq!(got, first);

        let second = StudentRecord::new("PRN1", "Asha R", vec![Course::new("C", "c", 1.0, 2.0)]);
        student_upsert(&conn, &second).expect("update");
        let got = student_get(&conn, "PRN1").expect("get").expect("present");
        assert_eq!(got.name, "Asha R");
        assert_eq!(got.courses.len(), 1);

        assert!(student_get(&conn, "MISSING").expect("get").is_none());
    }

    #[test]
    fn list_is_ordered_by_id() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = open_db(dir.path()).expect("open db");
        for id in ["P3", "P1", "P2"] {
            let r = StudentRecord::new(id, "x", vec![Course::new("A", "a", 1.0, 1.0)]);
            student_upsert(&conn, &r).expect("insert");
        }
        let ids: Vec<String> = students_list(&conn)
            .expect("list")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn grading_config_defaults_then_persists() {
        let dir = tempfile::tempdir().expect("temp dir");
        let conn = open_db(dir.path()).expect("open db");
        assert_eq!(
            load_grading_config(&conn).expect("load"),
            GradingConfig::default()
        );

        let cfg = GradingConfig {
            scale: GradeScale {
                bands: vec![GradeBand {
                    grade: 'P',
                    min_percent: 50.0,
                }],
                fail_grade: 'N',
            },
            allow_bonus_marks: true,
        };
        save_grading_config(&conn, &cfg).expect("save");
        drop(conn);

        let conn = open_db(dir.path()).expect("reopen db");
        assert_eq!(load_grading_config(&conn).expect("load"), cfg);
    }
}
