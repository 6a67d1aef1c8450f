use crate::calc::{round_off_2_decimals, CalcError, Course, GradeScale, StudentRecord};
use anyhow::Context;
use std::fmt::Write as _;
use std::path::Path;

const SEPARATOR: &str = "---------------------------------------------";

pub fn read_report_cards(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read report cards {}", path.to_string_lossy()))?;
    Ok(parse_report_cards(&String::from_utf8_lossy(&bytes)))
}

/// Parses the append-only report card text file. Percentage and grade lines
/// are ignored; both are recomputed from the courses.
pub fn parse_report_cards(text: &str) -> Vec<StudentRecord> {
    let mut out: Vec<StudentRecord> = Vec::new();
    let mut prn = String::new();
    let mut name = String::new();
    let mut courses: Vec<Course> = Vec::new();

    let mut flush = |prn: &mut String, name: &mut String, courses: &mut Vec<Course>| {
        if !prn.is_empty() && !name.is_empty() && !courses.is_empty() {
            out.push(StudentRecord::new(prn, name, std::mem::take(courses)));
        }
        prn.clear();
        name.clear();
        courses.clear();
    };

    for raw in text.lines() {
        let t = raw.trim();
        if t.is_empty() {
            continue;
        }
        if let Some(v) = field_value(t, "Student PRN:").or_else(|| field_value(t, "Student ID:")) {
            prn = v;
        } else if let Some(v) = field_value(t, "Student Name:") {
            name = v;
        } else if t.starts_with("Courses:") {
            courses.clear();
        } else if t.starts_with(SEPARATOR) {
            flush(&mut prn, &mut name, &mut courses);
        } else if let Some(c) = parse_course_line(t) {
            courses.push(c);
        }
    }
    // Last record may lack a closing separator.
    flush(&mut prn, &mut name, &mut courses);

    out
}

fn field_value(line: &str, label: &str) -> Option<String> {
    line.strip_prefix(label).map(|v| v.trim().to_string())
}

/// `CODE - Course Name : marks/max`
fn parse_course_line(line: &str) -> Option<Course> {
    let dash = line.find(" - ")?;
    // Names may contain " : "; marks never do.
    let colon = line[dash + 3..].rfind(" : ")? + dash + 3;
    let (marks, max) = line[colon + 3..].rsplit_once('/')?;
    let code = line[..dash].trim();
    let name = line[dash + 3..colon].trim();
    let marks = marks.trim().parse::<f64>().ok()?;
    let max = max.trim().parse::<f64>().ok()?;
    Some(Course::new(code, name, marks, max))
}

pub fn render_report_card(record: &StudentRecord, scale: &GradeScale) -> Result<String, CalcError> {
    let outcome = record.outcome(scale)?;
    let mut s = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(s, "{SEPARATOR}");
    let _ = writeln!(s, "Student PRN: {}", record.id);
    let _ = writeln!(s, "Student Name: {}", record.name);
    let _ = writeln!(s, "Courses:");
    for c in &record.courses {
        let _ = writeln!(
            s,
            "  {} - {} : {}/{}",
            c.code, c.name, c.marks_obtained, c.max_marks
        );
    }
    let _ = writeln!(
        s,
        "Percentage: {:.2}%",
        round_off_2_decimals(outcome.percentage)
    );
    let _ = writeln!(s, "Grade: {}", outcome.grade);
    let _ = writeln!(s, "{SEPARATOR}");
    s.push('\n');
    Ok(s)
}

pub fn write_report_cards(
    path: &Path,
    records: &[StudentRecord],
    scale: &GradeScale,
) -> anyhow::Result<usize> {
    let mut text = String::new();
    for r in records {
        text.push_str(&render_report_card(r, scale)?);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write report cards {}", path.to_string_lossy()))?;
    Ok(records.len())
}
