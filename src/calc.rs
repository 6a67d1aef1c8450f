use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest percentage that still counts as a pass. The default grade scale's
/// lowest band starts here, and roster statistics read it back from the scale.
pub const DEFAULT_PASS_MARK: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("total maximum marks is zero")]
    DivisionByZero,
    #[error("no entries to summarize")]
    EmptyDataset,
}

impl CalcError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CalcError::InvalidInput(message.into())
    }

    /// Stable code used in the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput(_) => "invalid_input",
            CalcError::DivisionByZero => "division_by_zero",
            CalcError::EmptyDataset => "empty_dataset",
        }
    }
}

/// Two-decimal presentation rounding: `Int(100*x + 0.5) / 100`.
/// Only applied when a value leaves the engine for display.
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub code: String,
    pub name: String,
    #[serde(alias = "marks")]
    pub marks_obtained: f64,
    pub max_marks: f64,
}

impl Course {
    pub fn new(code: &str, name: &str, marks_obtained: f64, max_marks: f64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            marks_obtained,
            max_marks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTotals {
    pub total_obtained: f64,
    pub total_max: f64,
}

pub fn course_totals(courses: &[Course]) -> CourseTotals {
    let mut total_obtained = 0.0;
    let mut total_max = 0.0;
    for c in courses {
        total_obtained += c.marks_obtained;
        total_max += c.max_marks;
    }
    CourseTotals {
        total_obtained,
        total_max,
    }
}

pub fn compute_percentage(courses: &[Course]) -> Result<f64, CalcError> {
    let totals = course_totals(courses);
    if totals.total_max == 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    if !totals.total_max.is_finite() || totals.total_max < 0.0 {
        return Err(CalcError::invalid("total maximum marks must be positive"));
    }
    Ok(totals.total_obtained / totals.total_max * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub total_obtained: f64,
    pub total_max: f64,
    pub percentage: f64,
    pub grade: char,
}

pub fn compute_result(courses: &[Course], scale: &GradeScale) -> Result<GradeOutcome, CalcError> {
    let totals = course_totals(courses);
    let percentage = compute_percentage(courses)?;
    Ok(GradeOutcome {
        total_obtained: totals.total_obtained,
        total_max: totals.total_max,
        percentage,
        grade: scale.classify(percentage),
    })
}

/// Input checks that must pass before a course reaches the engine.
/// Bonus marks (obtained above max) are only accepted when the policy allows it.
pub fn validate_course(course: &Course, allow_bonus_marks: bool) -> Result<(), CalcError> {
    if course.code.trim().is_empty() {
        return Err(CalcError::invalid("course code must not be empty"));
    }
    // Saved as `CODE - Name : m/max`, so the first " - " must end the code.
    if format!("{} - ", course.code).find(" - ") != Some(course.code.len()) {
        return Err(CalcError::invalid(format!(
            "course {}: code must not contain \" -\"",
            course.code
        )));
    }
    if has_line_break(&course.code) || has_line_break(&course.name) {
        return Err(CalcError::invalid(format!(
            "course {}: code and name must be a single line",
            course.code
        )));
    }
    if !course.marks_obtained.is_finite() || !course.max_marks.is_finite() {
        return Err(CalcError::invalid(format!(
            "course {}: marks must be finite numbers",
            course.code
        )));
    }
    if course.marks_obtained < 0.0 {
        return Err(CalcError::invalid(format!(
            "course {}: marksObtained must not be negative",
            course.code
        )));
    }
    if course.max_marks <= 0.0 {
        return Err(CalcError::invalid(format!(
            "course {}: maxMarks must be positive",
            course.code
        )));
    }
    if !allow_bonus_marks && course.marks_obtained > course.max_marks {
        return Err(CalcError::invalid(format!(
            "course {}: marksObtained exceeds maxMarks",
            course.code
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: char,
    pub min_percent: f64,
}

/// Ordered grade thresholds, highest band first. Lower bounds are inclusive;
/// anything under the last band gets `fail_grade`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeScale {
    pub bands: Vec<GradeBand>,
    pub fail_grade: char,
}

impl Default for GradeScale {
    fn default() -> Self {
        let band = |grade, min_percent| GradeBand { grade, min_percent };
        Self {
            bands: vec![
                band('A', 90.0),
                band('B', 75.0),
                band('C', 60.0),
                band('D', 50.0),
                band('E', DEFAULT_PASS_MARK),
            ],
            fail_grade: 'F',
        }
    }
}

impl GradeScale {
    /// Percentages above 100 (bonus marks) land in the top band.
    pub fn classify(&self, percentage: f64) -> char {
        self.bands
            .iter()
            .find(|b| percentage >= b.min_percent)
            .map(|b| b.grade)
            .unwrap_or(self.fail_grade)
    }

    pub fn pass_mark(&self) -> f64 {
        self.bands
            .last()
            .map(|b| b.min_percent)
            .unwrap_or(f64::INFINITY)
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        if self.bands.is_empty() {
            return Err(CalcError::invalid("grade scale needs at least one band"));
        }
        let mut seen: Vec<char> = vec![self.fail_grade];
        let mut prev: Option<f64> = None;
        for b in &self.bands {
            if !b.min_percent.is_finite() {
                return Err(CalcError::invalid(format!(
                    "band {}: minPercent must be finite",
                    b.grade
                )));
            }
            if let Some(p) = prev {
                if b.min_percent >= p {
                    return Err(CalcError::invalid(format!(
                        "band {}: thresholds must be strictly descending",
                        b.grade
                    )));
                }
            }
            if seen.contains(&b.grade) {
                return Err(CalcError::invalid(format!(
                    "grade {} appears more than once",
                    b.grade
                )));
            }
            seen.push(b.grade);
            prev = Some(b.min_percent);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradingConfig {
    pub scale: GradeScale,
    pub allow_bonus_marks: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub courses: Vec<Course>,
}

impl StudentRecord {
    pub fn new(id: &str, name: &str, courses: Vec<Course>) -> Self {
        Self {
            id: normalize_id(id),
            name: name.trim().to_string(),
            courses,
        }
    }

    pub fn outcome(&self, scale: &GradeScale) -> Result<GradeOutcome, CalcError> {
        compute_result(&self.courses, scale)
    }

    pub fn view(&self, scale: &GradeScale) -> Result<ResultView, CalcError> {
        let outcome = self.outcome(scale)?;
        Ok(ResultView {
            prn: self.id.clone(),
            name: self.name.clone(),
            percentage: round_off_2_decimals(outcome.percentage),
            grade: outcome.grade.to_string(),
            courses: self.courses.clone(),
        })
    }
}

/// Presentation shape handed back to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub prn: String,
    pub name: String,
    pub percentage: f64,
    pub grade: String,
    pub courses: Vec<Course>,
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}

pub fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub passed: usize,
    pub failed: usize,
}

pub fn roster_statistics(entries: &[RosterEntry], pass_mark: f64) -> Result<Statistics, CalcError> {
    if entries.is_empty() {
        return Err(CalcError::EmptyDataset);
    }

    let mut sum = 0.0;
    let mut highest = f64::NEG_INFINITY;
    let mut lowest = f64::INFINITY;
    let mut passed: usize = 0;
    for e in entries {
        sum += e.percentage;
        highest = highest.max(e.percentage);
        lowest = lowest.min(e.percentage);
        if e.percentage >= pass_mark {
            passed += 1;
        }
    }

    let total = entries.len();
    Ok(Statistics {
        total,
        average: round_off_2_decimals(sum / (total as f64)),
        highest,
        lowest,
        passed,
        failed: total - passed,
    })
}
