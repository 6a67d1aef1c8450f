use crate::calc::{normalize_id, GradeScale, RosterEntry};
use anyhow::Context;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Classmate roster loaded from the comma-separated dataset. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    by_id: HashMap<String, usize>,
}

impl Roster {
    pub fn from_entries(entries: Vec<RosterEntry>) -> Self {
        let mut by_id = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            // Last row wins for duplicate PRNs, like the legacy map insert.
            by_id.insert(e.id.clone(), i);
        }
        Self { entries, by_id }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn find(&self, id: &str) -> Option<&RosterEntry> {
        self.by_id
            .get(&normalize_id(id))
            .and_then(|&i| self.entries.get(i))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassmateView {
    pub prn: String,
    pub name: String,
    pub percentage: f64,
    pub grade: String,
}

impl ClassmateView {
    pub fn new(entry: &RosterEntry, scale: &GradeScale) -> Self {
        Self {
            prn: entry.id.clone(),
            name: entry.name.clone(),
            percentage: crate::calc::round_off_2_decimals(entry.percentage),
            grade: scale.classify(entry.percentage).to_string(),
        }
    }
}

pub fn load_roster(path: &Path) -> anyhow::Result<Roster> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read roster {}", path.to_string_lossy()))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(Roster::from_entries(parse_roster_text(&text)))
}

/// `PRN,Name,Percentage` rows after a single header line. Rows whose
/// percentage does not parse are skipped.
pub fn parse_roster_text(text: &str) -> Vec<RosterEntry> {
    let mut out = Vec::new();
    for raw in text.lines().skip(1) {
        let line = raw.trim_start_matches(UTF8_BOM).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(e) = parse_roster_line(line) {
            out.push(e);
        }
    }
    out
}

fn parse_roster_line(line: &str) -> Option<RosterEntry> {
    let mut parts = line.split(',');
    let id = normalize_id(parts.next()?);
    let name = parts.next()?.trim().to_string();
    let percentage = parts.next()?.trim().parse::<f64>().ok()?;
    if id.is_empty() || !percentage.is_finite() {
        return None;
    }
    Some(RosterEntry {
        id,
        name,
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_path(rel: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
    }

    #[test]
    fn skips_header_blank_and_malformed_rows() {
        let text = "PRN,Name,Percentage\n\
                    \u{feff}se001,Asha Rao,64\n\
                    \n\
                    SE002,Ravi Kumar,not-a-number\n\
                    SE003,Meera Iyer,77.5\n\
                    SE004,Short Row\n";
        let entries = parse_roster_text(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "SE001");
        assert_eq!(entries[0].percentage, 64.0);
        assert_eq!(entries[1].name, "Meera Iyer");
    }

    #[test]
    fn header_with_bom_is_still_skipped() {
        let text = "\u{feff}PRN,Name,Percentage\r\nSE010,Zoya Khan,88.25\r\n";
        let entries = parse_roster_text(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].percentage, 88.25);
    }

    #[test]
    fn find_is_case_insensitive_and_last_duplicate_wins() {
        let roster = Roster::from_entries(parse_roster_text(
            "PRN,Name,Percentage\nSE1,First,50\nSE1,Second,60\n",
        ));
        assert_eq!(roster.len(), 2);
        let hit = roster.find("se1").expect("found");
        assert_eq!(hit.name, "Second");
        assert!(roster.find("SE2").is_none());
    }

    #[test]
    fn classmate_view_grades_with_scale() {
        let e = RosterEntry {
            id: "SE1".into(),
            name: "Asha".into(),
            percentage: 74.999,
        };
        let v = ClassmateView::new(&e, &GradeScale::default());
        assert_eq!(v.grade, "C");
        assert_eq!(v.percentage, 75.0);
    }

    #[test]
    fn loads_sample_fixture() {
        let roster = load_roster(&fixture_path("fixtures/sample_se1.csv")).expect("load roster");
        assert_eq!(roster.len(), 10);
        assert!(roster.find("SE2301").is_some());
    }
}
