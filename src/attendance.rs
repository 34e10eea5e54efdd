use chrono::{DateTime, Datelike, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Partial,
    Late,
    Excused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub student_id: String,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationRef {
    pub id: String,
}

/// One scheduled class occurrence as returned by the sessions query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<IntegrationRef>,
    #[serde(default)]
    pub is_attendance_record_completed: bool,
    #[serde(default)]
    pub attendance_records: Vec<AttendanceRecord>,
}

impl Session {
    pub fn integration_key(&self) -> Option<&str> {
        self.integration_id
            .as_deref()
            .or_else(|| self.integration.as_ref().map(|i| i.id.as_str()))
    }

    fn record_for(&self, student_id: &str) -> Option<&AttendanceRecord> {
        self.attendance_records
            .iter()
            .find(|r| r.student_id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    MonthOutOfRange(u32),
    YearOutOfRange(i32),
    BadMonthKey(String),
}

impl fmt::Display for AttendanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceError::MonthOutOfRange(m) => {
                write!(f, "month must be between 1 and 12 (got {})", m)
            }
            AttendanceError::YearOutOfRange(y) => {
                write!(f, "year must be a 4-digit year (got {})", y)
            }
            AttendanceError::BadMonthKey(raw) => {
                write!(f, "month must be YYYY-MM (got {:?})", raw)
            }
        }
    }
}

impl std::error::Error for AttendanceError {}

/// A validated calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, AttendanceError> {
        if !(1..=12).contains(&month) {
            return Err(AttendanceError::MonthOutOfRange(month));
        }
        if !(1000..=9999).contains(&year) {
            return Err(AttendanceError::YearOutOfRange(year));
        }
        Ok(MonthKey { year, month })
    }

    pub fn parse(raw: &str) -> Result<Self, AttendanceError> {
        let t = raw.trim();
        let Some((y, m)) = t.split_once('-') else {
            return Err(AttendanceError::BadMonthKey(raw.to_string()));
        };
        let year = y
            .parse::<i32>()
            .map_err(|_| AttendanceError::BadMonthKey(raw.to_string()))?;
        let month = m
            .parse::<u32>()
            .map_err(|_| AttendanceError::BadMonthKey(raw.to_string()))?;
        MonthKey::new(year, month)
    }

    pub fn days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    fn contains(&self, ts: &DateTime<FixedOffset>) -> bool {
        ts.year() == self.year && ts.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Gregorian month length. Only reached through `MonthKey::days`, so `month`
/// is always 1..=12.
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 30,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CellState {
    NoSession,
    Incomplete,
    NoRecord,
    Recorded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCell {
    pub day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AttendanceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub is_record_completed: bool,
    pub state: CellState,
}

impl AttendanceCell {
    fn empty(day: u32) -> Self {
        AttendanceCell {
            day,
            session_id: None,
            status: None,
            remarks: None,
            is_record_completed: false,
            state: CellState::NoSession,
        }
    }

    fn for_session(day: u32, session: &Session, student_id: &str) -> Self {
        let record = session.record_for(student_id);
        let completed = session.is_attendance_record_completed;
        let state = match (completed, record) {
            (false, _) => CellState::Incomplete,
            (true, Some(_)) => CellState::Recorded,
            (true, None) => CellState::NoRecord,
        };
        AttendanceCell {
            day,
            session_id: Some(session.id.clone()),
            status: record.map(|r| r.status),
            remarks: record.and_then(|r| r.remarks.clone()),
            is_record_completed: completed,
            state,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSummary {
    pub present: u32,
    pub absent: u32,
    pub partial: u32,
    pub late: u32,
    pub excused: u32,
    pub session_days: u32,
    pub recorded_days: u32,
}

impl RowSummary {
    fn tally(cells: &[AttendanceCell]) -> Self {
        let mut s = RowSummary::default();
        for cell in cells {
            if cell.session_id.is_some() {
                s.session_days += 1;
            }
            let Some(status) = cell.status else { continue };
            s.recorded_days += 1;
            match status {
                AttendanceStatus::Present => s.present += 1,
                AttendanceStatus::Absent => s.absent += 1,
                AttendanceStatus::Partial => s.partial += 1,
                AttendanceStatus::Late => s.late += 1,
                AttendanceStatus::Excused => s.excused += 1,
            }
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub cells: Vec<AttendanceCell>,
    pub summary: RowSummary,
}

/// Sessions of the month keyed by day. When several sessions share a day the
/// one that starts last is kept.
pub fn sessions_by_day(sessions: &[Session], month: MonthKey) -> BTreeMap<u32, &Session> {
    let mut by_day: BTreeMap<u32, &Session> = BTreeMap::new();
    for session in sessions.iter().filter(|s| month.contains(&s.start_date)) {
        let day = session.start_date.day();
        match by_day.get(&day) {
            Some(current) if current.start_date >= session.start_date => {}
            _ => {
                by_day.insert(day, session);
            }
        }
    }
    by_day
}

/// Keeps only sessions of the given integration; `None` keeps everything.
pub fn sessions_for_integration(sessions: &[Session], integration_id: Option<&str>) -> Vec<Session> {
    match integration_id {
        None => sessions.to_vec(),
        Some(id) => sessions
            .iter()
            .filter(|s| s.integration_key() == Some(id))
            .cloned()
            .collect(),
    }
}

pub fn build_matrix(students: &[Student], sessions: &[Session], month: MonthKey) -> Vec<StudentRow> {
    let days = month.days();
    let by_day = sessions_by_day(sessions, month);

    let mut ordered: Vec<&Student> = students.iter().collect();
    ordered.sort_by(|a, b| {
        a.first_name
            .cmp(&b.first_name)
            .then_with(|| a.last_name.cmp(&b.last_name))
            .then_with(|| a.id.cmp(&b.id))
    });

    ordered
        .into_iter()
        .map(|student| {
            let cells: Vec<AttendanceCell> = (1..=days)
                .map(|day| match by_day.get(&day) {
                    Some(session) => AttendanceCell::for_session(day, session, &student.id),
                    None => AttendanceCell::empty(day),
                })
                .collect();
            let summary = RowSummary::tally(&cells);
            StudentRow {
                student_id: student.id.clone(),
                first_name: student.first_name.clone(),
                last_name: student.last_name.clone(),
                cells,
                summary,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, first: &str, last: &str) -> Student {
        Student {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    fn ts(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).expect("timestamp")
    }

    fn session(id: &str, start: &str, completed: bool, records: Vec<AttendanceRecord>) -> Session {
        Session {
            id: id.to_string(),
            start_date: ts(start),
            end_date: ts(start),
            integration_id: Some("int-1".to_string()),
            integration: None,
            is_attendance_record_completed: completed,
            attendance_records: records,
        }
    }

    fn record(student_id: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: None,
            student_id: student_id.to_string(),
            status,
            remarks: None,
        }
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn month_key_days_follow_leap_years() {
        assert_eq!(MonthKey::new(2024, 2).expect("month").days(), 29);
        assert_eq!(MonthKey::new(2023, 2).expect("month").days(), 28);
        assert_eq!(MonthKey::parse("2100-02").expect("month").days(), 28);
        assert_eq!(MonthKey::parse("2024-09").expect("month").days(), 30);
    }

    #[test]
    fn month_key_rejects_out_of_range() {
        assert_eq!(MonthKey::new(2024, 13), Err(AttendanceError::MonthOutOfRange(13)));
        assert_eq!(MonthKey::new(2024, 0), Err(AttendanceError::MonthOutOfRange(0)));
        assert_eq!(MonthKey::new(24, 3), Err(AttendanceError::YearOutOfRange(24)));
        assert_eq!(
            MonthKey::parse("2024-02").expect("parse"),
            MonthKey { year: 2024, month: 2 }
        );
        assert!(MonthKey::parse("February").is_err());
    }

    #[test]
    fn matrix_has_one_row_per_student_and_one_cell_per_day() {
        let students = vec![student("s1", "Ana", "B"), student("s2", "Ben", "C")];
        let month = MonthKey::new(2024, 2).expect("month");
        let rows = build_matrix(&students, &[], month);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.cells.len(), 29);
            let days: Vec<u32> = row.cells.iter().map(|c| c.day).collect();
            assert_eq!(days, (1..=29).collect::<Vec<_>>());
            assert!(row.cells.iter().all(|c| c.state == CellState::NoSession));
            assert!(row.cells.iter().all(|c| !c.is_record_completed && c.status.is_none()));
        }
    }

    #[test]
    fn zero_students_gives_empty_matrix() {
        let month = MonthKey::new(2023, 2).expect("month");
        let sessions = vec![session("x", "2023-02-03T09:00:00Z", true, vec![])];
        assert!(build_matrix(&[], &sessions, month).is_empty());
    }

    #[test]
    fn later_session_wins_same_day_collision() {
        let students = vec![student("s1", "Ana", "B")];
        let sessions = vec![
            session(
                "late",
                "2024-03-15T13:00:00Z",
                true,
                vec![record("s1", AttendanceStatus::Absent)],
            ),
            session(
                "early",
                "2024-03-15T08:00:00Z",
                true,
                vec![record("s1", AttendanceStatus::Present)],
            ),
        ];
        let month = MonthKey::new(2024, 3).expect("month");
        let rows = build_matrix(&students, &sessions, month);
        let cell = &rows[0].cells[14];
        assert_eq!(cell.day, 15);
        assert_eq!(cell.session_id.as_deref(), Some("late"));
        assert_eq!(cell.status, Some(AttendanceStatus::Absent));

        let reversed: Vec<Session> = sessions.into_iter().rev().collect();
        let rows = build_matrix(&students, &reversed, month);
        assert_eq!(rows[0].cells[14].session_id.as_deref(), Some("late"));
    }

    #[test]
    fn sessions_outside_month_are_ignored() {
        let students = vec![student("s1", "Ana", "B")];
        let sessions = vec![
            session("feb", "2024-02-29T09:00:00Z", true, vec![]),
            session("apr", "2025-03-01T09:00:00Z", true, vec![]),
            session("mar", "2024-03-01T09:00:00Z", true, vec![]),
        ];
        let rows = build_matrix(&students, &sessions, MonthKey::new(2024, 3).expect("month"));
        let with_session: Vec<u32> = rows[0]
            .cells
            .iter()
            .filter(|c| c.session_id.is_some())
            .map(|c| c.day)
            .collect();
        assert_eq!(with_session, vec![1]);
    }

    #[test]
    fn day_uses_timestamp_offset() {
        let students = vec![student("s1", "Ana", "B")];
        // 2024-03-31 23:30 at -05:00 is already April in UTC.
        let sessions = vec![session("s", "2024-03-31T23:30:00-05:00", true, vec![])];
        let rows = build_matrix(&students, &sessions, MonthKey::new(2024, 3).expect("month"));
        assert_eq!(rows[0].cells[30].session_id.as_deref(), Some("s"));
    }

    #[test]
    fn cell_states_distinguish_missing_record_and_incomplete() {
        let students = vec![student("s1", "Ana", "B"), student("s2", "Cy", "D")];
        let sessions = vec![
            session("done", "2024-05-02T09:00:00Z", true, vec![record("s1", AttendanceStatus::Late)]),
            session("open", "2024-05-03T09:00:00Z", false, vec![record("s1", AttendanceStatus::Present)]),
        ];
        let rows = build_matrix(&students, &sessions, MonthKey::new(2024, 5).expect("month"));

        let ana = &rows[0];
        assert_eq!(ana.cells[1].state, CellState::Recorded);
        assert_eq!(ana.cells[1].status, Some(AttendanceStatus::Late));
        assert_eq!(ana.cells[2].state, CellState::Incomplete);
        assert_eq!(ana.cells[2].status, Some(AttendanceStatus::Present));
        assert!(!ana.cells[2].is_record_completed);

        let cy = &rows[1];
        assert_eq!(cy.cells[1].state, CellState::NoRecord);
        assert!(cy.cells[1].is_record_completed);
        assert_eq!(cy.cells[1].status, None);

        assert_eq!(ana.summary.session_days, 2);
        assert_eq!(ana.summary.recorded_days, 2);
        assert_eq!(ana.summary.late, 1);
        assert_eq!(ana.summary.present, 1);
        assert_eq!(cy.summary.recorded_days, 0);
    }

    #[test]
    fn rows_sorted_by_first_then_last_name_case_sensitive() {
        let students = vec![
            student("3", "ben", "A"),
            student("2", "Ben", "Z"),
            student("1", "Ben", "A"),
            student("4", "Amy", "Q"),
        ];
        let rows = build_matrix(&students, &[], MonthKey::new(2024, 1).expect("month"));
        let ids: Vec<&str> = rows.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["4", "1", "2", "3"]);
    }

    #[test]
    fn integration_filter_accepts_nested_reference() {
        let mut nested = session("n", "2024-03-04T09:00:00Z", true, vec![]);
        nested.integration_id = None;
        nested.integration = Some(IntegrationRef { id: "int-2".to_string() });
        let flat = session("f", "2024-03-05T09:00:00Z", true, vec![]);
        let all = vec![nested, flat];

        let only_two = sessions_for_integration(&all, Some("int-2"));
        assert_eq!(only_two.len(), 1);
        assert_eq!(only_two[0].id, "n");
        assert_eq!(sessions_for_integration(&all, None).len(), 2);
    }
}
