use crate::attendance::{build_matrix, sessions_for_integration, MonthKey, Session, Student};
use crate::cache::cache_key;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_str, get_typed, parse_month_params, respond};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const CLASSROOM_QUERY: &str = "classroom.findOne";
const SESSIONS_QUERY: &str = "classroom.findAllIntegrationSessions";

fn matrix_json(
    students: &[Student],
    sessions: &[Session],
    integration_id: Option<&str>,
    month: MonthKey,
) -> serde_json::Value {
    let sessions = sessions_for_integration(sessions, integration_id);
    let rows = build_matrix(students, &sessions, month);
    json!({
        "month": month.to_string(),
        "daysInMonth": month.days(),
        "rows": rows,
    })
}

fn attendance_days_in_month(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let month = parse_month_params(params)?;
    Ok(json!({ "month": month.to_string(), "daysInMonth": month.days() }))
}

fn attendance_build_matrix(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let month = parse_month_params(params)?;
    let students: Vec<Student> = get_typed(params, "students")?;
    let sessions: Vec<Session> = match params.get("sessions") {
        Some(v) if !v.is_null() => get_typed(params, "sessions")?,
        _ => Vec::new(),
    };
    let integration_id = get_optional_str(params, "integrationId");
    Ok(matrix_json(&students, &sessions, integration_id.as_deref(), month))
}

/// Builds the matrix from what the shell already loaded into the cache:
/// the classroom (for its roster) and the integration sessions list.
fn attendance_month_open(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let classroom_id = get_required_str(params, "classroomId")?;
    let month = parse_month_params(params)?;
    let integration_id = get_optional_str(params, "integrationId");

    let classroom_key = cache_key(CLASSROOM_QUERY, &json!({ "id": classroom_id }));
    let sessions_filters = match params.get("sessionsFilters") {
        Some(f) if f.is_object() => f.clone(),
        _ => json!({ "classroomId": classroom_id }),
    };
    let sessions_key = cache_key(SESSIONS_QUERY, &sessions_filters);

    let classroom = state
        .cache
        .data(&classroom_key)
        .ok_or_else(|| HandlerErr::not_found("classroom not loaded", json!({ "key": classroom_key })))?;
    let sessions_page = state
        .cache
        .data(&sessions_key)
        .ok_or_else(|| HandlerErr::not_found("sessions not loaded", json!({ "key": sessions_key })))?;

    let students: Vec<Student> = match classroom.get("students") {
        Some(v) if !v.is_null() => get_typed(classroom, "students")?,
        _ => Vec::new(),
    };
    let sessions: Vec<Session> = match sessions_page.get("integrationSessions") {
        Some(v) if !v.is_null() => get_typed(sessions_page, "integrationSessions")?,
        _ => Vec::new(),
    };

    tracing::debug!(
        classroom = %classroom_id,
        month = %month,
        students = students.len(),
        sessions = sessions.len(),
        "attendance month open"
    );
    Ok(matrix_json(&students, &sessions, integration_id.as_deref(), month))
}

fn handle_attendance_days_in_month(_state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(req, attendance_days_in_month(&req.params))
}

fn handle_attendance_build_matrix(_state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(req, attendance_build_matrix(&req.params))
}

fn handle_attendance_month_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(req, attendance_month_open(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.daysInMonth" => Some(handle_attendance_days_in_month(state, req)),
        "attendance.buildMatrix" => Some(handle_attendance_build_matrix(state, req)),
        "attendance.monthOpen" => Some(handle_attendance_month_open(state, req)),
        _ => None,
    }
}
