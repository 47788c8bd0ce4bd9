//! Handlers for `/reports`: attendance rates and exports.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use rkids_core::error::CoreError;
use rkids_core::reports::{attendance_rate, csv_row};
use rkids_core::search::MAX_LIST_LIMIT;
use rkids_core::types::DbId;
use rkids_db::models::attendance::AttendanceSummary;
use rkids_db::repositories::AttendanceRepo;
use serde::{Deserialize, Serialize};

use super::attendance::resolve_group;
use super::non_blank;
use crate::error::AppResult;
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

const REPORT_LIMIT: i64 = 100;

const EXPORT_HEADER: [&str; 4] = ["date", "group", "present", "absent"];

#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReportRow {
    pub id: DbId,
    pub group_id: DbId,
    pub group_name: Option<String>,
    pub date: NaiveDate,
    pub present_count: i32,
    pub absent_count: i32,
    pub attendance_rate: f64,
}

impl From<AttendanceSummary> for AttendanceReportRow {
    fn from(s: AttendanceSummary) -> Self {
        Self {
            attendance_rate: attendance_rate(s.present_count.into(), s.absent_count.into()),
            id: s.id,
            group_id: s.group_id,
            group_name: s.group_name,
            date: s.date,
            present_count: s.present_count,
            absent_count: s.absent_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub group: Option<String>,
    pub present: i32,
    pub absent: i32,
}

impl From<AttendanceSummary> for ExportRow {
    fn from(s: AttendanceSummary) -> Self {
        Self {
            date: s.date,
            group: s.group_name,
            present: s.present_count,
            absent: s.absent_count,
        }
    }
}

/// GET /api/reports/attendance?group=
pub async fn attendance_report(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(params): Query<ReportParams>,
) -> AppResult<Json<DataResponse<Vec<AttendanceReportRow>>>> {
    let group_id = match non_blank(params.group) {
        Some(group) => match resolve_group(&state, staff.church_id, &group).await? {
            Some(id) => Some(id),
            None => return Ok(Json(DataResponse { data: Vec::new() })),
        },
        None => None,
    };
    let rows = AttendanceRepo::list(&state.pool, staff.church_id, None, group_id, REPORT_LIMIT)
        .await?
        .into_iter()
        .map(AttendanceReportRow::from)
        .collect();
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/reports/export?format=csv|json
///
/// `csv` (the default) returns a downloadable `text/csv` body.
pub async fn export_report(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let format = params
        .format
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| "csv".into());
    if format != "csv" && format != "json" {
        return Err(CoreError::Validation(format!("Unsupported export format '{format}'")).into());
    }

    let rows: Vec<ExportRow> =
        AttendanceRepo::list(&state.pool, staff.church_id, None, None, MAX_LIST_LIMIT)
            .await?
            .into_iter()
            .map(ExportRow::from)
            .collect();
    tracing::info!(user_id = %staff.user_id, rows = rows.len(), %format, "Attendance exported");

    if format == "json" {
        return Ok(Json(DataResponse { data: rows }).into_response());
    }
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"attendance.csv\"",
            ),
        ],
        render_csv(&rows),
    )
        .into_response())
}

fn render_csv(rows: &[ExportRow]) -> String {
    let mut out = csv_row(&EXPORT_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&csv_row(&[
            row.date.to_string(),
            row.group.clone().unwrap_or_default(),
            row.present.to_string(),
            row.absent.to_string(),
        ]));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group: Option<&str>, present: i32, absent: i32) -> ExportRow {
        ExportRow {
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            group: group.map(String::from),
            present,
            absent,
        }
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let csv = render_csv(&[row(Some("Little Lambs"), 12, 3), row(None, 0, 0)]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,group,present,absent");
        assert_eq!(lines[1], "2026-03-01,Little Lambs,12,3");
        assert_eq!(lines[2], "2026-03-01,,0,0");
    }

    #[test]
    fn csv_quotes_group_names_with_commas() {
        let csv = render_csv(&[row(Some("Seniors, Youth"), 1, 1)]);
        assert!(csv.contains("\"Seniors, Youth\""));
    }
}
