//! Handlers for the `/audit` trail (admin only).

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rkids_core::error::CoreError;
use rkids_core::reports::csv_row;
use rkids_core::search::{clamp_limit, clamp_offset, MAX_LIST_LIMIT};
use rkids_core::types::{DbId, Timestamp};
use rkids_db::models::audit::{AuditFilter, AuditLog};
use rkids_db::repositories::AuditRepo;
use serde::Deserialize;

use super::non_blank;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_AUDIT_LIMIT: i64 = 100;

const EXPORT_HEADER: [&str; 9] = [
    "id",
    "created_at",
    "user_id",
    "user_name",
    "action",
    "entity_type",
    "entity_id",
    "ip_address",
    "user_agent",
];

#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    #[serde(alias = "userId")]
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    #[serde(alias = "entityType")]
    pub entity_type: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Export only: `json` (default) or `csv`.
    pub format: Option<String>,
}

impl AuditQueryParams {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            user_id: self.user_id,
            action: non_blank(self.action.clone()).map(|a| a.to_uppercase()),
            entity_type: non_blank(self.entity_type.clone()),
            from: self.from,
            to: self.to,
        }
    }
}

/// GET /api/audit?user_id=&action=&entity_type=&from=&to=&limit=&offset=
pub async fn list_audit_logs(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<AuditQueryParams>,
) -> AppResult<Json<DataResponse<Vec<AuditLog>>>> {
    let logs = AuditRepo::list(
        &state.pool,
        admin.church_id,
        &params.filter(),
        clamp_limit(params.limit, DEFAULT_AUDIT_LIMIT, MAX_LIST_LIMIT),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(DataResponse { data: logs }))
}

/// GET /api/audit/{id}
pub async fn get_audit_log(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AuditLog>>> {
    let log = AuditRepo::find_by_id(&state.pool, admin.church_id, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Audit log", id))?;
    Ok(Json(DataResponse { data: log }))
}

/// GET /api/audit/export?format=json|csv
///
/// Same filters as the listing, up to the maximum page size.
pub async fn export_audit_logs(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<AuditQueryParams>,
) -> AppResult<Response> {
    let logs = AuditRepo::list(
        &state.pool,
        admin.church_id,
        &params.filter(),
        MAX_LIST_LIMIT,
        0,
    )
    .await?;

    match params.format.as_deref().unwrap_or("json") {
        "csv" => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"audit-logs.csv\"",
                ),
            ],
            render_csv(&logs),
        )
            .into_response()),
        "json" => Ok(Json(DataResponse { data: logs }).into_response()),
        other => Err(CoreError::Validation(format!("Unsupported export format '{other}'")).into()),
    }
}

fn render_csv(logs: &[AuditLog]) -> String {
    let mut out = csv_row(&EXPORT_HEADER);
    out.push('\n');
    for log in logs {
        out.push_str(&csv_row(&[
            log.id.to_string(),
            log.created_at.to_rfc3339(),
            log.user_id.map(|id| id.to_string()).unwrap_or_default(),
            log.user_name.clone().unwrap_or_default(),
            log.action_performed.clone(),
            log.entity_type.clone().unwrap_or_default(),
            log.entity_id.clone().unwrap_or_default(),
            log.ip_address.clone().unwrap_or_default(),
            log.user_agent.clone().unwrap_or_default(),
        ]));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn csv_escapes_user_agents() {
        let log = AuditLog {
            id: Uuid::nil(),
            user_id: None,
            user_name: Some("Admin".into()),
            action_performed: "LOGIN".into(),
            entity_type: Some("user".into()),
            entity_id: None,
            details: None,
            ip_address: Some("10.0.0.1".into()),
            user_agent: Some("Mozilla/5.0 (X11, Linux)".into()),
            created_at: Utc::now(),
        };
        let csv = render_csv(&[log]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,created_at,"));
        let row = lines.next().unwrap();
        assert!(row.contains(",Admin,LOGIN,user,,10.0.0.1,"));
        assert!(row.ends_with("\"Mozilla/5.0 (X11, Linux)\""));
    }

    #[test]
    fn action_filter_is_upper_cased() {
        let params: AuditQueryParams =
            serde_json::from_value(serde_json::json!({ "action": " check_in " })).unwrap();
        assert_eq!(params.filter().action.as_deref(), Some("CHECK_IN"));
    }
}
