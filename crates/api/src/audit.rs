//! Best-effort audit trail for security-relevant actions.
//!
//! Handlers call [`record`] after their primary write. A failed audit insert
//! is logged and never turns a successful request into an error.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use rkids_core::types::DbId;
use rkids_db::models::audit::CreateAuditLog;
use rkids_db::repositories::AuditRepo;
use rkids_db::DbPool;

pub const ACTION_LOGIN: &str = "LOGIN";
pub const ACTION_CREATE_USER: &str = "CREATE_USER";
pub const ACTION_UPDATE_USER: &str = "UPDATE_USER";
pub const ACTION_SUSPEND_USER: &str = "SUSPEND_USER";
pub const ACTION_ACTIVATE_USER: &str = "ACTIVATE_USER";
pub const ACTION_CHANGE_PASSWORD: &str = "CHANGE_PASSWORD";
pub const ACTION_CREATE_PARENT: &str = "CREATE_PARENT";
pub const ACTION_DELETE_PARENT: &str = "DELETE_PARENT";
pub const ACTION_CREATE_GUARDIAN: &str = "CREATE_GUARDIAN";
pub const ACTION_RENEW_GUARDIAN: &str = "RENEW_GUARDIAN";
pub const ACTION_CREATE_CHILD: &str = "CREATE_CHILD";
pub const ACTION_UPDATE_CHILD: &str = "UPDATE_CHILD";
pub const ACTION_DELETE_CHILD: &str = "DELETE_CHILD";
pub const ACTION_APPROVE_CHILD: &str = "APPROVE_CHILD";
pub const ACTION_REJECT_CHILD: &str = "REJECT_CHILD";
pub const ACTION_CHECK_IN: &str = "CHECK_IN";
pub const ACTION_CHECK_OUT: &str = "CHECK_OUT";
pub const ACTION_CREATE_SESSION: &str = "CREATE_SESSION";
pub const ACTION_DELETE_SESSION: &str = "DELETE_SESSION";
pub const ACTION_CREATE_GROUP: &str = "CREATE_GROUP";
pub const ACTION_DELETE_GROUP: &str = "DELETE_GROUP";
pub const ACTION_SUBMIT_ATTENDANCE: &str = "SUBMIT_ATTENDANCE";

/// Client address and user agent of the current request.
///
/// The address is the first hop of `X-Forwarded-For`, falling back to
/// `X-Real-IP`.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = header(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header(headers, "x-real-ip"))
            .map(str::to_string);

        Self {
            ip_address,
            user_agent: header(headers, "user-agent").map(str::to_string),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo::from_headers(&parts.headers))
    }
}

/// One audit entry, built by the handler and written by [`record`].
#[derive(Debug)]
pub struct AuditEntry<'a> {
    pub church_id: DbId,
    pub user_id: Option<DbId>,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub client: &'a ClientInfo,
}

/// Write an audit entry, logging instead of failing on error.
pub async fn record(pool: &DbPool, entry: AuditEntry<'_>) {
    let input = CreateAuditLog {
        user_id: entry.user_id,
        action_performed: entry.action.to_string(),
        entity_type: Some(entry.entity_type.to_string()),
        entity_id: entry.entity_id,
        details: entry.details,
        ip_address: entry.client.ip_address.clone(),
        user_agent: entry.client.user_agent.clone(),
    };

    if let Err(e) = AuditRepo::insert(pool, entry.church_id, &input).await {
        tracing::warn!(
            error = %e,
            action = entry.action,
            entity_type = entry.entity_type,
            "Failed to write audit log"
        );
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn first_forwarded_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert("user-agent", HeaderValue::from_static("kiosk/1.0"));

        let info = ClientInfo::from_headers(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(info.user_agent.as_deref(), Some("kiosk/1.0"));
    }

    #[test]
    fn falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        let info = ClientInfo::from_headers(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("198.51.100.2"));
        assert!(info.user_agent.is_none());
    }

    #[test]
    fn missing_headers_yield_nothing() {
        let info = ClientInfo::from_headers(&HeaderMap::new());
        assert!(info.ip_address.is_none());
        assert!(info.user_agent.is_none());
    }
}
