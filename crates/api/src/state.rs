use std::sync::Arc;

use crate::codes::PendingCodeStore;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference counted and everything else
/// sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: rkids_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Outstanding MFA challenges, check-in tokens and pickup codes.
    pub codes: Arc<dyn PendingCodeStore>,
    /// Event bus feeding the notification dispatcher.
    pub event_bus: Arc<rkids_events::EventBus>,
}
