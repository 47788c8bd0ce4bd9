//! Shared query parameter types for API handlers.

use rkids_core::types::DbId;
use serde::Deserialize;

/// `?child_id=` filter.
#[derive(Debug, Deserialize)]
pub struct ChildIdParams {
    pub child_id: Option<DbId>,
}
