//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use rkids_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub church_id: DbId,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_guardian_id: Option<DbId>,
    pub linked_child_id: Option<DbId>,
    pub mfa_enabled: bool,
    pub is_active: bool,
    pub profile_updated: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_guardian_id: Option<DbId>,
    pub linked_child_id: Option<DbId>,
    pub is_active: bool,
    pub profile_updated: bool,
    pub has_password: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            phone: user.phone,
            address: user.address,
            linked_guardian_id: user.linked_guardian_id,
            linked_child_id: user.linked_child_id,
            is_active: user.is_active,
            profile_updated: user.profile_updated,
            has_password: user.password_hash.is_some(),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user. Emails are expected lowercased.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub role: String,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_guardian_id: Option<DbId>,
    pub linked_child_id: Option<DbId>,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linked_guardian_id: Option<DbId>,
    pub linked_child_id: Option<DbId>,
    pub profile_updated: Option<bool>,
}

impl UpdateUser {
    /// Whether at least one field would change.
    pub fn has_changes(&self) -> bool {
        self.email.is_some()
            || self.name.is_some()
            || self.role.is_some()
            || self.phone.is_some()
            || self.address.is_some()
            || self.linked_guardian_id.is_some()
            || self.linked_child_id.is_some()
            || self.profile_updated.is_some()
    }
}
