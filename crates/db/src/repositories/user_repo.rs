//! Repository for the `users` table.

use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, church_id, email, name, password_hash, role, phone, address, \
                       linked_guardian_id, linked_child_id, mfa_enabled, is_active, \
                       profile_updated, last_login_at, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(
        pool: &PgPool,
        church_id: DbId,
        input: &CreateUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (church_id, email, name, role, password_hash, phone, address,
                                linked_guardian_id, linked_child_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(church_id)
            .bind(&input.email)
            .bind(&input.name)
            .bind(&input.role)
            .bind(&input.password_hash)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(input.linked_guardian_id)
            .bind(input.linked_child_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND church_id = $2");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by (lowercased) email within a church.
    pub async fn find_by_email(
        pool: &PgPool,
        church_id: DbId,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE church_id = $1 AND email = $2");
        sqlx::query_as::<_, User>(&query)
            .bind(church_id)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email across churches for sign-in.
    ///
    /// When the same address is registered with several churches the oldest
    /// account wins.
    pub async fn find_for_login(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE email = $1 ORDER BY created_at ASC LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// List users in a church, optionally filtered by role, newest first.
    pub async fn list(
        pool: &PgPool,
        church_id: DbId,
        role: Option<&str>,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE church_id = $1 AND ($2::text IS NULL OR role = $2)
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(church_id)
            .bind(role)
            .fetch_all(pool)
            .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                email = COALESCE($3, email),
                name = COALESCE($4, name),
                role = COALESCE($5, role),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                linked_guardian_id = COALESCE($8, linked_guardian_id),
                linked_child_id = COALESCE($9, linked_child_id),
                profile_updated = COALESCE($10, profile_updated),
                updated_at = NOW()
             WHERE id = $1 AND church_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(church_id)
            .bind(&input.email)
            .bind(&input.name)
            .bind(&input.role)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(input.linked_guardian_id)
            .bind(input.linked_child_id)
            .bind(input.profile_updated)
            .fetch_optional(pool)
            .await
    }

    /// Suspend or reactivate a user. Returns the updated row.
    pub async fn set_active(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET is_active = $3, updated_at = NOW()
             WHERE id = $1 AND church_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(church_id)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }

    /// Update a user's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set `last_login_at` to now.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
