//! Repository for the `pending_codes` table.
//!
//! Codes are redeemed with `DELETE ... RETURNING`, so only one caller can
//! consume a given code even across server instances.

use rkids_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::pending_code::PendingCodeRow;

const COLUMNS: &str = "code, purpose, payload, expires_at";

pub struct PendingCodeRepo;

impl PendingCodeRepo {
    /// Insert a code. Returns `false` if `(purpose, code)` already exists.
    pub async fn insert(
        pool: &PgPool,
        purpose: &str,
        code: &str,
        payload: &serde_json::Value,
        expires_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO pending_codes (purpose, code, payload, expires_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (purpose, code) DO NOTHING",
        )
        .bind(purpose)
        .bind(code)
        .bind(payload)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Look up a code without consuming it. Expired rows are still returned.
    pub async fn find(
        pool: &PgPool,
        purpose: &str,
        code: &str,
    ) -> Result<Option<PendingCodeRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM pending_codes WHERE purpose = $1 AND code = $2");
        sqlx::query_as::<_, PendingCodeRow>(&query)
            .bind(purpose)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Delete and return a code regardless of expiry. The caller decides
    /// what an expired row means.
    pub async fn take(
        pool: &PgPool,
        purpose: &str,
        code: &str,
    ) -> Result<Option<PendingCodeRow>, sqlx::Error> {
        let query = format!(
            "DELETE FROM pending_codes WHERE purpose = $1 AND code = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PendingCodeRow>(&query)
            .bind(purpose)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, purpose: &str, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_codes WHERE purpose = $1 AND code = $2")
            .bind(purpose)
            .bind(code)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every code of `purpose` whose payload names `child_id`.
    pub async fn delete_for_child(
        pool: &PgPool,
        purpose: &str,
        child_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM pending_codes WHERE purpose = $1 AND payload->>'child_id' = $2",
        )
        .bind(purpose)
        .bind(child_id.to_string())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Purge expired codes. Returns the number removed.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
