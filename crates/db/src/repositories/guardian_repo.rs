//! Repository for the `guardians` and `child_guardians` tables.

use rkids_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::guardian::{
    ChildGuardian, CreateGuardian, Guardian, LinkedGuardian, ParentSummary,
};

const COLUMNS: &str = "id, church_id, parent_code, name, email, phone, relationship, is_primary, \
                       photo_url, active_until, created_at, updated_at";

const LINK_COLUMNS: &str = "id, child_id, guardian_id, relationship, is_authorized, expires_at, \
                            created_at";

const PARENT_SUMMARY_SELECT: &str = "SELECT g.id, g.parent_code, g.name, g.email, g.phone, \
        g.relationship, g.photo_url, g.active_until, \
        (SELECT COUNT(*) FROM children c WHERE c.parent_id = g.id) AS children_count, \
        g.created_at \
     FROM guardians g";

pub struct GuardianRepo;

impl GuardianRepo {
    pub async fn create(
        pool: &PgPool,
        church_id: DbId,
        input: &CreateGuardian,
    ) -> Result<Guardian, sqlx::Error> {
        let query = format!(
            "INSERT INTO guardians (church_id, parent_code, name, email, phone, relationship,
                                    is_primary, photo_url, active_until)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Guardian>(&query)
            .bind(church_id)
            .bind(&input.parent_code)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.relationship)
            .bind(input.is_primary)
            .bind(&input.photo_url)
            .bind(input.active_until)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<Guardian>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM guardians WHERE id = $1 AND church_id = $2");
        sqlx::query_as::<_, Guardian>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(
        pool: &PgPool,
        church_id: DbId,
        email: &str,
    ) -> Result<Option<Guardian>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM guardians
             WHERE church_id = $1 AND lower(email) = lower($2)
             ORDER BY is_primary DESC, created_at ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, Guardian>(&query)
            .bind(church_id)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find a guardian already registered with the given email or phone.
    pub async fn find_by_contact(
        pool: &PgPool,
        church_id: DbId,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Guardian>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM guardians
             WHERE church_id = $1
               AND (($2::text IS NOT NULL AND lower(email) = lower($2))
                    OR ($3::text IS NOT NULL AND phone = $3))
             LIMIT 1"
        );
        sqlx::query_as::<_, Guardian>(&query)
            .bind(church_id)
            .bind(email)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// List every guardian in a church, primaries first.
    pub async fn list(pool: &PgPool, church_id: DbId) -> Result<Vec<Guardian>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM guardians WHERE church_id = $1
             ORDER BY is_primary DESC, name ASC"
        );
        sqlx::query_as::<_, Guardian>(&query)
            .bind(church_id)
            .fetch_all(pool)
            .await
    }

    /// List primary guardians with their registered children count.
    pub async fn list_parents(
        pool: &PgPool,
        church_id: DbId,
    ) -> Result<Vec<ParentSummary>, sqlx::Error> {
        let query = format!(
            "{PARENT_SUMMARY_SELECT}
             WHERE g.church_id = $1 AND g.is_primary = true
             ORDER BY g.parent_code ASC"
        );
        sqlx::query_as::<_, ParentSummary>(&query)
            .bind(church_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_parent(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<ParentSummary>, sqlx::Error> {
        let query = format!(
            "{PARENT_SUMMARY_SELECT}
             WHERE g.id = $1 AND g.church_id = $2 AND g.is_primary = true"
        );
        sqlx::query_as::<_, ParentSummary>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    /// Highest numeric suffix among `RS###` parent codes (0 when none exist).
    pub async fn max_primary_code_number(
        pool: &PgPool,
        church_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let max: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(substring(parent_code FROM '^RS([0-9]+)$')::bigint)
             FROM guardians WHERE church_id = $1",
        )
        .bind(church_id)
        .fetch_one(pool)
        .await?;
        Ok(max.unwrap_or(0))
    }

    /// Hard-delete a guardian. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, church_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM guardians WHERE id = $1 AND church_id = $2")
            .bind(id)
            .bind(church_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Extend a guardian's authorization window.
    pub async fn renew(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        active_until: Timestamp,
    ) -> Result<Option<Guardian>, sqlx::Error> {
        let query = format!(
            "UPDATE guardians SET active_until = $3, updated_at = NOW()
             WHERE id = $1 AND church_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Guardian>(&query)
            .bind(id)
            .bind(church_id)
            .bind(active_until)
            .fetch_optional(pool)
            .await
    }

    /// Authorize `guardian_id` for `child_id`, refreshing an existing link.
    pub async fn link_child(
        pool: &PgPool,
        child_id: DbId,
        guardian_id: DbId,
        relationship: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<ChildGuardian, sqlx::Error> {
        let query = format!(
            "INSERT INTO child_guardians (child_id, guardian_id, relationship, is_authorized, expires_at)
             VALUES ($1, $2, $3, true, $4)
             ON CONFLICT (child_id, guardian_id) DO UPDATE SET
                relationship = EXCLUDED.relationship,
                is_authorized = true,
                expires_at = EXCLUDED.expires_at
             RETURNING {LINK_COLUMNS}"
        );
        sqlx::query_as::<_, ChildGuardian>(&query)
            .bind(child_id)
            .bind(guardian_id)
            .bind(relationship)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// The child's primary guardian plus every authorized secondary guardian.
    pub async fn list_for_child(
        pool: &PgPool,
        church_id: DbId,
        child_id: DbId,
    ) -> Result<Vec<LinkedGuardian>, sqlx::Error> {
        sqlx::query_as::<_, LinkedGuardian>(
            "SELECT g.id, g.parent_code, g.name, g.email, g.phone, g.relationship, g.is_primary,
                    true AS is_authorized, NULL::timestamptz AS expires_at, g.active_until
             FROM children c
             JOIN guardians g ON g.id = c.parent_id
             WHERE c.id = $1 AND c.church_id = $2
             UNION ALL
             SELECT g.id, g.parent_code, g.name, g.email, g.phone, cg.relationship, g.is_primary,
                    cg.is_authorized, cg.expires_at, g.active_until
             FROM child_guardians cg
             JOIN guardians g ON g.id = cg.guardian_id
             JOIN children c ON c.id = cg.child_id
             WHERE cg.child_id = $1 AND c.church_id = $2 AND cg.is_authorized = true
               AND g.id <> c.parent_id",
        )
        .bind(child_id)
        .bind(church_id)
        .fetch_all(pool)
        .await
    }

    /// Whether `guardian_id` may collect `child_id` at `now`.
    ///
    /// The primary guardian always may. A secondary guardian needs an
    /// authorized link that has not expired and an unexpired guardian record.
    pub async fn is_authorized_for_child(
        pool: &PgPool,
        child_id: DbId,
        guardian_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM children WHERE id = $1 AND parent_id = $2
             ) OR EXISTS (
                SELECT 1 FROM child_guardians cg
                JOIN guardians g ON g.id = cg.guardian_id
                WHERE cg.child_id = $1 AND cg.guardian_id = $2
                  AND cg.is_authorized = true
                  AND (cg.expires_at IS NULL OR cg.expires_at > $3)
                  AND (g.active_until IS NULL OR g.active_until > $3)
             )",
        )
        .bind(child_id)
        .bind(guardian_id)
        .bind(now)
        .fetch_one(pool)
        .await
    }
}
