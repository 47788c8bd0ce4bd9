//! Repository for the `children` table.

use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::child::{Child, ChildDetail, CreateChild, UpdateChild};

const COLUMNS: &str = "id, church_id, parent_id, group_id, registration_id, name, date_of_birth, \
                       gender, status, submitted_by, submitted_at, created_at, updated_at";

/// Child joined with its group name.
const DETAIL_SELECT: &str = "SELECT c.id, c.registration_id, c.name, c.date_of_birth, c.group_id, \
        g.name AS group_name, c.parent_id, c.status, c.gender, c.submitted_by, c.submitted_at \
     FROM children c \
     LEFT JOIN groups g ON g.id = c.group_id";

/// Filters for listing children.
#[derive(Debug, Default)]
pub struct ChildFilter<'a> {
    pub parent_id: Option<DbId>,
    pub group_name: Option<&'a str>,
    pub status: Option<&'a str>,
}

pub struct ChildRepo;

impl ChildRepo {
    pub async fn create(
        pool: &PgPool,
        church_id: DbId,
        input: &CreateChild,
    ) -> Result<Child, sqlx::Error> {
        let query = format!(
            "INSERT INTO children (church_id, parent_id, group_id, registration_id, name,
                                   date_of_birth, gender, status, submitted_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Child>(&query)
            .bind(church_id)
            .bind(input.parent_id)
            .bind(input.group_id)
            .bind(&input.registration_id)
            .bind(&input.name)
            .bind(input.date_of_birth)
            .bind(&input.gender)
            .bind(&input.status)
            .bind(input.submitted_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<Child>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM children WHERE id = $1 AND church_id = $2");
        sqlx::query_as::<_, Child>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<ChildDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE c.id = $1 AND c.church_id = $2");
        sqlx::query_as::<_, ChildDetail>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        church_id: DbId,
        filter: &ChildFilter<'_>,
    ) -> Result<Vec<ChildDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE c.church_id = $1
               AND ($2::uuid IS NULL OR c.parent_id = $2)
               AND ($3::text IS NULL OR g.name = $3)
               AND ($4::text IS NULL OR c.status = $4)
             ORDER BY c.name ASC"
        );
        sqlx::query_as::<_, ChildDetail>(&query)
            .bind(church_id)
            .bind(filter.parent_id)
            .bind(filter.group_name)
            .bind(filter.status)
            .fetch_all(pool)
            .await
    }

    /// Children belonging to any of `group_ids`.
    pub async fn list_for_groups(
        pool: &PgPool,
        church_id: DbId,
        group_ids: &[DbId],
    ) -> Result<Vec<ChildDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE c.church_id = $1 AND c.group_id = ANY($2)
             ORDER BY c.name ASC"
        );
        sqlx::query_as::<_, ChildDetail>(&query)
            .bind(church_id)
            .bind(group_ids)
            .fetch_all(pool)
            .await
    }

    /// Highest child number used in this family's registration ids.
    pub async fn max_child_number(pool: &PgPool, parent_id: DbId) -> Result<i64, sqlx::Error> {
        let max: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(substring(registration_id FROM '/([0-9]+)$')::bigint)
             FROM children WHERE parent_id = $1",
        )
        .bind(parent_id)
        .fetch_one(pool)
        .await?;
        Ok(max.unwrap_or(0))
    }

    /// Count active children, optionally within one group.
    pub async fn count_active(
        pool: &PgPool,
        church_id: DbId,
        group_id: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM children
             WHERE church_id = $1 AND status = 'active'
               AND ($2::uuid IS NULL OR group_id = $2)",
        )
        .bind(church_id)
        .bind(group_id)
        .fetch_one(pool)
        .await
    }

    /// Update a child. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        input: &UpdateChild,
    ) -> Result<Option<Child>, sqlx::Error> {
        let query = format!(
            "UPDATE children SET
                name = COALESCE($3, name),
                date_of_birth = COALESCE($4, date_of_birth),
                group_id = COALESCE($5, group_id),
                gender = COALESCE($6, gender),
                status = COALESCE($7, status),
                updated_at = NOW()
             WHERE id = $1 AND church_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Child>(&query)
            .bind(id)
            .bind(church_id)
            .bind(&input.name)
            .bind(input.date_of_birth)
            .bind(input.group_id)
            .bind(&input.gender)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        status: &str,
    ) -> Result<Option<Child>, sqlx::Error> {
        let query = format!(
            "UPDATE children SET status = $3, updated_at = NOW()
             WHERE id = $1 AND church_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Child>(&query)
            .bind(id)
            .bind(church_id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a child. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, church_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM children WHERE id = $1 AND church_id = $2")
            .bind(id)
            .bind(church_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
