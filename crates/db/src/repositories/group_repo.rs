//! Repository for the `groups` table.

use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::group::{CreateGroup, Group, UpdateGroup};

/// Projection over a row source aliased `g`, joined with the teacher name.
const SELECT_FROM: &str = "SELECT g.id, g.name, g.age_range_min, g.age_range_max, g.room, \
        g.schedule, g.teacher_id, u.name AS teacher_name, g.created_at";

pub struct GroupRepo;

impl GroupRepo {
    pub async fn create(
        pool: &PgPool,
        church_id: DbId,
        input: &CreateGroup,
    ) -> Result<Group, sqlx::Error> {
        let query = format!(
            "WITH g AS (
                INSERT INTO groups (church_id, name, age_range_min, age_range_max, room,
                                    schedule, teacher_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
             )
             {SELECT_FROM} FROM g LEFT JOIN users u ON u.id = g.teacher_id"
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(church_id)
            .bind(&input.name)
            .bind(input.age_range_min)
            .bind(input.age_range_max)
            .bind(&input.room)
            .bind(&input.schedule)
            .bind(input.teacher_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<Group>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM} FROM groups g LEFT JOIN users u ON u.id = g.teacher_id
             WHERE g.id = $1 AND g.church_id = $2"
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        church_id: DbId,
        name: &str,
    ) -> Result<Option<Group>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM} FROM groups g LEFT JOIN users u ON u.id = g.teacher_id
             WHERE g.church_id = $1 AND g.name = $2"
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(church_id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List groups ordered by their minimum age.
    pub async fn list(pool: &PgPool, church_id: DbId) -> Result<Vec<Group>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM} FROM groups g LEFT JOIN users u ON u.id = g.teacher_id
             WHERE g.church_id = $1
             ORDER BY g.age_range_min ASC, g.name ASC"
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(church_id)
            .fetch_all(pool)
            .await
    }

    /// Groups assigned to one teacher.
    pub async fn list_for_teacher(
        pool: &PgPool,
        church_id: DbId,
        teacher_id: DbId,
    ) -> Result<Vec<Group>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM} FROM groups g LEFT JOIN users u ON u.id = g.teacher_id
             WHERE g.church_id = $1 AND g.teacher_id = $2
             ORDER BY g.age_range_min ASC"
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(church_id)
            .bind(teacher_id)
            .fetch_all(pool)
            .await
    }

    /// Update a group. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        input: &UpdateGroup,
    ) -> Result<Option<Group>, sqlx::Error> {
        let query = format!(
            "WITH g AS (
                UPDATE groups SET
                    name = COALESCE($3, name),
                    age_range_min = COALESCE($4, age_range_min),
                    age_range_max = COALESCE($5, age_range_max),
                    room = COALESCE($6, room),
                    schedule = COALESCE($7, schedule),
                    teacher_id = COALESCE($8, teacher_id),
                    updated_at = NOW()
                WHERE id = $1 AND church_id = $2
                RETURNING *
             )
             {SELECT_FROM} FROM g LEFT JOIN users u ON u.id = g.teacher_id"
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .bind(church_id)
            .bind(&input.name)
            .bind(input.age_range_min)
            .bind(input.age_range_max)
            .bind(&input.room)
            .bind(&input.schedule)
            .bind(input.teacher_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, church_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1 AND church_id = $2")
            .bind(id)
            .bind(church_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
