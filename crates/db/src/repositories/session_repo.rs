//! Repository for the `sessions` table.

use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::session::{
    CreateSession, Session, SessionFilter, UpdateSession, DEFAULT_SESSION_TYPE,
};

/// Projection over a row source aliased `s`, joined with group and teacher names.
const SELECT_FROM: &str = "SELECT s.id, s.title, s.description, s.session_date, s.start_time, \
        s.end_time, s.group_id, g.name AS group_name, s.teacher_id, u.name AS teacher_name, \
        s.created_by, s.session_type, s.location, s.is_recurring, s.recurrence_pattern, \
        s.gender_restriction, s.created_at";

const JOINS: &str = "LEFT JOIN groups g ON g.id = s.group_id \
                     LEFT JOIN users u ON u.id = s.teacher_id";

/// Maximum sessions returned by a list call.
pub const SESSION_LIST_LIMIT: i64 = 100;

pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(
        pool: &PgPool,
        church_id: DbId,
        created_by: DbId,
        input: &CreateSession,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "WITH s AS (
                INSERT INTO sessions (church_id, title, description, session_date, start_time,
                                      end_time, group_id, teacher_id, created_by, session_type,
                                      location, is_recurring, recurrence_pattern,
                                      gender_restriction)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                RETURNING *
             )
             {SELECT_FROM} FROM s {JOINS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(church_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.session_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.group_id)
            .bind(input.teacher_id)
            .bind(created_by)
            .bind(input.session_type.as_deref().unwrap_or(DEFAULT_SESSION_TYPE))
            .bind(&input.location)
            .bind(input.is_recurring.unwrap_or(false))
            .bind(&input.recurrence_pattern)
            .bind(&input.gender_restriction)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM} FROM sessions s {JOINS}
             WHERE s.id = $1 AND s.church_id = $2"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    /// List sessions, newest date first and earliest start within a day.
    pub async fn list(
        pool: &PgPool,
        church_id: DbId,
        filter: &SessionFilter,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let (range_start, range_end) = filter.date_range.unzip();
        let query = format!(
            "{SELECT_FROM} FROM sessions s {JOINS}
             WHERE s.church_id = $1
               AND ($2::uuid IS NULL OR s.group_id = $2)
               AND ($3::date IS NULL OR s.session_date = $3)
               AND ($4::date IS NULL OR s.session_date >= $4)
               AND ($5::date IS NULL OR s.session_date < $5)
             ORDER BY s.session_date DESC, s.start_time ASC NULLS LAST
             LIMIT $6"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(church_id)
            .bind(filter.group_id)
            .bind(filter.date)
            .bind(range_start)
            .bind(range_end)
            .bind(SESSION_LIST_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// Update a session. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        input: &UpdateSession,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "WITH s AS (
                UPDATE sessions SET
                    title = COALESCE($3, title),
                    description = COALESCE($4, description),
                    session_date = COALESCE($5, session_date),
                    start_time = COALESCE($6, start_time),
                    end_time = COALESCE($7, end_time),
                    group_id = COALESCE($8, group_id),
                    teacher_id = COALESCE($9, teacher_id),
                    session_type = COALESCE($10, session_type),
                    location = COALESCE($11, location),
                    is_recurring = COALESCE($12, is_recurring),
                    recurrence_pattern = COALESCE($13, recurrence_pattern),
                    gender_restriction = COALESCE($14, gender_restriction),
                    updated_at = NOW()
                WHERE id = $1 AND church_id = $2
                RETURNING *
             )
             {SELECT_FROM} FROM s {JOINS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(church_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.session_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.group_id)
            .bind(input.teacher_id)
            .bind(&input.session_type)
            .bind(&input.location)
            .bind(input.is_recurring)
            .bind(&input.recurrence_pattern)
            .bind(&input.gender_restriction)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, church_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND church_id = $2")
            .bind(id)
            .bind(church_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
