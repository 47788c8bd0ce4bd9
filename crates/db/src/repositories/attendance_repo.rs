//! Repository for the `attendance_summary` table.

use chrono::NaiveDate;
use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::attendance::{AttendanceSummary, SubmitAttendance};

const SELECT_FROM: &str = "SELECT a.id, a.group_id, g.name AS group_name, a.date, \
        a.present_count, a.absent_count, a.male_count, a.female_count, a.submitted_by, \
        a.updated_at";

pub struct AttendanceRepo;

impl AttendanceRepo {
    /// Insert or replace the summary for `(church, group, date)`.
    pub async fn upsert(
        pool: &PgPool,
        church_id: DbId,
        submitted_by: DbId,
        input: &SubmitAttendance,
    ) -> Result<AttendanceSummary, sqlx::Error> {
        let query = format!(
            "WITH a AS (
                INSERT INTO attendance_summary (church_id, group_id, date, present_count,
                                                absent_count, male_count, female_count,
                                                submitted_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT ON CONSTRAINT uq_attendance_summary_church_group_date DO UPDATE SET
                    present_count = EXCLUDED.present_count,
                    absent_count = EXCLUDED.absent_count,
                    male_count = EXCLUDED.male_count,
                    female_count = EXCLUDED.female_count,
                    submitted_by = EXCLUDED.submitted_by,
                    updated_at = NOW()
                RETURNING *
             )
             {SELECT_FROM} FROM a LEFT JOIN groups g ON g.id = a.group_id"
        );
        sqlx::query_as::<_, AttendanceSummary>(&query)
            .bind(church_id)
            .bind(input.group_id)
            .bind(input.date)
            .bind(input.present_count)
            .bind(input.absent_count)
            .bind(input.male_count)
            .bind(input.female_count)
            .bind(submitted_by)
            .fetch_one(pool)
            .await
    }

    /// List summaries newest first, optionally for one date and/or group.
    pub async fn list(
        pool: &PgPool,
        church_id: DbId,
        date: Option<NaiveDate>,
        group_id: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<AttendanceSummary>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM} FROM attendance_summary a LEFT JOIN groups g ON g.id = a.group_id
             WHERE a.church_id = $1
               AND ($2::date IS NULL OR a.date = $2)
               AND ($3::uuid IS NULL OR a.group_id = $3)
             ORDER BY a.date DESC, g.name ASC
             LIMIT $4"
        );
        sqlx::query_as::<_, AttendanceSummary>(&query)
            .bind(church_id)
            .bind(date)
            .bind(group_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Summaries for one group on or after `since`, newest first.
    pub async fn list_for_group_since(
        pool: &PgPool,
        church_id: DbId,
        group_id: DbId,
        since: NaiveDate,
    ) -> Result<Vec<AttendanceSummary>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM} FROM attendance_summary a LEFT JOIN groups g ON g.id = a.group_id
             WHERE a.church_id = $1 AND a.group_id = $2 AND a.date >= $3
             ORDER BY a.date DESC"
        );
        sqlx::query_as::<_, AttendanceSummary>(&query)
            .bind(church_id)
            .bind(group_id)
            .bind(since)
            .fetch_all(pool)
            .await
    }
}
