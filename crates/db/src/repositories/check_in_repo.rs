//! Repository for the `check_in_records` table.
//!
//! A record with `timestamp_out IS NULL` is an open check-in.

use rkids_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::check_in::{CheckInDetail, CheckInRecord, CreateCheckIn};

const COLUMNS: &str = "id, church_id, child_id, guardian_id, teacher_id, method, qr_code, \
                       otp_code, session_id, booking_id, timestamp_in, timestamp_out";

const DETAIL_SELECT: &str = "SELECT r.id AS record_id, r.child_id, c.name AS child_name, \
        c.registration_id, c.group_id, g.name AS group_name, r.guardian_id, \
        gd.name AS guardian_name, gd.parent_code, r.teacher_id, r.method, r.session_id, \
        r.booking_id, r.timestamp_in, r.timestamp_out \
     FROM check_in_records r \
     JOIN children c ON c.id = r.child_id \
     LEFT JOIN groups g ON g.id = c.group_id \
     LEFT JOIN guardians gd ON gd.id = r.guardian_id";

/// Filters for listing check-in records. All set filters must match.
#[derive(Debug, Default)]
pub struct CheckInFilter<'a> {
    pub child_id: Option<DbId>,
    pub group_ids: Option<&'a [DbId]>,
    pub session_id: Option<DbId>,
    pub since: Option<Timestamp>,
    pub open_only: bool,
}

pub struct CheckInRepo;

impl CheckInRepo {
    /// Whether `err` is the child already holding an open record for the day.
    pub fn is_open_record_conflict(err: &sqlx::Error) -> bool {
        crate::is_unique_violation(err, &["uq_check_in_records_open_child"])
    }

    pub async fn create(
        pool: &PgPool,
        church_id: DbId,
        input: &CreateCheckIn,
    ) -> Result<CheckInRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO check_in_records (church_id, child_id, guardian_id, teacher_id, method,
                                           qr_code, otp_code, session_id, booking_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CheckInRecord>(&query)
            .bind(church_id)
            .bind(input.child_id)
            .bind(input.guardian_id)
            .bind(input.teacher_id)
            .bind(&input.method)
            .bind(&input.qr_code)
            .bind(&input.otp_code)
            .bind(input.session_id)
            .bind(input.booking_id)
            .fetch_one(pool)
            .await
    }

    /// Most recent open record for a child since `since`.
    pub async fn find_open_since(
        pool: &PgPool,
        church_id: DbId,
        child_id: DbId,
        since: Timestamp,
    ) -> Result<Option<CheckInRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM check_in_records
             WHERE church_id = $1 AND child_id = $2 AND timestamp_in >= $3
               AND timestamp_out IS NULL
             ORDER BY timestamp_in DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, CheckInRecord>(&query)
            .bind(church_id)
            .bind(child_id)
            .bind(since)
            .fetch_optional(pool)
            .await
    }

    /// Most recent record for a child since `since`, open or closed.
    pub async fn latest_since(
        pool: &PgPool,
        church_id: DbId,
        child_id: DbId,
        since: Timestamp,
    ) -> Result<Option<CheckInRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM check_in_records
             WHERE church_id = $1 AND child_id = $2 AND timestamp_in >= $3
             ORDER BY timestamp_in DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, CheckInRecord>(&query)
            .bind(church_id)
            .bind(child_id)
            .bind(since)
            .fetch_optional(pool)
            .await
    }

    /// Close an open record. Keeps the existing guardian when none is given.
    /// Returns `None` if the record is already closed.
    pub async fn check_out(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
        guardian_id: Option<DbId>,
    ) -> Result<Option<CheckInRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE check_in_records SET
                timestamp_out = NOW(),
                guardian_id = COALESCE($3, guardian_id)
             WHERE id = $1 AND church_id = $2 AND timestamp_out IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CheckInRecord>(&query)
            .bind(id)
            .bind(church_id)
            .bind(guardian_id)
            .fetch_optional(pool)
            .await
    }

    /// List joined records, newest first unless `oldest_first` is set.
    pub async fn list(
        pool: &PgPool,
        church_id: DbId,
        filter: &CheckInFilter<'_>,
        oldest_first: bool,
        limit: i64,
    ) -> Result<Vec<CheckInDetail>, sqlx::Error> {
        let order = if oldest_first { "ASC" } else { "DESC" };
        let query = format!(
            "{DETAIL_SELECT}
             WHERE r.church_id = $1
               AND ($2::uuid IS NULL OR r.child_id = $2)
               AND ($3::uuid[] IS NULL OR c.group_id = ANY($3))
               AND ($4::uuid IS NULL OR r.session_id = $4)
               AND ($5::timestamptz IS NULL OR r.timestamp_in >= $5)
               AND (NOT $6 OR r.timestamp_out IS NULL)
             ORDER BY r.timestamp_in {order}
             LIMIT $7"
        );
        sqlx::query_as::<_, CheckInDetail>(&query)
            .bind(church_id)
            .bind(filter.child_id)
            .bind(filter.group_ids)
            .bind(filter.session_id)
            .bind(filter.since)
            .bind(filter.open_only)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count records matching `filter`.
    pub async fn count(
        pool: &PgPool,
        church_id: DbId,
        filter: &CheckInFilter<'_>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM check_in_records r
             JOIN children c ON c.id = r.child_id
             WHERE r.church_id = $1
               AND ($2::uuid IS NULL OR r.child_id = $2)
               AND ($3::uuid[] IS NULL OR c.group_id = ANY($3))
               AND ($4::uuid IS NULL OR r.session_id = $4)
               AND ($5::timestamptz IS NULL OR r.timestamp_in >= $5)
               AND (NOT $6 OR r.timestamp_out IS NULL)",
        )
        .bind(church_id)
        .bind(filter.child_id)
        .bind(filter.group_ids)
        .bind(filter.session_id)
        .bind(filter.since)
        .bind(filter.open_only)
        .fetch_one(pool)
        .await
    }

    /// Count records created by one teacher since `since`.
    pub async fn count_for_teacher_since(
        pool: &PgPool,
        church_id: DbId,
        teacher_id: DbId,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM check_in_records
             WHERE church_id = $1 AND teacher_id = $2 AND timestamp_in >= $3",
        )
        .bind(church_id)
        .bind(teacher_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }
}
