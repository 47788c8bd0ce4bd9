//! Repository for the `session_bookings` table.
//!
//! Bookings carry no `church_id` of their own; they are scoped through
//! their session.

use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::booking::{Booking, BookingDetail};

const COLUMNS: &str = "id, session_id, child_id, guardian_id, qr_code, otp_code, status, \
                       booked_at, checked_in_at, checked_out_at";

const DETAIL_SELECT: &str = "SELECT b.id, b.session_id, s.title AS session_title, s.session_date, \
        b.child_id, c.name AS child_name, c.registration_id, b.guardian_id, \
        gd.name AS guardian_name, b.qr_code, b.otp_code, b.status, b.booked_at, \
        b.checked_in_at, b.checked_out_at \
     FROM session_bookings b \
     JOIN sessions s ON s.id = b.session_id \
     JOIN children c ON c.id = b.child_id \
     LEFT JOIN guardians gd ON gd.id = b.guardian_id";

/// Unique constraints keeping QR tokens and OTPs distinct within a session.
const CODE_CONSTRAINTS: [&str; 2] = [
    "uq_session_bookings_session_qr",
    "uq_session_bookings_session_otp",
];

/// Attempts made to find a QR/OTP pair not already held in the session.
pub const MAX_CODE_ATTEMPTS: usize = 5;

pub struct BookingRepo;

impl BookingRepo {
    /// Whether `err` means the QR token or OTP is already taken in the
    /// session. A duplicate `(session, child)` pair is not a code collision.
    pub fn is_code_collision(err: &sqlx::Error) -> bool {
        crate::is_unique_violation(err, &CODE_CONSTRAINTS)
    }

    pub async fn create(
        pool: &PgPool,
        session_id: DbId,
        child_id: DbId,
        guardian_id: Option<DbId>,
        qr_code: &str,
        otp_code: &str,
    ) -> Result<Booking, sqlx::Error> {
        let query = format!(
            "INSERT INTO session_bookings (session_id, child_id, guardian_id, qr_code, otp_code)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(session_id)
            .bind(child_id)
            .bind(guardian_id)
            .bind(qr_code)
            .bind(otp_code)
            .fetch_one(pool)
            .await
    }

    /// [`create`](Self::create) with codes drawn from `codes`, drawing a new
    /// pair whenever either code collides with another booking's.
    pub async fn create_with_fresh_codes(
        pool: &PgPool,
        session_id: DbId,
        child_id: DbId,
        guardian_id: Option<DbId>,
        mut codes: impl FnMut() -> (String, String),
    ) -> Result<Booking, sqlx::Error> {
        let mut attempt = 1;
        loop {
            let (qr_code, otp_code) = codes();
            match Self::create(pool, session_id, child_id, guardian_id, &qr_code, &otp_code).await
            {
                Err(e) if Self::is_code_collision(&e) && attempt < MAX_CODE_ATTEMPTS => {
                    tracing::debug!(%session_id, attempt, "Booking code collision, regenerating");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn find_by_session_child(
        pool: &PgPool,
        session_id: DbId,
        child_id: DbId,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_bookings WHERE session_id = $1 AND child_id = $2"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(session_id)
            .bind(child_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_session_qr(
        pool: &PgPool,
        session_id: DbId,
        qr_code: &str,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_bookings WHERE session_id = $1 AND qr_code = $2"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(session_id)
            .bind(qr_code)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_session_otp(
        pool: &PgPool,
        session_id: DbId,
        otp_code: &str,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_bookings WHERE session_id = $1 AND otp_code = $2"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(session_id)
            .bind(otp_code)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<BookingDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE b.id = $1 AND s.church_id = $2");
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_session(
        pool: &PgPool,
        church_id: DbId,
        session_id: DbId,
    ) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE b.session_id = $1 AND s.church_id = $2
             ORDER BY c.name ASC"
        );
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(session_id)
            .bind(church_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_child(
        pool: &PgPool,
        church_id: DbId,
        child_id: DbId,
    ) -> Result<Vec<BookingDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE b.child_id = $1 AND s.church_id = $2
             ORDER BY s.session_date DESC"
        );
        sqlx::query_as::<_, BookingDetail>(&query)
            .bind(child_id)
            .bind(church_id)
            .fetch_all(pool)
            .await
    }

    /// Reset a cancelled booking to `booked` with fresh codes.
    pub async fn rebook(
        pool: &PgPool,
        id: DbId,
        guardian_id: Option<DbId>,
        qr_code: &str,
        otp_code: &str,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE session_bookings SET
                status = 'booked',
                guardian_id = COALESCE($2, guardian_id),
                qr_code = $3,
                otp_code = $4,
                booked_at = NOW(),
                checked_in_at = NULL,
                checked_out_at = NULL,
                updated_at = NOW()
             WHERE id = $1 AND status = 'cancelled'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(guardian_id)
            .bind(qr_code)
            .bind(otp_code)
            .fetch_optional(pool)
            .await
    }

    /// [`rebook`](Self::rebook) with codes drawn from `codes`, retried on
    /// collision like [`create_with_fresh_codes`](Self::create_with_fresh_codes).
    pub async fn rebook_with_fresh_codes(
        pool: &PgPool,
        id: DbId,
        guardian_id: Option<DbId>,
        mut codes: impl FnMut() -> (String, String),
    ) -> Result<Option<Booking>, sqlx::Error> {
        let mut attempt = 1;
        loop {
            let (qr_code, otp_code) = codes();
            match Self::rebook(pool, id, guardian_id, &qr_code, &otp_code).await {
                Err(e) if Self::is_code_collision(&e) && attempt < MAX_CODE_ATTEMPTS => {
                    tracing::debug!(booking_id = %id, attempt, "Booking code collision, regenerating");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Move a `booked` booking to `checked_in`. Returns `None` when the
    /// booking is in any other state, so concurrent redemptions lose.
    pub async fn mark_checked_in(pool: &PgPool, id: DbId) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE session_bookings SET status = 'checked_in', checked_in_at = NOW(),
                                         updated_at = NOW()
             WHERE id = $1 AND status = 'booked'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_checked_out(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE session_bookings SET status = 'checked_out', checked_out_at = NOW(),
                                         updated_at = NOW()
             WHERE id = $1 AND status = 'checked_in'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a booking that has not been redeemed yet.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE session_bookings SET status = 'cancelled', updated_at = NOW()
             WHERE id = $1 AND status = 'booked'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
