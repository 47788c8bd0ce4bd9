//! Integration tests for `check_in_records`: the one-open-record rule,
//! check-out, and the filtered listings behind the attendance views.

mod common;

use chrono::{Duration, Utc};
use common::{seed_child, seed_church, seed_guardian, seed_user};
use rkids_core::checkin::start_of_day;
use rkids_core::types::DbId;
use rkids_db::models::check_in::CreateCheckIn;
use rkids_db::repositories::check_in_repo::CheckInFilter;
use rkids_db::repositories::CheckInRepo;
use sqlx::PgPool;

struct Fixture {
    church: DbId,
    teacher: DbId,
    guardian: DbId,
    ann: DbId,
    ben: DbId,
}

async fn fixture(pool: &PgPool) -> Fixture {
    let church = seed_church(pool).await;
    let teacher = seed_user(pool, church, "teacher").await;
    let parent = seed_guardian(pool, church, "RS001").await;
    let ann = seed_child(pool, church, parent.id, "Ann").await;
    let ben = seed_child(pool, church, parent.id, "Ben").await;
    Fixture {
        church,
        teacher: teacher.id,
        guardian: parent.id,
        ann: ann.id,
        ben: ben.id,
    }
}

fn manual(f: &Fixture, child_id: DbId) -> CreateCheckIn {
    CreateCheckIn {
        child_id,
        guardian_id: Some(f.guardian),
        teacher_id: f.teacher,
        method: "PARENT_ID".to_string(),
        qr_code: None,
        otp_code: None,
        session_id: None,
        booking_id: None,
    }
}

// ---------------------------------------------------------------------------
// Open-record rule
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_second_open_record_is_rejected(pool: PgPool) {
    let f = fixture(&pool).await;
    CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();

    let err = CheckInRepo::create(&pool, f.church, &manual(&f, f.ann))
        .await
        .unwrap_err();
    assert!(CheckInRepo::is_open_record_conflict(&err));

    // Other children are unaffected.
    CheckInRepo::create(&pool, f.church, &manual(&f, f.ben)).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn test_checked_out_child_can_check_in_again(pool: PgPool) {
    let f = fixture(&pool).await;
    let first = CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();

    let closed = CheckInRepo::check_out(&pool, f.church, first.id, None)
        .await
        .unwrap()
        .unwrap();
    assert!(closed.timestamp_out.is_some());
    assert_eq!(closed.guardian_id, Some(f.guardian));

    // Closing twice is a no-op.
    assert!(CheckInRepo::check_out(&pool, f.church, first.id, None)
        .await
        .unwrap()
        .is_none());

    let second = CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();
    assert_ne!(second.id, first.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_yesterdays_open_record_does_not_block_today(pool: PgPool) {
    let f = fixture(&pool).await;
    let stale = CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();
    sqlx::query("UPDATE check_in_records SET timestamp_in = timestamp_in - INTERVAL '1 day' WHERE id = $1")
        .bind(stale.id)
        .execute(&pool)
        .await
        .unwrap();

    let today = start_of_day(Utc::now());
    assert!(CheckInRepo::find_open_since(&pool, f.church, f.ann, today)
        .await
        .unwrap()
        .is_none());
    CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unknown_method_is_rejected(pool: PgPool) {
    let f = fixture(&pool).await;
    let mut input = manual(&f, f.ann);
    input.method = "manual".to_string();

    let result = CheckInRepo::create(&pool, f.church, &input).await;
    assert!(result.is_err(), "method outside QR/OTP/PARENT_ID should fail");
}

// ---------------------------------------------------------------------------
// Lookups and listings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_open_and_latest_lookups(pool: PgPool) {
    let f = fixture(&pool).await;
    let today = start_of_day(Utc::now());
    assert!(CheckInRepo::latest_since(&pool, f.church, f.ann, today)
        .await
        .unwrap()
        .is_none());

    let record = CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();
    let open = CheckInRepo::find_open_since(&pool, f.church, f.ann, today)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.id, record.id);

    CheckInRepo::check_out(&pool, f.church, record.id, None).await.unwrap();
    assert!(CheckInRepo::find_open_since(&pool, f.church, f.ann, today)
        .await
        .unwrap()
        .is_none());
    let latest = CheckInRepo::latest_since(&pool, f.church, f.ann, today)
        .await
        .unwrap()
        .unwrap();
    assert!(latest.timestamp_out.is_some());

    // Scoped by church.
    let stranger = seed_church(&pool).await;
    assert!(CheckInRepo::latest_since(&pool, stranger, f.ann, today)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_and_count_apply_filters(pool: PgPool) {
    let f = fixture(&pool).await;
    let ann = CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();
    CheckInRepo::create(&pool, f.church, &manual(&f, f.ben)).await.unwrap();
    CheckInRepo::check_out(&pool, f.church, ann.id, None).await.unwrap();

    let all = CheckInFilter::default();
    let listed = CheckInRepo::list(&pool, f.church, &all, true, 50).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].child_name, "Ann");
    assert_eq!(listed[0].parent_code.as_deref(), Some("RS001"));
    assert_eq!(CheckInRepo::count(&pool, f.church, &all).await.unwrap(), 2);

    let open = CheckInFilter {
        open_only: true,
        ..Default::default()
    };
    let listed = CheckInRepo::list(&pool, f.church, &open, true, 50).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].child_id, f.ben);

    let only_ann = CheckInFilter {
        child_id: Some(f.ann),
        ..Default::default()
    };
    assert_eq!(CheckInRepo::count(&pool, f.church, &only_ann).await.unwrap(), 1);

    let future = CheckInFilter {
        since: Some(Utc::now() + Duration::hours(1)),
        ..Default::default()
    };
    assert_eq!(CheckInRepo::count(&pool, f.church, &future).await.unwrap(), 0);

    let limited = CheckInRepo::list(&pool, f.church, &all, false, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_count_since(pool: PgPool) {
    let f = fixture(&pool).await;
    CheckInRepo::create(&pool, f.church, &manual(&f, f.ann)).await.unwrap();
    CheckInRepo::create(&pool, f.church, &manual(&f, f.ben)).await.unwrap();
    let other_teacher = seed_user(&pool, f.church, "teacher").await;

    let today = start_of_day(Utc::now());
    let mine = CheckInRepo::count_for_teacher_since(&pool, f.church, f.teacher, today)
        .await
        .unwrap();
    let theirs = CheckInRepo::count_for_teacher_since(&pool, f.church, other_teacher.id, today)
        .await
        .unwrap();
    assert_eq!((mine, theirs), (2, 0));
}
