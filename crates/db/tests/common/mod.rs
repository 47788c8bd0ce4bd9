//! Seed helpers shared by the repository integration tests.
//!
//! `churches` has no repository; everything else is created through the
//! repositories under test.

#![allow(dead_code)]

use chrono::NaiveDate;
use rkids_core::types::DbId;
use rkids_db::models::child::{Child, CreateChild};
use rkids_db::models::guardian::{CreateGuardian, Guardian};
use rkids_db::models::session::{CreateSession, Session};
use rkids_db::models::user::{CreateUser, User};
use rkids_db::repositories::{ChildRepo, GuardianRepo, SessionRepo, UserRepo};
use sqlx::PgPool;

pub async fn seed_church(pool: &PgPool) -> DbId {
    sqlx::query_scalar("INSERT INTO churches (name) VALUES ('Grace Chapel') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn new_guardian(code: &str, name: &str) -> CreateGuardian {
    CreateGuardian {
        parent_code: code.to_string(),
        name: name.to_string(),
        email: Some(format!("{}@example.org", code.to_lowercase())),
        phone: None,
        relationship: "Primary".to_string(),
        is_primary: true,
        photo_url: None,
        active_until: None,
    }
}

pub async fn seed_guardian(pool: &PgPool, church_id: DbId, code: &str) -> Guardian {
    GuardianRepo::create(pool, church_id, &new_guardian(code, "Grace Parent"))
        .await
        .unwrap()
}

pub fn new_child(parent_id: DbId, registration_id: &str, name: &str) -> CreateChild {
    CreateChild {
        parent_id,
        group_id: None,
        registration_id: registration_id.to_string(),
        name: name.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2018, 5, 4).unwrap(),
        gender: None,
        status: "active".to_string(),
        submitted_by: None,
    }
}

pub async fn seed_child(pool: &PgPool, church_id: DbId, parent_id: DbId, name: &str) -> Child {
    let registration_id = format!("RS-{name}");
    ChildRepo::create(pool, church_id, &new_child(parent_id, &registration_id, name))
        .await
        .unwrap()
}

pub async fn seed_user(pool: &PgPool, church_id: DbId, role: &str) -> User {
    let input = CreateUser {
        email: format!("{role}-{}@example.org", uuid::Uuid::new_v4()),
        name: format!("Test {role}"),
        role: role.to_string(),
        password_hash: None,
        phone: None,
        address: None,
        linked_guardian_id: None,
        linked_child_id: None,
    };
    UserRepo::create(pool, church_id, &input).await.unwrap()
}

pub fn new_session(title: &str) -> CreateSession {
    CreateSession {
        title: title.to_string(),
        description: None,
        session_date: chrono::Utc::now().date_naive(),
        start_time: None,
        end_time: None,
        group_id: None,
        teacher_id: None,
        session_type: None,
        location: None,
        is_recurring: None,
        recurrence_pattern: None,
        gender_restriction: None,
    }
}

pub async fn seed_session(pool: &PgPool, church_id: DbId, created_by: DbId, title: &str) -> Session {
    SessionRepo::create(pool, church_id, created_by, &new_session(title))
        .await
        .unwrap()
}
