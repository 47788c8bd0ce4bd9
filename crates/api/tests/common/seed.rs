//! Rows for the database-backed HTTP tests, written through the repositories.

use chrono::NaiveDate;
use rkids_core::types::DbId;
use rkids_db::models::child::{Child, CreateChild};
use rkids_db::models::guardian::{CreateGuardian, Guardian};
use rkids_db::models::session::{CreateSession, Session};
use rkids_db::models::user::{CreateUser, User};
use rkids_db::repositories::{ChildRepo, GuardianRepo, SessionRepo, UserRepo};
use sqlx::PgPool;

/// A church with one staff user of the given role.
pub struct Church {
    pub id: DbId,
    pub staff: User,
}

impl Church {
    /// Bearer token for the staff user.
    pub fn staff_token(&self) -> String {
        super::token_for_user(self.staff.id, self.id, &self.staff.role)
    }
}

pub async fn church(pool: &PgPool, staff_role: &str) -> Church {
    let id = sqlx::query_scalar("INSERT INTO churches (name) VALUES ('Hope Fellowship') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();
    let staff = user(pool, id, staff_role, None).await;
    Church { id, staff }
}

pub async fn user(pool: &PgPool, church_id: DbId, role: &str, linked_child_id: Option<DbId>) -> User {
    let input = CreateUser {
        email: format!("{role}-{}@example.org", uuid::Uuid::new_v4()),
        name: format!("Test {role}"),
        role: role.to_string(),
        password_hash: None,
        phone: None,
        address: None,
        linked_guardian_id: None,
        linked_child_id,
    };
    UserRepo::create(pool, church_id, &input).await.unwrap()
}

pub async fn guardian(pool: &PgPool, church_id: DbId, code: &str) -> Guardian {
    let input = CreateGuardian {
        parent_code: code.to_string(),
        name: "Hope Parent".to_string(),
        email: Some(format!("{}@example.org", code.to_lowercase())),
        phone: None,
        relationship: "Primary".to_string(),
        is_primary: true,
        photo_url: None,
        active_until: None,
    };
    GuardianRepo::create(pool, church_id, &input).await.unwrap()
}

pub async fn child(pool: &PgPool, church_id: DbId, parent_id: DbId, name: &str) -> Child {
    let input = CreateChild {
        parent_id,
        group_id: None,
        registration_id: format!("RS-{name}"),
        name: name.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2011, 2, 14).unwrap(),
        gender: None,
        status: "active".to_string(),
        submitted_by: None,
    };
    ChildRepo::create(pool, church_id, &input).await.unwrap()
}

pub async fn session(pool: &PgPool, church_id: DbId, created_by: DbId, title: &str) -> Session {
    let input = CreateSession {
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
    };
    SessionRepo::create(pool, church_id, created_by, &input).await.unwrap()
}
