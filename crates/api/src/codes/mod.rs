//! Short-lived codes awaiting redemption: MFA challenges, check-in QR/OTP
//! tokens and pickup codes.
//!
//! Storage sits behind [`PendingCodeStore`] so the server can keep codes in
//! PostgreSQL ([`postgres::PgCodeStore`], shared by every instance) or in
//! process memory ([`memory::MemoryCodeStore`], tests and single-instance
//! deployments).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rkids_core::types::{DbId, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use memory::MemoryCodeStore;
pub use postgres::PgCodeStore;

/// Attempts at finding an unused code before giving up.
const MAX_ISSUE_ATTEMPTS: usize = 5;

/// What a pending code unlocks. Codes are unique per purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePurpose {
    Mfa,
    Checkin,
    Pickup,
}

impl CodePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            CodePurpose::Mfa => "mfa",
            CodePurpose::Checkin => "checkin",
            CodePurpose::Pickup => "pickup",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mfa" => Some(CodePurpose::Mfa),
            "checkin" => Some(CodePurpose::Checkin),
            "pickup" => Some(CodePurpose::Pickup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingCode {
    pub purpose: CodePurpose,
    pub code: String,
    pub payload: serde_json::Value,
    pub expires_at: Timestamp,
}

impl PendingCode {
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// The `child_id` recorded in the payload, if any.
    pub fn child_id(&self) -> Option<DbId> {
        self.payload
            .get("child_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodeStoreError {
    #[error("Pending code database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed pending code payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Could not allocate an unused {0} code")]
    Exhausted(&'static str),
}

/// Storage for pending codes.
///
/// `take` must be atomic: of two concurrent callers redeeming the same code
/// at most one receives it.
#[async_trait]
pub trait PendingCodeStore: Send + Sync {
    /// Store a code. Returns `false` when the code is already in use for
    /// the same purpose.
    async fn insert(&self, code: PendingCode) -> Result<bool, CodeStoreError>;

    /// Look a code up without consuming it. Expired codes are returned as-is.
    async fn peek(
        &self,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<PendingCode>, CodeStoreError>;

    /// Remove and return a code, whether or not it has expired.
    async fn take(
        &self,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<PendingCode>, CodeStoreError>;

    async fn remove(&self, purpose: CodePurpose, code: &str) -> Result<bool, CodeStoreError>;

    /// Remove every code of `purpose` whose payload names `child_id`.
    async fn remove_for_child(
        &self,
        purpose: CodePurpose,
        child_id: DbId,
    ) -> Result<u64, CodeStoreError>;

    /// Remove every code that expired at or before `now`.
    async fn purge_expired(&self, now: Timestamp) -> Result<u64, CodeStoreError>;
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload of an MFA challenge, keyed by the hashed challenge token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MfaChallenge {
    pub user_id: DbId,
    pub church_id: DbId,
    pub code: String,
}

/// Payload of a check-in QR token or OTP code issued without a session.
///
/// QR and OTP are issued as a pair; on the OTP, `pair` names the QR token
/// it was issued with. A completed check-in retires every outstanding
/// check-in code for the child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckinGrant {
    pub child_id: DbId,
    pub guardian_id: Option<DbId>,
    pub church_id: DbId,
    #[serde(default)]
    pub pair: Option<String>,
}

/// Payload of a pickup QR or OTP code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupGrant {
    pub child_id: DbId,
    pub guardian_id: Option<DbId>,
    pub church_id: DbId,
}

// ---------------------------------------------------------------------------
// Issue / redeem
// ---------------------------------------------------------------------------

/// Result of looking up a code for redemption.
#[derive(Debug, Clone, PartialEq)]
pub enum Redemption<T> {
    Valid(T),
    /// The code existed but had expired; it has been removed.
    Expired,
    Missing,
}

/// Store a freshly generated code, retrying with a new code on collision.
///
/// Returns the code and its expiry.
pub async fn issue<T: Serialize>(
    store: &dyn PendingCodeStore,
    purpose: CodePurpose,
    payload: &T,
    ttl_mins: i64,
    generate: impl Fn() -> String,
) -> Result<(String, Timestamp), CodeStoreError> {
    let payload = serde_json::to_value(payload)?;
    let expires_at = Utc::now() + Duration::minutes(ttl_mins);

    for _ in 0..MAX_ISSUE_ATTEMPTS {
        let code = generate();
        let pending = PendingCode {
            purpose,
            code: code.clone(),
            payload: payload.clone(),
            expires_at,
        };
        if store.insert(pending).await? {
            return Ok((code, expires_at));
        }
        tracing::debug!(purpose = purpose.as_str(), "Pending code collision, regenerating");
    }
    Err(CodeStoreError::Exhausted(purpose.as_str()))
}

/// Look a code up without consuming it. Expired codes are removed.
pub async fn peek_valid<T: DeserializeOwned>(
    store: &dyn PendingCodeStore,
    purpose: CodePurpose,
    code: &str,
    now: Timestamp,
) -> Result<Redemption<T>, CodeStoreError> {
    match store.peek(purpose, code).await? {
        None => Ok(Redemption::Missing),
        Some(pending) if pending.is_expired_at(now) => {
            store.remove(purpose, code).await?;
            Ok(Redemption::Expired)
        }
        Some(pending) => Ok(Redemption::Valid(serde_json::from_value(pending.payload)?)),
    }
}

/// Consume a code. The code is gone afterwards whether or not it was valid.
pub async fn redeem<T: DeserializeOwned>(
    store: &dyn PendingCodeStore,
    purpose: CodePurpose,
    code: &str,
    now: Timestamp,
) -> Result<Redemption<T>, CodeStoreError> {
    match store.take(purpose, code).await? {
        None => Ok(Redemption::Missing),
        Some(pending) if pending.is_expired_at(now) => Ok(Redemption::Expired),
        Some(pending) => Ok(Redemption::Valid(serde_json::from_value(pending.payload)?)),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    fn grant(child_id: DbId) -> PickupGrant {
        PickupGrant {
            child_id,
            guardian_id: None,
            church_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn purpose_round_trips_through_column_value() {
        for purpose in [CodePurpose::Mfa, CodePurpose::Checkin, CodePurpose::Pickup] {
            assert_eq!(CodePurpose::parse(purpose.as_str()), Some(purpose));
        }
        assert_eq!(CodePurpose::parse("login"), None);
    }

    #[test]
    fn child_id_is_read_from_payload() {
        let child = Uuid::new_v4();
        let pending = PendingCode {
            purpose: CodePurpose::Pickup,
            code: "123456".into(),
            payload: serde_json::to_value(grant(child)).unwrap(),
            expires_at: Utc::now(),
        };
        assert_eq!(pending.child_id(), Some(child));
    }

    #[tokio::test]
    async fn issue_then_redeem_once() {
        let store = MemoryCodeStore::new();
        let child = Uuid::new_v4();
        let (code, expires_at) = issue(&store, CodePurpose::Pickup, &grant(child), 30, || {
            "654321".to_string()
        })
        .await
        .unwrap();
        assert_eq!(code, "654321");
        assert!(expires_at > Utc::now());

        let first: Redemption<PickupGrant> =
            redeem(&store, CodePurpose::Pickup, &code, Utc::now()).await.unwrap();
        assert_matches!(first, Redemption::Valid(g) if g.child_id == child);

        let second: Redemption<PickupGrant> =
            redeem(&store, CodePurpose::Pickup, &code, Utc::now()).await.unwrap();
        assert_eq!(second, Redemption::Missing);
    }

    #[tokio::test]
    async fn issue_gives_up_when_every_code_collides() {
        let store = MemoryCodeStore::new();
        let payload = grant(Uuid::new_v4());
        issue(&store, CodePurpose::Checkin, &payload, 15, || "000000".into())
            .await
            .unwrap();

        let result = issue(&store, CodePurpose::Checkin, &payload, 15, || "000000".into()).await;
        assert_matches!(result, Err(CodeStoreError::Exhausted("checkin")));
    }

    #[tokio::test]
    async fn peek_removes_expired_codes() {
        let store = MemoryCodeStore::new();
        let (code, _) = issue(&store, CodePurpose::Pickup, &grant(Uuid::new_v4()), 30, || {
            "111111".into()
        })
        .await
        .unwrap();

        let later = Utc::now() + Duration::minutes(31);
        let result: Redemption<PickupGrant> =
            peek_valid(&store, CodePurpose::Pickup, &code, later).await.unwrap();
        assert_eq!(result, Redemption::Expired);
        assert!(store.peek(CodePurpose::Pickup, &code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn peek_keeps_valid_codes() {
        let store = MemoryCodeStore::new();
        let (code, _) = issue(&store, CodePurpose::Pickup, &grant(Uuid::new_v4()), 30, || {
            "222222".into()
        })
        .await
        .unwrap();

        for _ in 0..2 {
            let result: Redemption<PickupGrant> =
                peek_valid(&store, CodePurpose::Pickup, &code, Utc::now()).await.unwrap();
            assert_matches!(result, Redemption::Valid(_));
        }
    }

    #[tokio::test]
    async fn redeem_reports_expired_and_consumes() {
        let store = MemoryCodeStore::new();
        let (code, _) = issue(&store, CodePurpose::Checkin, &grant(Uuid::new_v4()), 15, || {
            "333333".into()
        })
        .await
        .unwrap();

        let later = Utc::now() + Duration::minutes(16);
        let result: Redemption<PickupGrant> =
            redeem(&store, CodePurpose::Checkin, &code, later).await.unwrap();
        assert_eq!(result, Redemption::Expired);
        assert!(store.peek(CodePurpose::Checkin, &code).await.unwrap().is_none());
    }
}
