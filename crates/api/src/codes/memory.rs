//! In-process pending-code store.
//!
//! Codes live only as long as the process; use [`super::PgCodeStore`] when
//! more than one instance serves traffic.

use std::collections::HashMap;

use async_trait::async_trait;
use rkids_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use super::{CodePurpose, CodeStoreError, PendingCode, PendingCodeStore};

type Key = (CodePurpose, String);

#[derive(Default)]
pub struct MemoryCodeStore {
    codes: RwLock<HashMap<Key, PendingCode>>,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }
}

fn key(purpose: CodePurpose, code: &str) -> Key {
    (purpose, code.to_string())
}

#[async_trait]
impl PendingCodeStore for MemoryCodeStore {
    async fn insert(&self, code: PendingCode) -> Result<bool, CodeStoreError> {
        let mut codes = self.codes.write().await;
        let k = key(code.purpose, &code.code);
        if codes.contains_key(&k) {
            return Ok(false);
        }
        codes.insert(k, code);
        Ok(true)
    }

    async fn peek(
        &self,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<PendingCode>, CodeStoreError> {
        Ok(self.codes.read().await.get(&key(purpose, code)).cloned())
    }

    async fn take(
        &self,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<PendingCode>, CodeStoreError> {
        Ok(self.codes.write().await.remove(&key(purpose, code)))
    }

    async fn remove(&self, purpose: CodePurpose, code: &str) -> Result<bool, CodeStoreError> {
        Ok(self.codes.write().await.remove(&key(purpose, code)).is_some())
    }

    async fn remove_for_child(
        &self,
        purpose: CodePurpose,
        child_id: DbId,
    ) -> Result<u64, CodeStoreError> {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|(p, _), pending| !(*p == purpose && pending.child_id() == Some(child_id)));
        Ok((before - codes.len()) as u64)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, CodeStoreError> {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|_, pending| !pending.is_expired_at(now));
        Ok((before - codes.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn pending(purpose: CodePurpose, code: &str, child: DbId, ttl_mins: i64) -> PendingCode {
        PendingCode {
            purpose,
            code: code.to_string(),
            payload: json!({ "child_id": child.to_string() }),
            expires_at: Utc::now() + Duration::minutes(ttl_mins),
        }
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_per_purpose() {
        let store = MemoryCodeStore::new();
        let child = Uuid::new_v4();
        assert!(store.insert(pending(CodePurpose::Checkin, "123456", child, 15)).await.unwrap());
        assert!(!store.insert(pending(CodePurpose::Checkin, "123456", child, 15)).await.unwrap());
        // Same code under another purpose is a different entry.
        assert!(store.insert(pending(CodePurpose::Pickup, "123456", child, 30)).await.unwrap());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn purposes_are_isolated() {
        let store = MemoryCodeStore::new();
        store
            .insert(pending(CodePurpose::Pickup, "999999", Uuid::new_v4(), 30))
            .await
            .unwrap();
        assert!(store.peek(CodePurpose::Checkin, "999999").await.unwrap().is_none());
        assert!(store.take(CodePurpose::Mfa, "999999").await.unwrap().is_none());
        assert!(store.peek(CodePurpose::Pickup, "999999").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn take_consumes_exactly_once() {
        let store = MemoryCodeStore::new();
        store
            .insert(pending(CodePurpose::Mfa, "token", Uuid::new_v4(), 10))
            .await
            .unwrap();
        assert!(store.take(CodePurpose::Mfa, "token").await.unwrap().is_some());
        assert!(store.take(CodePurpose::Mfa, "token").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn remove_for_child_only_touches_that_child_and_purpose() {
        let store = MemoryCodeStore::new();
        let child = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert(pending(CodePurpose::Pickup, "qr-a", child, 30)).await.unwrap();
        store.insert(pending(CodePurpose::Pickup, "111111", child, 30)).await.unwrap();
        store.insert(pending(CodePurpose::Pickup, "222222", other, 30)).await.unwrap();
        store.insert(pending(CodePurpose::Checkin, "333333", child, 15)).await.unwrap();

        let removed = store.remove_for_child(CodePurpose::Pickup, child).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.peek(CodePurpose::Pickup, "222222").await.unwrap().is_some());
        assert!(store.peek(CodePurpose::Checkin, "333333").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_expired_keeps_live_codes() {
        let store = MemoryCodeStore::new();
        let child = Uuid::new_v4();
        store.insert(pending(CodePurpose::Checkin, "old", child, -1)).await.unwrap();
        store.insert(pending(CodePurpose::Checkin, "new", child, 15)).await.unwrap();

        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 1);
        assert!(store.peek(CodePurpose::Checkin, "new").await.unwrap().is_some());
        assert!(store.peek(CodePurpose::Checkin, "old").await.unwrap().is_none());
    }
}
