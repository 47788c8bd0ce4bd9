//! Pending codes persisted in the `pending_codes` table.

use async_trait::async_trait;
use rkids_core::types::{DbId, Timestamp};
use rkids_db::models::pending_code::PendingCodeRow;
use rkids_db::repositories::PendingCodeRepo;
use rkids_db::DbPool;

use super::{CodePurpose, CodeStoreError, PendingCode, PendingCodeStore};

pub struct PgCodeStore {
    pool: DbPool,
}

impl PgCodeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Rows carry their purpose as text; anything unrecognised is treated as
/// absent since it can never be redeemed.
fn from_row(row: PendingCodeRow) -> Option<PendingCode> {
    let purpose = CodePurpose::parse(&row.purpose)?;
    Some(PendingCode {
        purpose,
        code: row.code,
        payload: row.payload,
        expires_at: row.expires_at,
    })
}

#[async_trait]
impl PendingCodeStore for PgCodeStore {
    async fn insert(&self, code: PendingCode) -> Result<bool, CodeStoreError> {
        Ok(PendingCodeRepo::insert(
            &self.pool,
            code.purpose.as_str(),
            &code.code,
            &code.payload,
            code.expires_at,
        )
        .await?)
    }

    async fn peek(
        &self,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<PendingCode>, CodeStoreError> {
        let row = PendingCodeRepo::find(&self.pool, purpose.as_str(), code).await?;
        Ok(row.and_then(from_row))
    }

    async fn take(
        &self,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<PendingCode>, CodeStoreError> {
        let row = PendingCodeRepo::take(&self.pool, purpose.as_str(), code).await?;
        Ok(row.and_then(from_row))
    }

    async fn remove(&self, purpose: CodePurpose, code: &str) -> Result<bool, CodeStoreError> {
        Ok(PendingCodeRepo::delete(&self.pool, purpose.as_str(), code).await?)
    }

    async fn remove_for_child(
        &self,
        purpose: CodePurpose,
        child_id: DbId,
    ) -> Result<u64, CodeStoreError> {
        Ok(PendingCodeRepo::delete_for_child(&self.pool, purpose.as_str(), child_id).await?)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, CodeStoreError> {
        Ok(PendingCodeRepo::delete_expired(&self.pool, now).await?)
    }
}
