//! Repository for the `audit_logs` table.

use rkids_core::types::DbId;
use sqlx::PgPool;

use crate::models::audit::{AuditFilter, AuditLog, CreateAuditLog};

const SELECT_FROM: &str = "SELECT a.id, a.user_id, u.name AS user_name, a.action_performed, \
        a.entity_type, a.entity_id, a.details, a.ip_address, a.user_agent, a.created_at \
     FROM audit_logs a \
     LEFT JOIN users u ON u.id = a.user_id";

pub struct AuditRepo;

impl AuditRepo {
    pub async fn insert(
        pool: &PgPool,
        church_id: DbId,
        input: &CreateAuditLog,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO audit_logs (church_id, user_id, action_performed, entity_type,
                                     entity_id, details, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(church_id)
        .bind(input.user_id)
        .bind(&input.action_performed)
        .bind(&input.entity_type)
        .bind(&input.entity_id)
        .bind(&input.details)
        .bind(&input.ip_address)
        .bind(&input.user_agent)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List entries newest first.
    pub async fn list(
        pool: &PgPool,
        church_id: DbId,
        filter: &AuditFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "{SELECT_FROM}
             WHERE a.church_id = $1
               AND ($2::uuid IS NULL OR a.user_id = $2)
               AND ($3::text IS NULL OR a.action_performed = $3)
               AND ($4::text IS NULL OR a.entity_type = $4)
               AND ($5::timestamptz IS NULL OR a.created_at >= $5)
               AND ($6::timestamptz IS NULL OR a.created_at < $6)
             ORDER BY a.created_at DESC
             LIMIT $7 OFFSET $8"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(church_id)
            .bind(filter.user_id)
            .bind(&filter.action)
            .bind(&filter.entity_type)
            .bind(filter.from)
            .bind(filter.to)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        church_id: DbId,
        id: DbId,
    ) -> Result<Option<AuditLog>, sqlx::Error> {
        let query = format!("{SELECT_FROM} WHERE a.id = $1 AND a.church_id = $2");
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(id)
            .bind(church_id)
            .fetch_optional(pool)
            .await
    }
}
