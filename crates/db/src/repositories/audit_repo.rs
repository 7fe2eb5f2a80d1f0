//! Repository for the `audit_logs` table.
//!
//! Appends are serialized per organization with a transaction-scoped
//! advisory lock so the read-latest/insert pair can never interleave
//! for the same chain. Chains for different organizations never
//! contend. Rows are never updated or deleted; there is no redaction
//! or repair path.

use chrono::Utc;
use sqlx::PgPool;
use trialgate_core::audit::{
    compute_entry_hash, redact_sensitive_fields, EntryContent, GENESIS_HASH,
};
use trialgate_core::types::{DbId, Timestamp};

use crate::models::audit::{AuditLog, AuditQuery, NewAuditEntry};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const COLUMNS: &str = "\
    id, organization_id, timestamp, action, target_type, target_id, \
    agent, status, details, document_hash, previous_hash, entry_hash";

/// Keyspace tag for the per-organization advisory lock, so audit
/// appends cannot collide with any future advisory-lock user.
const LOCK_NAMESPACE: i64 = 0x5447_4143 << 32; // "TGAC"

/// Single bigint advisory-lock key for one organization's chain.
///
/// XOR keeps the mapping bijective over the full i64 id range, so two
/// distinct organizations can never share a lock key.
fn chain_lock_key(organization_id: DbId) -> i64 {
    LOCK_NAMESPACE ^ organization_id
}

// ---------------------------------------------------------------------------
// AuditRepo
// ---------------------------------------------------------------------------

pub struct AuditRepo;

impl AuditRepo {
    /// Append one entry to an organization's chain.
    ///
    /// Inside the transaction: take the organization's advisory lock,
    /// read the latest predecessor by `id` (commit order, immune to
    /// clock skew), compute the entry hash over the canonical content,
    /// insert. A concurrent appender for the same organization blocks
    /// on the lock until this transaction commits, so it always sees
    /// this entry as its predecessor.
    pub async fn append(pool: &PgPool, entry: &NewAuditEntry) -> Result<AuditLog, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(chain_lock_key(entry.organization_id))
            .execute(&mut *tx)
            .await?;

        let previous_hash: Option<String> = sqlx::query_scalar(
            "SELECT entry_hash FROM audit_logs \
             WHERE organization_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(entry.organization_id)
        .fetch_optional(&mut *tx)
        .await?;
        let previous_hash = previous_hash.unwrap_or_else(|| GENESIS_HASH.to_string());

        // Redact before hashing: the digest must cover exactly what is
        // stored.
        let details = entry.details.as_ref().map(redact_sensitive_fields);
        let timestamp: Timestamp = Utc::now();

        let content = EntryContent {
            organization_id: entry.organization_id,
            action: &entry.action,
            target_type: entry.target_type.as_deref(),
            target_id: entry.target_id.as_deref(),
            agent: &entry.agent,
            status: &entry.status,
            details: details.as_ref(),
            document_hash: entry.document_hash.as_deref(),
            timestamp,
        }
        .canonical();
        let entry_hash = compute_entry_hash(&previous_hash, &content);

        let insert_query = format!(
            "INSERT INTO audit_logs \
                (organization_id, timestamp, action, target_type, target_id, \
                 agent, status, details, document_hash, previous_hash, entry_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AuditLog>(&insert_query)
            .bind(entry.organization_id)
            .bind(timestamp)
            .bind(&entry.action)
            .bind(&entry.target_type)
            .bind(&entry.target_id)
            .bind(&entry.agent)
            .bind(&entry.status)
            .bind(&details)
            .bind(&entry.document_hash)
            .bind(&previous_hash)
            .bind(&entry_hash)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Query one organization's entries with filters, newest first.
    pub async fn query(
        pool: &PgPool,
        organization_id: DbId,
        params: &AuditQuery,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let limit = params.limit.unwrap_or(100).min(500);
        let offset = params.offset.unwrap_or(0);

        let (where_clause, binds, next_idx) = build_filter(params);
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs \
             WHERE organization_id = $1{where_clause} \
             ORDER BY id DESC \
             LIMIT ${next_idx} OFFSET ${}",
            next_idx + 1
        );

        let mut q = sqlx::query_as::<_, AuditLog>(&query).bind(organization_id);
        for value in &binds {
            q = q.bind(value);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count entries matching the filter (pagination metadata).
    pub async fn count(
        pool: &PgPool,
        organization_id: DbId,
        params: &AuditQuery,
    ) -> Result<i64, sqlx::Error> {
        let (where_clause, binds, _) = build_filter(params);
        let query = format!(
            "SELECT COUNT(*)::BIGINT FROM audit_logs WHERE organization_id = $1{where_clause}"
        );

        let mut q = sqlx::query_scalar::<_, i64>(&query).bind(organization_id);
        for value in &binds {
            q = q.bind(value);
        }
        q.fetch_one(pool).await
    }

    /// Load an organization's full chain in link order for
    /// verification.
    pub async fn fetch_chain(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs WHERE organization_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }

    /// Export an organization's entries within a time range, oldest
    /// first (compliance export).
    pub async fn export_range(
        pool: &PgPool,
        organization_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs \
             WHERE organization_id = $1 AND timestamp >= $2 AND timestamp <= $3 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(organization_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Filter building
// ---------------------------------------------------------------------------

/// Build the optional filter conditions after the mandatory
/// organization scope (`$1`). All filters are text equality, so the
/// bind values stay a plain `Vec<String>`.
fn build_filter(params: &AuditQuery) -> (String, Vec<String>, u32) {
    let mut clause = String::new();
    let mut binds: Vec<String> = Vec::new();
    let mut idx = 2u32;

    for (column, value) in [
        ("agent", &params.agent),
        ("action", &params.action),
        ("target_type", &params.target_type),
    ] {
        if let Some(v) = value {
            clause.push_str(&format!(" AND {column} = ${idx}"));
            binds.push(v.clone());
            idx += 1;
        }
    }

    (clause, binds, idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_keys_stay_distinct_for_wide_organization_ids() {
        // Ids differing only above bit 31 must not share a lock key.
        let low = chain_lock_key(7);
        let high = chain_lock_key(7 + (1i64 << 33));
        assert_ne!(low, high);
        assert_eq!(chain_lock_key(7), low);
    }
}
