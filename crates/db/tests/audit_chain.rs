//! Integration tests for the per-organization audit chain.
//!
//! Exercises append, query, and tamper detection against a real
//! database. Verification here mirrors what the API does: rebuild the
//! canonical content from stored columns and replay the chain.

use serde_json::json;
use sqlx::PgPool;
use trialgate_core::audit::{
    verify_chain, ChainEntryView, ChainIssueKind, EntryContent, GENESIS_HASH,
};
use trialgate_db::models::audit::{AuditLog, AuditQuery, NewAuditEntry};
use trialgate_db::repositories::AuditRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entry(organization_id: i64, action: &str, target_id: &str) -> NewAuditEntry {
    NewAuditEntry {
        organization_id,
        action: action.to_string(),
        target_type: Some("trial_submission".to_string()),
        target_id: Some(target_id.to_string()),
        agent: "user:2".to_string(),
        status: "success".to_string(),
        details: Some(json!({"patient_count": 3})),
        document_hash: None,
    }
}

/// Rebuild a verifier view from stored columns, exactly as the API's
/// integrity endpoint does.
fn chain_view(log: &AuditLog) -> ChainEntryView {
    let canonical_content = EntryContent {
        organization_id: log.organization_id,
        action: &log.action,
        target_type: log.target_type.as_deref(),
        target_id: log.target_id.as_deref(),
        agent: &log.agent,
        status: &log.status,
        details: log.details.as_ref(),
        document_hash: log.document_hash.as_deref(),
        timestamp: log.timestamp,
    }
    .canonical();

    ChainEntryView {
        entry_id: log.id,
        previous_hash: log.previous_hash.clone(),
        entry_hash: log.entry_hash.clone(),
        canonical_content,
    }
}

async fn verify_org(pool: &PgPool, organization_id: i64) -> trialgate_core::audit::ChainReport {
    let rows = AuditRepo::fetch_chain(pool, organization_id).await.unwrap();
    let views: Vec<ChainEntryView> = rows.iter().map(chain_view).collect();
    verify_chain(&views)
}

// ---------------------------------------------------------------------------
// Append and linking
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_entry_links_to_genesis(pool: PgPool) {
    let row = AuditRepo::append(&pool, &entry(1, "submission_created", "1"))
        .await
        .unwrap();

    assert_eq!(row.previous_hash, GENESIS_HASH);
    assert_eq!(row.entry_hash.len(), 64);
    assert_ne!(row.entry_hash, GENESIS_HASH);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn appends_link_and_survive_a_storage_roundtrip(pool: PgPool) {
    let a = AuditRepo::append(&pool, &entry(1, "submission_created", "1"))
        .await
        .unwrap();
    let b = AuditRepo::append(&pool, &entry(1, "patient_approved", "1"))
        .await
        .unwrap();
    let c = AuditRepo::append(&pool, &entry(1, "bulk_review", "1"))
        .await
        .unwrap();

    assert_eq!(b.previous_hash, a.entry_hash);
    assert_eq!(c.previous_hash, b.entry_hash);

    // Hashes recomputed from what the database stored (including the
    // timestamp after TIMESTAMPTZ truncation) must still match.
    let report = verify_org(&pool, 1).await;
    assert!(report.valid, "issues: {:?}", report.issues);
    assert_eq!(report.entries_checked, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn chains_are_isolated_per_organization(pool: PgPool) {
    AuditRepo::append(&pool, &entry(1, "submission_created", "1"))
        .await
        .unwrap();
    let first_for_org2 = AuditRepo::append(&pool, &entry(2, "submission_created", "2"))
        .await
        .unwrap();

    // Organization 2's chain starts at genesis regardless of what
    // organization 1 has appended.
    assert_eq!(first_for_org2.previous_hash, GENESIS_HASH);

    assert!(verify_org(&pool, 1).await.valid);
    assert!(verify_org(&pool, 2).await.valid);

    // Queries never cross tenants.
    let org2_rows = AuditRepo::query(&pool, 2, &AuditQuery::default())
        .await
        .unwrap();
    assert_eq!(org2_rows.len(), 1);
    assert_eq!(org2_rows[0].organization_id, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sensitive_details_are_redacted_before_hashing(pool: PgPool) {
    let mut e = entry(1, "submission_created", "1");
    e.details = Some(json!({"patient_count": 2, "api_key": "sk-live-xyz"}));

    let row = AuditRepo::append(&pool, &e).await.unwrap();
    let details = row.details.unwrap();
    assert_eq!(details["api_key"], "[REDACTED]");
    assert_eq!(details["patient_count"], 2);

    // The stored digest covers the redacted form, so the chain still
    // verifies.
    assert!(verify_org(&pool, 1).await.valid);
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn rewriting_stored_details_is_detected(pool: PgPool) {
    AuditRepo::append(&pool, &entry(1, "submission_created", "1"))
        .await
        .unwrap();
    let victim = AuditRepo::append(&pool, &entry(1, "patient_approved", "1"))
        .await
        .unwrap();
    AuditRepo::append(&pool, &entry(1, "patient_rejected", "1"))
        .await
        .unwrap();

    // Tamper out-of-band, bypassing the repository.
    sqlx::query("UPDATE audit_logs SET details = $2 WHERE id = $1")
        .bind(victim.id)
        .bind(json!({"patient_count": 999}))
        .execute(&pool)
        .await
        .unwrap();

    let report = verify_org(&pool, 1).await;
    assert!(!report.valid);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].entry_id, victim.id);
    assert_eq!(report.issues[0].kind, ChainIssueKind::HashMismatch);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_middle_entry_breaks_the_link(pool: PgPool) {
    AuditRepo::append(&pool, &entry(1, "submission_created", "1"))
        .await
        .unwrap();
    let victim = AuditRepo::append(&pool, &entry(1, "patient_approved", "1"))
        .await
        .unwrap();
    AuditRepo::append(&pool, &entry(1, "bulk_review", "1"))
        .await
        .unwrap();

    sqlx::query("DELETE FROM audit_logs WHERE id = $1")
        .bind(victim.id)
        .execute(&pool)
        .await
        .unwrap();

    let report = verify_org(&pool, 1).await;
    assert!(!report.valid);
    assert!(report
        .issues
        .iter()
        .any(|i| i.kind == ChainIssueKind::BrokenLink));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

/// Concurrent appends to the same organization serialize on the
/// advisory lock; every entry must end up with a distinct predecessor
/// and the chain must replay cleanly.
#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_appends_serialize_into_one_chain(pool: PgPool) {
    let e1 = entry(1, "submission_created", "1");
    let e2 = entry(1, "patient_approved", "1");
    let e3 = entry(1, "patient_rejected", "1");
    let e4 = entry(1, "bulk_review", "1");
    let (a, b, c, d) = tokio::join!(
        AuditRepo::append(&pool, &e1),
        AuditRepo::append(&pool, &e2),
        AuditRepo::append(&pool, &e3),
        AuditRepo::append(&pool, &e4),
    );
    let rows = [a.unwrap(), b.unwrap(), c.unwrap(), d.unwrap()];

    let mut predecessors: Vec<&str> = rows.iter().map(|r| r.previous_hash.as_str()).collect();
    predecessors.sort_unstable();
    predecessors.dedup();
    assert_eq!(predecessors.len(), 4, "each append saw a distinct predecessor");

    let report = verify_org(&pool, 1).await;
    assert!(report.valid, "issues: {:?}", report.issues);
    assert_eq!(report.entries_checked, 4);
}

// ---------------------------------------------------------------------------
// Query filters
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn action_filter_and_count_agree(pool: PgPool) {
    AuditRepo::append(&pool, &entry(1, "submission_created", "1"))
        .await
        .unwrap();
    AuditRepo::append(&pool, &entry(1, "patient_approved", "1"))
        .await
        .unwrap();
    AuditRepo::append(&pool, &entry(1, "patient_approved", "2"))
        .await
        .unwrap();

    let params = AuditQuery {
        action: Some("patient_approved".to_string()),
        ..Default::default()
    };

    let rows = AuditRepo::query(&pool, 1, &params).await.unwrap();
    let total = AuditRepo::count(&pool, 1, &params).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(total, 2);

    // Newest first.
    assert!(rows[0].id > rows[1].id);
}
