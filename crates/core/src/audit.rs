//! Audit chain primitives: canonical entry encoding, hash computation,
//! and pure chain verification.
//!
//! Every state-changing operation appends one entry to its tenant's
//! chain. Entries are hash-linked: each entry's hash covers its own
//! canonical content plus the previous entry's hash, so any later
//! mutation of a stored row is detectable by replaying the chain.

use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;

use crate::hashing;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// `previous_hash` of the first entry in every tenant's chain.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Known action tags for audit entries.
pub mod actions {
    pub const SUBMISSION_CREATED: &str = "submission_created";
    pub const PATIENT_APPROVED: &str = "patient_approved";
    pub const PATIENT_REJECTED: &str = "patient_rejected";
    pub const BULK_REVIEW: &str = "bulk_review";
    pub const REVIEW_NOTE: &str = "review_note";
    pub const SUBMISSION_WITHDRAWN: &str = "submission_withdrawn";
}

/// Outcome tags recorded in the `status` column.
pub mod statuses {
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
}

// ---------------------------------------------------------------------------
// Canonical JSON
// ---------------------------------------------------------------------------

/// Serialize a JSON value with recursively sorted object keys.
///
/// The digest input must be byte-for-byte reproducible between append
/// and verification, regardless of how the value was built or which
/// map implementation backs it.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        Value::String(k.clone()),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let elems: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", elems.join(","))
        }
        scalar => scalar.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Entry content and hash computation
// ---------------------------------------------------------------------------

/// The fields of an audit entry that are covered by its hash.
///
/// Timestamps are rendered at microsecond precision because that is
/// what TIMESTAMPTZ preserves; anything finer would make the stored
/// row hash differently from the appended one.
#[derive(Debug, Clone)]
pub struct EntryContent<'a> {
    pub organization_id: DbId,
    pub action: &'a str,
    pub target_type: Option<&'a str>,
    pub target_id: Option<&'a str>,
    pub agent: &'a str,
    pub status: &'a str,
    pub details: Option<&'a Value>,
    pub document_hash: Option<&'a str>,
    pub timestamp: Timestamp,
}

impl EntryContent<'_> {
    /// Pipe-delimited canonical rendering used as the digest input.
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.organization_id,
            self.action,
            self.target_type.unwrap_or(""),
            self.target_id.unwrap_or(""),
            self.agent,
            self.status,
            self.details.map(canonical_json).unwrap_or_default(),
            self.document_hash.unwrap_or(""),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        )
    }
}

/// Compute an entry's chain hash from its predecessor's hash and its
/// own canonical content.
pub fn compute_entry_hash(previous_hash: &str, canonical_content: &str) -> String {
    hashing::sha256_hex(format!("{previous_hash}|{canonical_content}").as_bytes())
}

// ---------------------------------------------------------------------------
// Detail redaction
// ---------------------------------------------------------------------------

/// Keys whose values must never reach the audit store.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "authorization",
    "credential",
];

/// Replace the value of any sensitive key with `"[REDACTED]"`,
/// recursing through nested objects and arrays.
pub fn redact_sensitive_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, val) in map {
                let lower = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower.contains(f)) {
                    out.insert(key.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    out.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Chain verification
// ---------------------------------------------------------------------------

/// One stored entry as seen by the verifier.
#[derive(Debug, Clone)]
pub struct ChainEntryView {
    pub entry_id: DbId,
    pub previous_hash: String,
    pub entry_hash: String,
    /// Canonical content rebuilt from the stored columns.
    pub canonical_content: String,
}

/// What went wrong at a given position in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainIssueKind {
    /// `previous_hash` does not match the predecessor's `entry_hash`
    /// (or the genesis value, for the first entry).
    BrokenLink,
    /// The stored `entry_hash` does not match a recomputation over the
    /// stored columns; the entry itself was altered.
    HashMismatch,
}

/// A single verification failure.
#[derive(Debug, Clone, Serialize)]
pub struct ChainIssue {
    /// Zero-based position in the tenant's chain.
    pub index: usize,
    pub entry_id: DbId,
    pub kind: ChainIssueKind,
    pub message: String,
}

/// Result of replaying one tenant's chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub entries_checked: usize,
    pub valid: bool,
    pub issues: Vec<ChainIssue>,
}

/// Replay a tenant's chain and report every break found.
///
/// All issues are preserved, not only the earliest, so that multiple
/// independent tamper points can be diagnosed in one pass. An empty
/// chain is trivially valid. This function never mutates anything;
/// a broken chain is reported, never repaired.
pub fn verify_chain(entries: &[ChainEntryView]) -> ChainReport {
    let mut issues = Vec::new();
    let mut expected_prev = GENESIS_HASH.to_string();

    for (index, entry) in entries.iter().enumerate() {
        if entry.previous_hash != expected_prev {
            issues.push(ChainIssue {
                index,
                entry_id: entry.entry_id,
                kind: ChainIssueKind::BrokenLink,
                message: format!(
                    "entry {} expected previous_hash {} but found {}",
                    entry.entry_id, expected_prev, entry.previous_hash
                ),
            });
        }

        let recomputed = compute_entry_hash(&entry.previous_hash, &entry.canonical_content);
        if recomputed != entry.entry_hash {
            issues.push(ChainIssue {
                index,
                entry_id: entry.entry_id,
                kind: ChainIssueKind::HashMismatch,
                message: format!(
                    "entry {} content does not match its recorded hash",
                    entry.entry_id
                ),
            });
        }

        // The stored hash stays authoritative for the next link check:
        // one corrupted entry must not cascade into failures for every
        // later, untouched entry.
        expected_prev = entry.entry_hash.clone();
    }

    ChainReport {
        entries_checked: entries.len(),
        valid: issues.is_empty(),
        issues,
    }
}
