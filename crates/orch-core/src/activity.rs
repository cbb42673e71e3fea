// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C10 — ActivitySynthesizer: debounces raw `.git`-directory filesystem
//! events and fingerprints staged-index snapshots so a single user action
//! (e.g. `git add .`) surfaces as one semantic event, not one per inode.

use std::collections::HashMap;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::clock;

const DEDUPE_WINDOW_MS: u64 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFileRow {
    pub path: String,
    pub added: u32,
    pub deleted: u32,
    pub status_code: String,
}

/// Deterministic, permutation-invariant fingerprint of a staged-index
/// snapshot: rows are sorted before hashing so `buildIndexFingerprint` is
/// invariant under input ordering.
pub fn build_index_fingerprint(files: &[StagedFileRow]) -> String {
    let mut rows: Vec<String> = files.iter().map(|f| format!("{}|{}|{}|{}", f.path, f.added, f.deleted, f.status_code)).collect();
    rows.sort();
    let joined = rows.join(";");
    let digest = Sha256::digest(joined.as_bytes());
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn semantic_event_key(kind: &str, canonical_path: &str, details: &str) -> String {
    format!("{kind}|{canonical_path}|{details}")
}

/// Tracks last-emitted timestamps per `semanticEventKey` and per-repo index
/// fingerprints. Stateless with respect to the raw filesystem events
/// themselves — callers decide what `kind`/`canonicalPath`/`details` mean.
pub struct ActivitySynthesizer {
    last_emitted: Mutex<HashMap<String, u64>>,
    index_baselines: Mutex<HashMap<String, String>>,
}

impl ActivitySynthesizer {
    pub fn new() -> Self {
        Self { last_emitted: Mutex::new(HashMap::new()), index_baselines: Mutex::new(HashMap::new()) }
    }

    /// Returns `true` if this event should be emitted, `false` if it falls
    /// within 80ms of the last emission for the same `semanticEventKey`.
    pub fn should_emit(&self, semantic_event_key: &str) -> bool {
        let now = clock::now_ms();
        let mut last_emitted = self.last_emitted.lock();
        match last_emitted.get(semantic_event_key) {
            Some(&prev) if now.saturating_sub(prev) < DEDUPE_WINDOW_MS => false,
            _ => {
                last_emitted.insert(semantic_event_key.to_string(), now);
                true
            }
        }
    }

    /// Index-specific path: fingerprints the staged-file snapshot and
    /// compares against the repo's last baseline. Returns `Some(fingerprint)`
    /// when an `index_updated` event should be emitted, `None` when the
    /// snapshot is unchanged or this is the first-ever observation for the
    /// repo (baseline-only, per spec — never emit on first sight).
    pub fn observe_index_update(&self, repo_root: &str, files: &[StagedFileRow]) -> Option<String> {
        let fingerprint = build_index_fingerprint(files);
        let mut baselines = self.index_baselines.lock();
        let previous = baselines.insert(repo_root.to_string(), fingerprint.clone());
        match previous {
            None => None,
            Some(prev) if prev == fingerprint => None,
            Some(_) => Some(fingerprint),
        }
    }
}

impl Default for ActivitySynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
