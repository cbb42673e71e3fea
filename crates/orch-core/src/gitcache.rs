// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C8 — GitCache: four short-TTL keyed caches for the Git panel's read
//! surface, with repo-scoped invalidation after writes.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock;

const PREFLIGHT_TTL_MS: u64 = 2_000;
const STATUS_TTL_MS: u64 = 1_200;
const HISTORY_TTL_MS: u64 = 2_000;
const DIFF_TTL_MS: u64 = 2_000;

/// 1 MiB — files larger than this never get a real diff, per the degraded
/// diff path.
const DIFF_SIZE_LIMIT_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffPayload {
    pub patch: String,
    pub is_truncated: bool,
}

impl DiffPayload {
    fn truncated() -> Self {
        Self { patch: String::new(), is_truncated: true }
    }
}

#[derive(Clone)]
struct Entry<T> {
    value: T,
    expires_at: u64,
}

struct TtlMap<K, V> {
    ttl_ms: u64,
    entries: HashMap<K, Entry<V>>,
}

impl<K: std::hash::Hash + Eq + Clone, V: Clone> TtlMap<K, V> {
    fn new(ttl_ms: u64) -> Self {
        Self { ttl_ms, entries: HashMap::new() }
    }

    fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= clock::now_ms() {
            return None;
        }
        Some(entry.value.clone())
    }

    fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, Entry { value, expires_at: clock::now_ms() + self.ttl_ms });
    }

    fn remove(&mut self, key: &K) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    pub repo_root: String,
    pub cursor: String,
    pub limit: u32,
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffKey {
    pub repo_root: String,
    pub file_path: String,
    pub mode: String,
    pub context_lines: u32,
}

struct State {
    preflight: TtlMap<String, serde_json::Value>,
    status: TtlMap<String, serde_json::Value>,
    history: TtlMap<HistoryKey, serde_json::Value>,
    diff: TtlMap<DiffKey, DiffPayload>,
}

/// TTL-bounded read caches keyed by repo, invalidated wholesale on writes to
/// that repo (see [`GitCache::invalidate_repo_cache`]).
pub struct GitCache {
    state: RwLock<State>,
}

impl GitCache {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                preflight: TtlMap::new(PREFLIGHT_TTL_MS),
                status: TtlMap::new(STATUS_TTL_MS),
                history: TtlMap::new(HISTORY_TTL_MS),
                diff: TtlMap::new(DIFF_TTL_MS),
            }),
        }
    }

    pub fn get_preflight(&self, repo_path: &str) -> Option<serde_json::Value> {
        self.state.read().preflight.get(&repo_path.to_string())
    }

    pub fn put_preflight(&self, repo_path: &str, value: serde_json::Value) {
        self.state.write().preflight.insert(repo_path.to_string(), value);
    }

    pub fn get_status(&self, repo_root: &str) -> Option<serde_json::Value> {
        self.state.read().status.get(&repo_root.to_string())
    }

    pub fn put_status(&self, repo_root: &str, value: serde_json::Value) {
        self.state.write().status.insert(repo_root.to_string(), value);
    }

    pub fn get_history(&self, key: &HistoryKey) -> Option<serde_json::Value> {
        self.state.read().history.get(key)
    }

    pub fn put_history(&self, key: HistoryKey, value: serde_json::Value) {
        self.state.write().history.insert(key, value);
    }

    /// Returns the cached diff, or `None` if not cached. Callers should
    /// check [`GitCache::diff_degraded_for_size`] before invoking Git at all.
    pub fn get_diff(&self, key: &DiffKey) -> Option<DiffPayload> {
        self.state.read().diff.get(key)
    }

    pub fn put_diff(&self, key: DiffKey, value: DiffPayload) {
        self.state.write().diff.insert(key, value);
    }

    /// Files over 1 MiB never get a real diff computed; callers should
    /// short-circuit to this payload without invoking Git.
    pub fn diff_degraded_for_size(file_size_bytes: u64) -> Option<DiffPayload> {
        (file_size_bytes > DIFF_SIZE_LIMIT_BYTES).then(DiffPayload::truncated)
    }

    /// A Git timeout computing a diff never surfaces as a raw timeout to
    /// callers — it degrades to the same truncated payload shape.
    pub fn diff_timeout_fallback() -> DiffPayload {
        DiffPayload::truncated()
    }

    /// Removes preflight entries for `repo_path`, the status entry for
    /// `repo_root`, and all history/diff keys whose repo root prefix
    /// matches. An empty or `"."` path purges everything (used on reset).
    pub fn invalidate_repo_cache(&self, repo_path: &str) {
        let mut state = self.state.write();
        if repo_path.is_empty() || repo_path == "." {
            state.preflight.clear();
            state.status.clear();
            state.history.clear();
            state.diff.clear();
            return;
        }

        state.preflight.remove(&repo_path.to_string());
        state.status.remove(&repo_path.to_string());
        state.history.entries.retain(|k, _| k.repo_root != repo_path);
        state.diff.entries.retain(|k, _| k.repo_root != repo_path);
    }
}

impl Default for GitCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "gitcache_tests.rs"]
mod tests;
