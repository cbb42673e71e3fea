// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C9 — TerminalBinding: the sessionID↔agentID bijection and the
//! bounded ring-buffer output history kept per terminal session.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{ErrorCode, OrchError};
use crate::ring::RingBuffer;

/// Workspace id forced onto the very first agent ever bound, mirroring the
/// "auto-create Default, set active" behavior of the workspace manager this
/// module delegates to outside this crate.
pub const DEFAULT_WORKSPACE_ID: u64 = 0;

struct Binding {
    agent_id: String,
    workspace_id: Option<u64>,
}

pub struct TerminalBinding {
    ring_capacity: usize,
    bindings: RwLock<HashMap<String, Binding>>,
    agent_owner: RwLock<HashMap<String, String>>,
    buffers: RwLock<HashMap<String, RingBuffer>>,
    forced_default: RwLock<bool>,
}

impl TerminalBinding {
    pub fn new(ring_capacity: usize) -> Self {
        Self {
            ring_capacity,
            bindings: RwLock::new(HashMap::new()),
            agent_owner: RwLock::new(HashMap::new()),
            buffers: RwLock::new(HashMap::new()),
            forced_default: RwLock::new(false),
        }
    }

    /// Registers sessionID↔agentID. Fails if the agent is already bound to
    /// a different terminal session (the bijection invariant).
    pub fn bind(&self, session_id: &str, agent_id: &str, mut workspace_id: Option<u64>) -> Result<(), OrchError> {
        let mut owner = self.agent_owner.write();
        if let Some(existing) = owner.get(agent_id) {
            if existing != session_id {
                return Err(OrchError::with_detail(ErrorCode::CommandFailed, "agent already bound to another terminal session"));
            }
        }

        let mut forced = self.forced_default.write();
        if !*forced && owner.is_empty() {
            workspace_id = workspace_id.or(Some(DEFAULT_WORKSPACE_ID));
            *forced = true;
        }
        drop(forced);

        owner.insert(agent_id.to_string(), session_id.to_string());
        self.bindings.write().insert(session_id.to_string(), Binding { agent_id: agent_id.to_string(), workspace_id });
        self.buffers.write().entry(session_id.to_string()).or_insert_with(|| RingBuffer::new(self.ring_capacity));
        Ok(())
    }

    /// Unbinds and clears history; returns the agent id that was bound, if
    /// any, so the caller can tear down its runtime.
    pub fn unbind(&self, session_id: &str) -> Option<String> {
        let binding = self.bindings.write().remove(session_id)?;
        self.agent_owner.write().remove(&binding.agent_id);
        self.buffers.write().remove(session_id);
        Some(binding.agent_id)
    }

    pub fn agent_of(&self, session_id: &str) -> Option<String> {
        self.bindings.read().get(session_id).map(|b| b.agent_id.clone())
    }

    pub fn workspace_of(&self, session_id: &str) -> Option<u64> {
        self.bindings.read().get(session_id).and_then(|b| b.workspace_id)
    }

    pub fn append_output(&self, session_id: &str, text: &str) {
        if let Some(buf) = self.buffers.write().get_mut(session_id) {
            buf.write(text.as_bytes());
        }
    }

    /// CLI snapshot: the full output currently retained in the ring.
    pub fn snapshot(&self, session_id: &str) -> Option<String> {
        let buffers = self.buffers.read();
        let buf = buffers.get(session_id)?;
        let oldest = buf.total_written().saturating_sub(self.ring_capacity as u64);
        let (a, b) = buf.read_from(oldest)?;
        let mut bytes = Vec::with_capacity(a.len() + b.len());
        bytes.extend_from_slice(a);
        bytes.extend_from_slice(b);
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// CLI restore: seed a freshly bound session's ring with prior output
    /// (e.g. rehydrated from a persisted snapshot on restart).
    pub fn restore(&self, session_id: &str, text: &str) {
        self.append_output(session_id, text);
    }

    /// Non-empty per-agent histories for the given workspace.
    pub fn workspace_history_buffer(&self, workspace_id: u64) -> HashMap<String, String> {
        let bindings = self.bindings.read();
        let mut out = HashMap::new();
        for (session_id, binding) in bindings.iter() {
            if binding.workspace_id != Some(workspace_id) {
                continue;
            }
            if let Some(text) = self.snapshot(session_id) {
                if !text.is_empty() {
                    out.insert(binding.agent_id.clone(), text);
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
