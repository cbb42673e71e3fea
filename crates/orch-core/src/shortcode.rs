// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C1 — ShortCodeIssuer: unambiguous human-dictatable session codes.

use rand::Rng;

/// Ambiguity-free charset: no 0/O/1/I/L.
const CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Current format: `XXXX-XXX` (8 chars incl. separator).
const CURRENT_GROUPS: (usize, usize) = (4, 3);
/// Legacy format: `XXX-YY`, accepted only to restore persisted rows.
const LEGACY_GROUPS: (usize, usize) = (3, 2);

const MAX_GENERATION_RETRIES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFormat {
    Current,
    Legacy,
}

/// Generate and validate short codes. Stateless aside from the RNG; callers
/// own the `codeIndex` collision check (this type knows nothing about
/// sessions).
pub struct ShortCodeIssuer;

impl ShortCodeIssuer {
    /// Generate a new current-format code, retrying on collision up to
    /// [`MAX_GENERATION_RETRIES`] times. `exists` should answer whether the
    /// normalized code is already indexed.
    pub fn generate(exists: impl Fn(&str) -> bool) -> Option<String> {
        let mut rng = rand::rng();
        for _ in 0..MAX_GENERATION_RETRIES {
            let code = Self::random_code(&mut rng, CURRENT_GROUPS);
            if !exists(&code) {
                return Some(code);
            }
        }
        None
    }

    fn random_code(rng: &mut impl Rng, groups: (usize, usize)) -> String {
        let (a, b) = groups;
        let mut out = String::with_capacity(a + b + 1);
        for _ in 0..a {
            out.push(CHARSET[rng.random_range(0..CHARSET.len())] as char);
        }
        out.push('-');
        for _ in 0..b {
            out.push(CHARSET[rng.random_range(0..CHARSET.len())] as char);
        }
        out
    }

    /// Normalize for comparison: uppercase + trim.
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Validate a (normalized or raw) code against current or legacy format.
    /// Total: rejects any character outside the charset or wrong shape.
    pub fn validate_format(code: &str) -> Option<CodeFormat> {
        let normalized = Self::normalize(code);
        if Self::matches_groups(&normalized, CURRENT_GROUPS) {
            Some(CodeFormat::Current)
        } else if Self::matches_groups(&normalized, LEGACY_GROUPS) {
            Some(CodeFormat::Legacy)
        } else {
            None
        }
    }

    fn matches_groups(normalized: &str, groups: (usize, usize)) -> bool {
        let (a, b) = groups;
        let expected_len = a + b + 1;
        if normalized.len() != expected_len {
            return false;
        }
        let Some((left, right)) = normalized.split_once('-') else {
            return false;
        };
        if left.len() != a || right.len() != b {
            return false;
        }
        left.bytes().chain(right.bytes()).all(|c| CHARSET.contains(&c))
    }
}

#[cfg(test)]
#[path = "shortcode_tests.rs"]
mod tests;
