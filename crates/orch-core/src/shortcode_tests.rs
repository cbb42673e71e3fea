// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn generated_codes_are_current_format() {
    let code = ShortCodeIssuer::generate(|_| false).expect("should generate");
    assert_eq!(ShortCodeIssuer::validate_format(&code), Some(CodeFormat::Current));
}

#[test]
fn generation_retries_on_collision_then_fails() {
    // Every candidate "already exists" -> exhausts retries and returns None.
    assert!(ShortCodeIssuer::generate(|_| true).is_none());
}

#[test]
fn generation_retries_then_succeeds() {
    use std::cell::Cell;
    let attempts = Cell::new(0);
    let code = ShortCodeIssuer::generate(|_| {
        let n = attempts.get();
        attempts.set(n + 1);
        n < 3
    });
    assert!(code.is_some());
    assert!(attempts.get() >= 4);
}

#[parameterized(
    current = { "ABCD-EFG", Some(CodeFormat::Current) },
    current_lowercase = { "abcd-efg", Some(CodeFormat::Current) },
    legacy = { "ABC-DE", Some(CodeFormat::Legacy) },
    bad_separator = { "ABCDEFG", None },
    bad_charset_zero = { "0BCD-EFG", None },
    bad_charset_o = { "OBCD-EFG", None },
    bad_charset_one = { "1BCD-EFG", None },
    bad_charset_i = { "IBCD-EFG", None },
    bad_charset_l = { "LBCD-EFG", None },
    wrong_length = { "ABCDE-FG", None },
    empty = { "", None },
)]
fn format_validation_is_total(input: &str, expected: Option<CodeFormat>) {
    assert_eq!(ShortCodeIssuer::validate_format(input), expected);
}

#[test]
fn normalize_trims_and_uppercases() {
    assert_eq!(ShortCodeIssuer::normalize("  abcd-efg \n"), "ABCD-EFG");
}
