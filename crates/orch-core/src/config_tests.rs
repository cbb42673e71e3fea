// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;
use serial_test::serial;

fn parse(args: &[&str]) -> Config {
    let mut full = vec!["orchd"];
    full.extend_from_slice(args);
    Config::parse_from(full)
}

#[test]
fn defaults_match_spec() {
    let cfg = parse(&[]);
    assert_eq!(cfg.gateway_listen_addr, "127.0.0.1:9888");
    assert_eq!(cfg.signaling_listen_addr, "127.0.0.1:9876");
    assert_eq!(cfg.code_ttl_minutes, 15);
    assert_eq!(cfg.approval_window_secs, 300);
    assert_eq!(cfg.join_invalid_threshold, 5);
    assert_eq!(cfg.join_lock_secs, 600);
    assert_eq!(cfg.terminal_ring_bytes, 65536);
}

#[test]
fn gateway_can_be_disabled() {
    for sentinel in ["off", "disabled", "none"] {
        let cfg = parse(&["--gateway-listen-addr", sentinel]);
        assert!(cfg.gateway_disabled());
    }
    assert!(!parse(&[]).gateway_disabled());
}

#[test]
fn allowed_origins_parses_comma_separated() {
    let cfg = parse(&["--signaling-allowed-origins", "https://a.example,https://b.example"]);
    assert_eq!(cfg.signaling_allowed_origins, vec!["https://a.example", "https://b.example"]);
}

// Mutates process-global environment state, so it must not interleave with
// any other test that reads or writes the same variables.
#[test]
#[serial]
fn env_vars_are_read_when_no_flag_is_given() {
    std::env::set_var("ORCH_CODE_TTL_MINUTES", "42");
    std::env::set_var("ORCH_SESSION_GATEWAY_LISTEN_ADDR", "127.0.0.1:7000");

    let cfg = parse(&[]);

    std::env::remove_var("ORCH_CODE_TTL_MINUTES");
    std::env::remove_var("ORCH_SESSION_GATEWAY_LISTEN_ADDR");

    assert_eq!(cfg.code_ttl_minutes, 42);
    assert_eq!(cfg.gateway_listen_addr, "127.0.0.1:7000");
}
