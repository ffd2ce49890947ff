//! Tests for the send and config subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use tsend_core::TelemetryKind;

#[test]
fn cli_parse_send() {
    match parse(&["tsend", "send", "points.json", "--kind", "metrics"]) {
        CliCommand::Send {
            file,
            kind,
            endpoint,
            no_compress,
            ..
        } => {
            assert_eq!(file, std::path::Path::new("points.json"));
            assert_eq!(kind, TelemetryKind::Metrics);
            assert!(endpoint.is_none());
            assert!(!no_compress);
        }
        _ => panic!("expected Send"),
    }
}

#[test]
fn cli_parse_send_overrides() {
    match parse(&[
        "tsend",
        "send",
        "spans.json",
        "--kind",
        "span",
        "--api-key",
        "abc",
        "--endpoint",
        "http://127.0.0.1:8080/trace/v1",
        "--no-compress",
    ]) {
        CliCommand::Send {
            kind,
            api_key,
            endpoint,
            no_compress,
            ..
        } => {
            assert_eq!(kind, TelemetryKind::Spans);
            assert_eq!(api_key.as_deref(), Some("abc"));
            assert_eq!(endpoint.as_deref(), Some("http://127.0.0.1:8080/trace/v1"));
            assert!(no_compress);
        }
        _ => panic!("expected Send with overrides"),
    }
}

#[test]
fn cli_parse_send_requires_kind() {
    assert!(Cli::try_parse_from(["tsend", "send", "points.json"]).is_err());
    assert!(Cli::try_parse_from(["tsend", "send", "p.json", "--kind", "traces"]).is_err());
}

#[test]
fn cli_parse_config_with_global_path() {
    let cli = Cli::try_parse_from(["tsend", "config", "--config", "/tmp/tsend.toml"]).unwrap();
    assert!(matches!(cli.command, CliCommand::Config));
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/tmp/tsend.toml"))
    );
}
