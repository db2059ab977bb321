//! Tests for the query, maintenance and generator subcommands.

use super::parse;
use crate::cli::commands::{format_event, format_rate};
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use pdm_core::events::ProgressEvent;
use pdm_core::registry::JobState;

#[test]
fn cli_parse_per_content_commands() {
    match parse(&["pdm", "status", "c1"]) {
        CliCommand::Status { content_id } => assert_eq!(content_id, "c1"),
        _ => panic!("expected Status"),
    }
    match parse(&["pdm", "files", "c1"]) {
        CliCommand::Files { content_id } => assert_eq!(content_id, "c1"),
        _ => panic!("expected Files"),
    }
    match parse(&["pdm", "path", "c1"]) {
        CliCommand::Path { content_id } => assert_eq!(content_id, "c1"),
        _ => panic!("expected Path"),
    }
    match parse(&["pdm", "count", "c1"]) {
        CliCommand::Count { content_id } => assert_eq!(content_id, "c1"),
        _ => panic!("expected Count"),
    }
}

#[test]
fn cli_parse_delete() {
    match parse(&["pdm", "delete", "c1"]) {
        CliCommand::Delete { content_id, path } => {
            assert_eq!(content_id, "c1");
            assert!(path.is_none());
        }
        _ => panic!("expected Delete"),
    }
    match parse(&["pdm", "delete", "c1", "--path", "/data/c1"]) {
        CliCommand::Delete { path, .. } => {
            assert_eq!(path.as_deref(), Some(std::path::Path::new("/data/c1")));
        }
        _ => panic!("expected Delete with --path"),
    }
}

#[test]
fn cli_parse_registry_commands() {
    assert!(matches!(parse(&["pdm", "jobs"]), CliCommand::Jobs));
    assert!(matches!(parse(&["pdm", "prune"]), CliCommand::Prune));
}

#[test]
fn cli_parse_generators() {
    assert!(matches!(
        parse(&["pdm", "completions", "bash"]),
        CliCommand::Completions { shell: clap_complete::Shell::Bash }
    ));
    assert!(matches!(parse(&["pdm", "man"]), CliCommand::Man));
    assert!(Cli::try_parse_from(["pdm", "completions", "tcsh"]).is_err());
}

#[test]
fn cli_parse_unknown_command_fails() {
    assert!(Cli::try_parse_from(["pdm", "bench", "http://x"]).is_err());
}

#[test]
fn rate_formatting() {
    assert_eq!(format_rate(0), "0 B/s");
    assert_eq!(format_rate(1023), "1023 B/s");
    assert_eq!(format_rate(1536), "1.5 KiB/s");
    assert_eq!(format_rate(5 * 1024 * 1024), "5.0 MiB/s");
}

#[test]
fn event_line_contains_status_and_pages() {
    let line = format_event(&ProgressEvent {
        content_id: "c1".into(),
        downloaded_pages: 2,
        total_pages: 4,
        status: JobState::Running,
        download_speed: 2048,
    });
    assert!(line.starts_with("c1"));
    assert!(line.contains("RUNNING"));
    assert!(line.contains("2/4"));
    assert!(line.ends_with("2.0 KiB/s"));
}
