//! Utility helpers shared across integration tests.
#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::{
    fs,
    path::{Path, PathBuf},
    process::Output,
};

use assert_cmd::Command;
use discordwiki::{AuthorDirectory, AuthorRecord};

/// Verified members used throughout the archive scenarios.
pub const AUTHORS_JSON: &str = r#"[
    {"memberId": "123", "wikiAccount": "Ironwestie", "displayName": "Ironwestie"},
    {"memberId": "456", "wikiAccount": "TestUser", "displayName": "Test User"}
]"#;

pub fn authors() -> AuthorDirectory {
    AuthorDirectory::new(vec![
        AuthorRecord {
            member_id: "123".into(),
            wiki_account: "Ironwestie".into(),
            display_name: "Ironwestie".into(),
        },
        AuthorRecord {
            member_id: "456".into(),
            wiki_account: "TestUser".into(),
            display_name: "Test User".into(),
        },
    ])
}

/// JSON for a plain message at `timestamp`.
pub fn message_json(author_id: &str, timestamp: &str, content: &str) -> String {
    format!(
        r#"{{"author": {{"id": "{author_id}", "username": "user{author_id}"}}, "timestamp": "{timestamp}", "content": {}}}"#,
        serde_json::to_string(content).expect("string serialises")
    )
}

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("failed to write test file");
    path
}

pub fn cli() -> Command {
    Command::cargo_bin("discordwiki").expect("failed to create cargo command for discordwiki")
}

/// Run the binary with `args` and no stdin.
pub fn run_cli_with_args(args: &[&str]) -> Output {
    cli()
        .args(args)
        .write_stdin("")
        .output()
        .expect("failed to run discordwiki")
}

/// Run the binary with `args`, feeding `input` on stdin.
pub fn run_cli_with_stdin(args: &[&str], input: &str) -> Output {
    cli()
        .args(args)
        .write_stdin(input)
        .output()
        .expect("failed to run discordwiki")
}
