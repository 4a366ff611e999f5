//! End-to-end tests for the `compass-rs` binary.
//!
//! Agents live in a temporary fixture file and point at a closed local port,
//! so no test depends on network services.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FIXTURE: &str = r#"{
  "agents": [
    {
      "agent_id": "painter",
      "name": "Landscape Painter",
      "description": "Renders images from prompts",
      "url": "http://127.0.0.1:9/painter",
      "provider": { "organization": "Easel Co" },
      "capabilities": { "image_processing": true },
      "category": "creative",
      "tags": ["art"],
      "reliability": 0.97
    },
    {
      "agentId": "scribe",
      "name": "Scribe",
      "url": "http://127.0.0.1:9/scribe",
      "capabilities": { "text_processing": true, "image_processing": false },
      "skills": [{ "name": "drafting", "description": "Writes first drafts" }],
      "category": "writing",
      "cost": 0.5
    }
  ]
}"#;

fn fixture() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agents.json");
    std::fs::write(&path, FIXTURE).unwrap();
    (dir, path)
}

fn compass() -> Command {
    let mut cmd = Command::cargo_bin("compass-rs").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("COMPASS_API_KEY")
        .env_remove("COMPASS_LEDGER_URL")
        .env_remove("COMPASS_AGENTS")
        .env_remove("RUST_LOG")
        .env("COMPASS_ANALYZER", "keyword");
    cmd
}

#[test]
fn test_analyze_keyword() {
    compass()
        .args(["analyze", "Generate a photorealistic mountain landscape image"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intent:      creation"))
        .stdout(predicate::str::contains("Required:    image_processing"));
}

#[test]
fn test_search_ranks_matching_agent() {
    let (_dir, path) = fixture();
    compass()
        .arg("--agents")
        .arg(&path)
        .args(["search", "edit this photo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Agents (1 of 1 found):"))
        .stdout(predicate::str::contains("painter"))
        .stdout(predicate::str::contains("scribe").not());
}

#[test]
fn test_search_json_preferred_boost() {
    let (_dir, path) = fixture();
    let output = compass()
        .arg("--agents")
        .arg(&path)
        .args(["--format", "json", "search", "a picture", "--prefer", "painter"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total_found"], 1);
    assert_eq!(json["agents"][0]["agent_id"], "painter");
    let score = json["agents"][0]["relevance_score"].as_f64().unwrap();
    assert!((score - 0.9).abs() < 1e-9);
}

#[test]
fn test_agents_lists_by_category() {
    let (_dir, path) = fixture();
    compass()
        .arg("--agents")
        .arg(&path)
        .args(["agents", "--category", "writing"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1 agent(s):"))
        .stdout(predicate::str::contains("scribe"));
}

#[test]
fn test_agent_details_and_unknown() {
    let (_dir, path) = fixture();
    compass()
        .arg("--agents")
        .arg(&path)
        .args(["agent", "scribe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Capabilities: text_processing"))
        .stdout(predicate::str::contains("drafting: Writes first drafts"));

    compass()
        .arg("--agents")
        .arg(&path)
        .args(["agent", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("agent not found: ghost"));
}

#[test]
fn test_route_unreachable_agent_reports_failure() {
    let (_dir, path) = fixture();
    let output = compass()
        .arg("--agents")
        .arg(&path)
        .args([
            "--format",
            "json",
            "route",
            "write a document about rivers",
            "--timeout-ms",
            "2000",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let used = json["agents_used"].as_array().unwrap();
    let raw = json["raw_responses"].as_array().unwrap();
    assert_eq!(used.len(), raw.len());
    assert_eq!(used[0], "scribe");
    assert!(raw[0]["error"].is_string());
    assert!(
        json["synthesized_response"]
            .as_str()
            .unwrap()
            .contains("could not be completed")
    );
}

#[test]
fn test_route_without_candidates() {
    let (_dir, path) = fixture();
    compass()
        .arg("--agents")
        .arg(&path)
        .args(["route", "crunch the statistics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No agent was available"));
}

#[test]
fn test_empty_query_fails() {
    let (_dir, path) = fixture();
    compass()
        .arg("--agents")
        .arg(&path)
        .args(["search", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("query cannot be empty"));
}

#[test]
fn test_missing_directory_fails() {
    compass()
        .args(["search", "draw a picture"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no agent directory"));
}

#[test]
fn test_init_prompts() {
    let dir = TempDir::new().unwrap();
    compass()
        .args(["init-prompts", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("analyzer.md"));
    assert!(dir.path().join("analyzer.md").exists());
}
