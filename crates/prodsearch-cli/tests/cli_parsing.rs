//! CLI parsing tests for the prodsearch command
//!
//! Everything here runs without Qdrant or an embedding server: either the
//! command only parses arguments, or it never leaves the process.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Working directory inside the temporary home
fn workdir(home: &TempDir) -> std::path::PathBuf {
    let dir = home.path().join("work");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Get a Command for the prodsearch binary, isolated from the user's config
#[allow(deprecated)]
fn prodsearch(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("prodsearch").expect("Failed to find prodsearch binary");
    cmd.env("HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("PRODSEARCH_CONFIG")
        .env_remove("PRODSEARCH_QDRANT_URL")
        .env_remove("PRODSEARCH_COLLECTION")
        .env_remove("PRODSEARCH_EMBEDDING_PROVIDER")
        .current_dir(workdir(home));
    cmd
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("prodsearch"));
}

#[test]
fn test_global_options_in_help() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--qdrant-url"))
        .stdout(predicate::str::contains("--collection"));
}

// ============================================================================
// Search Command Tests
// ============================================================================

#[test]
fn test_search_help() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--filter"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--stats"));
}

#[test]
fn test_search_mode_values() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auto"))
        .stdout(predicate::str::contains("dense"))
        .stdout(predicate::str::contains("sparse"))
        .stdout(predicate::str::contains("hybrid"))
        .stdout(predicate::str::contains("rrf"))
        .stdout(predicate::str::contains("fusion"));
}

#[test]
fn test_search_requires_query() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["search"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_search_rejects_unknown_mode() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["search", "torch", "--mode", "semantic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_search_rejects_malformed_filter_offline() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["search", "torch", "--filter", "brand"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("field=value"));
}

// ============================================================================
// Classify Command Tests
// ============================================================================

#[test]
fn test_classify_requires_a_query() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["classify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_classify_text() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["classify", "RAD64002019", "best gas torch for brazing"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"RAD64002019\": part number (score 12, threshold 4)",
        ))
        .stdout(predicate::str::contains(
            "\"best gas torch for brazing\": natural language",
        ));
}

#[test]
fn test_classify_explain() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["classify", "--explain", "RAD64002019", "welding gloves"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+3: Contains both letters and numbers"))
        .stdout(predicate::str::contains("Rejected: Contains no digits"));
}

#[test]
fn test_classify_json() {
    let home = TempDir::new().unwrap();
    let output = prodsearch(&home)
        .args(["classify", "-o", "json", "HYP-220-479"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["query"], "HYP-220-479");
    assert_eq!(json[0]["is_part_number"], true);
    assert_eq!(json[0]["score"], 12);
}

#[test]
fn test_classify_uses_local_config() {
    let home = TempDir::new().unwrap();
    let dir = workdir(&home).join(".prodsearch");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "[classifier]\nthreshold = 20\n").unwrap();

    prodsearch(&home)
        .args(["classify", "RAD64002019"])
        .assert()
        .success()
        .stdout(predicate::str::contains("natural language (score 12, threshold 20)"));
}

// ============================================================================
// Compare / Status Command Tests
// ============================================================================

#[test]
fn test_compare_help() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["compare", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--limit"));
}

#[test]
fn test_status_help() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--warmup"))
        .stdout(predicate::str::contains("--json"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[qdrant]"))
        .stdout(predicate::str::contains("collection = \"products\""));
}

#[test]
fn test_config_get_applies_cli_overrides() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["--collection", "catalog_v2", "config", "get", "qdrant.collection"])
        .assert()
        .success()
        .stdout(predicate::str::diff("catalog_v2\n"));
}

#[test]
fn test_config_get_unknown_key() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["config", "get", "search.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_init_writes_local_file() {
    let home = TempDir::new().unwrap();
    prodsearch(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    let written = workdir(&home).join(".prodsearch").join("config.toml");
    assert!(written.exists());
    let content = std::fs::read_to_string(written).unwrap();
    assert!(content.contains("min_vector_score"));
}

#[test]
fn test_config_path_json() {
    let home = TempDir::new().unwrap();
    let output = prodsearch(&home)
        .args(["config", "path", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["local_exists"], false);
    assert_eq!(json["global_exists"], false);
}
