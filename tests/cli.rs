use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

use precache::data::{CacheStorage, Response};
use precache::stores::FileCacheStorage;

fn precache() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("precache"))
}

#[test]
fn install_dry_run_lists_resolved_manifest() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("precache.yml");
    fs::write(
        &config,
        "cache_name: site-v3\norigin: http://127.0.0.1:9000\nurls: ['/', '/manifest.json', '/static/logo.png']\n",
    )
    .unwrap();

    precache()
        .arg("--config")
        .arg(&config)
        .arg("--dry-run")
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Would pre-cache 3 URL(s) into site-v3"))
        .stdout(predicate::str::contains("http://127.0.0.1:9000/static/logo.png"));
}

#[test]
fn invalid_config_fails() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("precache.yml");
    fs::write(&config, "origin: ftp://example.com\n").unwrap();

    precache()
        .arg("--config")
        .arg(&config)
        .arg("keys")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported scheme"));
}

#[test]
fn origin_flag_overrides_invalid_config_origin() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("precache.yml");
    fs::write(&config, "cache_name: site-v4\norigin: ftp://example.com\n").unwrap();

    precache()
        .arg("--config")
        .arg(&config)
        .arg("--origin")
        .arg("http://127.0.0.1:9000")
        .arg("--dry-run")
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Would pre-cache 2 URL(s) into site-v4"))
        .stdout(predicate::str::contains("http://127.0.0.1:9000/manifest.json"));
}

#[test]
fn keys_on_empty_cache_dir() {
    let temp = tempdir().unwrap();

    precache()
        .arg("--config")
        .arg(temp.path().join("absent.yml"))
        .arg("--cache-dir")
        .arg(temp.path().join("cache"))
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("No caches found"));
}

#[tokio::test]
async fn keys_and_entries_read_existing_store() {
    let temp = tempdir().unwrap();
    let cache_dir = temp.path().join("cache");
    let storage = FileCacheStorage::new(Some(cache_dir.clone()));
    storage.open("imd-cache-v1").await.unwrap();
    storage
        .put(
            "imd-cache-v2",
            "http://localhost:8080/",
            Response::new("http://localhost:8080/", 200, "<html></html>"),
        )
        .await
        .unwrap();

    precache()
        .arg("--config")
        .arg(temp.path().join("absent.yml"))
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("  imd-cache-v1"))
        .stdout(predicate::str::contains("* imd-cache-v2"));

    precache()
        .arg("--config")
        .arg(temp.path().join("absent.yml"))
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("entries")
        .assert()
        .success()
        .stdout(predicate::str::contains("imd-cache-v2 (1 entries)"))
        .stdout(predicate::str::contains("http://localhost:8080/"));
}

#[test]
fn fetch_cached_path_without_network() {
    let temp = tempdir().unwrap();
    let cache_dir = temp.path().join("cache");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let storage = FileCacheStorage::new(Some(cache_dir.clone()));
        storage
            .put(
                "imd-cache-v2",
                "http://localhost:8080/manifest.json",
                Response::new("http://localhost:8080/manifest.json", 200, "{\"name\":\"IMD\"}"),
            )
            .await
            .unwrap();
    });

    precache()
        .arg("--config")
        .arg(temp.path().join("absent.yml"))
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("fetch")
        .arg("/manifest.json")
        .arg("--body")
        .assert()
        .success()
        .stdout("{\"name\":\"IMD\"}");
}

#[test]
fn activate_after_failed_install_keeps_previous_cache() {
    let temp = tempdir().unwrap();
    let cache_dir = temp.path().join("cache");
    let config = temp.path().join("precache.yml");
    // Nothing listens on the discard port, so every manifest fetch fails.
    fs::write(&config, "cache_name: v2\norigin: http://127.0.0.1:9\n").unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let storage = FileCacheStorage::new(Some(cache_dir.clone()));
        storage
            .put_all(
                "v1",
                vec![
                    (
                        "http://127.0.0.1:9/".to_string(),
                        Response::new("http://127.0.0.1:9/", 200, "<html></html>"),
                    ),
                    (
                        "http://127.0.0.1:9/manifest.json".to_string(),
                        Response::new("http://127.0.0.1:9/manifest.json", 200, "{}"),
                    ),
                ],
            )
            .await
            .unwrap();
    });

    precache()
        .arg("--config")
        .arg(&config)
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("install")
        .assert()
        .failure();

    precache()
        .arg("--config")
        .arg(&config)
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("activate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not installed"));

    precache()
        .arg("--config")
        .arg(&config)
        .arg("--cache-dir")
        .arg(&cache_dir)
        .arg("entries")
        .arg("v1")
        .assert()
        .success()
        .stdout(predicate::str::contains("v1 (2 entries)"));
}
