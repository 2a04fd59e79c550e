// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{load_or_default, ConfigStore, FileConfigStore, MemoryConfigStore};
use crate::config::{BrightnessMode, ClientConfig};

fn sample() -> ClientConfig {
    ClientConfig {
        ws_url: "ws://relay.local:8080/ws".to_owned(),
        sse_url: "http://meter.local/events".to_owned(),
        brightness_mode: BrightnessMode::Light,
        alert_threshold_watts: 1800.0,
    }
}

#[test]
fn file_store_missing_file_is_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileConfigStore::new(dir.path());
    assert!(store.load()?.is_none());
    assert_eq!(load_or_default(&store), ClientConfig::default());
    Ok(())
}

#[test]
fn file_store_saves_and_restores() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileConfigStore::new(dir.path().join("nested"));
    store.save(&sample())?;

    assert!(store.path().ends_with("display-config.json"));
    assert_eq!(store.load()?, Some(sample()));

    // Overwrite leaves no temp files behind.
    store.save(&ClientConfig::default())?;
    let names: Vec<_> = std::fs::read_dir(dir.path().join("nested"))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["display-config.json".to_owned()]);
    assert_eq!(store.load()?, Some(ClientConfig::default()));
    Ok(())
}

#[test]
fn corrupt_file_falls_back_to_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileConfigStore::new(dir.path());
    std::fs::write(store.path(), "{ definitely not json")?;

    assert!(store.load().is_err());
    assert_eq!(load_or_default(&store), ClientConfig::default());
    Ok(())
}

#[test]
fn memory_store_round_trips_through_raw_json() -> anyhow::Result<()> {
    let store = MemoryConfigStore::new();
    assert!(store.load()?.is_none());
    store.save(&sample())?;
    assert!(store.raw().is_some_and(|raw| raw.contains("\"alertThresholdWatts\":1800.0")));
    assert_eq!(store.load()?, Some(sample()));
    Ok(())
}

#[test]
fn memory_store_corrupt_record_uses_defaults() {
    let store = MemoryConfigStore::with_raw("[1, 2");
    assert_eq!(load_or_default(&store), ClientConfig::default());
}
