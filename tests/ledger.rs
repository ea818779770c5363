mod common;

use std::fs;

use assert_matches::assert_matches;

use itasser_miner::error::MinerError;
use itasser_miner::ledger::Ledger;

use common::{id, temp_workspace};

#[test]
fn missing_file_loads_empty() {
    let (_temp, workspace) = temp_workspace();
    let ledger = Ledger::load(&workspace.ledger_path()).unwrap();
    assert!(ledger.is_empty());
    assert!(!workspace.ledger_path().as_std_path().exists());
}

#[test]
fn flushed_entries_survive_reload() {
    let (_temp, workspace) = temp_workspace();
    let mut ledger = Ledger::load(&workspace.ledger_path()).unwrap();
    ledger.record(&id("S12"), "HTTP Error 404: Not Found");
    ledger.record(&id("S13"), "bzip2: invalid header");
    ledger.flush().unwrap();

    let reloaded = Ledger::load(&workspace.ledger_path()).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.reason(&id("S12")), Some("HTTP Error 404: Not Found"));
    assert_eq!(reloaded.entries(), ledger.entries());
}

#[test]
fn recording_twice_keeps_latest_reason() {
    let (_temp, workspace) = temp_workspace();
    let mut ledger = Ledger::load(&workspace.ledger_path()).unwrap();
    ledger.record(&id("S5"), "first");
    ledger.record(&id("S5"), "second");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.reason(&id("S5")), Some("second"));
}

#[test]
fn file_is_a_flat_json_object() {
    let (_temp, workspace) = temp_workspace();
    fs::write(
        workspace.ledger_path().as_std_path(),
        r#"{"S438780": "HTTP Error 403: Forbidden"}"#,
    )
    .unwrap();

    let ledger = Ledger::load(&workspace.ledger_path()).unwrap();
    assert!(ledger.contains(&id("S438780")));
    ledger.flush().unwrap();

    let raw = fs::read_to_string(workspace.ledger_path().as_std_path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["S438780"], "HTTP Error 403: Forbidden");
}

#[test]
fn invalid_json_is_reported() {
    let (_temp, workspace) = temp_workspace();
    fs::write(workspace.ledger_path().as_std_path(), "not json").unwrap();
    assert_matches!(
        Ledger::load(&workspace.ledger_path()),
        Err(MinerError::Ledger(_))
    );
}
