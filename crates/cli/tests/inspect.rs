//! `chainbind list` and `chainbind show` against a persisted registry.

use assert_cmd::Command;
use chainbind_core::prelude::*;
use chainbind_core::FileSystemContractRegistry;
use chainbind_fabric::{ChaincodeId, FabricContractBuilder};
use predicates::prelude::*;
use std::path::Path;

fn persist_assets(base_path: &Path) {
    let interface = ContractInterface::new("Assets").method(MethodSignature::new(
        "owner",
        vec![ParameterSignature::new("asset", NativeType::String)],
        ReturnSignature::of(NativeType::String),
    ));
    let mut builder = FabricContractBuilder::new(interface).unwrap();
    builder.chaincode_id(ChaincodeId::new("assets", "1.0"));
    builder.method("owner", &[NativeType::String]).unwrap().read_only(true);
    let binding = builder.build().unwrap();

    let mut registry = FileSystemContractRegistry::new(base_path);
    registry.add(binding).unwrap();
    registry.persist().unwrap();
}

fn chainbind() -> Command {
    let mut command = Command::cargo_bin("chainbind").unwrap();
    command.env_remove("CHAINBIND_CONFIG").env("RUST_LOG", "warn");
    command
}

#[test]
fn test_list_bindings() {
    let dir = tempfile::tempdir().unwrap();
    persist_assets(dir.path());

    chainbind()
        .arg("--registry")
        .arg(dir.path())
        .args(["--chain", "fabric", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assets\tAssets\t1 methods\t0 events"));
}

#[test]
fn test_show_binding() {
    let dir = tempfile::tempdir().unwrap();
    persist_assets(dir.path());

    let output = chainbind()
        .arg("--registry")
        .arg(dir.path())
        .args(["--chain", "fabric", "show", "Assets"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["identifier"], "Assets");
}

#[test]
fn test_show_unknown_binding() {
    let dir = tempfile::tempdir().unwrap();
    persist_assets(dir.path());

    chainbind()
        .arg("--registry")
        .arg(dir.path())
        .args(["--chain", "fabric", "show", "Ledger"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no fabric binding with identifier 'Ledger'"));
}

#[test]
fn test_settings_file_selects_registry() {
    let dir = tempfile::tempdir().unwrap();
    let contracts = dir.path().join("contracts");
    persist_assets(&contracts);
    let settings = dir.path().join("chainbind.toml");
    std::fs::write(
        &settings,
        format!("[registry]\nbase_path = {:?}\n", contracts.display().to_string()),
    )
    .unwrap();

    chainbind()
        .arg("--config")
        .arg(&settings)
        .args(["--chain", "fabric", "list"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Assets"));
}
