use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn inspect_lists_interfaces_with_includes() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("curtin-net"));
    cmd.arg("inspect")
        .arg(fixture("fixtures/eni/interfaces"))
        .assert()
        .success()
        .stdout(predicate::str::contains("eth0"))
        .stdout(predicate::str::contains("eth1"))
        .stdout(predicate::str::contains("address=192.168.1.10"))
        .stdout(predicate::str::contains("hwaddress=52:54:00:12:34:02"))
        .stdout(predicate::str::contains("interfaces=3"))
        .stdout(predicate::str::contains("eth9").not());
}

#[test]
fn inspect_json_records_sources() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("curtin-net"));
    let output = cmd
        .arg("inspect")
        .arg(fixture("fixtures/eni/interfaces"))
        .arg("--format")
        .arg("json")
        .output()
        .expect("run");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["eth1"]["control"], "hotplug");
    assert_eq!(json["eth1"]["method"], "dhcp");
    assert!(json["eth1"]["source_path"]
        .as_str()
        .expect("source path")
        .ends_with("interfaces.d/eth1"));
    assert_eq!(json["eth0"]["dns"]["nameservers"][1], "192.168.1.3");
    assert_eq!(json["lo"]["method"], "loopback");
    assert!(json.get("eth9").is_none());
}

#[test]
fn inspect_missing_file_fails() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("curtin-net"));
    cmd.arg("inspect")
        .arg(fixture("fixtures/eni/does-not-exist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"));
}
