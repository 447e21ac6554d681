mod common;

use common::{da_with_regions, sample_da, sample_sej_blob, write_fixture};
use daforge_core::container::{ContainerParser, DaFileParser};
use daforge_core::model::Stage;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn info_lists_regions_and_stages() {
    let dir = tempdir().expect("tempdir");
    let da = write_fixture(dir.path(), "donor.bin", &sample_da());

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("info")
        .arg(&da)
        .assert()
        .success()
        .stdout(predicate::str::contains("hw_code=0x0766"))
        .stdout(predicate::str::contains("[da2]"));
}

#[test]
fn info_fails_for_missing_file() {
    let dir = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("info")
        .arg(dir.path().join("nope.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read container"));
}

#[test]
fn extract_writes_payloads_and_signatures() {
    let dir = tempdir().expect("tempdir");
    let da = write_fixture(dir.path(), "donor.bin", &sample_da());
    let out = dir.path().join("out");

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("extract")
        .arg(&da)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("DA stages extracted successfully."));

    assert_eq!(std::fs::read(out.join("da1.bin")).expect("da1.bin"), vec![0x22; 0x40]);
    assert_eq!(std::fs::read(out.join("da1.sig")).expect("da1.sig"), vec![0x5A; 0x10]);
    assert_eq!(std::fs::read(out.join("da2.bin")).expect("da2.bin"), vec![0x33; 0x60]);
    assert_eq!(std::fs::read(out.join("da2.sig")).expect("da2.sig").len(), 0x18);
}

#[test]
fn extract_json_without_stages_is_machine_readable() {
    let dir = tempdir().expect("tempdir");
    let two_regions =
        da_with_regions(&[(0x0010_0000, 0x11, 0x20, 0), (0x0020_0000, 0x22, 0x40, 0x10)]);
    let da = write_fixture(dir.path(), "stub.bin", &two_regions);
    let out = dir.path().join("out");

    let output = assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("extract")
        .arg(&da)
        .arg("--out-dir")
        .arg(&out)
        .arg("--json")
        .output()
        .expect("run extract");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["image_index"], 0);
    assert_eq!(report["files"].as_array().map(Vec::len), Some(0));
    assert!(!out.join("da1.bin").exists());
}

#[test]
fn extract_without_stages_says_so() {
    let dir = tempdir().expect("tempdir");
    let stub_only = da_with_regions(&[(0x0010_0000, 0x11, 0x20, 0)]);
    let da = write_fixture(dir.path(), "stub.bin", &stub_only);

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("extract")
        .arg(&da)
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("exposes no boot stages"));
}

#[test]
fn extract_rejects_unknown_hw_code() {
    let dir = tempdir().expect("tempdir");
    let da = write_fixture(dir.path(), "donor.bin", &sample_da());

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("extract")
        .arg(&da)
        .arg("--hw-code")
        .arg("0x1234")
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No image for hw_code"));
}

#[test]
fn merge_writes_reparseable_container() {
    let dir = tempdir().expect("tempdir");
    let da = write_fixture(dir.path(), "donor.bin", &sample_da());
    let da2 = write_fixture(dir.path(), "patched_da2.bin", &[0x44; 0x80]);
    let output = dir.path().join("merged.bin");

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("merge")
        .arg(&da)
        .arg("--da2")
        .arg(&da2)
        .arg("--output")
        .arg(&output)
        .arg("--sync-header")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated region offsets:"))
        .stdout(predicate::str::contains("(replaced)"));

    let merged = std::fs::read(&output).expect("merged");
    let container = DaFileParser::new().parse(&merged).expect("parse merged");
    let region = container.images[0].stage(Stage::Two).expect("da2");
    assert_eq!(region.payload().expect("payload"), &[0x44; 0x80][..]);
    assert_eq!(region.signature().expect("sig"), &[0u8; 0x18][..]);
}

#[test]
fn merge_requires_a_replacement() {
    let dir = tempdir().expect("tempdir");
    let da = write_fixture(dir.path(), "donor.bin", &sample_da());

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("merge")
        .arg(&da)
        .arg("--output")
        .arg(dir.path().join("merged.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to merge"));
}

#[test]
fn scan_reports_engine_base() {
    let dir = tempdir().expect("tempdir");
    let blob = write_fixture(dir.path(), "da2.bin", &sample_sej_blob());

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("scan")
        .arg(&blob)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 cluster(s)."))
        .stdout(predicate::str::contains("SEJ base: 0x1000A000"));
}

#[test]
fn scan_json_is_machine_readable() {
    let dir = tempdir().expect("tempdir");
    let blob = write_fixture(dir.path(), "da2.bin", &sample_sej_blob());

    let output = assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("scan")
        .arg(&blob)
        .arg("--json")
        .output()
        .expect("run scan");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["outcomes"][0]["result"]["Ok"]["base_address"], 0x1000_A000u32);
    assert_eq!(report["clusters"][0]["members"].as_array().map(Vec::len), Some(5));
}

#[test]
fn scan_fails_without_constants() {
    let dir = tempdir().expect("tempdir");
    let blob = write_fixture(dir.path(), "zeros.bin", &[0u8; 0x100]);

    assert_cmd::cargo::cargo_bin_cmd!("daforge")
        .arg("scan")
        .arg(&blob)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no signatures found"));
}
