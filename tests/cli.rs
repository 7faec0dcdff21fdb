use assert_cmd::Command;
use indoc::indoc;
use std::fs;
use tempfile::TempDir;

fn svcwrap() -> Command {
    let mut cmd = Command::cargo_bin("svcwrap").unwrap();
    cmd.env_remove("SVCWRAP_LOG");
    cmd
}

fn sources() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("api.rs"),
        indoc! {r#"
            use svcwrap::{Call, Response};

            pub struct Repo;

            #[remote_service]
            pub trait Github: Send + Sync {
                fn repo(&self, owner: String, name: String) -> Call<Repo>;
                fn rate_limit(&self) -> Response<u32>;
            }
        "#},
    )
    .unwrap();
    dir
}

#[test]
fn test_generate_writes_units_and_reports_json() {
    let src = sources();
    let out = TempDir::new().unwrap();

    let output = svcwrap()
        .arg("generate")
        .arg(src.path())
        .arg("--out")
        .arg(out.path())
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["generated"][0]["qualified_name"], "crate::api::Github");
    assert_eq!(report["generated"][0]["written"], true);
    assert!(out.path().join("api/github_dsl_extensions.rs").exists());
}

#[test]
fn test_generate_fails_when_an_interface_aborts() {
    let src = sources();
    fs::write(
        src.path().join("bad.rs"),
        "#[remote_service] pub trait Bad { fn nothing(&self); }",
    )
    .unwrap();
    let out = TempDir::new().unwrap();

    let output = svcwrap()
        .arg("generate")
        .arg(src.path())
        .arg("-o")
        .arg(out.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 interface(s) failed to generate"));
    // The healthy interface is still written
    assert!(out.path().join("api/github_dsl_extensions.rs").exists());
}

#[test]
fn test_scan_reports_shapes_as_json() {
    let src = sources();

    let output = svcwrap()
        .arg("scan")
        .arg(src.path())
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let operations = report["interfaces"][0]["operations"].as_array().unwrap();
    assert_eq!(operations.len(), 2);
    assert_eq!(operations[0]["result_shape"], "async_call_wrapper");
    assert_eq!(operations[1]["result_shape"], "sync_response_wrapper");
    assert_eq!(operations[1]["payload_type"], "u32");
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();

    svcwrap()
        .arg("init")
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("svcwrap.toml").exists());

    let output = svcwrap()
        .arg("init")
        .arg("--dir")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    svcwrap()
        .args(["init", "--force", "--dir"])
        .arg(dir.path())
        .assert()
        .success();
}
