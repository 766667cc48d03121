//! End-to-end tests of the `a3s-attest` binary with the software backend.

use std::process::{Command, Output};

fn a3s_attest(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_a3s-attest"))
        .args(args)
        .env("A3S_ATTEST_BACKEND", "software")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run `a3s-attest {}`: {}", args.join(" "), e))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn test_attest_then_verify() {
    let attest = a3s_attest(&["attest", "--user-data", "deadbeef", "--nonce", "0a0b"]);
    assert!(attest.status.success(), "{:?}", attest);
    let report = stdout(&attest);

    let verify = a3s_attest(&[
        "verify",
        "--report",
        &report,
        "--nonce",
        "0a0b",
        "--measurement",
        "insecure-software-no-hardware-root-of-trust",
    ]);
    assert!(verify.status.success(), "{:?}", verify);
    assert_eq!(stdout(&verify), "deadbeef");
}

#[test]
fn test_verify_expired_report_fails() {
    let attest = a3s_attest(&["attest", "--user-data", "01"]);
    let report = stdout(&attest);

    let verify = a3s_attest(&["verify", "--report", &report, "--timestamp", "2999-01-01T00:00:00Z"]);
    assert!(!verify.status.success());
    assert!(String::from_utf8_lossy(&verify.stderr).contains("Timestamp"));
}

#[test]
fn test_attest_json_output_and_file_report() {
    let attest = a3s_attest(&["attest", "--user-data", "", "--random-nonce", "--json"]);
    assert!(attest.status.success(), "{:?}", attest);
    let output: serde_json::Value = serde_json::from_str(&stdout(&attest)).unwrap();
    assert_eq!(output["backend"], "software");
    assert_eq!(output["nonce"].as_str().unwrap().len(), 64);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.b64");
    std::fs::write(&path, output["report"].as_str().unwrap()).unwrap();

    let verify = a3s_attest(&["verify", "--report", path.to_str().unwrap(), "--json"]);
    assert!(verify.status.success(), "{:?}", verify);
    let result: serde_json::Value = serde_json::from_str(&stdout(&verify)).unwrap();
    assert_eq!(result["verified"], true);
    assert_eq!(result["user_data"], "");
}

#[test]
fn test_unknown_backend_rejected() {
    let output = a3s_attest(&["--backend", "sgx", "version"]);
    assert!(!output.status.success());
}
