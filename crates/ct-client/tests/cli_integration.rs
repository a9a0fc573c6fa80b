//! CLI integration tests
//!
//! Tests the ct-client binary's startup and fatal-exit behavior using assert_cmd.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ct_client(error_log: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ct-client")
        .expect("Failed to locate ct-client binary - ensure it's built before running tests");
    for var in ["CT_TOKEN", "CT_SERVICE_PORT", "CT_KERNEL_PORT", "CT_KERNEL_HOST", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd.arg("--error-log").arg(error_log);
    cmd
}

fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).expect("error log was not written")
}

#[test]
fn test_cli_help() {
    let temp = TempDir::new().unwrap();
    ct_client(&temp.path().join("errors.txt"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kernel client agent"))
        .stdout(predicate::str::contains("--kernel-port"));
}

#[test]
fn test_missing_token_is_fatal() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("errors.txt");

    ct_client(&log)
        .args(["--service-port", "8080", "--kernel-port", "7000"])
        .assert()
        .code(2)
        .stderr(predicate::str::is_empty());

    let contents = read_log(&log);
    assert!(contents.contains("token"), "log was: {}", contents);
    assert_eq!(contents.lines().count(), 1);
}

#[test]
fn test_foreground_reports_fatal_error_on_stderr() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("errors.txt");

    ct_client(&log)
        .args(["--foreground", "--service-port", "8080", "--kernel-port", "7000"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("token"));

    assert!(read_log(&log).contains("token"));
}

#[test]
fn test_placeholder_kernel_port_is_fatal() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("errors.txt");

    ct_client(&log)
        .args(["--token", "abc", "--service-port", "8080", "--kernel-port", "0"])
        .assert()
        .code(2);

    assert!(read_log(&log).contains("kernel_port"));
}

#[test]
fn test_missing_service_port_from_env() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("errors.txt");

    ct_client(&log)
        .env("CT_TOKEN", "abc")
        .env("CT_KERNEL_PORT", "7000")
        .assert()
        .code(2);

    assert!(read_log(&log).contains("service_port"));
}

#[test]
fn test_config_file_values_are_used() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("errors.txt");
    let config = temp.path().join("client.toml");
    std::fs::write(&config, "token = \"from-file\"\nservice_port = 8080\n").unwrap();

    // Only the Kernel port is missing now
    ct_client(&log)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2);

    assert!(read_log(&log).contains("kernel_port"));
}

#[test]
fn test_unreachable_kernel_is_fatal() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("errors.txt");

    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    ct_client(&log)
        .args(["--token", "abc", "--service-port", "8080"])
        .args(["--kernel-port", &port.to_string()])
        .assert()
        .code(2);

    assert!(read_log(&log).contains("Failed to connect to Kernel"));
}

#[test]
fn test_rejected_handshake_is_fatal() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("errors.txt");

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let kernel = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        let request: serde_json::Value = loop {
            let n = socket.read(&mut buf).unwrap();
            assert!(n > 0, "client closed before sending a full command");
            received.extend_from_slice(&buf[..n]);
            if let Ok(value) = serde_json::from_slice(&received) {
                break value;
            }
        };
        socket
            .write_all(br#"{"status":403,"message":"bad token"}"#)
            .unwrap();
        request
    });

    ct_client(&log)
        .args(["--token", "wrong", "--service-port", "8080"])
        .args(["--kernel-port", &port.to_string()])
        .assert()
        .code(2)
        .stderr(predicate::str::is_empty());

    let request = kernel.join().unwrap();
    assert_eq!(request["command"], "connect");
    assert_eq!(request["emmitter"], "wrong");

    let contents = read_log(&log);
    assert!(contents.contains("403"));
    assert!(contents.contains("bad token"));
}
