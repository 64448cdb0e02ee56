use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

/// Serve a single HTTP response on a random local port.
fn serve_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}/")
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// Run the binary inside `dir` with no user config in reach.
fn whatsmyip(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("whatsmyip").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn extract_prints_address_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path())
        .arg("extract")
        .write_stdin("<body>Current IP Address: 203.0.113.7</body>")
        .assert()
        .success()
        .stdout("203.0.113.7\n");
}

#[test]
fn extract_no_match_fails() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path())
        .arg("extract")
        .write_stdin("nothing to see")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no match"));
}

#[test]
fn extract_invalid_pattern_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path())
        .args(["extract", "--pattern", "("])
        .write_stdin("anything")
        .assert()
        .code(2);
}

#[test]
fn extract_reads_file_with_custom_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.txt");
    std::fs::write(&page, "addr=10.1.2.3;").unwrap();
    whatsmyip(dir.path())
        .args(["extract", "--pattern", r"addr=(?P<ip>[\d.]+)"])
        .arg(&page)
        .assert()
        .success()
        .stdout("10.1.2.3\n");
}

#[test]
fn extract_unnamed_groups_print_whole_match() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path())
        .args(["extract", "--pattern", r"(\d{1,3}\.){3}\d{1,3}"])
        .write_stdin("Current IP Address: 203.0.113.7")
        .assert()
        .success()
        .stdout("203.0.113.7\n");
}

#[test]
fn fetch_prints_address() {
    let dir = tempfile::tempdir().unwrap();
    let url = serve_once("<html><body>Current IP Address: 198.51.100.23</body></html>");
    whatsmyip(dir.path())
        .args(["fetch", "--url", &url])
        .assert()
        .success()
        .stdout("198.51.100.23\n");
}

#[test]
fn fetch_connection_failure_fails() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path())
        .args(["fetch", "--url", &closed_port_url()])
        .assert()
        .failure();
}

#[test]
fn console_replies_to_trigger_only() {
    let dir = tempfile::tempdir().unwrap();
    let url = serve_once("Current IP Address: 203.0.113.7</body>");
    whatsmyip(dir.path())
        .args(["run", "--console", "--url", &url])
        .write_stdin("hello\nip\n")
        .assert()
        .success()
        .stdout("203.0.113.7\n");
}

#[test]
fn console_is_silent_when_page_has_no_address() {
    let dir = tempfile::tempdir().unwrap();
    let url = serve_once("<html>maintenance</html>");
    whatsmyip(dir.path())
        .args(["run", "--console", "--url", &url])
        .write_stdin("ip\n")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn console_replies_with_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let assert = whatsmyip(dir.path())
        .args(["run", "--console", "--url", &closed_port_url()])
        .write_stdin("ip\n")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert_eq!(stdout.lines().count(), 1, "expected one reply, got {stdout:?}");
    assert!(!stdout.trim().is_empty());
}

#[test]
fn run_rejects_invalid_pattern() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path())
        .args(["run", "--console", "--pattern", "("])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fetch.pattern"));
}

#[test]
fn run_uses_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let url = serve_once("your ip is 192.0.2.44");
    std::fs::write(
        dir.path().join(".whatsmyip.toml"),
        format!("[fetch]\nurl = \"{url}\"\npattern = 'ip is (?P<ip>[\\d.]+)'\n\n[trigger]\ncommand = \"!ip\"\n"),
    )
    .unwrap();
    whatsmyip(dir.path())
        .args(["run", "--console"])
        .write_stdin("ip\n!ip\n")
        .assert()
        .success()
        .stdout("192.0.2.44\n")
        .stderr(predicate::str::contains("using config file"));
}

#[test]
fn init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path()).arg("init").assert().success();

    let written = std::fs::read_to_string(dir.path().join(".whatsmyip.toml")).unwrap();
    assert!(written.contains("[fetch]"));
    assert!(written.contains("checkip.dyndns.org"));

    whatsmyip(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    whatsmyip(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn init_user_writes_into_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path()).args(["init", "--user"]).assert().success();
    assert!(dir.path().join("xdg/whatsmyip/config.toml").exists());
}

#[test]
fn schema_is_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = whatsmyip(dir.path()).arg("schema").output().unwrap();
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(schema["properties"].get("fetch").is_some());
}

#[test]
fn doctor_reports_bad_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let output = whatsmyip(dir.path())
        .args(["doctor", "--format", "json", "--pattern", "["])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["issues"].as_array().map(Vec::len), Some(1));
}

#[test]
fn doctor_passes_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    whatsmyip(dir.path())
        .args(["doctor", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("whatsmyip-doctor"));
}
