#![cfg(feature = "cli")]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const POWER_ON_COOL: &str = "AA 07 00 00 01 01 01 81 2D";
const STATUS_REQUEST: &str = "AA 05 00 00 10 3D 18";

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "buswatch-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture should be writable");
    path
}

fn buswatch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_buswatch"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("buswatch should run")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn replay_decodes_frames_in_bursts_mode() {
    let dir = unique_temp_dir("frames");
    let capture = write_file(
        &dir,
        "capture.txt",
        &format!("# two frames\n{POWER_ON_COOL}\n{STATUS_REQUEST}\n"),
    );

    let output = buswatch(&["replay", capture.to_str().unwrap(), "--mode", "bursts"]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"kind\":\"frame\""));
    assert!(lines[0].contains("Power ON, Mode Cool"));
    assert!(lines[1].contains("Status request"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_reports_crc_mismatch() {
    let dir = unique_temp_dir("crc");
    let capture = write_file(&dir, "bad.txt", "AA 07 00 00 01 01 01 81 2E\n");

    let output = buswatch(&["replay", capture.to_str().unwrap(), "--mode", "stream"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"kind\":\"diagnostic\""));
    assert!(stdout.contains("\"diagnostic\":\"crc_mismatch\""));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_suppresses_repeats_and_prints_stats() {
    let dir = unique_temp_dir("dedupe");
    let capture = write_file(
        &dir,
        "polls.txt",
        &format!("{STATUS_REQUEST}\n{STATUS_REQUEST}\n{STATUS_REQUEST}\n"),
    );

    let output = buswatch(&[
        "replay",
        capture.to_str().unwrap(),
        "--mode",
        "bursts",
        "--stats",
    ]);
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    let frames = lines
        .iter()
        .filter(|l| l.contains("\"kind\":\"frame\""))
        .count();
    assert_eq!(frames, 1);
    let stats = lines.last().expect("stats line");
    assert!(stats.contains("\"kind\":\"stats\""));
    assert!(stats.contains("\"frames\":3"));
    assert!(stats.contains("\"recency_dedupe\":2"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_raw_mode_drops_idle_bursts() {
    let dir = unique_temp_dir("idle");
    let capture = write_file(&dir, "raw.txt", "00 06 18\n01 02 03\n");

    let output = buswatch(&[
        "replay",
        capture.to_str().unwrap(),
        "--idle-bytes",
        "0x00,0x06,0x18",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"bytes\":\"01 02 03\""));
    assert!(!stdout.contains("\"bytes\":\"00 06 18\""));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_reads_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_buswatch"))
        .args(["--log-level", "error", "--format", "json"])
        .args(["replay", "-", "--mode", "stream"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("replay should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(format!("{POWER_ON_COOL}\n").as_bytes())
        .expect("stdin should accept data");
    let output = child.wait_with_output().expect("replay should finish");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Power ON, Mode Cool"));
}

#[test]
fn replay_rejects_bad_hex_with_60() {
    let dir = unique_temp_dir("badhex");
    let capture = write_file(&dir, "bad.txt", "AA 07\nnot hex\n");

    let output = buswatch(&["replay", capture.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 2"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_valid_and_invalid_frames() {
    let ok = buswatch(&["decode", POWER_ON_COOL]);
    assert!(ok.status.success());
    let stdout = String::from_utf8_lossy(&ok.stdout);
    assert!(stdout.contains("\"valid\":true"));
    assert!(stdout.contains("\"command\":\"Power ON, Mode Cool\""));

    let bad = buswatch(&["decode", "AA 07 00 00 01 01 01 00 00"]);
    assert_eq!(bad.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&bad.stdout).contains("\"valid\":false"));

    let short = buswatch(&["decode", "AA 07"]);
    assert_eq!(short.status.code(), Some(60));
}

#[test]
fn encode_builds_checksummed_frame() {
    let output = buswatch(&["encode", "--cmd", "0x01", "01", "01"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("\"bytes\":\"{POWER_ON_COOL}\"")));

    let wrong_addr = buswatch(&["encode", "--cmd", "0x10", "--addr", "1,2,3"]);
    assert_eq!(wrong_addr.status.code(), Some(64));
}

#[test]
fn unknown_config_field_is_usage_error() {
    let dir = unique_temp_dir("config");
    let config = write_file(&dir, "buswatch.json", r#"{ "idle_gap": 1200 }"#);
    let capture = write_file(&dir, "capture.txt", "01 02\n");

    let output = buswatch(&[
        "--config",
        config.to_str().unwrap(),
        "replay",
        capture.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown field"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn sniff_missing_device_is_source_error() {
    let output = buswatch(&["sniff", "/nonexistent/ttyBUS0"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/ttyBUS0"));
}
