//! End-to-end tests for the call pipeline against a stub emulator.
//!
//! The stub is a shell script standing in for DOSBox: it receives the same
//! `-conf ... -noconsole --exit` invocation and fakes the guest's side
//! effects by writing artifact files into its working directory. Tests that
//! need a real DOSBox installation are `#[ignore]`d.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use doscall_core::{call_dos_utility, CallContext, ExecutionRequest};

/// Write an executable stub emulator into `dir` with the given body.
fn write_stub(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("stub-emulator.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write stub");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub");
    path
}

fn context(work: &Path, emulator: PathBuf) -> CallContext {
    CallContext {
        cwd: work.to_path_buf(),
        tool_root: None,
        locale: Some("en_US".to_string()),
        emulator_path: emulator,
    }
}

/// Request wired so the stub's cwd equals the artifact directory.
fn request_in(work: &Path, command: &str) -> ExecutionRequest {
    let mut request = ExecutionRequest::new(command);
    request.working_dir = Some(work.to_path_buf());
    request
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .expect("read artifact dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect()
}

#[test]
fn test_capture_roundtrip_via_artifacts() {
    let work = tempfile::tempdir().unwrap();
    let stub = write_stub(
        work.path(),
        "printf 'HELLO\\r\\n' > STDOUT.TXT\n\
         : > STDERR.TXT\n\
         printf '0\\r\\n' > EXITCODE.TXT\n",
    );

    let ctx = context(work.path(), stub);
    let request = request_in(work.path(), "echo");
    let result = call_dos_utility(&ctx, &request);

    assert!(result.success, "stderr: {}", result.stderr);
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("HELLO"));

    // Batch script and descriptor stay behind for post-mortem inspection;
    // the consumed marker does not.
    assert_eq!(files_with_extension(work.path(), "BAT").len(), 1);
    assert_eq!(files_with_extension(work.path(), "CFG").len(), 1);
    assert!(!work.path().join("EXITCODE.TXT").exists());
}

#[test]
fn test_marker_file_beats_textual_exit_code() {
    let work = tempfile::tempdir().unwrap();
    let stub = write_stub(
        work.path(),
        "printf 'Exit code: 5\\r\\n' > STDOUT.TXT\n\
         : > STDERR.TXT\n\
         printf '2\\r\\n' > EXITCODE.TXT\n",
    );

    let ctx = context(work.path(), stub);
    let result = call_dos_utility(&ctx, &request_in(work.path(), "cl"));

    assert_eq!(result.exit_code, 2);
    assert!(!result.success);
}

#[test]
fn test_textual_exit_code_when_marker_absent() {
    let work = tempfile::tempdir().unwrap();
    let stub = write_stub(
        work.path(),
        "printf 'Exit code: 5\\r\\n' > STDOUT.TXT\n: > STDERR.TXT\n",
    );

    let ctx = context(work.path(), stub);
    let result = call_dos_utility(&ctx, &request_in(work.path(), "cl"));
    assert_eq!(result.exit_code, 5);
}

#[test]
fn test_guest_stderr_forces_failure() {
    let work = tempfile::tempdir().unwrap();
    let stub = write_stub(
        work.path(),
        "printf 'done\\r\\n' > STDOUT.TXT\n\
         printf 'warning: x\\r\\n' > STDERR.TXT\n\
         printf '0\\r\\n' > EXITCODE.TXT\n",
    );

    let ctx = context(work.path(), stub);
    let result = call_dos_utility(&ctx, &request_in(work.path(), "cl"));

    assert_eq!(result.exit_code, 0);
    assert!(!result.success);
    assert!(result.stderr.contains("warning: x"));
}

#[test]
fn test_validation_rejects_before_any_side_effect() {
    let work = tempfile::tempdir().unwrap();
    // A stub that would prove it ran.
    let stub = write_stub(work.path(), "touch SPAWNED\n");

    let ctx = context(work.path(), stub);
    let mut request = request_in(work.path(), "cl");
    request.arguments = vec!["averylongname.txt".to_string()];
    let result = call_dos_utility(&ctx, &request);

    assert!(!result.success);
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("Filename validation error"));

    // No batch script, no descriptor, no spawned emulator.
    assert!(files_with_extension(work.path(), "BAT").is_empty());
    assert!(files_with_extension(work.path(), "CFG").is_empty());
    assert!(!work.path().join("SPAWNED").exists());
    assert!(!work.path().join("STDOUT.TXT").exists());
}

#[test]
fn test_timeout_is_enforced_within_margin() {
    let work = tempfile::tempdir().unwrap();
    let stub = write_stub(work.path(), "sleep 30\n");

    let ctx = context(work.path(), stub);
    let mut request = request_in(work.path(), "loop");
    request.timeout_secs = Some(1);

    let started = Instant::now();
    let result = call_dos_utility(&ctx, &request);

    assert!(started.elapsed() < Duration::from_secs(3), "timeout not enforced");
    assert!(!result.success);
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("timed out after 1 seconds"));
}

#[test]
fn test_no_capture_synthesizes_from_raw_status() {
    let work = tempfile::tempdir().unwrap();
    let stub = write_stub(work.path(), "exit 0\n");

    let ctx = context(work.path(), stub);
    let mut request = request_in(work.path(), "install");
    request.capture_output = false;
    let result = call_dos_utility(&ctx, &request);

    assert!(result.success);
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.is_empty() && result.stderr.is_empty());

    // In the no-capture path the batch script is cleaned up again.
    assert!(files_with_extension(work.path(), "BAT").is_empty());
}

#[test]
fn test_tools_mount_must_exist() {
    let work = tempfile::tempdir().unwrap();
    let stub = write_stub(work.path(), "exit 0\n");

    let ctx = context(work.path(), stub);
    let mut request = request_in(work.path(), "ver");
    request.tools_dir = Some(PathBuf::from("/definitely/not/here"));
    let result = call_dos_utility(&ctx, &request);

    assert!(!result.success);
    assert!(result.stderr.contains("mount directory does not exist"));
}

/// Requires a real DOSBox installation on PATH; run with `cargo test -- --ignored`.
#[test]
#[ignore = "requires dosbox on PATH"]
fn test_real_dosbox_echo_hello() {
    let work = tempfile::tempdir().unwrap();
    let mut ctx = context(work.path(), PathBuf::from("dosbox"));
    ctx.locale = None;

    let mut request = request_in(work.path(), "echo");
    request.arguments = vec!["HELLO".to_string()];
    let result = call_dos_utility(&ctx, &request);

    assert!(result.success, "stderr: {}", result.stderr);
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("HELLO"));
}
