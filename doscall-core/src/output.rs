//! Recovery of the guest command's output and exit status.
//!
//! The emulator's own exit status is useless for judging the guest command,
//! so the real result is reconstructed from artifacts the batch script left
//! in the artifact directory: the capture files and the ERRORLEVEL marker.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::batch::{EXIT_CODE_MARKER, STDERR_CAPTURE, STDOUT_CAPTURE};
use crate::codepage::decode_cp850;
use crate::ExecutionResult;

/// Decoded capture-file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Which strategy produced the recovered exit code, in priority order:
/// the marker file is authoritative, the textual pattern is a
/// compatibility fallback, and zero is assumed when both are absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCodeSource {
    Marker,
    Pattern,
    Default,
}

/// Read and decode the capture files from the artifact directory. A missing
/// or unreadable file decodes to an empty string.
pub fn read_capture(artifact_dir: &Path) -> CapturedOutput {
    CapturedOutput {
        stdout: read_dos_text(&artifact_dir.join(STDOUT_CAPTURE)),
        stderr: read_dos_text(&artifact_dir.join(STDERR_CAPTURE)),
    }
}

fn read_dos_text(path: &Path) -> String {
    if !path.exists() {
        return String::new();
    }
    match std::fs::read(path) {
        Ok(bytes) => decode_cp850(&bytes),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read capture file");
            String::new()
        }
    }
}

/// Recover the guest exit code. The marker file wins when present and
/// parseable (and is deleted once consumed); otherwise stdout then stderr
/// are searched for an embedded `Exit code: N`; otherwise 0. Never fails:
/// malformed marker content simply falls through the chain.
pub fn recover_exit_code(artifact_dir: &Path, stdout: &str, stderr: &str) -> (i32, ExitCodeSource) {
    let marker = artifact_dir.join(EXIT_CODE_MARKER);
    if marker.exists() {
        let parsed = std::fs::read_to_string(&marker)
            .ok()
            .and_then(|raw| raw.trim().parse::<i32>().ok());
        if let Err(err) = std::fs::remove_file(&marker) {
            tracing::warn!(path = %marker.display(), %err, "failed to remove marker file");
        }
        if let Some(code) = parsed {
            return (code, ExitCodeSource::Marker);
        }
        tracing::debug!("marker file unparseable, falling back to output pattern");
    }

    if let Some(code) = extract_exit_code(stdout).or_else(|| extract_exit_code(stderr)) {
        return (code, ExitCodeSource::Pattern);
    }

    (0, ExitCodeSource::Default)
}

/// Find an embedded `Exit code: N` marker in command output.
pub fn extract_exit_code(text: &str) -> Option<i32> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"Exit code: (\d+)").expect("static pattern compiles"));
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Assemble the final result: recovered exit code plus the success rule —
/// a run succeeds only with exit code 0 and an empty (or whitespace-only)
/// stderr.
pub fn process_output(artifact_dir: &Path, captured: CapturedOutput) -> ExecutionResult {
    let (exit_code, source) =
        recover_exit_code(artifact_dir, &captured.stdout, &captured.stderr);
    tracing::debug!(exit_code, ?source, "recovered guest exit code");

    let success = exit_code == 0 && captured.stderr.trim().is_empty();
    ExecutionResult {
        stdout: captured.stdout,
        stderr: captured.stderr,
        exit_code,
        success,
    }
}
