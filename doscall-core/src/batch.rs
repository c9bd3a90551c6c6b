//! Guest batch-script synthesis.
//!
//! The host never talks to the guest command directly; everything it wants
//! done is compiled into a batch script the emulator runs at startup. The
//! script also smuggles the guest ERRORLEVEL back out through a marker file,
//! since the emulator's own exit status says nothing about the command.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Fixed guest-side capture file for standard output.
pub const STDOUT_CAPTURE: &str = "STDOUT.TXT";
/// Fixed guest-side capture file for standard error.
pub const STDERR_CAPTURE: &str = "STDERR.TXT";
/// Fixed marker file the guest writes its ERRORLEVEL into.
pub const EXIT_CODE_MARKER: &str = "EXITCODE.TXT";

static SCRIPT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A generated guest script plus its allocated 8.3 file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchScript {
    pub file_name: String,
    pub content: String,
}

impl BatchScript {
    /// Capture-mode script: run the command with stdout/stderr redirected to
    /// the fixed capture files, write ERRORLEVEL to the marker file, then
    /// list the marker file as a flush barrier before the emulator exits.
    pub fn simple(command: &str, arguments: &[String]) -> Self {
        let cmdline = command_line(command, arguments);
        let content = format!(
            "@echo off\n\
             {cmdline} > C:\\{STDOUT_CAPTURE} 2> C:\\{STDERR_CAPTURE}\n\
             echo %ERRORLEVEL% > C:\\{EXIT_CODE_MARKER}\n\
             dir C:\\{EXIT_CODE_MARKER}\n"
        );
        Self::with_fresh_name(content)
    }

    /// Compilation-mode script: echo the command before and after running
    /// it, optionally check that an expected output artifact was created,
    /// and finish with a directory listing filtered by `listing_pattern`.
    pub fn compilation(
        command: &str,
        arguments: &[String],
        tool_name: &str,
        expected_output: Option<&str>,
        listing_pattern: &str,
    ) -> Self {
        let cmdline = command_line(command, arguments);
        let mut content = format!(
            "@echo on\n\
             echo Compiling with {tool_name}...\n\
             echo.\n\
             \n\
             echo Executing: {cmdline}\n\
             {cmdline}\n\
             echo Exit code: %ERRORLEVEL%\n"
        );
        if let Some(output) = expected_output {
            content.push_str(&format!(
                "if exist {output} echo {output} created successfully\n\
                 if not exist {output} echo {output} NOT created\n"
            ));
        }
        content.push_str(&format!(
            "\necho.\necho Final files:\ndir {listing_pattern}\n"
        ));
        Self::with_fresh_name(content)
    }

    /// Like [`BatchScript::compilation`] without the artifact check, plus a
    /// fixed advisory that generated filenames may come back uppercased.
    pub fn with_case_warning(command: &str, arguments: &[String]) -> Self {
        let cmdline = command_line(command, arguments);
        let content = format!(
            "@echo on\n\
             echo Executing: {cmdline}\n\
             echo.\n\
             \n\
             {cmdline}\n\
             echo Exit code: %ERRORLEVEL%\n\
             \n\
             echo.\n\
             echo NOTE: Generated files may be in UPPER CASE due to DOS limitations.\n\
             echo Please check for files with uppercase names in the output directory.\n\
             echo.\n"
        );
        Self::with_fresh_name(content)
    }

    /// File name without the `.BAT` extension.
    pub fn stem(&self) -> &str {
        self.file_name
            .strip_suffix(".BAT")
            .unwrap_or(&self.file_name)
    }

    /// Write the script into `dir` and return its full path. Scripts are
    /// deliberately not cleaned up here; they stay behind for post-mortem
    /// debugging and the caller owns their lifetime.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.content)?;
        tracing::debug!(path = %path.display(), "wrote batch script");
        Ok(path)
    }

    fn with_fresh_name(content: String) -> Self {
        let script = Self {
            file_name: allocate_script_name(),
            content,
        };
        tracing::debug!(name = %script.file_name, "generated batch script:\n{}", script.content);
        script
    }
}

/// Allocate a unique 8.3 script name: `B` plus seven digits derived from
/// the current time, the process id, and a process-local counter. Distinct
/// across concurrent processes sharing a directory and across repeated
/// calls within one process.
fn allocate_script_name() -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);
    let pid = u64::from(std::process::id());
    let seq = SCRIPT_SEQ.fetch_add(1, Ordering::Relaxed);

    let token = (micros ^ pid.rotate_left(23)).wrapping_add(seq.wrapping_mul(7919)) % 10_000_000;
    format!("B{token:07}.BAT")
}

fn command_line(command: &str, arguments: &[String]) -> String {
    if arguments.is_empty() {
        command.to_string()
    } else {
        format!("{command} {}", arguments.join(" "))
    }
}
