//! Emulator process supervision.
//!
//! One call means one emulator process: serialize the configuration to a
//! descriptor file, synthesize the autoexec startup section, spawn the
//! emulator non-interactively, and wait under a hard wall-clock timeout.
//! There is no graceful guest shutdown; on expiry the child is killed.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::config::{VmConfig, AUTOEXEC_SECTION};
use crate::error::{DosError, DosResult};

/// How often the child is polled while waiting for it to finish.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawns the external emulator for one batch script at a time.
#[derive(Debug, Clone)]
pub struct EmulatorExecutor {
    emulator_path: PathBuf,
}

impl Default for EmulatorExecutor {
    fn default() -> Self {
        Self::new("dosbox")
    }
}

impl EmulatorExecutor {
    pub fn new(emulator_path: impl Into<PathBuf>) -> Self {
        Self {
            emulator_path: emulator_path.into(),
        }
    }

    /// Run `batch_file_name` (already written into `artifact_dir`) inside
    /// the emulator configured by `config`.
    ///
    /// Returns the emulator's own host-level exit status code — NOT the
    /// guest command's exit code, which must be recovered from artifacts
    /// afterwards. One attempt per call; no retries.
    pub fn execute(
        &self,
        config: &VmConfig,
        batch_file_name: &str,
        artifact_dir: &Path,
        working_dir: Option<&Path>,
    ) -> DosResult<i32> {
        for mount in config.mount_table().mounts() {
            if !mount.host_dir.is_dir() {
                return Err(DosError::MountDirMissing(mount.host_dir.clone()));
            }
        }

        let descriptor = self.write_descriptor(config, batch_file_name, artifact_dir)?;

        let mut command = Command::new(&self.emulator_path);
        command
            .arg("-conf")
            .arg(&descriptor)
            .arg("-noconsole")
            .arg("--exit")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }
        tracing::debug!(
            emulator = %self.emulator_path.display(),
            descriptor = %descriptor.display(),
            "spawning emulator"
        );

        let timeout_secs = config.timeout_secs();
        let mut child = command.spawn().map_err(DosError::Spawn)?;

        match wait_with_timeout(&mut child, Duration::from_secs(timeout_secs))? {
            Some(status) => Ok(status_code(status)),
            None => Err(DosError::Timeout(timeout_secs)),
        }
    }

    /// Serialize the descriptor: every configured section except autoexec
    /// verbatim, then a synthesized `[autoexec]` that mounts each drive in
    /// declaration order, switches to the primary drive, and invokes the
    /// batch script by base name.
    fn write_descriptor(
        &self,
        config: &VmConfig,
        batch_file_name: &str,
        artifact_dir: &Path,
    ) -> DosResult<PathBuf> {
        let stem = batch_file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(batch_file_name);
        let path = artifact_dir.join(format!("{stem}.CFG"));

        let mut text = String::new();
        for (name, entries) in config.sections() {
            if name.eq_ignore_ascii_case(AUTOEXEC_SECTION) {
                continue;
            }
            let _ = writeln!(text, "[{name}]");
            for (key, value) in entries {
                let _ = writeln!(text, "{key}={value}");
            }
            text.push('\n');
        }

        let mounts = config.mount_table();
        let _ = writeln!(text, "[{AUTOEXEC_SECTION}]");
        for mount in mounts.mounts() {
            let _ = writeln!(text, "mount {} \"{}\"", mount.letter, mount.host_dir.display());
        }
        let primary = mounts.primary().map(|m| m.letter).unwrap_or('c');
        let _ = writeln!(text, "{primary}:");
        let _ = writeln!(text, "{batch_file_name}");

        std::fs::write(&path, &text)?;
        tracing::debug!(path = %path.display(), "wrote emulator descriptor:\n{text}");
        Ok(path)
    }
}

/// Wait for the child, polling until it exits or the timeout expires.
/// On expiry the child is killed and reaped; `None` signals the timeout.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> DosResult<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            tracing::warn!("emulator exceeded timeout, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn status_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal: Option<i32> = None;

    match status.code() {
        Some(code) => code,
        None => signal.map(|s| 128 + s).unwrap_or(1),
    }
}
