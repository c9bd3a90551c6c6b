//! DOS utility caller core
//!
//! This crate lets a host process invoke a legacy DOS command-line tool
//! inside an external DOSBox process as if it were a normal subprocess
//! call:
//! - `filename`: pre-flight DOS 8.3 validation
//! - `config` / `locale` / `mount`: virtual-machine configuration and
//!   host<->guest path translation
//! - `batch`: guest batch-script synthesis
//! - `executor`: bounded emulator process supervision
//! - `output`: recovery of the guest exit code and output from artifacts
//! - `caller`: one request/response cycle with a never-failing boundary
//!
//! The emulator never reports the guest command's result directly; it is
//! reconstructed after the fact from files the batch script leaves in the
//! primary mount directory.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod batch;
pub mod caller;
pub mod codepage;
pub mod config;
pub mod error;
pub mod executor;
pub mod filename;
pub mod locale;
pub mod mount;
pub mod output;

pub use batch::BatchScript;
pub use caller::call_dos_utility;
pub use config::{ConfigPatch, VmConfig, DEFAULT_TIMEOUT_SECS};
pub use error::{DosError, DosResult};
pub use executor::EmulatorExecutor;
pub use filename::{DosFilename, FilenameError};
pub use mount::{DriveMount, MountTable};
pub use output::{CapturedOutput, ExitCodeSource};

/// Ambient host state snapshotted once per call.
///
/// Everything the pipeline would otherwise read from process-wide state
/// (current directory, `TOOL_ROOT_DIR`, locale) lives here, so a call never
/// mutates the process environment and concurrent callers can diverge.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Host directory the primary drive is mounted on.
    pub cwd: PathBuf,
    /// Override for the secondary (tools) drive mount.
    pub tool_root: Option<PathBuf>,
    /// Host locale tag, e.g. `de_DE.UTF-8`.
    pub locale: Option<String>,
    /// Emulator executable to spawn.
    pub emulator_path: PathBuf,
}

impl CallContext {
    /// Snapshot the ambient environment: cwd, `TOOL_ROOT_DIR`, locale.
    pub fn from_env() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            tool_root: std::env::var_os("TOOL_ROOT_DIR").map(PathBuf::from),
            locale: locale::system_locale_tag(),
            emulator_path: PathBuf::from("dosbox"),
        }
    }
}

/// One logical request: "run command X with arguments Y".
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// DOS command to execute.
    pub command: String,
    /// Ordered command arguments.
    pub arguments: Vec<String>,
    /// Guest environment variable overrides.
    pub environment: IndexMap<String, String>,
    /// Nested configuration overrides applied over the defaults.
    pub config_overrides: ConfigPatch,
    /// Capture guest output through artifact files (default true).
    pub capture_output: bool,
    /// Working directory for the emulator process.
    pub working_dir: Option<PathBuf>,
    /// Wall-clock timeout override in seconds.
    pub timeout_secs: Option<u64>,
    /// Primary drive (C:) mount override.
    pub source_dir: Option<PathBuf>,
    /// Secondary drive (D:) mount override.
    pub tools_dir: Option<PathBuf>,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: Vec::new(),
            environment: IndexMap::new(),
            config_overrides: ConfigPatch::new(),
            capture_output: true,
            working_dir: None,
            timeout_secs: None,
            source_dir: None,
            tools_dir: None,
        }
    }
}

/// Reconstructed outcome of one guest command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

impl ExecutionResult {
    /// Minimal result synthesized from the raw emulator status when no
    /// output is captured.
    pub fn from_raw_status(exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code,
            success: exit_code == 0,
        }
    }

    /// Uniform failure shape: exit code 1, diagnostic in stderr.
    pub fn internal_failure(diagnostic: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: diagnostic.into(),
            exit_code: 1,
            success: false,
        }
    }
}
