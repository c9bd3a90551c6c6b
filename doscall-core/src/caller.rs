//! One-shot orchestration of a DOS utility call.
//!
//! Composes validation, configuration, path translation, batch synthesis,
//! execution, and output recovery into a single request/response cycle.
//! The public entry point never returns an error: every failure is folded
//! into the same result shape callers already handle.
//!
//! Capture and marker files use fixed names, so two concurrent calls
//! sharing a primary mount directory would clobber each other; concurrent
//! callers must use distinct working directories.

use crate::batch::{BatchScript, STDOUT_CAPTURE};
use crate::config::{VmConfig, ENVIRONMENT_SECTION, EXECUTION_SECTION, MOUNT_SECTION};
use crate::error::{DosError, DosResult};
use crate::executor::EmulatorExecutor;
use crate::filename;
use crate::output;
use crate::{CallContext, ExecutionRequest, ExecutionResult};

/// Execute a DOS utility command and return its reconstructed result.
///
/// Failures of any kind — pre-flight validation, emulator execution, or
/// anything unexpected — come back as a normal result with `success =
/// false`, `exit_code = 1`, and a diagnostic in `stderr`.
pub fn call_dos_utility(ctx: &CallContext, request: &ExecutionRequest) -> ExecutionResult {
    match run_request(ctx, request) {
        Ok(result) => result,
        Err(DosError::Filename(err)) => {
            ExecutionResult::internal_failure(format!("Filename validation error: {err}"))
        }
        Err(err @ (DosError::Timeout(_) | DosError::Spawn(_) | DosError::MountDirMissing(_))) => {
            ExecutionResult::internal_failure(format!("Emulator execution error: {err}"))
        }
        Err(err) => ExecutionResult::internal_failure(format!("Unexpected error: {err}")),
    }
}

fn run_request(ctx: &CallContext, request: &ExecutionRequest) -> DosResult<ExecutionResult> {
    tracing::debug!(command = %request.command, arguments = ?request.arguments, "dos utility call");

    // Pre-flight: every non-flag argument must be a legal 8.3 name. This
    // runs before anything touches the filesystem or spawns a process.
    let filenames: Vec<&str> = request
        .arguments
        .iter()
        .filter(|arg| !arg.starts_with('/') && !arg.starts_with('-'))
        .map(String::as_str)
        .collect();
    filename::validate_all(filenames.iter().copied())?;
    for warning in filename::check_case_warnings(filenames.iter().copied()) {
        tracing::warn!("{warning}");
    }

    let mut config = VmConfig::defaults(ctx);
    config.apply_patch(&request.config_overrides);

    if let Some(dir) = &request.source_dir {
        config.set(MOUNT_SECTION, "c", dir.display().to_string());
    }
    if let Some(dir) = &request.tools_dir {
        config.set(MOUNT_SECTION, "d", dir.display().to_string());
    }
    if let Some(secs) = request.timeout_secs {
        config.set(EXECUTION_SECTION, "timeout", secs.to_string());
    }

    let mounts = config.mount_table();
    let guest_command = mounts.to_guest(&request.command);
    let guest_arguments: Vec<String> = request
        .arguments
        .iter()
        .map(|arg| {
            // Command-line switches pass through untranslated.
            if arg.starts_with('/') || arg.starts_with('-') {
                arg.clone()
            } else {
                mounts.to_guest(arg)
            }
        })
        .collect();

    let script = if request.capture_output {
        BatchScript::simple(&guest_command, &guest_arguments)
    } else {
        BatchScript::with_case_warning(&guest_command, &guest_arguments)
    };

    // Artifacts live in the primary mount root: that is drive C:'s view of
    // the world, where the capture redirects and the marker land.
    let artifact_dir = mounts
        .primary()
        .map(|mount| mount.host_dir.clone())
        .unwrap_or_else(|| ctx.cwd.clone());

    if request.capture_output {
        // Seed an empty capture file so a guest that writes nothing still
        // leaves a readable artifact behind.
        std::fs::write(artifact_dir.join(STDOUT_CAPTURE), b"")?;
    }
    let script_path = script.write_to(&artifact_dir)?;

    if !request.environment.is_empty() {
        for (key, value) in &request.environment {
            config.set(ENVIRONMENT_SECTION, key, value.clone());
        }
        // Search-path style values cross the boundary too.
        for (key, value) in config.environment() {
            config.set(ENVIRONMENT_SECTION, &key, mounts.translate_env_value(&value));
        }
    }

    let executor = EmulatorExecutor::new(&ctx.emulator_path);
    let status = executor.execute(
        &config,
        &script.file_name,
        &artifact_dir,
        request.working_dir.as_deref(),
    )?;
    tracing::debug!(status, "emulator exited");

    if request.capture_output {
        let captured = output::read_capture(&artifact_dir);
        Ok(output::process_output(&artifact_dir, captured))
    } else {
        // Nothing to recover; the raw emulator status is all there is.
        let _ = std::fs::remove_file(&script_path);
        Ok(ExecutionResult::from_raw_status(status))
    }
}
