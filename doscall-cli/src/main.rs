//! doscall - call DOS utilities through DOSBox from the command line.
//!
//! Usage:
//!   doscall <command> [arguments...]
//!
//! Examples:
//!   doscall ver
//!   doscall dir *.txt
//!   doscall echo Hello World
//!   doscall cl /c test.c
//!   doscall --config config.doscfg dir *.txt

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use indexmap::IndexMap;
use tracing_subscriber::EnvFilter;

use doscall_core::{call_dos_utility, CallContext, ConfigPatch, ExecutionRequest};

/// Call DOS utilities through DOSBox with a transparent interface.
#[derive(Parser, Debug)]
#[command(name = "doscall")]
#[command(about = "Call DOS utilities through DOSBox with a transparent interface")]
struct Args {
    /// DOS command to execute
    command: String,

    /// Arguments for the DOS command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    arguments: Vec<String>,

    /// Path to an emulator configuration file (.doscfg)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timeout in seconds (default: 300)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Do not capture output
    #[arg(long)]
    no_capture: bool,

    /// Working directory for the emulator
    #[arg(short = 'w', long)]
    working_dir: Option<PathBuf>,

    /// Environment variables in KEY=VALUE format (can be used multiple times)
    #[arg(short, long = "env")]
    env: Vec<String>,

    /// Directory for the tools drive D: (overrides TOOL_ROOT_DIR)
    #[arg(long)]
    tool_root: Option<PathBuf>,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    std::process::exit(run(args));
}

fn run(args: Args) -> i32 {
    let mut ctx = CallContext::from_env();
    if let Some(root) = args.tool_root {
        ctx.tool_root = Some(root);
    }

    let config_overrides = match &args.config {
        Some(path) => match load_config_file(path) {
            Ok(patch) => patch,
            Err(err) => {
                eprintln!("Error loading configuration file: {err}");
                return 1;
            }
        },
        None => ConfigPatch::new(),
    };

    let mut request = ExecutionRequest::new(args.command);
    request.arguments = args.arguments;
    request.environment = parse_env_vars(&args.env);
    request.config_overrides = config_overrides;
    request.capture_output = !args.no_capture;
    request.working_dir = args.working_dir;
    request.timeout_secs = args.timeout;

    tracing::debug!(command = %request.command, arguments = ?request.arguments, "executing");

    let result = call_dos_utility(&ctx, &request);

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("Error: {err}");
                return 1;
            }
        }
    } else {
        print!("{}", result.stdout);
        eprint!("{}", result.stderr);
        if !result.success {
            eprintln!("Command failed with exit code {}", result.exit_code);
        }
    }

    result.exit_code
}

/// Parse repeated `KEY=VALUE` flags; malformed entries warn and are skipped.
fn parse_env_vars(entries: &[String]) -> IndexMap<String, String> {
    let mut vars = IndexMap::new();
    for entry in entries {
        match entry.split_once('=') {
            Some((key, value)) => {
                vars.insert(key.to_string(), value.to_string());
            }
            None => eprintln!("Warning: Invalid environment variable format: {entry}"),
        }
    }
    vars
}

/// Load a `.doscfg` file: sectioned `key=value` text, `#` comments, no
/// interpolation. Lines outside any section are ignored.
fn load_config_file(path: &Path) -> std::io::Result<ConfigPatch> {
    let mut text = String::new();
    std::fs::File::open(path)?.read_to_string(&mut text)?;

    let mut patch = ConfigPatch::new();
    let mut current: Option<String> = None;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Some(name.to_string());
            patch.entry(name.to_string()).or_default();
        } else if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            patch
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(patch)
}
