//! Minimal usage tour: run a couple of DOS commands through the emulator.
//!
//! Requires DOSBox on PATH:
//!   cargo run --example basic

use doscall_core::{call_dos_utility, CallContext, ExecutionRequest};

fn main() {
    let ctx = CallContext::from_env();

    let mut request = ExecutionRequest::new("ver");
    let result = call_dos_utility(&ctx, &request);
    println!("ver -> exit {} (success: {})", result.exit_code, result.success);
    print!("{}", result.stdout);

    request = ExecutionRequest::new("dir");
    request.arguments = vec!["*.TXT".to_string()];
    let result = call_dos_utility(&ctx, &request);
    println!("dir *.TXT -> exit {} (success: {})", result.exit_code, result.success);
    print!("{}", result.stdout);
}
