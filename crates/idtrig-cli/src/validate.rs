//! # Validate Subcommand
//!
//! Parses a trigger definition file and checks every definition's shape.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::input::load_triggers;

/// Arguments for `idtrig validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// YAML file holding a list of trigger definitions.
    #[arg(value_name = "TRIGGERS")]
    pub triggers: PathBuf,
}

/// Execute the validate subcommand.
///
/// Returns 0 when every definition is valid, 1 otherwise.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let definitions = load_triggers(&args.triggers)?;
    let mut failed = 0usize;

    for definition in &definitions {
        match definition.validate() {
            Ok(()) => println!("  OK: {} ({})", definition.id, definition.trigger_type),
            Err(e) => {
                failed += 1;
                println!("  FAIL: {}: {e}", definition.id);
            }
        }
    }

    println!(
        "Triggers: {}/{} valid",
        definitions.len() - failed,
        definitions.len()
    );
    Ok(u8::from(failed > 0))
}
