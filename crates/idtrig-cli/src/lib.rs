//! # idtrig-cli: Command-Line Front End for the Identity Trigger Engine
//!
//! Provides the `idtrig` binary:
//!
//! - `idtrig validate <TRIGGERS>` checks a YAML list of trigger definitions.
//! - `idtrig evaluate --triggers <TRIGGERS> [--previous <JSON>] [--new <JSON>]`
//!   runs the definitions against an identity refresh and prints the results.
//!
//! ```bash
//! idtrig --config idtrig.yaml evaluate --triggers triggers.yaml \
//!     --previous before.json --new after.json --format json
//! ```
//!
//! Exit codes: 0 success, 1 failures present, 2 operational error.

pub mod config;
pub mod evaluate;
pub mod input;
pub mod validate;
