//! eCRF CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`; prints errors to
//! stderr and exits non-zero on failure. No configuration or subsystem
//! setup happens here.

use ecrf::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
