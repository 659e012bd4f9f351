//! mirrorgroup CLI entry point
//!
//! Parses arguments, runs one command, prints errors to stderr and exits
//! non-zero on failure. All logic lives in the `cli` module.
//!
//! Talking to a cluster needs librados/librbd: build with
//! `--features librbd`. A default build parses every command but each one
//! fails with `MIRROR_CLI_UNAVAILABLE`, including `info` and `status`.

use mirrorgroup::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
