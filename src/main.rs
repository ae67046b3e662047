//! shipline - build, version, push and extract containerized .NET apps
//!
//! Runs as a GitHub Actions step or locally.
//!
//! ## Commands
//!
//! - `shipline run` - Execute the pipeline from `INPUT_*` variables
//! - `shipline run --dry-run` - Print the commands the pipeline would run
//! - `shipline version` - Print the version label for a ref
//! - `shipline completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Preview a build
//! shipline run --dry-run \
//!     --input app-name=Orders.Api \
//!     --input docker-registry-url=ghcr.io/acme \
//!     --input push-to-docker-registry=false
//!
//! # Label for a branch
//! shipline version --ref refs/heads/feature/login
//! ```

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var("SHIPLINE_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
