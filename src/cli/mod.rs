//! CLI for shipline
//!
//! - `run`: execute the build pipeline (or record it with `--dry-run`)
//! - `version`: print the version label for a ref
//! - `completions`: generate shell completions

pub mod completions;
pub mod run;
pub mod version;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for shipline
#[derive(Parser, Debug)]
#[command(name = "shipline")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level, overridden by `RUST_LOG`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build, push and extract the application image
    Run {
        /// Record commands instead of executing them
        #[arg(long)]
        dry_run: bool,
        /// Input override, e.g. `--input app-name=Orders.Api`
        #[arg(short, long = "input", value_name = "NAME=VALUE", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },

    /// Print the version label derived from a git ref
    Version {
        /// Ref to classify (defaults to `GITHUB_REF` and the event payload)
        #[arg(long = "ref", value_name = "REF")]
        git_ref: Option<String>,
        /// Pull request number, for `refs/pull/*` refs
        #[arg(long)]
        pr: Option<u64>,
        /// Image to tag, e.g. `ghcr.io/org/app`
        #[arg(long)]
        image: Option<String>,
        /// Print JSON instead of the bare label
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Parse and execute CLI arguments
pub fn run() -> Result<()> {
    let args = Args::parse();
    shipline::infrastructure::init_logging(&args.log_level);

    match args.command {
        Command::Run { dry_run, inputs } => {
            run::run_pipeline(&run::RunOptions { dry_run, inputs })?;
        }
        Command::Version {
            git_ref,
            pr,
            image,
            json,
        } => {
            let info = version::resolve(git_ref.as_deref(), pr, image.as_deref());
            println!("{}", version::render(&info, json)?);
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_inputs() {
        let args = Args::try_parse_from([
            "shipline",
            "run",
            "--dry-run",
            "-i",
            "app-name=Orders.Api",
            "--input",
            "build-configuration=release",
        ])
        .unwrap();

        match args.command {
            Command::Run { dry_run, inputs } => {
                assert!(dry_run);
                assert_eq!(
                    inputs,
                    vec![
                        ("app-name".to_string(), "Orders.Api".to_string()),
                        ("build-configuration".to_string(), "release".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_input_value_may_contain_equals() {
        assert_eq!(
            parse_input("myget-pre-auth-url=https://x/?a=b").unwrap(),
            (
                "myget-pre-auth-url".to_string(),
                "https://x/?a=b".to_string()
            )
        );
        assert!(parse_input("no-separator").is_err());
        assert!(parse_input("=value").is_err());
    }

    #[test]
    fn test_parse_version_with_global_log_level() {
        let args = Args::try_parse_from([
            "shipline",
            "version",
            "--ref",
            "refs/tags/v1.0.0",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.log_level, "debug");
        assert!(matches!(
            args.command,
            Command::Version { git_ref: Some(ref r), .. } if r == "refs/tags/v1.0.0"
        ));
    }
}
