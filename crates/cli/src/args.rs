//! Command line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chainbind", version, about = "Inspect persisted smart-contract bindings")]
pub struct Cli {
    /// Path to the TOML settings file.
    #[arg(long, env = "CHAINBIND_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Overrides the configured registry directory.
    #[arg(long, value_name = "DIR")]
    pub registry: Option<PathBuf>,

    /// Chain the bindings were built for.
    #[arg(long, value_enum)]
    pub chain: ChainKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainKind {
    Ethereum,
    Quorum,
    Fabric,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Lists the identifiers of all bindings.
    List,
    /// Prints one binding as JSON.
    Show {
        /// Contract identifier.
        identifier: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_arguments() {
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from([
            "chainbind",
            "--registry",
            "contracts",
            "--chain",
            "fabric",
            "show",
            "Assets",
        ])
        .unwrap();
        assert_eq!(cli.chain, ChainKind::Fabric);
        assert_eq!(cli.registry, Some(PathBuf::from("contracts")));
        assert_eq!(
            cli.command,
            Command::Show {
                identifier: "Assets".to_string()
            }
        );

        assert!(Cli::try_parse_from(["chainbind", "--chain", "bitcoin", "list"]).is_err());
    }
}
