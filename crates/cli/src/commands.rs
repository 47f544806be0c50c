//! `list` and `show` over a filesystem registry.

use crate::args::{ChainKind, Command};
use anyhow::{bail, Context, Result};
use chainbind_config::{RegistryProvider, RegistrySettings};
use chainbind_core::{Chain, ContractRegistry, FileSystemContractRegistry};
use chainbind_ethereum::Ethereum;
use chainbind_fabric::Fabric;
use chainbind_quorum::Quorum;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Runs `command` against the registry of `chain`.
pub fn execute<W: Write>(chain: ChainKind, registry: &RegistrySettings, command: &Command, out: &mut W) -> Result<()> {
    if registry.provider == RegistryProvider::Memory {
        bail!("the in-memory registry holds no persisted bindings to inspect");
    }
    match chain {
        ChainKind::Ethereum => run::<Ethereum, W>(&registry.base_path, command, out),
        ChainKind::Quorum => run::<Quorum, W>(&registry.base_path, command, out),
        ChainKind::Fabric => run::<Fabric, W>(&registry.base_path, command, out),
    }
}

fn run<C: Chain, W: Write>(base_path: &Path, command: &Command, out: &mut W) -> Result<()> {
    debug!("Loading {} bindings from {}", C::NAME, base_path.display());
    let registry = FileSystemContractRegistry::<C>::open(base_path)
        .with_context(|| format!("failed to load {} bindings from '{}'", C::NAME, base_path.display()))?;

    match command {
        Command::List => {
            for binding in registry.bindings() {
                writeln!(
                    out,
                    "{}\t{}\t{} methods\t{} events",
                    binding.identifier(),
                    binding.interface(),
                    binding.methods().len(),
                    binding.events().len()
                )?;
            }
        }
        Command::Show { identifier } => {
            let Some(binding) = registry.get(identifier) else {
                bail!("no {} binding with identifier '{}'", C::NAME, identifier);
            };
            let document = serde_json::to_string_pretty(&*binding)?;
            writeln!(out, "{}", document)?;
        }
    }
    Ok(())
}
