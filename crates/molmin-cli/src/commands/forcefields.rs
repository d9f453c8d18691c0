use crate::cli::ForcefieldsArgs;
use crate::error::{CliError, Result};
use molmin::core::forcefield::registry::ForcefieldRegistry;
use std::path::PathBuf;
use tracing::info;

/// Builds a registry with the built-in force fields plus those in `parameter_files`.
pub fn load_registry(parameter_files: &[PathBuf]) -> Result<ForcefieldRegistry> {
    let mut registry = ForcefieldRegistry::new();
    for path in parameter_files {
        let name = registry
            .load_and_register(path)
            .map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
        info!("Registered force field '{}' from {:?}", name, path);
    }
    Ok(registry)
}

/// One line per force field: name, potential function and parameterized element count.
fn describe(registry: &ForcefieldRegistry) -> Result<Vec<String>> {
    registry
        .names()
        .into_iter()
        .map(|name| {
            let params = registry.get(&name)?;
            Ok(format!(
                "{:<16} {:<8} {} elements",
                name,
                params.globals.potential_function,
                params.vdw.len()
            ))
        })
        .collect()
}

pub async fn run(args: ForcefieldsArgs) -> Result<()> {
    let registry = load_registry(&args.parameter_files)?;
    for line in describe(&registry)? {
        println!("{}", line);
    }
    Ok(())
}
