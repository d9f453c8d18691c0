use crate::cli::MinimizeArgs;
use crate::commands::forcefields::load_registry;
use crate::config::PartialMinimizeConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use molmin::{
    core::io::{trace::write_trace_to_path, traits::MolecularFile, xyz::XyzFile},
    engine::{executor::RayonExecutor, progress::ProgressReporter},
    workflows,
};
use std::sync::{Arc, PoisonError};
use tracing::{info, warn};

pub async fn run(args: MinimizeArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialMinimizeConfig::from_file(path)?,
        None => PartialMinimizeConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let resolved = partial_config.merge_with_cli(&args)?;
    let registry = load_registry(&resolved.parameter_files)?;

    info!("Loading input structure from {:?}", &args.input);
    let (system, mut metadata) =
        XyzFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    info!(
        "Read {} atoms and perceived {} bonds.",
        system.atom_count(),
        system.bonds().len()
    );

    let molecule = system.into_shared();
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Minimizing {} with force field '{}'...",
        args.input.display(),
        resolved.minimization.forcefield
    );
    let result = tokio::task::block_in_place(|| {
        workflows::minimize::minimize_system(
            Arc::clone(&molecule),
            &resolved.minimization,
            Arc::new(registry),
            Arc::new(RayonExecutor::global()),
            &reporter,
        )
    })?;

    if !result.converged() {
        warn!(
            "Minimization stopped after {} steps without converging.",
            result.steps
        );
    }

    metadata.comment = format!(
        "E = {:.6} kcal/mol ({}, {}, {} steps)",
        result.energy, resolved.minimization.forcefield, result.final_state, result.steps
    );
    {
        let system = molecule.read().unwrap_or_else(PoisonError::into_inner);
        XyzFile::write_to_path(&system, &metadata, &args.output).map_err(|e| {
            CliError::FileParsing {
                path: args.output.clone(),
                source: e.into(),
            }
        })?;
    }

    if let Some(trace_path) = &args.trace {
        write_trace_to_path(&result.trace, trace_path)?;
        info!("Energy trace written to {:?}", trace_path);
    }

    println!(
        "✓ {} after {} steps: {:.4} → {:.4} kcal/mol. Structure written to: {}",
        result.final_state,
        result.steps,
        result.initial_energy,
        result.energy,
        args.output.display()
    );
    Ok(())
}
