use crate::cli::MinimizeArgs;
use crate::error::{CliError, Result};
use molmin::engine::config::{
    self as core_config, DEFAULT_FORCEFIELD, DEFAULT_MAX_STEPS, MinimizationConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialForcefieldConfig {
    name: Option<String>,
    parameter_files: Option<Vec<PathBuf>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialOptimizerConfig {
    initial_step_size: Option<f64>,
    max_step_size: Option<f64>,
    min_step_size: Option<f64>,
    gradient_tolerance: Option<f64>,
    energy_tolerance: Option<f64>,
    line_search_attempts: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRunConfig {
    max_steps: Option<usize>,
}

/// The `minimize` configuration as read from a TOML file, before CLI overrides.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialMinimizeConfig {
    forcefield: Option<PartialForcefieldConfig>,
    optimizer: Option<PartialOptimizerConfig>,
    run: Option<PartialRunConfig>,
}

/// Everything the `minimize` command needs after merging file, `--set` and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub minimization: MinimizationConfig,
    pub parameter_files: Vec<PathBuf>,
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid value for {}: '{}' ({} expected)",
            key,
            value,
            std::any::type_name::<T>()
        ))
    })
}

impl PartialMinimizeConfig {
    /// Reads a configuration file. Relative `parameter-files` entries are
    /// resolved against the directory containing the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        if let Some(files) = config
            .forcefield
            .as_mut()
            .and_then(|ff| ff.parameter_files.as_mut())
        {
            for file in files.iter_mut() {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }
        Ok(config)
    }

    pub fn merge_with_cli(mut self, args: &MinimizeArgs) -> Result<ResolvedConfig> {
        self.apply_set_values(&args.set_values)?;

        let ff_config = self.forcefield.take().unwrap_or_default();
        let opt_config = self.optimizer.take().unwrap_or_default();
        let run_config = self.run.take().unwrap_or_default();

        let forcefield = args
            .forcefield
            .clone()
            .or(ff_config.name)
            .unwrap_or_else(|| DEFAULT_FORCEFIELD.to_string());

        let mut parameter_files = ff_config.parameter_files.unwrap_or_default();
        parameter_files.extend(args.parameter_files.iter().cloned());

        let mut optimizer = core_config::OptimizerConfigBuilder::new();
        if let Some(size) = opt_config.initial_step_size {
            optimizer = optimizer.initial_step_size(size);
        }
        if let Some(size) = opt_config.max_step_size {
            optimizer = optimizer.max_step_size(size);
        }
        if let Some(size) = opt_config.min_step_size {
            optimizer = optimizer.min_step_size(size);
        }
        if let Some(tolerance) = args.gradient_tolerance.or(opt_config.gradient_tolerance) {
            optimizer = optimizer.gradient_tolerance(tolerance);
        }
        if let Some(tolerance) = args.energy_tolerance.or(opt_config.energy_tolerance) {
            optimizer = optimizer.energy_tolerance(tolerance);
        }
        if let Some(attempts) = opt_config.line_search_attempts {
            optimizer = optimizer.line_search_attempts(attempts);
        }
        let optimizer = optimizer
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let minimization = core_config::MinimizationConfigBuilder::new()
            .forcefield(forcefield)
            .max_steps(
                args.max_steps
                    .or(run_config.max_steps)
                    .unwrap_or(DEFAULT_MAX_STEPS),
            )
            .optimizer(optimizer)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(ResolvedConfig {
            minimization,
            parameter_files,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let key = key.trim();

            match key {
                "forcefield.name" => {
                    self.forcefield.get_or_insert_with(Default::default).name =
                        Some(value.trim().to_string());
                }
                "run.max-steps" => {
                    self.run.get_or_insert_with(Default::default).max_steps =
                        Some(parse_value(key, value)?);
                }
                "optimizer.initial-step-size" => {
                    self.optimizer
                        .get_or_insert_with(Default::default)
                        .initial_step_size = Some(parse_value(key, value)?);
                }
                "optimizer.max-step-size" => {
                    self.optimizer
                        .get_or_insert_with(Default::default)
                        .max_step_size = Some(parse_value(key, value)?);
                }
                "optimizer.min-step-size" => {
                    self.optimizer
                        .get_or_insert_with(Default::default)
                        .min_step_size = Some(parse_value(key, value)?);
                }
                "optimizer.gradient-tolerance" => {
                    self.optimizer
                        .get_or_insert_with(Default::default)
                        .gradient_tolerance = Some(parse_value(key, value)?);
                }
                "optimizer.energy-tolerance" => {
                    self.optimizer
                        .get_or_insert_with(Default::default)
                        .energy_tolerance = Some(parse_value(key, value)?);
                }
                "optimizer.line-search-attempts" => {
                    self.optimizer
                        .get_or_insert_with(Default::default)
                        .line_search_attempts = Some(parse_value(key, value)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
