use thiserror::Error;

pub const DEFAULT_FORCEFIELD: &str = "lj-12-6";
pub const DEFAULT_MAX_STEPS: usize = 500;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Tunables of the steepest-descent optimizer.
///
/// Step sizes are expressed as the displacement (Å) of the atom with the
/// largest gradient; the others move proportionally.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub initial_step_size: f64,
    pub max_step_size: f64,
    /// Below this step size the line search gives up and the run is treated as converged.
    pub min_step_size: f64,
    /// RMS gradient threshold, kcal/(mol·Å).
    pub gradient_tolerance: f64,
    /// Energy change threshold between consecutive steps, kcal/mol.
    pub energy_tolerance: f64,
    pub line_search_attempts: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            initial_step_size: 0.05,
            max_step_size: 0.3,
            min_step_size: 1e-6,
            gradient_tolerance: 0.1,
            energy_tolerance: 1e-6,
            line_search_attempts: 10,
        }
    }
}

#[derive(Default)]
pub struct OptimizerConfigBuilder {
    initial_step_size: Option<f64>,
    max_step_size: Option<f64>,
    min_step_size: Option<f64>,
    gradient_tolerance: Option<f64>,
    energy_tolerance: Option<f64>,
    line_search_attempts: Option<usize>,
}

fn require_positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a positive number (got {})", value),
        })
    }
}

impl OptimizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_step_size(mut self, size: f64) -> Self {
        self.initial_step_size = Some(size);
        self
    }
    pub fn max_step_size(mut self, size: f64) -> Self {
        self.max_step_size = Some(size);
        self
    }
    pub fn min_step_size(mut self, size: f64) -> Self {
        self.min_step_size = Some(size);
        self
    }
    pub fn gradient_tolerance(mut self, tolerance: f64) -> Self {
        self.gradient_tolerance = Some(tolerance);
        self
    }
    pub fn energy_tolerance(mut self, tolerance: f64) -> Self {
        self.energy_tolerance = Some(tolerance);
        self
    }
    pub fn line_search_attempts(mut self, attempts: usize) -> Self {
        self.line_search_attempts = Some(attempts);
        self
    }

    /// Fills unset values from [`OptimizerConfig::default`] and validates the result.
    pub fn build(self) -> Result<OptimizerConfig, ConfigError> {
        let defaults = OptimizerConfig::default();
        let config = OptimizerConfig {
            initial_step_size: require_positive(
                "initial_step_size",
                self.initial_step_size.unwrap_or(defaults.initial_step_size),
            )?,
            max_step_size: require_positive(
                "max_step_size",
                self.max_step_size.unwrap_or(defaults.max_step_size),
            )?,
            min_step_size: require_positive(
                "min_step_size",
                self.min_step_size.unwrap_or(defaults.min_step_size),
            )?,
            gradient_tolerance: require_positive(
                "gradient_tolerance",
                self.gradient_tolerance.unwrap_or(defaults.gradient_tolerance),
            )?,
            energy_tolerance: require_positive(
                "energy_tolerance",
                self.energy_tolerance.unwrap_or(defaults.energy_tolerance),
            )?,
            line_search_attempts: self
                .line_search_attempts
                .unwrap_or(defaults.line_search_attempts),
        };

        if config.line_search_attempts == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "line_search_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if config.initial_step_size > config.max_step_size {
            return Err(ConfigError::InvalidParameter {
                name: "initial_step_size",
                reason: format!(
                    "must not exceed max_step_size ({})",
                    config.max_step_size
                ),
            });
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationConfig {
    pub forcefield: String,
    pub max_steps: usize,
    pub optimizer: OptimizerConfig,
}

#[derive(Default)]
pub struct MinimizationConfigBuilder {
    forcefield: Option<String>,
    max_steps: Option<usize>,
    optimizer: Option<OptimizerConfig>,
}

impl MinimizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forcefield(mut self, name: impl Into<String>) -> Self {
        self.forcefield = Some(name.into());
        self
    }
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
    pub fn optimizer(mut self, config: OptimizerConfig) -> Self {
        self.optimizer = Some(config);
        self
    }

    pub fn build(self) -> Result<MinimizationConfig, ConfigError> {
        let forcefield = self
            .forcefield
            .ok_or(ConfigError::MissingParameter("forcefield"))?;
        if forcefield.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "forcefield",
                reason: "must not be empty".to_string(),
            });
        }
        let max_steps = self
            .max_steps
            .ok_or(ConfigError::MissingParameter("max_steps"))?;
        if max_steps == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_steps",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(MinimizationConfig {
            forcefield,
            max_steps,
            optimizer: self.optimizer.unwrap_or_default(),
        })
    }
}
