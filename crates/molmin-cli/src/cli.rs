use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "molmin - Force-field geometry minimization for small molecules, one background step at a time.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads in the pool that runs minimization steps.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Minimize the energy of a molecular structure.
    Minimize(MinimizeArgs),
    /// List the force fields available for minimization.
    Forcefields(ForcefieldsArgs),
}

/// Arguments for the `minimize` subcommand.
#[derive(Args, Debug)]
pub struct MinimizeArgs {
    /// Path to the input structure in XYZ format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the minimized structure (XYZ format).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Force field to minimize with (e.g., 'lj-12-6', 'exp-6', or a name from a parameter file).
    #[arg(short, long, value_name = "NAME")]
    pub forcefield: Option<String>,

    /// Load additional force-field parameters from a TOML file. Can be used multiple times.
    #[arg(long = "parameter-file", value_name = "PATH")]
    pub parameter_files: Vec<PathBuf>,

    /// Maximum number of optimization steps.
    #[arg(long, value_name = "INT")]
    pub max_steps: Option<usize>,

    /// RMS gradient convergence threshold, kcal/(mol·Å).
    #[arg(long, value_name = "FLOAT")]
    pub gradient_tolerance: Option<f64>,

    /// Energy change convergence threshold, kcal/mol.
    #[arg(long, value_name = "FLOAT")]
    pub energy_tolerance: Option<f64>,

    /// Write the per-step energy trace to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub trace: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S optimizer.max-step-size=0.2
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `forcefields` subcommand.
#[derive(Args, Debug)]
pub struct ForcefieldsArgs {
    /// Also list force fields defined in these parameter files.
    #[arg(long = "parameter-file", value_name = "PATH")]
    pub parameter_files: Vec<PathBuf>,
}
