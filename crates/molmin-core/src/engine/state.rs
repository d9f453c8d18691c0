use std::fmt;

/// Lifecycle state of an [`EnergyMinimizer`](super::minimizer::EnergyMinimizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinimizerState {
    #[default]
    Stopped,
    SettingUp,
    Running,
    SetupFailed,
    /// A step finished and new coordinates are ready to be displayed.
    UpdateReady,
    Converged,
}

impl MinimizerState {
    /// Human-readable label, suitable for a status bar.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::SettingUp => "Setting Up",
            Self::Running => "Running",
            Self::SetupFailed => "Setup Failed",
            Self::UpdateReady => "Update Ready",
            Self::Converged => "Converged",
        }
    }
}

impl fmt::Display for MinimizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}
