use std::fmt;

/// Errors in the simulation inputs. These fail a whole batch before any
/// trial runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Covariance matrix built from volatilities and correlations has no
    /// Cholesky factor
    NotPositiveSemiDefinite { row: usize, pivot: f64 },
    /// Correlation matrix is malformed (wrong shape, asymmetric, out of range)
    InvalidCorrelation { reason: String },
    /// No simulated years between current age and life expectancy
    NonPositiveHorizon { current_age: u8, life_expectancy: u8 },
    /// RMD lookup impossible because the table has no entries
    EmptyRmdTable,
    UnknownPolicyYear(i16),
    UnknownState(String),
    InvalidValue {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
    /// Allocation weights must be non-negative and sum to one
    InvalidWeights { sum: f64 },
    /// Input could not be decoded into strongly-typed parameters
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotPositiveSemiDefinite { row, pivot } => write!(
                f,
                "covariance matrix is not positive semi-definite (row {row}, pivot {pivot})"
            ),
            ConfigError::InvalidCorrelation { reason } => {
                write!(f, "invalid correlation matrix: {reason}")
            }
            ConfigError::NonPositiveHorizon {
                current_age,
                life_expectancy,
            } => write!(
                f,
                "life expectancy {life_expectancy} leaves no years to simulate from age {current_age}"
            ),
            ConfigError::EmptyRmdTable => write!(f, "RMD table has no entries"),
            ConfigError::UnknownPolicyYear(year) => {
                write!(f, "no tax policy tables for year {year}")
            }
            ConfigError::UnknownState(code) => write!(f, "no state tax entry for '{code}'"),
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => write!(f, "invalid value for {field} ({value}): {reason}"),
            ConfigError::InvalidWeights { sum } => {
                write!(f, "allocation weights must sum to 1.0 (got {sum})")
            }
            ConfigError::Parse(msg) => write!(f, "could not parse parameters: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Per-trial numerical faults. The trial is dropped and counted; the batch
/// keeps going.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialError {
    NonFinite { year: usize, field: &'static str },
}

impl fmt::Display for TrialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialError::NonFinite { year, field } => {
                write!(f, "non-finite {field} in simulated year {year}")
            }
        }
    }
}

impl std::error::Error for TrialError {}

/// Batch-level failures surfaced to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Config(ConfigError),
    /// Every trial was dropped or cancelled, so there is nothing to aggregate
    NoTrialsCompleted { dropped: usize, cancelled: usize },
    /// Cancelled before a single trial was dispatched
    Cancelled,
    /// The worker pool could not be started
    Pool(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "{e}"),
            SimulationError::NoTrialsCompleted { dropped, cancelled } => write!(
                f,
                "no trials completed ({dropped} dropped, {cancelled} cancelled)"
            ),
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
            SimulationError::Pool(msg) => write!(f, "could not start worker pool: {msg}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(err: ConfigError) -> Self {
        SimulationError::Config(err)
    }
}
