//! Error types for the read endpoint and the configuration surface.

/// Error returned by [`MemLogger::read`](crate::logger::MemLogger::read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Destination buffer unusable (empty or too small for one field).
    InvalidArgument(String),
    /// The blocking wait was interrupted before any data was produced.
    Interrupted,
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            ReadError::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for ReadError {}

/// Error returned when a configuration value is rejected.
///
/// The previous configuration stays in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Setting name not recognized.
    UnknownSetting(String),
    /// Value could not be parsed.
    InvalidValue { name: String, value: String },
    /// Mask contains bits with no field behind them.
    UnknownBits { name: &'static str, bits: u32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownSetting(name) => write!(f, "unknown setting '{}'", name),
            ConfigError::InvalidValue { name, value } => {
                write!(f, "invalid value '{}' for {}", value, name)
            }
            ConfigError::UnknownBits { name, bits } => {
                write!(f, "{} has unknown bits in {:#x}", name, bits)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
