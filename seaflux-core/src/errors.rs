use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum SeaFluxError {
    #[error("{0}")]
    Error(String),
    #[error("{name}: {count} of {valid} values fall outside the limits ({lower}, {upper}). Check that the input has the correct units")]
    OutOfRange {
        name: String,
        count: usize,
        valid: usize,
        lower: f64,
        upper: f64,
    },
    #[error("Shapes {left:?} and {right:?} cannot be broadcast together")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("Could not parse MBL record at line {line}: {reason}")]
    MblParse { line: usize, reason: String },
    #[error("Could not read configuration: {0}")]
    ConfigRead(#[from] std::io::Error),
    #[error("Could not parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Could not serialise configuration: {0}")]
    ConfigSerialise(#[from] toml::ser::Error),
}

/// Convenience type for `Result<T, SeaFluxError>`.
pub type SeaFluxResult<T> = Result<T, SeaFluxError>;
