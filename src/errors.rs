//! Centralized error handling for das-common
//!
//! This module provides structured error types shared across the helper
//! modules, so validation failures and collaborator errors carry enough
//! context to be reported without string matching.

use std::fmt;

/// Main error type for das-common operations
#[derive(Debug)]
pub enum DasError {
    /// No value resolvable for a declared parameter from any source
    MissingParameter { param: String },

    /// Resolved parameter value has the wrong type
    TypeMismatch {
        param: String,
        expected: String,
        received: String,
    },

    /// Resolved parameter value is outside an enumerated set
    InvalidChoice {
        param: String,
        received: String,
        allowed: Vec<String>,
    },

    /// Resolved numeric parameter value is outside its declared range
    OutOfRange {
        param: String,
        received: f64,
        min: f64,
        max: f64,
    },

    /// Trace container file operation errors
    NetCDFError(netcdf::Error),

    /// Required variable missing from a trace file
    VariableNotFound { var: String },

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Timestamp parsing errors
    TimeParseError(chrono::ParseError),

    /// Identifier parsing errors
    UuidError(uuid::Error),

    /// Serialization errors (records, interval indices, registry files)
    JsonError(serde_json::Error),

    /// Malformed input value (times, durations, versions)
    ParseError { message: String },

    /// Frame construction or alignment error
    FrameError { message: String },

    /// Interval index manipulation error
    IntervalError { message: String },

    /// Data-processing filter error
    ProcessingError(String),

    /// Credential chain or record error
    AuthError(String),

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Generic error for odds and ends
    Generic(String),
}

impl fmt::Display for DasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DasError::MissingParameter { param } => {
                write!(f, "No value could be resolved for parameter '{}'", param)
            }
            DasError::TypeMismatch {
                param,
                expected,
                received,
            } => write!(
                f,
                "Parameter '{}' expected {} but received {}",
                param, expected, received
            ),
            DasError::InvalidChoice {
                param,
                received,
                allowed,
            } => write!(
                f,
                "Parameter '{}' received '{}', expected one of [{}]",
                param,
                received,
                allowed.join(", ")
            ),
            DasError::OutOfRange {
                param,
                received,
                min,
                max,
            } => write!(
                f,
                "Parameter '{}' received {} outside range [{}, {}]",
                param, received, min, max
            ),
            DasError::NetCDFError(e) => write!(f, "Trace file error: {}", e),
            DasError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in trace file", var)
            }
            DasError::IoError(e) => write!(f, "I/O error: {}", e),
            DasError::ArrayError(e) => write!(f, "Array error: {}", e),
            DasError::TimeParseError(e) => write!(f, "Time parse error: {}", e),
            DasError::UuidError(e) => write!(f, "Invalid UUID: {}", e),
            DasError::JsonError(e) => write!(f, "Serialization error: {}", e),
            DasError::ParseError { message } => write!(f, "Parse error: {}", message),
            DasError::FrameError { message } => write!(f, "Frame error: {}", message),
            DasError::IntervalError { message } => write!(f, "Interval error: {}", message),
            DasError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            DasError::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            DasError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            DasError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DasError::NetCDFError(e) => Some(e),
            DasError::IoError(e) => Some(e),
            DasError::ArrayError(e) => Some(e),
            DasError::TimeParseError(e) => Some(e),
            DasError::UuidError(e) => Some(e),
            DasError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for DasError {
    fn from(error: netcdf::Error) -> Self {
        DasError::NetCDFError(error)
    }
}

impl From<std::io::Error> for DasError {
    fn from(error: std::io::Error) -> Self {
        DasError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for DasError {
    fn from(error: ndarray::ShapeError) -> Self {
        DasError::ArrayError(error)
    }
}

impl From<chrono::ParseError> for DasError {
    fn from(error: chrono::ParseError) -> Self {
        DasError::TimeParseError(error)
    }
}

impl From<uuid::Error> for DasError {
    fn from(error: uuid::Error) -> Self {
        DasError::UuidError(error)
    }
}

impl From<serde_json::Error> for DasError {
    fn from(error: serde_json::Error) -> Self {
        DasError::JsonError(error)
    }
}

impl From<String> for DasError {
    fn from(error: String) -> Self {
        DasError::Generic(error)
    }
}

impl From<&str> for DasError {
    fn from(error: &str) -> Self {
        DasError::Generic(error.to_string())
    }
}

/// Result type alias for das-common operations
pub type Result<T> = std::result::Result<T, DasError>;
