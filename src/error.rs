//! Error type shared by every layer of the fitter.
//!
//! Nothing in the core recovers locally: errors bubble up to `main`, which
//! prints the message and exits with the kind-specific code.

use thiserror::Error;

/// Broad failure category. Determines the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid options or construction parameters.
    Config,
    /// A usage contract was broken (double fill, unfinalized data, off-center input).
    Contract,
    /// A malformed input record.
    Input,
    /// A numerical failure such as a non-positive-definite covariance.
    Numerical,
    /// The minimizer could not produce a usable result.
    Minimizer,
    /// File system errors.
    Io,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 2,
            ErrorKind::Contract => 3,
            ErrorKind::Input => 4,
            ErrorKind::Numerical => 5,
            ErrorKind::Minimizer => 6,
            ErrorKind::Io => 7,
        }
    }
}

#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Contract, message)
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Numerical, message)
    }

    pub fn minimizer(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Minimizer, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}
