//! Error taxonomy shared by every operation.
//!
//! Backend status codes are translated here into [`Error`]; the mapping is
//! pure and never retries.

use crate::params::ParamError;
use crate::primitive::StatusCode;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("getrlimit or sysctl(hw.usermem) failed")]
    ResourceProbeFailed,

    #[error("clock_getres or clock_gettime failed")]
    ClockFailed,

    #[error("error computing derived key")]
    DerivationFailed,

    #[error("could not read salt from the OS entropy source")]
    EntropySourceFailed,

    #[error("error in the underlying crypto library")]
    CryptoLibraryError,

    #[error("malloc failed")]
    AllocationFailed,

    #[error("data is not a valid scrypt-encrypted block")]
    MalformedCiphertext,

    #[error("unrecognized scrypt format")]
    UnrecognizedFormat,

    #[error("decrypting file would take too much memory")]
    MemoryBudgetExceeded,

    #[error("decrypting file would take too long")]
    TimeBudgetExceeded,

    #[error("password is incorrect")]
    PasswordIncorrect,

    #[error("error writing output file")]
    OutputWriteFailed,

    #[error("error reading input file")]
    InputReadFailed,

    #[error("hash parameters are wrong: {0}")]
    InvalidParams(#[from] ParamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric code of the scrypt library table, if this error has one.
    pub fn code(&self) -> Option<i32> {
        let code = match self {
            Error::ResourceProbeFailed => StatusCode::RESOURCE_PROBE,
            Error::ClockFailed => StatusCode::CLOCK,
            Error::DerivationFailed => StatusCode::DERIVATION,
            Error::EntropySourceFailed => StatusCode::ENTROPY,
            Error::CryptoLibraryError => StatusCode::CRYPTO,
            Error::AllocationFailed => StatusCode::ALLOCATION,
            Error::MalformedCiphertext => StatusCode::MALFORMED,
            Error::UnrecognizedFormat => StatusCode::UNRECOGNIZED_FORMAT,
            Error::MemoryBudgetExceeded => StatusCode::MEMORY_BUDGET,
            Error::TimeBudgetExceeded => StatusCode::TIME_BUDGET,
            Error::PasswordIncorrect => StatusCode::PASSWORD_INCORRECT,
            Error::OutputWriteFailed => StatusCode::OUTPUT_WRITE,
            Error::InputReadFailed => StatusCode::INPUT_READ,
            Error::InvalidParams(_) | Error::Internal(_) => return None,
        };
        Some(code.get())
    }

    /// True for failures a caller may retry with a larger budget.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(
            self,
            Error::MemoryBudgetExceeded | Error::TimeBudgetExceeded
        )
    }
}

impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::RESOURCE_PROBE => Error::ResourceProbeFailed,
            StatusCode::CLOCK => Error::ClockFailed,
            StatusCode::DERIVATION => Error::DerivationFailed,
            StatusCode::ENTROPY => Error::EntropySourceFailed,
            StatusCode::CRYPTO => Error::CryptoLibraryError,
            StatusCode::ALLOCATION => Error::AllocationFailed,
            StatusCode::MALFORMED => Error::MalformedCiphertext,
            StatusCode::UNRECOGNIZED_FORMAT => Error::UnrecognizedFormat,
            StatusCode::MEMORY_BUDGET => Error::MemoryBudgetExceeded,
            StatusCode::TIME_BUDGET => Error::TimeBudgetExceeded,
            StatusCode::PASSWORD_INCORRECT => Error::PasswordIncorrect,
            StatusCode::OUTPUT_WRITE => Error::OutputWriteFailed,
            StatusCode::INPUT_READ => Error::InputReadFailed,
            other => Error::Internal(format!("unknown primitive status {}", other.get())),
        }
    }
}
