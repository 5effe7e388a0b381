//! Error types raised by the calculators and loaders.

use thiserror::Error;

/// Errors surfaced by table loading and calculation.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("failed to load {origin}: {reason}")]
    DataLoad { origin: String, reason: String },

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown label '{label}' in category '{category}'")]
    UnknownLabel { category: String, label: String },

    #[error("no package '{package}' in bundle category '{category}'")]
    UnknownPackage { category: String, package: String },

    #[error("invalid duration: {0} seconds")]
    InvalidDuration(f64),
}

impl CalcError {
    pub fn data_load(origin: impl Into<String>, reason: impl ToString) -> Self {
        CalcError::DataLoad {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for CalcError {
    fn from(e: rusqlite::Error) -> Self {
        CalcError::data_load("database", e)
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
