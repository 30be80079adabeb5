use thiserror::Error;

use crate::catalog::EntityKind;

/// Resolver input that cannot be reconciled at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("missing required argument: {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failures raised by a catalog store.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{kind} write rejected: {reason}")]
    WriteRejected { kind: EntityKind, reason: String },

    #[error("{kind} #{id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("catalog serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("catalog I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("no result for '{0}'")]
    ZeroResults(String),

    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid threshold {name}={value}: must be within [0, 1]")]
    Threshold { name: &'static str, value: f64 },
}

/// Failure isolating one calendar row from the rest of the batch.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("cannot read program {path}: {source}")]
    Program {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("{kind} not resolved: {detail}")]
    Unresolved { kind: EntityKind, detail: String },
}
