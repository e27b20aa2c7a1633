//! Error types shared across the crate

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Batch-level and parse errors
#[derive(Debug, Error)]
pub enum Error {
    /// A single line could not be read as a proxy address
    #[error("malformed proxy address {address:?}: {reason}")]
    MalformedAddress { address: String, reason: String },

    /// The input list could not be read
    #[error("unable to read proxy list {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The input list contained no parseable proxy
    #[error("unable to find any valid proxy in {path:?}")]
    NoValidCandidates { path: PathBuf },

    /// The alive list could not be written
    #[error("unable to write alive proxies to {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn malformed(address: &str, reason: impl ToString) -> Self {
        Error::MalformedAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }
}
