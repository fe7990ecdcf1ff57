use std::{io, path::PathBuf};

use thiserror::Error;
use trust_dns_proto::error::ProtoError;
use trust_dns_resolver::error::ResolveError;

/// Why a piece of user input could not be turned into a [`Domain`](crate::Domain).
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("empty domain name")]
    Empty,
    #[error("empty label in `{0}`")]
    EmptyLabel(String),
    #[error("label `{0}` is longer than 63 octets")]
    LabelTooLong(String),
    #[error("`{0}` is longer than 253 octets")]
    TooLong(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query name `{name}`: {source}")]
    InvalidName {
        name: String,
        #[source]
        source: ProtoError,
    },
    #[error("cannot build resolver: {0}")]
    Setup(#[from] io::Error),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Error)]
#[error("cannot append to {}: {source}", .path.display())]
pub struct RecordError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
