pub mod core;
pub mod factory;
pub mod resolver;
pub mod sources;

pub use crate::core::{Config, PartitionKey, TaxonId};
pub use crate::factory::{ResolutionOrigin, ResolveOutcome, ResolverFactory};
pub use crate::resolver::{IdResolver, SynonymIndex};
pub use crate::sources::{LoadStats, SourceAdapter, SourceRegistry};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Resolver data file root path is not specified: {0}")]
    ConfigMissing(String),

    #[error("Resolver file not found: {}", .0.display())]
    SourceFileMissing(PathBuf),

    #[error("Corrupt resolver cache at line {line}: {reason}")]
    CacheCorrupt { line: usize, reason: String },

    #[error(
        "Synonym '{synonym}' in {key} is bound to '{existing}', cannot bind it to '{incoming}'"
    )]
    Conflict {
        key: PartitionKey,
        synonym: String,
        existing: String,
        incoming: String,
    },

    #[error("No resolved partition for {0}")]
    UnknownPartition(PartitionKey),

    #[error("Partition {0} is complete and can no longer be modified")]
    PartitionSealed(PartitionKey),

    #[error("Unknown resolver source: {0}")]
    UnknownSource(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ResolverError>;
