pub mod config;
pub mod types;

pub use config::{default_config, load_config, save_config, Config};
pub use types::{PartitionKey, TaxonId};
