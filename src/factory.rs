/// Builds resolver partitions on demand: memory first, then the cache file,
/// then the configured source file.
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::core::{Config, TaxonId};
use crate::resolver::{cache, IdResolver};
use crate::sources::{LoadStats, PartitionWriter, SourceRegistry};
use crate::{ResolverError, Result};

/// Where a resolved partition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOrigin {
    InMemory,
    Cache,
    Source(LoadStats),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(ResolutionOrigin),
    /// No source root configured; the partitions stay unresolved
    NotConfigured,
    /// The configured source file does not exist
    SourceMissing(PathBuf),
}

impl ResolveOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Turn the unresolved outcomes into errors for callers that need the data
    pub fn into_result(self) -> Result<ResolutionOrigin> {
        match self {
            Self::Resolved(origin) => Ok(origin),
            Self::NotConfigured => Err(ResolverError::ConfigMissing(
                "resolver.file_root".to_string(),
            )),
            Self::SourceMissing(path) => Err(ResolverError::SourceFileMissing(path)),
        }
    }
}

pub struct ResolverFactory {
    config: Config,
    registry: SourceRegistry,
    cache_checked: bool,
}

impl ResolverFactory {
    pub fn new(config: Config, registry: SourceRegistry) -> Self {
        Self {
            config,
            registry,
            cache_checked: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Make sure `resolver` holds complete partitions for every class in
    /// `feature_classes` of the taxon served by `source`.
    ///
    /// Missing configuration or source files are reported through the
    /// outcome. Conflicting records and read failures are errors, and leave
    /// no partially populated partition behind.
    pub fn ensure(
        &mut self,
        resolver: &mut IdResolver,
        source: &str,
        feature_classes: &[&str],
    ) -> Result<ResolveOutcome> {
        let adapter = self.registry.get(source)?;
        let taxon = adapter.taxon_id();
        let classes: Vec<String> = if feature_classes.is_empty() {
            self.config.resolver.default_feature_classes.clone()
        } else {
            feature_classes.iter().map(|c| c.to_string()).collect()
        };

        if missing_classes(resolver, taxon, &classes).is_empty() {
            return Ok(ResolveOutcome::Resolved(ResolutionOrigin::InMemory));
        }

        if self.restore_cache(resolver) && missing_classes(resolver, taxon, &classes).is_empty()
        {
            return Ok(ResolveOutcome::Resolved(ResolutionOrigin::Cache));
        }

        let Some(path) = self.config.source_file(adapter.file_suffix()) else {
            tracing::warn!("Resolver data file root path is not specified");
            return Ok(ResolveOutcome::NotConfigured);
        };

        if !path.exists() {
            tracing::warn!("Resolver file does not exist: {}", path.display());
            return Ok(ResolveOutcome::SourceMissing(path));
        }

        let targets = missing_classes(resolver, taxon, &classes);
        tracing::info!(
            "Creating id resolver for {} ({}) from {} and caching it",
            adapter.name(),
            targets.join(", "),
            path.display()
        );

        let mut reader = BufReader::new(File::open(&path)?);
        let populated = {
            let mut writer = PartitionWriter::new(&mut *resolver, taxon, targets.clone());
            adapter.populate(&mut reader, &mut writer)
        };

        let stats = match populated {
            Ok(stats) => stats,
            Err(e) => {
                for class in &targets {
                    resolver.discard_partition(taxon, class);
                }
                return Err(e);
            }
        };

        for class in &targets {
            resolver.mark_complete(taxon, class);
        }

        if self.config.cache.enabled {
            if let Err(e) = cache::save(resolver, &self.config.cache.path) {
                tracing::warn!(
                    "Failed to write resolver cache {}: {}",
                    self.config.cache.path.display(),
                    e
                );
            }
        }

        Ok(ResolveOutcome::Resolved(ResolutionOrigin::Source(stats)))
    }

    /// Merge the cache file into `resolver` once per factory. Returns true when
    /// partitions were adopted.
    fn restore_cache(&mut self, resolver: &mut IdResolver) -> bool {
        if self.cache_checked || !self.config.cache.enabled {
            return false;
        }
        self.cache_checked = true;

        let path = &self.config.cache.path;
        if !path.exists() {
            tracing::debug!("No resolver cache at {}", path.display());
            return false;
        }

        match cache::restore(path) {
            Ok(restored) => {
                let adopted = resolver.merge_complete(restored);
                tracing::info!(
                    "Restored {} resolver partitions from {}",
                    adopted,
                    path.display()
                );
                adopted > 0
            }
            Err(e) => {
                tracing::warn!("Ignoring resolver cache {}: {}", path.display(), e);
                false
            }
        }
    }
}

fn missing_classes(resolver: &IdResolver, taxon: TaxonId, classes: &[String]) -> Vec<String> {
    classes
        .iter()
        .filter(|class| !resolver.has_partition(taxon, class))
        .cloned()
        .collect()
}
