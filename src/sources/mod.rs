//! Readers that populate resolver partitions from external mapping files

pub mod tabular;
pub mod zfin;

pub use tabular::TabularSynonymSource;

use serde::Serialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use crate::core::TaxonId;
use crate::resolver::IdResolver;
use crate::{ResolverError, Result};

/// Record counts from one populate pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub records: usize,
    pub skipped: usize,
}

/// Populates one organism's partitions from one raw file
pub trait SourceAdapter: Send + Sync {
    /// Registry name, e.g. "zfin"
    fn name(&self) -> &str;

    fn taxon_id(&self) -> TaxonId;

    /// Appended to the configured root to locate the raw file
    fn file_suffix(&self) -> &str;

    /// Feed every usable record of `reader` into `target`.
    ///
    /// Completion is signalled by the caller, never by the adapter.
    fn populate(
        &self,
        reader: &mut dyn BufRead,
        target: &mut PartitionWriter<'_>,
    ) -> Result<LoadStats>;
}

/// Write handle over the partitions of one taxon, one per feature class
pub struct PartitionWriter<'a> {
    resolver: &'a mut IdResolver,
    taxon: TaxonId,
    feature_classes: Vec<String>,
}

impl<'a> PartitionWriter<'a> {
    pub fn new(resolver: &'a mut IdResolver, taxon: TaxonId, feature_classes: Vec<String>) -> Self {
        Self {
            resolver,
            taxon,
            feature_classes,
        }
    }

    pub fn taxon(&self) -> TaxonId {
        self.taxon
    }

    pub fn feature_classes(&self) -> &[String] {
        &self.feature_classes
    }

    pub fn add_main_ids(&mut self, canonical: &str, ids: &[&str]) -> Result<()> {
        for class in &self.feature_classes {
            self.resolver.add_main_ids(self.taxon, class, canonical, ids)?;
        }
        Ok(())
    }

    pub fn add_synonyms(&mut self, canonical: &str, synonyms: &[&str]) -> Result<()> {
        for class in &self.feature_classes {
            self.resolver.add_synonyms(self.taxon, class, canonical, synonyms)?;
        }
        Ok(())
    }
}

/// Source name -> adapter
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every bundled adapter
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(zfin::source()));
        registry
    }

    /// Register an adapter under its own name, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SourceAdapter>> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| ResolverError::UnknownSource(name.to_string()))
    }

    /// Registered source names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
