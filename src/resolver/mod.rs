//! Identifier resolver partitioned by organism and feature class
//!
//! Every partition moves through `Absent -> Populating -> Complete`. Only
//! complete partitions are visible to lookups, and a complete partition is
//! never modified again within the run.

pub mod cache;
pub mod index;

pub use index::{SynonymEntry, SynonymIndex};

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{PartitionKey, TaxonId};
use crate::{ResolverError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    Populating,
    Complete,
}

#[derive(Debug, Clone)]
struct Partition {
    index: SynonymIndex,
    state: PartitionState,
}

#[derive(Debug, Clone, Default)]
pub struct IdResolver {
    partitions: BTreeMap<PartitionKey, Partition>,
    default_class: Option<String>,
}

impl IdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver whose `add_synonyms_default` targets a single feature class
    pub fn with_default_class(feature_class: impl Into<String>) -> Self {
        Self {
            partitions: BTreeMap::new(),
            default_class: Some(feature_class.into()),
        }
    }

    pub fn default_class(&self) -> Option<&str> {
        self.default_class.as_deref()
    }

    /// True iff the partition exists and is complete
    pub fn has_partition(&self, taxon: TaxonId, feature_class: &str) -> bool {
        self.state(taxon, feature_class) == Some(PartitionState::Complete)
    }

    pub fn state(&self, taxon: TaxonId, feature_class: &str) -> Option<PartitionState> {
        self.partitions
            .get(&PartitionKey::new(taxon, feature_class))
            .map(|p| p.state)
    }

    pub fn has_taxon(&self, taxon: TaxonId) -> bool {
        self.complete().any(|(key, _)| key.taxon == taxon)
    }

    pub fn has_feature_class(&self, feature_class: &str) -> bool {
        self.complete().any(|(key, _)| key.feature_class == feature_class)
    }

    pub fn taxa(&self) -> BTreeSet<TaxonId> {
        self.complete().map(|(key, _)| key.taxon).collect()
    }

    pub fn feature_classes(&self) -> BTreeSet<String> {
        self.complete().map(|(key, _)| key.feature_class.clone()).collect()
    }

    /// Keys of all complete partitions, ordered
    pub fn partition_keys(&self) -> impl Iterator<Item = &PartitionKey> {
        self.complete().map(|(key, _)| key)
    }

    /// Read access to a complete partition
    pub fn partition(&self, taxon: TaxonId, feature_class: &str) -> Option<&SynonymIndex> {
        self.partitions
            .get(&PartitionKey::new(taxon, feature_class))
            .filter(|p| p.state == PartitionState::Complete)
            .map(|p| &p.index)
    }

    pub(crate) fn complete(&self) -> impl Iterator<Item = (&PartitionKey, &SynonymIndex)> {
        self.partitions
            .iter()
            .filter(|(_, p)| p.state == PartitionState::Complete)
            .map(|(key, p)| (key, &p.index))
    }

    /// Index being populated for the partition, allocating it if absent
    pub fn get_or_create_partition(
        &mut self,
        taxon: TaxonId,
        feature_class: &str,
    ) -> Result<&mut SynonymIndex> {
        let key = PartitionKey::new(taxon, feature_class);
        let partition = self
            .partitions
            .entry(key.clone())
            .or_insert_with(|| Partition {
                index: SynonymIndex::new(key.clone()),
                state: PartitionState::Populating,
            });

        match partition.state {
            PartitionState::Populating => Ok(&mut partition.index),
            PartitionState::Complete => Err(ResolverError::PartitionSealed(key)),
        }
    }

    /// Mark a partition complete. An absent partition becomes an empty complete one.
    pub fn mark_complete(&mut self, taxon: TaxonId, feature_class: &str) {
        let key = PartitionKey::new(taxon, feature_class);
        self.partitions
            .entry(key.clone())
            .or_insert_with(|| Partition {
                index: SynonymIndex::new(key),
                state: PartitionState::Populating,
            })
            .state = PartitionState::Complete;
    }

    /// Drop a partition that is still populating. Complete partitions are kept.
    pub fn discard_partition(&mut self, taxon: TaxonId, feature_class: &str) -> bool {
        let key = PartitionKey::new(taxon, feature_class);
        match self.partitions.get(&key).map(|p| p.state) {
            Some(PartitionState::Populating) => {
                self.partitions.remove(&key);
                true
            }
            _ => false,
        }
    }

    pub fn add_main_ids<I, S>(
        &mut self,
        taxon: TaxonId,
        feature_class: &str,
        canonical: &str,
        ids: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.get_or_create_partition(taxon, feature_class)?
            .add_main_ids(canonical, ids)
    }

    pub fn add_synonyms<I, S>(
        &mut self,
        taxon: TaxonId,
        feature_class: &str,
        canonical: &str,
        synonyms: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.get_or_create_partition(taxon, feature_class)?
            .add_synonyms(canonical, synonyms)
    }

    /// Same as `add_synonyms` against the default feature class
    pub fn add_synonyms_default<I, S>(
        &mut self,
        taxon: TaxonId,
        canonical: &str,
        synonyms: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let feature_class = self.require_default_class()?;
        self.add_synonyms(taxon, &feature_class, canonical, synonyms)
    }

    fn require_default_class(&self) -> Result<String> {
        self.default_class.clone().ok_or_else(|| {
            ResolverError::InvalidInput("resolver has no default feature class".to_string())
        })
    }

    fn lookup(&self, taxon: TaxonId, feature_class: &str) -> Result<&SynonymIndex> {
        self.partition(taxon, feature_class)
            .ok_or_else(|| ResolverError::UnknownPartition(PartitionKey::new(taxon, feature_class)))
    }

    /// Canonical identifiers for `id`. Empty means the identifier is unknown.
    pub fn resolve(
        &self,
        taxon: TaxonId,
        feature_class: &str,
        id: &str,
    ) -> Result<BTreeSet<String>> {
        Ok(self.lookup(taxon, feature_class)?.resolve(id))
    }

    pub fn count_resolutions(
        &self,
        taxon: TaxonId,
        feature_class: &str,
        id: &str,
    ) -> Result<usize> {
        Ok(self.lookup(taxon, feature_class)?.resolve(id).len())
    }

    pub fn is_primary_identifier(
        &self,
        taxon: TaxonId,
        feature_class: &str,
        id: &str,
    ) -> Result<bool> {
        Ok(self.lookup(taxon, feature_class)?.is_main_id(id))
    }

    /// Install a fully built index as a complete partition
    pub(crate) fn install_complete(&mut self, index: SynonymIndex) {
        let key = index.key().clone();
        self.partitions.insert(
            key,
            Partition {
                index,
                state: PartitionState::Complete,
            },
        );
    }

    /// Take over complete partitions from `other` for keys this resolver does
    /// not hold at all. Partitions being populated here are left untouched.
    /// Returns the number of partitions adopted.
    pub fn merge_complete(&mut self, other: IdResolver) -> usize {
        let mut adopted = 0;
        for (key, partition) in other.partitions {
            if partition.state != PartitionState::Complete {
                continue;
            }
            if self.partitions.contains_key(&key) {
                continue;
            }
            self.partitions.insert(key, partition);
            adopted += 1;
        }
        adopted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ZFIN_GENE: &str = "ZDB-GENE-001";

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn populated() -> IdResolver {
        let mut resolver = IdResolver::new();
        resolver
            .add_main_ids(TaxonId::ZEBRAFISH, "gene", ZFIN_GENE, [ZFIN_GENE])
            .unwrap();
        resolver
            .add_synonyms(TaxonId::ZEBRAFISH, "gene", ZFIN_GENE, ["synA", "synB"])
            .unwrap();
        resolver.mark_complete(TaxonId::ZEBRAFISH, "gene");
        resolver
    }

    #[test]
    fn test_partition_lifecycle() {
        let mut resolver = IdResolver::new();
        assert_eq!(resolver.state(TaxonId::ZEBRAFISH, "gene"), None);

        resolver.get_or_create_partition(TaxonId::ZEBRAFISH, "gene").unwrap();
        assert_eq!(
            resolver.state(TaxonId::ZEBRAFISH, "gene"),
            Some(PartitionState::Populating)
        );
        assert!(!resolver.has_partition(TaxonId::ZEBRAFISH, "gene"));

        resolver.mark_complete(TaxonId::ZEBRAFISH, "gene");
        assert!(resolver.has_partition(TaxonId::ZEBRAFISH, "gene"));
    }

    #[test]
    fn test_resolve_synonyms_and_canonical() {
        let resolver = populated();

        for id in [ZFIN_GENE, "synA", "synB"] {
            assert_eq!(
                resolver.resolve(TaxonId::ZEBRAFISH, "gene", id).unwrap(),
                set(&[ZFIN_GENE])
            );
        }
        assert!(resolver
            .resolve(TaxonId::ZEBRAFISH, "gene", "unknown")
            .unwrap()
            .is_empty());
        assert_eq!(resolver.count_resolutions(TaxonId::ZEBRAFISH, "gene", "synA").unwrap(), 1);
    }

    #[test]
    fn test_primary_identifier() {
        let resolver = populated();
        assert!(resolver.is_primary_identifier(TaxonId::ZEBRAFISH, "gene", ZFIN_GENE).unwrap());
        assert!(!resolver.is_primary_identifier(TaxonId::ZEBRAFISH, "gene", "synA").unwrap());
    }

    #[test]
    fn test_unknown_partition() {
        let resolver = populated();

        assert!(!resolver.has_partition(TaxonId::HUMAN, "gene"));
        assert!(matches!(
            resolver.resolve(TaxonId::HUMAN, "gene", ZFIN_GENE),
            Err(ResolverError::UnknownPartition(_))
        ));
        assert!(matches!(
            resolver.resolve(TaxonId::ZEBRAFISH, "mRNA", ZFIN_GENE),
            Err(ResolverError::UnknownPartition(_))
        ));
    }

    #[test]
    fn test_populating_partition_is_not_visible() {
        let mut resolver = IdResolver::new();
        resolver
            .add_synonyms(TaxonId::ZEBRAFISH, "gene", ZFIN_GENE, ["synA"])
            .unwrap();

        assert!(resolver.partition(TaxonId::ZEBRAFISH, "gene").is_none());
        assert!(matches!(
            resolver.resolve(TaxonId::ZEBRAFISH, "gene", "synA"),
            Err(ResolverError::UnknownPartition(_))
        ));
    }

    #[test]
    fn test_complete_partition_is_sealed() {
        let mut resolver = populated();

        let result = resolver.add_synonyms(TaxonId::ZEBRAFISH, "gene", ZFIN_GENE, ["synC"]);
        assert!(matches!(result, Err(ResolverError::PartitionSealed(_))));
        assert!(!resolver.discard_partition(TaxonId::ZEBRAFISH, "gene"));
        assert!(resolver.has_partition(TaxonId::ZEBRAFISH, "gene"));
    }

    #[test]
    fn test_discard_populating_partition() {
        let mut resolver = IdResolver::new();
        resolver
            .add_synonyms(TaxonId::ZEBRAFISH, "gene", ZFIN_GENE, ["synA"])
            .unwrap();

        assert!(resolver.discard_partition(TaxonId::ZEBRAFISH, "gene"));
        assert_eq!(resolver.state(TaxonId::ZEBRAFISH, "gene"), None);
    }

    #[test]
    fn test_mark_complete_without_records() {
        let mut resolver = IdResolver::new();
        resolver.mark_complete(TaxonId::MOUSE, "gene");

        assert!(resolver.has_partition(TaxonId::MOUSE, "gene"));
        assert!(resolver.resolve(TaxonId::MOUSE, "gene", "Shh").unwrap().is_empty());
    }

    #[test]
    fn test_taxa_and_classes_only_report_complete_partitions() {
        let mut resolver = populated();
        resolver.get_or_create_partition(TaxonId::HUMAN, "gene").unwrap();

        assert_eq!(resolver.taxa(), BTreeSet::from([TaxonId::ZEBRAFISH]));
        assert_eq!(resolver.feature_classes(), set(&["gene"]));
        assert!(resolver.has_taxon(TaxonId::ZEBRAFISH));
        assert!(!resolver.has_taxon(TaxonId::HUMAN));
        assert!(resolver.has_feature_class("gene"));
        assert_eq!(resolver.partition_keys().count(), 1);
    }

    #[test]
    fn test_default_class_helpers() {
        let mut resolver = IdResolver::with_default_class("gene");
        resolver
            .add_synonyms_default(TaxonId::ZEBRAFISH, ZFIN_GENE, ["synA"])
            .unwrap();
        resolver.mark_complete(TaxonId::ZEBRAFISH, "gene");

        assert_eq!(resolver.default_class(), Some("gene"));
        assert_eq!(
            resolver.resolve(TaxonId::ZEBRAFISH, "gene", "synA").unwrap(),
            set(&[ZFIN_GENE])
        );

        let mut classless = IdResolver::new();
        assert!(matches!(
            classless.add_synonyms_default(TaxonId::ZEBRAFISH, ZFIN_GENE, ["synA"]),
            Err(ResolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_merge_keeps_existing_complete_partitions() {
        let mut resolver = populated();

        let mut other = IdResolver::new();
        other
            .add_synonyms(TaxonId::ZEBRAFISH, "gene", "ZDB-GENE-777", ["other"])
            .unwrap();
        other.mark_complete(TaxonId::ZEBRAFISH, "gene");
        other.add_synonyms(TaxonId::MOUSE, "gene", "MGI:1", ["Shh"]).unwrap();
        other.mark_complete(TaxonId::MOUSE, "gene");
        other.add_synonyms(TaxonId::HUMAN, "gene", "HGNC:1", ["A1BG"]).unwrap();

        assert_eq!(resolver.merge_complete(other), 1);
        assert!(resolver.resolve(TaxonId::ZEBRAFISH, "gene", "other").unwrap().is_empty());
        assert_eq!(
            resolver.resolve(TaxonId::MOUSE, "gene", "Shh").unwrap(),
            set(&["MGI:1"])
        );
        assert!(!resolver.has_partition(TaxonId::HUMAN, "gene"));
    }

    #[test]
    fn test_merge_does_not_replace_populating_partition() {
        let mut resolver = IdResolver::new();
        resolver
            .add_synonyms(TaxonId::ZEBRAFISH, "gene", ZFIN_GENE, ["mine"])
            .unwrap();

        let mut cached = IdResolver::new();
        cached
            .add_synonyms(TaxonId::ZEBRAFISH, "gene", "ZDB-GENE-777", ["cached"])
            .unwrap();
        cached.mark_complete(TaxonId::ZEBRAFISH, "gene");

        assert_eq!(resolver.merge_complete(cached), 0);
        assert_eq!(
            resolver.state(TaxonId::ZEBRAFISH, "gene"),
            Some(PartitionState::Populating)
        );

        resolver.mark_complete(TaxonId::ZEBRAFISH, "gene");
        assert_eq!(
            resolver.resolve(TaxonId::ZEBRAFISH, "gene", "mine").unwrap(),
            set(&[ZFIN_GENE])
        );
        assert!(resolver.resolve(TaxonId::ZEBRAFISH, "gene", "cached").unwrap().is_empty());
    }
}
