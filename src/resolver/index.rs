/// Per-partition mapping between canonical identifiers and their synonyms
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::PartitionKey;
use crate::{ResolverError, Result};

/// Everything known about one canonical identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymEntry {
    /// Primary identifiers of the feature; always contains the canonical id
    pub main_ids: BTreeSet<String>,
    /// Every string resolving to the canonical id, main ids included
    pub synonyms: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct SynonymIndex {
    key: PartitionKey,
    entries: BTreeMap<String, SynonymEntry>,
    // synonym -> canonical id
    lookup: HashMap<String, String>,
}

impl SynonymIndex {
    pub fn new(key: PartitionKey) -> Self {
        Self {
            key,
            entries: BTreeMap::new(),
            lookup: HashMap::new(),
        }
    }

    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// Register a canonical identifier. Re-adding is a no-op.
    pub fn add_main_identifier(&mut self, canonical: &str) -> Result<()> {
        self.add_main_ids(canonical, std::iter::empty::<&str>())
    }

    /// Bind `ids` to `canonical` as primary identifiers
    pub fn add_main_ids<I, S>(&mut self, canonical: &str, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: BTreeSet<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        self.bind(canonical, &ids, true)
    }

    /// Union `synonyms` into the synonyms of `canonical`, creating the entry if needed.
    ///
    /// Fails without modifying the index when any synonym already belongs to a
    /// different canonical identifier.
    pub fn add_synonyms<I, S>(&mut self, canonical: &str, synonyms: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let synonyms: BTreeSet<String> =
            synonyms.into_iter().map(|s| s.as_ref().to_string()).collect();
        self.bind(canonical, &synonyms, false)
    }

    fn bind(&mut self, canonical: &str, ids: &BTreeSet<String>, main: bool) -> Result<()> {
        if canonical.is_empty() {
            return Err(ResolverError::InvalidInput(format!(
                "empty canonical identifier in {}",
                self.key
            )));
        }
        if ids.iter().any(String::is_empty) {
            return Err(ResolverError::InvalidInput(format!(
                "empty synonym for '{}' in {}",
                canonical, self.key
            )));
        }

        for id in ids.iter().map(String::as_str).chain(std::iter::once(canonical)) {
            if let Some(existing) = self.lookup.get(id) {
                if existing != canonical {
                    return Err(ResolverError::Conflict {
                        key: self.key.clone(),
                        synonym: id.to_string(),
                        existing: existing.clone(),
                        incoming: canonical.to_string(),
                    });
                }
            }
        }

        let entry = self.entries.entry(canonical.to_string()).or_default();
        entry.main_ids.insert(canonical.to_string());
        entry.synonyms.insert(canonical.to_string());
        self.lookup.insert(canonical.to_string(), canonical.to_string());

        for id in ids {
            if main {
                entry.main_ids.insert(id.clone());
            }
            entry.synonyms.insert(id.clone());
            self.lookup.insert(id.clone(), canonical.to_string());
        }

        Ok(())
    }

    /// Canonical identifiers matching `id_or_synonym` exactly. Empty means unknown.
    pub fn resolve(&self, id_or_synonym: &str) -> BTreeSet<String> {
        self.lookup
            .get(id_or_synonym)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn is_main_id(&self, id: &str) -> bool {
        self.lookup
            .get(id)
            .and_then(|canonical| self.entries.get(canonical))
            .map(|entry| entry.main_ids.contains(id))
            .unwrap_or(false)
    }

    pub fn synonyms_of(&self, canonical: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(canonical).map(|entry| &entry.synonyms)
    }

    pub fn count_canonical_ids(&self) -> usize {
        self.entries.len()
    }

    pub fn count_synonyms(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by canonical identifier
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SynonymEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaxonId;
    use proptest::prelude::*;

    fn index() -> SynonymIndex {
        SynonymIndex::new(PartitionKey::new(TaxonId::ZEBRAFISH, "gene"))
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_resolves_to_itself() {
        let mut index = index();
        index.add_main_identifier("ZDB-GENE-001").unwrap();

        assert_eq!(index.resolve("ZDB-GENE-001"), set(&["ZDB-GENE-001"]));
        assert!(index.is_main_id("ZDB-GENE-001"));
        assert_eq!(index.count_canonical_ids(), 1);
    }

    #[test]
    fn test_add_synonyms_creates_entry() {
        let mut index = index();
        index.add_synonyms("ZDB-GENE-001", ["synA", "synB"]).unwrap();

        assert_eq!(index.resolve("synA"), set(&["ZDB-GENE-001"]));
        assert_eq!(index.resolve("synB"), set(&["ZDB-GENE-001"]));
        assert_eq!(index.resolve("ZDB-GENE-001"), set(&["ZDB-GENE-001"]));
        assert!(!index.is_main_id("synA"));
        assert_eq!(
            index.synonyms_of("ZDB-GENE-001"),
            Some(&set(&["ZDB-GENE-001", "synA", "synB"]))
        );
    }

    #[test]
    fn test_synonyms_are_case_sensitive() {
        let mut index = index();
        index.add_synonyms("ZDB-GENE-001", ["shha"]).unwrap();

        assert!(index.resolve("SHHA").is_empty());
        index.add_synonyms("ZDB-GENE-002", ["SHHA"]).unwrap();
        assert_eq!(index.resolve("SHHA"), set(&["ZDB-GENE-002"]));
    }

    #[test]
    fn test_repeated_add_is_idempotent() {
        let mut index = index();
        index.add_synonyms("ZDB-GENE-001", ["synA", "synB"]).unwrap();
        let canonical = index.count_canonical_ids();
        let synonyms = index.count_synonyms();

        index.add_synonyms("ZDB-GENE-001", ["synA", "synB"]).unwrap();
        index.add_main_identifier("ZDB-GENE-001").unwrap();

        assert_eq!(index.count_canonical_ids(), canonical);
        assert_eq!(index.count_synonyms(), synonyms);
    }

    #[test]
    fn test_conflicting_synonym_is_rejected_atomically() {
        let mut index = index();
        index.add_synonyms("ZDB-GENE-001", ["synA", "synB"]).unwrap();

        let err = index
            .add_synonyms("ZDB-GENE-002", ["synC", "synA"])
            .unwrap_err();
        match err {
            ResolverError::Conflict { synonym, existing, incoming, .. } => {
                assert_eq!(synonym, "synA");
                assert_eq!(existing, "ZDB-GENE-001");
                assert_eq!(incoming, "ZDB-GENE-002");
            }
            other => panic!("unexpected error: {other}"),
        }

        // Nothing from the rejected call was applied
        assert!(index.resolve("synC").is_empty());
        assert!(index.resolve("ZDB-GENE-002").is_empty());
        assert_eq!(index.count_canonical_ids(), 1);
    }

    #[test]
    fn test_canonical_cannot_become_synonym_of_another() {
        let mut index = index();
        index.add_main_identifier("ZDB-GENE-001").unwrap();

        let result = index.add_synonyms("ZDB-GENE-002", ["ZDB-GENE-001"]);
        assert!(matches!(result, Err(ResolverError::Conflict { .. })));
    }

    #[test]
    fn test_empty_canonical_is_invalid() {
        let mut index = index();
        assert!(matches!(
            index.add_main_identifier(""),
            Err(ResolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_synonym_is_invalid() {
        let mut index = index();

        assert!(matches!(
            index.add_synonyms("ZDB-GENE-001", ["", "abc"]),
            Err(ResolverError::InvalidInput(_))
        ));
        assert!(matches!(
            index.add_main_ids("ZDB-GENE-001", [""]),
            Err(ResolverError::InvalidInput(_))
        ));
        assert!(index.resolve("").is_empty());
        assert!(index.resolve("abc").is_empty());
        assert!(index.is_empty());
    }

    proptest! {
        #[test]
        fn prop_every_synonym_resolves_to_canonical(
            synonyms in proptest::collection::btree_set("[a-z]{1,8}", 0..16)
        ) {
            let mut index = index();
            index.add_synonyms("ZDB-GENE-999", &synonyms).unwrap();

            for synonym in &synonyms {
                prop_assert_eq!(index.resolve(synonym), set(&["ZDB-GENE-999"]));
            }
            prop_assert_eq!(index.resolve("ZDB-GENE-999"), set(&["ZDB-GENE-999"]));
            prop_assert_eq!(index.count_synonyms(), synonyms.len() + 1);
        }
    }
}
