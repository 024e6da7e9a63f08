/// Reader for two-column identifier mapping files
///
/// ```text
/// ZDB-GENE-000125-4    dlc|deltaC
/// ```
///
/// The first column is the canonical identifier, the second a `|`-separated
/// synonym list. Comments, short lines and identifiers without the source's
/// prefix are skipped, not rejected: these files come from third parties.
use std::io::BufRead;

use super::{LoadStats, PartitionWriter, SourceAdapter};
use crate::core::TaxonId;
use crate::Result;

#[derive(Debug, Clone)]
pub struct TabularSynonymSource {
    name: String,
    taxon: TaxonId,
    file_suffix: String,
    id_prefix: String,
}

impl TabularSynonymSource {
    pub fn new(
        name: impl Into<String>,
        taxon: TaxonId,
        file_suffix: impl Into<String>,
        id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            taxon,
            file_suffix: file_suffix.into(),
            id_prefix: id_prefix.into(),
        }
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    /// Canonical id and synonyms of a usable line, None for lines to skip
    fn parse_line<'l>(&self, line: &'l str) -> Option<(&'l str, Vec<&'l str>)> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut columns = line.split('\t');
        let id = columns.next()?;
        let synonyms = columns.next()?;

        if id.starts_with('#') || !id.starts_with(self.id_prefix.as_str()) {
            return None;
        }

        let synonyms = synonyms.split('|').filter(|s| !s.is_empty()).collect();
        Some((id, synonyms))
    }
}

impl SourceAdapter for TabularSynonymSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn taxon_id(&self) -> TaxonId {
        self.taxon
    }

    fn file_suffix(&self) -> &str {
        &self.file_suffix
    }

    fn populate(
        &self,
        reader: &mut dyn BufRead,
        target: &mut PartitionWriter<'_>,
    ) -> Result<LoadStats> {
        let mut stats = LoadStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            // Third-party files are not always valid UTF-8
            let line = String::from_utf8_lossy(&buf);
            let Some((id, synonyms)) = self.parse_line(line.trim_end_matches('\n')) else {
                stats.skipped += 1;
                continue;
            };

            target.add_main_ids(id, &[id])?;
            target.add_synonyms(id, &synonyms)?;
            stats.records += 1;
        }

        tracing::debug!(
            "{}: {} records loaded, {} lines skipped",
            self.name,
            stats.records,
            stats.skipped
        );
        Ok(stats)
    }
}
