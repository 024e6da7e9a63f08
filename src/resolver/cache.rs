/// Flat-file persistence of complete resolver partitions
///
/// Layout, one record per line, TAB separated:
///
/// ```text
/// idresolver-cache    1
/// E    <taxon>    <class>    <canonical>    <main|ids>    <synonym|list>
/// C    <taxon>    <class>    <entry count>
/// ```
///
/// A partition is only restored once its `C` marker has been read.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{PartitionKey, TaxonId};
use crate::resolver::{IdResolver, SynonymIndex};
use crate::{ResolverError, Result};

const HEADER: &str = "idresolver-cache";
const FORMAT_VERSION: &str = "1";
const ENTRY_TAG: &str = "E";
const COMPLETE_TAG: &str = "C";
const LIST_SEPARATOR: char = '|';

/// Write every complete partition of `resolver` to `path`.
///
/// The file is written next to its destination and renamed into place, so
/// readers see either the previous cache or the new one.
pub fn save(resolver: &IdResolver, path: &Path) -> Result<()> {
    let mut contents = String::new();
    contents.push_str(&format!("{}\t{}\n", HEADER, FORMAT_VERSION));

    for (key, index) in resolver.complete() {
        check_field(&key.feature_class)?;
        for (canonical, entry) in index.entries() {
            check_field(canonical)?;
            for id in entry.main_ids.iter().chain(entry.synonyms.iter()) {
                check_field(id)?;
            }
            contents.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                ENTRY_TAG,
                key.taxon,
                key.feature_class,
                canonical,
                join(entry.main_ids.iter()),
                join(entry.synonyms.iter()),
            ));
        }
        contents.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            COMPLETE_TAG,
            key.taxon,
            key.feature_class,
            index.count_canonical_ids()
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Write to temp file first (atomic)
    let temp_path = temp_path_for(path)?;
    {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    tracing::debug!(
        "Saved {} resolver partitions to {}",
        resolver.partition_keys().count(),
        path.display()
    );
    Ok(())
}

/// Read a cache written by [`save`]. Every restored partition is complete.
pub fn restore(path: &Path) -> Result<IdResolver> {
    let file = File::open(path)
        .map_err(|e| corrupt(0, format!("cannot open {}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);

    let mut resolver = IdResolver::new();
    let mut pending: BTreeMap<PartitionKey, SynonymIndex> = BTreeMap::new();
    let mut saw_header = false;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|e| corrupt(line_no, e.to_string()))?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        let fields: Vec<&str> = line.split('\t').collect();

        if !saw_header {
            if fields != [HEADER, FORMAT_VERSION] {
                return Err(corrupt(line_no, "missing or unsupported header".to_string()));
            }
            saw_header = true;
            continue;
        }

        match fields.as_slice() {
            [ENTRY_TAG, taxon, class, canonical, main_ids, synonyms] => {
                let key = PartitionKey::new(parse_taxon(line_no, taxon)?, *class);
                if resolver.has_partition(key.taxon, &key.feature_class) {
                    return Err(corrupt(line_no, format!("entry after completion of {}", key)));
                }
                let index = pending
                    .entry(key.clone())
                    .or_insert_with(|| SynonymIndex::new(key));
                index
                    .add_main_ids(canonical, split(main_ids))
                    .and_then(|_| index.add_synonyms(canonical, split(synonyms)))
                    .map_err(|e| corrupt(line_no, e.to_string()))?;
            }
            [COMPLETE_TAG, taxon, class, count] => {
                let key = PartitionKey::new(parse_taxon(line_no, taxon)?, *class);
                let expected: usize = count
                    .parse()
                    .map_err(|_| corrupt(line_no, format!("invalid entry count '{}'", count)))?;
                if resolver.has_partition(key.taxon, &key.feature_class) {
                    return Err(corrupt(
                        line_no,
                        format!("duplicate completion marker for {}", key),
                    ));
                }
                let index = pending.remove(&key).unwrap_or_else(|| SynonymIndex::new(key.clone()));
                if index.count_canonical_ids() != expected {
                    return Err(corrupt(
                        line_no,
                        format!(
                            "{} declares {} entries but {} were read",
                            key,
                            expected,
                            index.count_canonical_ids()
                        ),
                    ));
                }
                resolver.install_complete(index);
            }
            _ => return Err(corrupt(line_no, "malformed record".to_string())),
        }
    }

    if !saw_header {
        return Err(corrupt(0, "empty cache file".to_string()));
    }
    if let Some(key) = pending.keys().next() {
        return Err(corrupt(0, format!("partition {} has no completion marker", key)));
    }

    Ok(resolver)
}

fn corrupt(line: usize, reason: String) -> ResolverError {
    ResolverError::CacheCorrupt { line, reason }
}

fn parse_taxon(line: usize, raw: &str) -> Result<TaxonId> {
    raw.parse()
        .map_err(|_| corrupt(line, format!("invalid taxon id '{}'", raw)))
}

/// `<file name>.tmp` in the same directory. Appending keeps it distinct from
/// `path` even when the cache itself is named `*.tmp`.
fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| {
            ResolverError::InvalidInput(format!("cache path {} has no file name", path.display()))
        })?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}

fn check_field(value: &str) -> Result<()> {
    let unencodable = |c: char| matches!(c, '\t' | '\n' | '\r' | LIST_SEPARATOR);
    if value.is_empty() || value.contains(unencodable) {
        return Err(ResolverError::InvalidInput(format!(
            "identifier {:?} cannot be written to the resolver cache",
            value
        )));
    }
    Ok(())
}

fn join<'a>(ids: impl Iterator<Item = &'a String>) -> String {
    ids.map(String::as_str).collect::<Vec<_>>().join("|")
}

fn split(list: &str) -> impl Iterator<Item = &str> {
    list.split(LIST_SEPARATOR)
}
