/// ZFIN gene identifiers for zebrafish
use super::TabularSynonymSource;
use crate::core::TaxonId;

pub const NAME: &str = "zfin";
pub const FILE_SUFFIX: &str = "zfin";
pub const GENE_PREFIX: &str = "ZDB-GENE";

pub fn source() -> TabularSynonymSource {
    TabularSynonymSource::new(NAME, TaxonId::ZEBRAFISH, FILE_SUFFIX, GENE_PREFIX)
}
