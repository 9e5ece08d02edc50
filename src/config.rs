use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Category of an annotation record, resolved from column 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Gene,
    Transcript,
    Exon,
    Cds,
    FivePrimeUtr,
    ThreePrimeUtr,
    Intron,
    Other,
}

/// Configure which column-3 values map to which [`FeatureKind`], and which
/// attribute keys carry identity and parent linkage.
///
/// Notes:
/// - Several names per kind are allowed; the kinds are checked in a fixed
///   order (gene, transcript, exon, CDS, UTRs, intron) and the first hit wins.
/// - Matching is ASCII case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureTypes {
    pub gene_types: Vec<String>,
    pub transcript_types: Vec<String>,
    pub exon_types: Vec<String>,
    pub cds_types: Vec<String>,
    pub five_prime_utr_types: Vec<String>,
    pub three_prime_utr_types: Vec<String>,
    pub intron_types: Vec<String>,

    /// Attribute holding the feature's own identifier (usually `ID`)
    pub id_key: String,
    /// Attribute linking a feature to its parent(s) (usually `Parent`)
    pub parent_key: String,
}

impl Default for FeatureTypes {
    fn default() -> Self {
        Self {
            gene_types: vec!["gene".into()],
            transcript_types: vec!["mRNA".into(), "transcript".into()],
            exon_types: vec!["exon".into()],
            cds_types: vec!["CDS".into()],
            five_prime_utr_types: vec!["five_prime_UTR".into()],
            three_prime_utr_types: vec!["three_prime_UTR".into()],
            intron_types: vec!["intron".into()],
            id_key: "ID".into(),
            parent_key: "Parent".into(),
        }
    }
}

fn owned(types: &[&str]) -> Vec<String> {
    types.iter().map(|s| s.to_string()).collect()
}

impl FeatureTypes {
    pub fn kind_of(&self, feature_type: &str) -> FeatureKind {
        let hit = |names: &[String]| names.iter().any(|n| n.eq_ignore_ascii_case(feature_type));

        if hit(&self.gene_types) {
            FeatureKind::Gene
        } else if hit(&self.transcript_types) {
            FeatureKind::Transcript
        } else if hit(&self.exon_types) {
            FeatureKind::Exon
        } else if hit(&self.cds_types) {
            FeatureKind::Cds
        } else if hit(&self.five_prime_utr_types) {
            FeatureKind::FivePrimeUtr
        } else if hit(&self.three_prime_utr_types) {
            FeatureKind::ThreePrimeUtr
        } else if hit(&self.intron_types) {
            FeatureKind::Intron
        } else {
            FeatureKind::Other
        }
    }

    pub fn gene_types(mut self, types: &[&str]) -> Self {
        self.gene_types = owned(types);
        self
    }

    pub fn transcript_types(mut self, types: &[&str]) -> Self {
        self.transcript_types = owned(types);
        self
    }

    pub fn exon_types(mut self, types: &[&str]) -> Self {
        self.exon_types = owned(types);
        self
    }

    pub fn cds_types(mut self, types: &[&str]) -> Self {
        self.cds_types = owned(types);
        self
    }

    pub fn intron_types(mut self, types: &[&str]) -> Self {
        self.intron_types = owned(types);
        self
    }

    pub fn id_key(mut self, key: &str) -> Self {
        self.id_key = key.to_string();
        self
    }

    pub fn parent_key(mut self, key: &str) -> Self {
        self.parent_key = key.to_string();
        self
    }
}

/// One named annotation input of a multi-source statistics run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub sample: String,
    pub path: PathBuf,
}

/// Sources listed one per line as `<sample> <path>` (any whitespace).
///
/// Blank lines, `#` comments and lines with fewer than two tokens are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    pub sources: Vec<Source>,
}

impl SourceList {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open source list {}", path.display()))?;
        Self::from_reader(BufReader::new(f))
            .with_context(|| format!("read source list {}", path.display()))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut sources = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut it = line.split_whitespace();
            let (Some(sample), Some(path)) = (it.next(), it.next()) else {
                log::warn!("skipping source line without a path: {line}");
                continue;
            };
            sources.push(Source {
                sample: sample.to_string(),
                path: PathBuf::from(path),
            });
        }
        Ok(Self { sources })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
