use std::io::BufRead;
use std::path::Path;

use crate::annotation::io::{open_bufread, ParseError};
use crate::config::FeatureTypes;
use crate::hierarchy::Hierarchy;

/// High-level builder for a [`Hierarchy`] from a GFF3 file.
///
/// - parses the whole file (optionally gzipped)
/// - configurable feature-type vocabulary and `ID` / `Parent` keys
/// - builds genes, transcripts and their sub-feature collections
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuilder {
    pub types: FeatureTypes,
}

impl AnnotationBuilder {
    /// Defaults that fit common GFF3 (`gene`, `mRNA`/`transcript`, `exon`, `CDS`, ...).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(types: FeatureTypes) -> Self {
        Self { types }
    }

    /// Feature types treated as genes.
    pub fn gene_types(mut self, types: &[&str]) -> Self {
        self.types = self.types.gene_types(types);
        self
    }

    /// Feature types treated as transcripts.
    pub fn transcript_types(mut self, types: &[&str]) -> Self {
        self.types = self.types.transcript_types(types);
        self
    }

    pub fn exon_types(mut self, types: &[&str]) -> Self {
        self.types = self.types.exon_types(types);
        self
    }

    pub fn cds_types(mut self, types: &[&str]) -> Self {
        self.types = self.types.cds_types(types);
        self
    }

    pub fn intron_types(mut self, types: &[&str]) -> Self {
        self.types = self.types.intron_types(types);
        self
    }

    /// Attribute holding a feature's own identifier (usually `ID`).
    pub fn id_key(mut self, key: &str) -> Self {
        self.types = self.types.id_key(key);
        self
    }

    /// Attribute linking a feature to its parents (usually `Parent`).
    pub fn parent_key(mut self, key: &str) -> Self {
        self.types = self.types.parent_key(key);
        self
    }

    /// Build from anything implementing `BufRead`.
    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<Hierarchy, ParseError> {
        Hierarchy::new().from_reader(reader, &self.types)
    }

    /// Build from a file path; `.gz` paths are decompressed on the fly.
    pub fn build_from_path<P: AsRef<Path>>(&self, path: P) -> Result<Hierarchy, ParseError> {
        let reader = open_bufread(path.as_ref())?;
        self.build_from_reader(reader)
    }
}
