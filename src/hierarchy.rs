use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

use crate::annotation::io::{open_bufread, AnnotationReader, Line, ParseError, Record};
use crate::config::{FeatureKind, FeatureTypes};
use crate::model::gene::Gene;
use crate::model::transcript::Transcript;
use crate::model::types::{Feature, GeneId, TranscriptId};

/// Suffix convention linking an intron record to its transcript via its own ID.
const INTRON_ID_MARKER: &str = "_intron";

/// Per-run counters for records that did not make it into the hierarchy.
///
/// None of these abort a run; they exist for logging and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Data lines with too few fields or unusable coordinates
    pub opaque_lines: usize,
    pub genes_without_id: usize,
    pub transcripts_without_id: usize,
    /// Transcripts whose (first) parent is missing or not a known gene
    pub orphan_transcripts: usize,
    /// Sub-feature parent references that name no known transcript
    pub orphan_features: usize,
    /// Intron records whose ID does not lead back to a known transcript
    pub unresolved_introns: usize,
    /// Gene or transcript IDs seen more than once (last definition wins)
    pub redefined_ids: usize,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Diagnostics::default()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "opaque_lines={}, genes_without_id={}, transcripts_without_id={}, \
             orphan_transcripts={}, orphan_features={}, unresolved_introns={}, redefined_ids={}",
            self.opaque_lines,
            self.genes_without_id,
            self.transcripts_without_id,
            self.orphan_transcripts,
            self.orphan_features,
            self.unresolved_introns,
            self.redefined_ids
        )
    }
}

/// The owning gene model graph of one annotation file:
/// - genes in first-seen order
/// - transcripts in an arena, referenced from genes by index
/// - name lookups for parent resolution
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    pub genes: Vec<Gene>,
    pub transcripts: Vec<Transcript>,

    gene_by_name: HashMap<String, GeneId>,
    tx_by_name: HashMap<String, TranscriptId>,

    pub diagnostics: Diagnostics,
}

/// Human-readable summary of the `Hierarchy`.
///
/// Prints gene/transcript totals, then per sequence the number of genes,
/// transcripts and the mean number of transcripts per gene. Sequences are
/// listed in lexical order. Meant for logging, not for machine-readable output.
impl fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Hierarchy: {} genes, {} transcripts",
            self.genes.len(),
            self.transcript_count()
        )?;

        let mut per_seq: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for gene in &self.genes {
            let entry = per_seq.entry(gene.seqid.as_str()).or_default();
            entry.0 += 1;
            entry.1 += gene.transcript_ids().len();
        }

        for (seqid, (n_genes, n_txs)) in per_seq {
            let mean = if n_genes == 0 {
                0.0
            } else {
                n_txs as f64 / n_genes as f64
            };
            writeln!(
                f,
                "  - {}: genes={}, transcripts={}, mean_tx/gene={:.3}",
                seqid, n_genes, n_txs, mean
            )?;
        }

        Ok(())
    }
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a `Hierarchy` from a GFF3 path (plain or `.gz`).
    pub fn from_path<P: AsRef<Path>>(path: P, types: &FeatureTypes) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_bufread(path)
            .with_context(|| format!("open annotation file {}", path.display()))?;

        let h = Self::new()
            .from_reader(reader, types)
            .with_context(|| format!("build gene hierarchy from {}", path.display()))?;

        log::info!("{}: {} genes, {} transcripts", path.display(), h.genes.len(), h.transcript_count());
        if !h.diagnostics.is_clean() {
            log::info!("{}: {}", path.display(), h.diagnostics);
        }
        Ok(h)
    }

    /// Build the hierarchy directly from a GFF3 reader.
    ///
    /// Workflow per record:
    /// - gene: register under its `ID`
    /// - transcript: attach to the gene named by its first `Parent`
    /// - exon / CDS / UTR: copy into every listed `Parent` that is a known transcript
    /// - intron: strip `_intron<N>` from its own `ID` and attach to that transcript
    ///
    /// Anything that cannot be resolved is counted in [`Diagnostics`] and skipped.
    ///
    /// # Example
    /// ```
    /// use std::io::Cursor;
    /// use gff_intron_stats::{FeatureTypes, Hierarchy};
    ///
    /// let gff = "\
    /// chr1\tsrc\tgene\t101\t500\t.\t+\t.\tID=G1\n\
    /// chr1\tsrc\tmRNA\t101\t500\t.\t+\t.\tID=T1;Parent=G1\n\
    /// chr1\tsrc\texon\t101\t150\t.\t+\t.\tParent=T1\n";
    ///
    /// let h = Hierarchy::new()
    ///     .from_reader(Cursor::new(gff.as_bytes()), &FeatureTypes::default())
    ///     .unwrap();
    ///
    /// assert_eq!(h.genes.len(), 1);
    /// assert_eq!(h.transcripts[0].exons().len(), 1);
    /// ```
    pub fn from_reader<R: BufRead>(mut self, reader: R, types: &FeatureTypes) -> Result<Self, ParseError> {
        for line in AnnotationReader::new(reader).lines() {
            match line? {
                Line::Record(rec) => self.add_record(&rec, types),
                Line::Opaque(_) => self.diagnostics.opaque_lines += 1,
                Line::Comment(_) | Line::Blank(_) => {}
            }
        }
        Ok(self)
    }

    /// Route one record into the hierarchy.
    pub fn add_record(&mut self, rec: &Record, types: &FeatureTypes) {
        match rec.kind(types) {
            FeatureKind::Gene => {
                let Some(name) = rec.id(types) else {
                    self.diagnostics.genes_without_id += 1;
                    return;
                };
                self.intern_gene(name, rec);
            }
            FeatureKind::Transcript => {
                let gene_id = rec
                    .attrs
                    .first_value(&types.parent_key)
                    .and_then(|p| self.gene_by_name.get(p).copied());
                let Some(gene_id) = gene_id else {
                    self.diagnostics.orphan_transcripts += 1;
                    return;
                };
                let Some(name) = rec.id(types) else {
                    self.diagnostics.transcripts_without_id += 1;
                    return;
                };
                self.intern_tx(name, gene_id, rec);
            }
            kind @ (FeatureKind::Exon
            | FeatureKind::Cds
            | FeatureKind::FivePrimeUtr
            | FeatureKind::ThreePrimeUtr) => {
                let parents = rec.attrs.values(&types.parent_key);
                if parents.is_empty() {
                    self.diagnostics.orphan_features += 1;
                    return;
                }
                let feature = Feature::new(rec.interval(), rec.id(types));
                for p in parents {
                    match self.tx_by_name.get(p) {
                        Some(&tid) => {
                            self.transcripts[tid].add_feature(kind, feature.clone());
                        }
                        None => self.diagnostics.orphan_features += 1,
                    }
                }
            }
            FeatureKind::Intron => {
                let owner = rec
                    .id(types)
                    .and_then(transcript_name_from_intron_id)
                    .and_then(|name| self.tx_by_name.get(name).copied());
                match owner {
                    Some(tid) => {
                        let feature = Feature::new(rec.interval(), rec.id(types));
                        self.transcripts[tid].add_feature(FeatureKind::Intron, feature);
                    }
                    None => self.diagnostics.unresolved_introns += 1,
                }
            }
            FeatureKind::Other => {}
        }
    }

    pub fn gene(&self, name: &str) -> Option<&Gene> {
        self.gene_by_name.get(name).map(|&gid| &self.genes[gid])
    }

    pub fn transcript(&self, name: &str) -> Option<&Transcript> {
        self.tx_by_name.get(name).map(|&tid| &self.transcripts[tid])
    }

    /// Transcripts owned by `gene`, in first-seen order.
    pub fn transcripts_of<'a>(&'a self, gene: &'a Gene) -> impl Iterator<Item = &'a Transcript> + 'a {
        gene.transcript_ids().iter().map(move |&tid| &self.transcripts[tid])
    }

    /// Transcripts reachable from a gene (redefined ids leave stale arena slots behind).
    pub fn transcript_count(&self) -> usize {
        self.genes.iter().map(|g| g.transcript_ids().len()).sum()
    }

    // -----------------------
    // Internal helpers
    // -----------------------

    fn intern_gene(&mut self, name: &str, rec: &Record) -> GeneId {
        if let Some(&gid) = self.gene_by_name.get(name) {
            log::debug!("gene {name} defined again; keeping the last definition");
            self.diagnostics.redefined_ids += 1;

            for tid in self.genes[gid].redefine(rec.seqid.as_str(), rec.interval()) {
                let tx_name = &self.transcripts[tid].name;
                if self.tx_by_name.get(tx_name) == Some(&tid) {
                    self.tx_by_name.remove(tx_name.as_str());
                }
            }
            return gid;
        }

        let gid = self.genes.len();
        self.genes
            .push(Gene::new(gid, name, rec.seqid.as_str(), rec.interval()));
        self.gene_by_name.insert(name.to_string(), gid);
        gid
    }

    fn intern_tx(&mut self, name: &str, gene_id: GeneId, rec: &Record) -> TranscriptId {
        if let Some(&tid) = self.tx_by_name.get(name) {
            log::debug!("transcript {name} defined again; keeping the last definition");
            self.diagnostics.redefined_ids += 1;

            let old_gene = self.transcripts[tid].gene_id;
            if old_gene != gene_id {
                self.genes[old_gene].remove_transcript(tid);
            }
            self.genes[gene_id].add_transcript(tid);
            self.transcripts[tid].redefine(gene_id, rec.interval(), rec.strand);
            return tid;
        }

        let tid = self.transcripts.len();
        self.transcripts
            .push(Transcript::new(tid, gene_id, name, rec.interval(), rec.strand));
        self.tx_by_name.insert(name.to_string(), tid);
        self.genes[gene_id].add_transcript(tid);
        tid
    }
}

/// `T1_intron3` -> `T1`. Splits at the last `_intron`; no marker => `None`.
pub fn transcript_name_from_intron_id(id: &str) -> Option<&str> {
    id.rsplit_once(INTRON_ID_MARKER).map(|(tx, _)| tx)
}
