use crate::config::FeatureKind;
use crate::model::types::{Feature, GeneId, TranscriptId};
use crate::types::{total_len, Interval, Strand};

/// Transcript (mRNA) model with its sub-feature collections.
///
/// Every collection keeps file order; nothing is merged or deduplicated, so
/// counts and totals reflect the records exactly as they were attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub id: TranscriptId,
    pub gene_id: GeneId,
    pub name: String,
    pub span: Interval,
    pub strand: Strand,
    exons: Vec<Feature>,
    cds: Vec<Feature>,
    five_prime_utrs: Vec<Feature>,
    three_prime_utrs: Vec<Feature>,
    introns: Vec<Feature>,
}

impl Transcript {
    pub fn new(
        id: TranscriptId,
        gene_id: GeneId,
        name: impl Into<String>,
        span: Interval,
        strand: Strand,
    ) -> Self {
        Self {
            id,
            gene_id,
            name: name.into(),
            span,
            strand,
            exons: Vec::new(),
            cds: Vec::new(),
            five_prime_utrs: Vec::new(),
            three_prime_utrs: Vec::new(),
            introns: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.span.len()
    }

    /// Attach a sub-feature. Returns false for kinds a transcript does not own.
    pub fn add_feature(&mut self, kind: FeatureKind, feature: Feature) -> bool {
        let bucket = match kind {
            FeatureKind::Exon => &mut self.exons,
            FeatureKind::Cds => &mut self.cds,
            FeatureKind::FivePrimeUtr => &mut self.five_prime_utrs,
            FeatureKind::ThreePrimeUtr => &mut self.three_prime_utrs,
            FeatureKind::Intron => &mut self.introns,
            FeatureKind::Gene | FeatureKind::Transcript | FeatureKind::Other => return false,
        };
        bucket.push(feature);
        true
    }

    /// Forget all sub-features and take a new location (id redefinition).
    pub fn redefine(&mut self, gene_id: GeneId, span: Interval, strand: Strand) {
        self.gene_id = gene_id;
        self.span = span;
        self.strand = strand;
        self.exons.clear();
        self.cds.clear();
        self.five_prime_utrs.clear();
        self.three_prime_utrs.clear();
        self.introns.clear();
    }

    pub fn exons(&self) -> &[Feature] {
        &self.exons
    }

    pub fn cds(&self) -> &[Feature] {
        &self.cds
    }

    pub fn five_prime_utrs(&self) -> &[Feature] {
        &self.five_prime_utrs
    }

    pub fn three_prime_utrs(&self) -> &[Feature] {
        &self.three_prime_utrs
    }

    pub fn introns(&self) -> &[Feature] {
        &self.introns
    }

    pub fn exon_total_len(&self) -> u64 {
        total_len(self.exons.iter().map(|f| &f.interval))
    }

    pub fn cds_total_len(&self) -> u64 {
        total_len(self.cds.iter().map(|f| &f.interval))
    }

    pub fn five_prime_utr_total_len(&self) -> u64 {
        total_len(self.five_prime_utrs.iter().map(|f| &f.interval))
    }

    pub fn three_prime_utr_total_len(&self) -> u64 {
        total_len(self.three_prime_utrs.iter().map(|f| &f.interval))
    }

    /// Sum of the explicitly attached intron records (no inference).
    pub fn intron_records_total_len(&self) -> u64 {
        total_len(self.introns.iter().map(|f| &f.interval))
    }
}
