//! Structural statistics over a [`Hierarchy`].
//!
//! Three tables come out of one annotation source:
//! - one row per transcript ([`TranscriptRow`])
//! - one row per identified exon / CDS / intron ([`FeatureRow`])
//! - one summary row for the whole source ([`SummaryRow`])
//!
//! Lengths are inclusive (`end - start + 1`). Every average or ratio with a
//! zero denominator is reported as 0.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};

use crate::annotation::builder::AnnotationBuilder;
use crate::annotation::io::create_writer;
use crate::config::{FeatureTypes, SourceList};
use crate::hierarchy::Hierarchy;
use crate::model::gene::Gene;
use crate::model::transcript::Transcript;
use crate::model::types::Feature;

fn fixed2<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{v:.2}"))
}

fn fixed4<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{v:.4}"))
}

/// `num / den`, or 0 when `den` is 0.
pub fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Total intron length of a transcript.
///
/// Uses the attached intron records. When there are none but the transcript
/// has more than one exon, falls back to `transcript length - exon total`.
/// That fallback is an estimate (it also counts any UTR-only stretch not
/// covered by exons); it is not a re-derivation from exon gaps. The result
/// is clamped at 0 when exons overhang the transcript span.
pub fn intron_total(tx: &Transcript) -> u64 {
    if tx.introns().is_empty() && tx.exons().len() > 1 {
        return tx.len().saturating_sub(tx.exon_total_len());
    }
    tx.intron_records_total_len()
}

/// Column names of a table row, in serialisation order.
pub trait TableRow: Serialize {
    const HEADER: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRow {
    pub seqid: String,
    pub gene_start: u64,
    pub gene_end: u64,
    pub gene_id: String,
    pub gene_length: u64,
    pub mrna_id: String,
    pub mrna_length: u64,
    pub exon_count: usize,
    pub intron_count: usize,
    pub cds_count: usize,
    pub three_utr_count: usize,
    pub five_utr_count: usize,
    pub exon_total_length: u64,
    pub intron_total_length: u64,
    pub cds_total_length: u64,
    pub three_utr_total_length: u64,
    pub five_utr_total_length: u64,
    #[serde(serialize_with = "fixed2")]
    pub exon_avg_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub intron_avg_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub cds_avg_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub three_utr_avg_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub five_utr_avg_length: f64,
    #[serde(serialize_with = "fixed4")]
    pub intron_per_mrna: f64,
    #[serde(serialize_with = "fixed4")]
    pub intron_per_gene: f64,
}

impl TableRow for TranscriptRow {
    const HEADER: &'static [&'static str] = &[
        "seqid",
        "gene_start",
        "gene_end",
        "gene_id",
        "gene_length",
        "mrna_id",
        "mrna_length",
        "exon_count",
        "intron_count",
        "cds_count",
        "three_utr_count",
        "five_utr_count",
        "exon_total_length",
        "intron_total_length",
        "cds_total_length",
        "three_utr_total_length",
        "five_utr_total_length",
        "exon_avg_length",
        "intron_avg_length",
        "cds_avg_length",
        "three_utr_avg_length",
        "five_utr_avg_length",
        "intron_per_mrna",
        "intron_per_gene",
    ];
}

impl TranscriptRow {
    pub fn new(gene: &Gene, tx: &Transcript) -> Self {
        let exon_count = tx.exons().len();
        let intron_count = tx.introns().len();
        let cds_count = tx.cds().len();
        let three_utr_count = tx.three_prime_utrs().len();
        let five_utr_count = tx.five_prime_utrs().len();

        let exon_total = tx.exon_total_len();
        let intron_total = intron_total(tx);
        let cds_total = tx.cds_total_len();
        let three_utr_total = tx.three_prime_utr_total_len();
        let five_utr_total = tx.five_prime_utr_total_len();

        Self {
            seqid: gene.seqid.clone(),
            gene_start: gene.span.start,
            gene_end: gene.span.end,
            gene_id: gene.name.clone(),
            gene_length: gene.len(),
            mrna_id: tx.name.clone(),
            mrna_length: tx.len(),
            exon_count,
            intron_count,
            cds_count,
            three_utr_count,
            five_utr_count,
            exon_total_length: exon_total,
            intron_total_length: intron_total,
            cds_total_length: cds_total,
            three_utr_total_length: three_utr_total,
            five_utr_total_length: five_utr_total,
            exon_avg_length: ratio(exon_total, exon_count as u64),
            intron_avg_length: ratio(intron_total, intron_count as u64),
            cds_avg_length: ratio(cds_total, cds_count as u64),
            three_utr_avg_length: ratio(three_utr_total, three_utr_count as u64),
            five_utr_avg_length: ratio(five_utr_total, five_utr_count as u64),
            intron_per_mrna: ratio(intron_total, tx.len()),
            intron_per_gene: ratio(intron_total, gene.len()),
        }
    }
}

/// One exon, CDS or intron instance with the sibling counts of its transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRow {
    pub chr_id: String,
    pub start: u64,
    pub end: u64,
    pub feature_id: String,
    pub feature_type: &'static str,
    pub gene_id: String,
    pub mrna_id: String,
    pub exon_count: usize,
    pub cds_count: usize,
    pub intron_count: usize,
    pub length: u64,
}

impl TableRow for FeatureRow {
    const HEADER: &'static [&'static str] = &[
        "chr_id",
        "start",
        "end",
        "feature_id",
        "feature_type",
        "gene_id",
        "mrna_id",
        "exon_count",
        "cds_count",
        "intron_count",
        "length",
    ];
}

impl FeatureRow {
    /// Rows for every feature of `tx` that carries an ID: exons, then CDS,
    /// then introns, each in file order.
    pub fn for_transcript(gene: &Gene, tx: &Transcript) -> Vec<Self> {
        let (exon_count, cds_count, intron_count) =
            (tx.exons().len(), tx.cds().len(), tx.introns().len());

        let classes: [(&'static str, &[Feature]); 3] =
            [("exon", tx.exons()), ("cds", tx.cds()), ("intron", tx.introns())];

        classes
            .into_iter()
            .flat_map(|(feature_type, features)| {
                features.iter().filter_map(move |f| {
                    let id = f.id.as_ref()?;
                    Some(FeatureRow {
                        chr_id: gene.seqid.clone(),
                        start: f.interval.start,
                        end: f.interval.end,
                        feature_id: id.clone(),
                        feature_type,
                        gene_id: gene.name.clone(),
                        mrna_id: tx.name.clone(),
                        exon_count,
                        cds_count,
                        intron_count,
                        length: f.len(),
                    })
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub sample: String,
    pub num_genes: usize,
    #[serde(serialize_with = "fixed2")]
    pub avg_gene_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub avg_mrna_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub avg_exon_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub avg_exon_count: f64,
    #[serde(serialize_with = "fixed2")]
    pub avg_intron_length: f64,
    #[serde(serialize_with = "fixed2")]
    pub avg_intron_count: f64,
}

impl TableRow for SummaryRow {
    const HEADER: &'static [&'static str] = &[
        "sample",
        "num_genes",
        "avg_gene_length",
        "avg_mrna_length",
        "avg_exon_length",
        "avg_exon_count",
        "avg_intron_length",
        "avg_intron_count",
    ];
}

/// Pooled sums over every gene and transcript of one source.
#[derive(Debug, Clone, Copy, Default)]
struct Pool {
    genes: u64,
    gene_len: u64,
    transcripts: u64,
    transcript_len: u64,
    exons: u64,
    exon_len: u64,
    // implied count: one fewer than the exons of each transcript
    introns: u64,
    intron_len: u64,
}

impl Pool {
    fn add_gene(&mut self, gene: &Gene) {
        self.genes += 1;
        self.gene_len += gene.len();
    }

    fn add_transcript(&mut self, tx: &Transcript, intron_total: u64) {
        let exons = tx.exons().len() as u64;
        self.transcripts += 1;
        self.transcript_len += tx.len();
        self.exons += exons;
        self.exon_len += tx.exon_total_len();
        self.introns += exons.saturating_sub(1);
        self.intron_len += intron_total;
    }

    fn summary(&self, sample: &str) -> SummaryRow {
        SummaryRow {
            sample: sample.to_string(),
            num_genes: self.genes as usize,
            avg_gene_length: ratio(self.gene_len, self.genes),
            avg_mrna_length: ratio(self.transcript_len, self.transcripts),
            avg_exon_length: ratio(self.exon_len, self.exons),
            avg_exon_count: ratio(self.exons, self.transcripts),
            avg_intron_length: ratio(self.intron_len, self.introns),
            avg_intron_count: ratio(self.introns, self.transcripts),
        }
    }
}

/// All three tables of one annotation source.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub transcripts: Vec<TranscriptRow>,
    pub features: Vec<FeatureRow>,
    pub summary: SummaryRow,
}

impl StatsReport {
    /// Walk every gene once, and every transcript it owns, in file order.
    pub fn from_hierarchy(h: &Hierarchy, sample: &str) -> Self {
        let mut pool = Pool::default();
        let mut transcripts = Vec::new();
        let mut features = Vec::new();

        for gene in &h.genes {
            pool.add_gene(gene);
            for tx in h.transcripts_of(gene) {
                let row = TranscriptRow::new(gene, tx);
                pool.add_transcript(tx, row.intron_total_length);
                transcripts.push(row);
                features.extend(FeatureRow::for_transcript(gene, tx));
            }
        }

        Self {
            transcripts,
            features,
            summary: pool.summary(sample),
        }
    }

    pub fn write(&self, paths: &OutputPaths) -> Result<()> {
        write_table_path(&paths.detail, &self.transcripts)?;
        write_table_path(&paths.features, &self.features)?;
        write_table_path(&paths.summary, std::slice::from_ref(&self.summary))?;
        Ok(())
    }
}

/// Write a header row and then `rows`, tab separated and never quoted.
pub fn write_table<W: Write, T: TableRow>(writer: W, rows: &[T]) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    wtr.write_record(T::HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_table_path<T: TableRow>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = create_writer(path).with_context(|| format!("create {}", path.display()))?;
    write_table(&mut writer, rows).with_context(|| format!("write {}", path.display()))?;
    writer.finish().with_context(|| format!("finish {}", path.display()))
}

/// File names of the three tables for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub detail: PathBuf,
    pub features: PathBuf,
    pub summary: PathBuf,
}

impl OutputPaths {
    /// `<prefix>.gene.information.stat.tsv` and friends, inside `outdir` when given.
    pub fn for_prefix(prefix: &str, outdir: Option<&Path>) -> Self {
        let at = |suffix: &str| {
            let name = format!("{prefix}.{suffix}");
            match outdir {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            }
        };
        Self {
            detail: at("gene.information.stat.tsv"),
            features: at("intron.exon.cds.stat.tsv"),
            summary: at("summary.information.stat.tsv"),
        }
    }
}

/// Load one annotation file, compute its tables and write them under `sample`.
pub fn process_source(
    sample: &str,
    path: &Path,
    outdir: Option<&Path>,
    types: &FeatureTypes,
) -> Result<StatsReport> {
    let hierarchy = AnnotationBuilder::with_types(types.clone())
        .build_from_path(path)
        .with_context(|| format!("build gene hierarchy for {sample} from {}", path.display()))?;
    log::debug!("{hierarchy}");
    if !hierarchy.diagnostics.is_clean() {
        log::info!("{sample}: {}", hierarchy.diagnostics);
    }

    let report = StatsReport::from_hierarchy(&hierarchy, sample);
    let paths = OutputPaths::for_prefix(sample, outdir);
    report.write(&paths)?;

    log::info!(
        "{sample}: {} transcripts, {} features -> {}",
        report.transcripts.len(),
        report.features.len(),
        paths.detail.display()
    );
    Ok(report)
}

/// Run [`process_source`] for every entry of a source list, in order.
pub fn process_sources(
    sources: &SourceList,
    outdir: Option<&Path>,
    types: &FeatureTypes,
) -> Result<Vec<StatsReport>> {
    sources
        .sources
        .iter()
        .map(|src| process_source(&src.sample, &src.path, outdir, types))
        .collect()
}
