use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::annotation::attributes::Attributes;
use crate::annotation::io::{create_writer, open_bufread, AnnotationReader, Line, Record};
use crate::annotation::modules::{GeneModules, ModuleItem};
use crate::config::{FeatureKind, FeatureTypes};
use crate::types::{Interval, Strand};

/// Counters of one inference run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferenceReport {
    pub modules: usize,
    pub transcripts: usize,
    pub exons_renamed: usize,
    pub cds_renamed: usize,
    pub introns_inferred: usize,
    /// Intron records already in the input that matched an inferred one
    pub introns_replaced: usize,
    /// CDS records of transcripts without any exon
    pub cds_dropped: usize,
}

impl fmt::Display for InferenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "modules={}, transcripts={}, exons={}, cds={}, introns_inferred={}, introns_replaced={}, cds_dropped={}",
            self.modules,
            self.transcripts,
            self.exons_renamed,
            self.cds_renamed,
            self.introns_inferred,
            self.introns_replaced,
            self.cds_dropped
        )
    }
}

/// Records held back while a transcript is open.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptBuffer {
    pub transcript_id: String,
    pub strand: Strand,
    pub exons: Vec<Record>,
    pub cds: Vec<Record>,
    pub introns: Vec<Record>,
}

impl TranscriptBuffer {
    pub fn new(transcript_id: impl Into<String>, strand: Strand) -> Self {
        Self {
            transcript_id: transcript_id.into(),
            strand,
            exons: Vec::new(),
            cds: Vec::new(),
            introns: Vec::new(),
        }
    }
}

/// Scan state inside one gene module.
#[derive(Debug, Clone, PartialEq)]
enum ScanState {
    Idle,
    InTranscript(TranscriptBuffer),
}

/// Adds intron records between exons and renumbers exon/CDS IDs per transcript.
///
/// Per transcript, the output block is: exons (display order), introns
/// (genomic order), CDS (display order). Display order is ascending start on
/// `+`/unknown strand and the reverse on `-`. Introns are always numbered by
/// their position between genomically sorted exons, so on `-` strand exon
/// and intron numbers run in opposite directions.
///
/// # Example
/// ```
/// use std::io::Cursor;
/// use gff_intron_stats::{FeatureTypes, IntronAnnotator};
///
/// let gff = "\
/// chr1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1\n\
/// chr1\tsrc\texon\t1\t100\t.\t+\t.\tParent=T1\n\
/// chr1\tsrc\texon\t201\t300\t.\t+\t.\tParent=T1\n";
///
/// let types = FeatureTypes::default();
/// let mut out = Vec::new();
/// IntronAnnotator::new(&types)
///     .run(Cursor::new(gff.as_bytes()), &mut out)
///     .unwrap();
///
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.contains("intron\t101\t200\t.\t+\t.\tID=T1_intron1"));
/// ```
pub struct IntronAnnotator<'a> {
    types: &'a FeatureTypes,
    report: InferenceReport,
}

impl<'a> IntronAnnotator<'a> {
    pub fn new(types: &'a FeatureTypes) -> Self {
        Self {
            types,
            report: InferenceReport::default(),
        }
    }

    pub fn report(&self) -> InferenceReport {
        self.report
    }

    /// Stream `reader` to `writer`, one gene module at a time.
    pub fn run<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<InferenceReport> {
        let types = self.types;
        let lines = AnnotationReader::new(reader).lines();

        for item in GeneModules::new(lines, types) {
            match item? {
                ModuleItem::Break(line) => writeln!(writer, "{line}")?,
                ModuleItem::Module(module) => {
                    for line in self.process_module(module) {
                        writeln!(writer, "{line}")?;
                    }
                }
            }
        }
        writer.flush()?;

        Ok(self.report)
    }

    /// Rewrite one gene module.
    ///
    /// Everything except the exon/CDS/intron records of an open transcript is
    /// emitted in input order; those are held back and replaced by the
    /// transcript's canonical block when the transcript closes (next gene or
    /// transcript record, or end of module).
    pub fn process_module(&mut self, module: Vec<Line>) -> Vec<Line> {
        self.report.modules += 1;

        let mut out = Vec::with_capacity(module.len());
        let mut state = ScanState::Idle;

        for line in module {
            let rec = match line {
                Line::Record(rec) => rec,
                other => {
                    out.push(other);
                    continue;
                }
            };

            let kind = rec.kind(self.types);
            match kind {
                FeatureKind::Gene | FeatureKind::Transcript => {
                    self.close(std::mem::replace(&mut state, ScanState::Idle), &mut out);

                    if kind == FeatureKind::Transcript {
                        if let Some(id) = rec.id(self.types) {
                            state = ScanState::InTranscript(TranscriptBuffer::new(id, rec.strand));
                        }
                    }
                    out.push(Line::Record(rec));
                }
                FeatureKind::Exon | FeatureKind::Cds | FeatureKind::Intron => match &mut state {
                    ScanState::InTranscript(buf) => match kind {
                        FeatureKind::Exon => buf.exons.push(rec),
                        FeatureKind::Cds => buf.cds.push(rec),
                        _ => buf.introns.push(rec),
                    },
                    ScanState::Idle => out.push(Line::Record(rec)),
                },
                _ => out.push(Line::Record(rec)),
            }
        }

        self.close(state, &mut out);
        out
    }

    fn close(&mut self, state: ScanState, out: &mut Vec<Line>) {
        if let ScanState::InTranscript(buf) = state {
            self.reconcile(buf, out);
        }
    }

    /// Emit the canonical exon -> intron -> CDS block of one transcript.
    pub fn reconcile(&mut self, buf: TranscriptBuffer, out: &mut Vec<Line>) {
        self.report.transcripts += 1;

        let TranscriptBuffer {
            transcript_id,
            strand,
            mut exons,
            mut cds,
            introns: existing_introns,
        } = buf;

        if exons.is_empty() {
            if !cds.is_empty() {
                log::debug!("{transcript_id}: dropping {} CDS without exons", cds.len());
            }
            self.report.cds_dropped += cds.len();
            out.extend(existing_introns.into_iter().map(Line::Record));
            return;
        }

        // genomic order; stable, so equal starts keep input order
        exons.sort_by_key(|r| r.start);
        cds.sort_by_key(|r| r.start);

        let genomic: Vec<Interval> = exons.iter().map(Record::interval).collect();
        let inferred: Vec<Record> = Interval::gaps(&genomic)
            .into_iter()
            .map(|(i, gap)| self.intron_record(&exons[0], gap, strand, &format!("{transcript_id}_intron{i}")))
            .collect();

        if strand == Strand::Minus {
            exons.reverse();
            cds.reverse();
        }

        let id_key = self.types.id_key.as_str();

        for (k, mut exon) in exons.into_iter().enumerate() {
            exon.set_attr(id_key, format!("{transcript_id}_exon{}", k + 1));
            out.push(Line::Record(exon));
            self.report.exons_renamed += 1;
        }

        let n_existing = existing_introns.len();
        let kept: Vec<Record> = existing_introns
            .into_iter()
            .filter(|r| !inferred.iter().any(|i| i.interval() == r.interval()))
            .collect();
        self.report.introns_replaced += n_existing - kept.len();
        self.report.introns_inferred += inferred.len();
        out.extend(inferred.into_iter().map(Line::Record));
        out.extend(kept.into_iter().map(Line::Record));

        for (k, mut seg) in cds.into_iter().enumerate() {
            seg.set_attr(id_key, format!("{transcript_id}_cds{}", k + 1));
            out.push(Line::Record(seg));
            self.report.cds_renamed += 1;
        }
    }

    /// Intron between two exons; seqid and source come from `template`.
    fn intron_record(&self, template: &Record, gap: Interval, strand: Strand, id: &str) -> Record {
        let mut attrs = Attributes::default();
        attrs.set(&self.types.id_key, id);

        Record {
            seqid: template.seqid.clone(),
            source: template.source.clone(),
            feature_type: self
                .types
                .intron_types
                .first()
                .cloned()
                .unwrap_or_else(|| "intron".to_string()),
            start: gap.start,
            end: gap.end,
            score: ".".to_string(),
            strand,
            phase: ".".to_string(),
            attrs,
            extra: Vec::new(),
            raw: None,
        }
    }
}

/// Add introns to a GFF3 file (plain or `.gz` on either side).
pub fn annotate_path<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    types: &FeatureTypes,
) -> Result<InferenceReport> {
    let (input, output) = (input.as_ref(), output.as_ref());

    let reader = open_bufread(input)
        .with_context(|| format!("open annotation file {}", input.display()))?;
    let mut writer = create_writer(output)
        .with_context(|| format!("create output file {}", output.display()))?;

    let report = IntronAnnotator::new(types)
        .run(reader, &mut writer)
        .with_context(|| format!("add introns {} -> {}", input.display(), output.display()))?;
    writer
        .finish()
        .with_context(|| format!("finish output file {}", output.display()))?;

    log::info!("{}: {report}", input.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn annotate(gff: &str) -> String {
        let types = FeatureTypes::default();
        let mut out = Vec::new();
        IntronAnnotator::new(&types)
            .run(Cursor::new(gff.as_bytes()), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    /// (type, start, end, ID) of every record line.
    fn features(text: &str) -> Vec<(String, u64, u64, String)> {
        text.lines()
            .filter_map(|l| crate::annotation::io::parse_record_line(l).ok())
            .map(|r| {
                let id = r.attr("ID").unwrap_or("").to_string();
                (r.feature_type, r.start, r.end, id)
            })
            .collect()
    }

    fn f(kind: &str, start: u64, end: u64, id: &str) -> (String, u64, u64, String) {
        (kind.to_string(), start, end, id.to_string())
    }

    fn three_exon_gene(strand: &str) -> String {
        format!(
            "\
chr1\tsrc\tgene\t100\t600\t.\t{s}\t.\tID=G1
chr1\tsrc\tmRNA\t100\t600\t.\t{s}\t.\tID=T1;Parent=G1
chr1\tsrc\texon\t300\t400\t.\t{s}\t.\tID=x;Parent=T1
chr1\tsrc\texon\t100\t200\t.\t{s}\t.\tID=y;Parent=T1
chr1\tsrc\texon\t500\t600\t.\t{s}\t.\tID=z;Parent=T1
",
            s = strand
        )
    }

    #[test]
    fn plus_strand_numbering() {
        let got = features(&annotate(&three_exon_gene("+")));
        assert_eq!(
            got[2..],
            [
                f("exon", 100, 200, "T1_exon1"),
                f("exon", 300, 400, "T1_exon2"),
                f("exon", 500, 600, "T1_exon3"),
                f("intron", 201, 299, "T1_intron1"),
                f("intron", 401, 499, "T1_intron2"),
            ]
        );
    }

    #[test]
    fn minus_strand_reverses_exons_but_not_introns() {
        let got = features(&annotate(&three_exon_gene("-")));
        assert_eq!(
            got[2..],
            [
                f("exon", 500, 600, "T1_exon1"),
                f("exon", 300, 400, "T1_exon2"),
                f("exon", 100, 200, "T1_exon3"),
                f("intron", 201, 299, "T1_intron1"),
                f("intron", 401, 499, "T1_intron2"),
            ]
        );
        assert!(annotate(&three_exon_gene("-")).contains("intron\t201\t299\t.\t-\t.\tID=T1_intron1"));
    }

    #[test]
    fn touching_exons_yield_no_intron() {
        let gff = "\
chr1\tsrc\tmRNA\t100\t300\t.\t+\t.\tID=T1
chr1\tsrc\texon\t100\t200\t.\t+\t.\tParent=T1
chr1\tsrc\texon\t201\t300\t.\t+\t.\tParent=T1
";
        let got = features(&annotate(gff));
        assert!(got.iter().all(|(kind, ..)| kind != "intron"));
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn skipped_gap_keeps_genomic_intron_index() {
        let gff = "\
chr1\tsrc\tmRNA\t100\t600\t.\t+\t.\tID=T1
chr1\tsrc\texon\t100\t200\t.\t+\t.\tParent=T1
chr1\tsrc\texon\t201\t300\t.\t+\t.\tParent=T1
chr1\tsrc\texon\t500\t600\t.\t+\t.\tParent=T1
";
        let got = features(&annotate(gff));
        let introns: Vec<_> = got.into_iter().filter(|(k, ..)| k == "intron").collect();
        assert_eq!(introns, vec![f("intron", 301, 499, "T1_intron2")]);
    }

    #[test]
    fn single_exon_has_no_intron_on_either_strand() {
        for strand in ["+", "-", "."] {
            let gff = format!(
                "chr1\tsrc\tmRNA\t1\t50\t.\t{strand}\t.\tID=T1\nchr1\tsrc\texon\t1\t50\t.\t{strand}\t.\tParent=T1\n"
            );
            let got = features(&annotate(&gff));
            assert_eq!(got, vec![f("mRNA", 1, 50, "T1"), f("exon", 1, 50, "T1_exon1")]);
        }
    }

    #[test]
    fn block_order_is_exons_introns_cds_and_others_pass_first() {
        let gff = "\
chr1\tsrc\tgene\t1\t400\t.\t-\t.\tID=G1
chr1\tsrc\tmRNA\t1\t400\t.\t-\t.\tID=T1;Parent=G1
chr1\tsrc\texon\t1\t100\t.\t-\t.\tParent=T1
chr1\tsrc\tCDS\t50\t100\t.\t-\t0\tParent=T1;ID=c
chr1\tsrc\tfive_prime_UTR\t301\t320\t.\t-\t.\tParent=T1
chr1\tsrc\texon\t301\t400\t.\t-\t.\tParent=T1
chr1\tsrc\tCDS\t321\t400\t.\t-\t0\tParent=T1;ID=c
";
        let text = annotate(gff);
        let got = features(&text);
        assert_eq!(
            got,
            vec![
                f("gene", 1, 400, "G1"),
                f("mRNA", 1, 400, "T1"),
                f("five_prime_UTR", 301, 320, ""),
                f("exon", 301, 400, "T1_exon1"),
                f("exon", 1, 100, "T1_exon2"),
                f("intron", 101, 300, "T1_intron1"),
                f("CDS", 321, 400, "T1_cds1"),
                f("CDS", 50, 100, "T1_cds2"),
            ]
        );
        // ID rewritten in place, Parent stays first
        assert!(text.contains("CDS\t321\t400\t.\t-\t0\tParent=T1;ID=T1_cds1\n"));
        assert!(text.contains("exon\t1\t100\t.\t-\t.\tParent=T1;ID=T1_exon2\n"));
    }

    #[test]
    fn cds_without_exons_is_dropped() {
        let gff = "\
chr1\tsrc\tmRNA\t1\t400\t.\t+\t.\tID=T1
chr1\tsrc\tCDS\t50\t100\t.\t+\t0\tParent=T1
chr1\tsrc\tmRNA\t1\t400\t.\t+\t.\tID=T2
chr1\tsrc\texon\t1\t100\t.\t+\t.\tParent=T2
";
        let types = FeatureTypes::default();
        let mut out = Vec::new();
        let report = IntronAnnotator::new(&types)
            .run(Cursor::new(gff.as_bytes()), &mut out)
            .unwrap();

        let got = features(&String::from_utf8(out).unwrap());
        assert_eq!(
            got,
            vec![
                f("mRNA", 1, 400, "T1"),
                f("mRNA", 1, 400, "T2"),
                f("exon", 1, 100, "T2_exon1"),
            ]
        );
        assert_eq!(report.cds_dropped, 1);
        assert_eq!(report.transcripts, 2);
    }

    #[test]
    fn records_outside_a_transcript_pass_through() {
        let gff = "\
##gff-version 3
chr1\tsrc\tgene\t1\t400\t.\t+\t.\tID=G1
chr1\tsrc\texon\t1\t100\t.\t+\t.\tID=orphan
too\tshort
chr1\tsrc\tmRNA\t1\t400\t.\t+\t.\tName=no_id
chr1\tsrc\texon\t201\t300\t.\t+\t.\tID=also_orphan

# trailing comment
";
        assert_eq!(annotate(gff), gff);
    }

    #[test]
    fn untouched_records_keep_their_exact_text() {
        let gff = "\
chr1\tsrc\tgene\t1\t300\t.\t+\t.\tID=G1; Name=Alpha;
chr1\tsrc\trepeat_region\t5\t20\t.\t?\t.\t.
chr1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1;Parent=G1;Note=a b ;
chr1\tsrc\texon\t1\t100\t.\t?\t.\t.
";
        let out = annotate(gff);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "chr1\tsrc\tgene\t1\t300\t.\t+\t.\tID=G1; Name=Alpha;");
        assert_eq!(lines[1], "chr1\tsrc\trepeat_region\t5\t20\t.\t?\t.\t.");
        assert_eq!(lines[2], "chr1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1;Parent=G1;Note=a b ;");
        // renamed exon keeps its own strand column
        assert_eq!(lines[3], "chr1\tsrc\texon\t1\t100\t.\t?\t.\tID=T1_exon1");

        let no_transcript = "chr1\tsrc\texon\t1\t100\t.\t?\t.\tID=e1 ;Note= x\n";
        assert_eq!(annotate(no_transcript), no_transcript);
    }

    #[test]
    fn unusual_strand_still_opens_a_transcript() {
        let gff = "\
chr1\tsrc\tmRNA\t1\t100\t.\t+\t.\tID=T1
chr1\tsrc\texon\t1\t100\t.\t+\t.\tParent=T1
chr1\tsrc\tmRNA\t201\t500\t.\t*\t.\tID=T2
chr1\tsrc\texon\t201\t300\t.\t*\t.\tParent=T2
chr1\tsrc\texon\t401\t500\t.\t*\t.\tParent=T2
";
        let out = annotate(gff);
        assert_eq!(
            features(&out),
            vec![
                f("mRNA", 1, 100, "T1"),
                f("exon", 1, 100, "T1_exon1"),
                f("mRNA", 201, 500, "T2"),
                f("exon", 201, 300, "T2_exon1"),
                f("exon", 401, 500, "T2_exon2"),
                f("intron", 301, 400, "T2_intron1"),
            ]
        );
        assert!(out.contains("exon\t201\t300\t.\t*\t.\tParent=T2;ID=T2_exon1"));
        assert!(out.contains("intron\t301\t400\t.\t.\t.\tID=T2_intron1"));
    }

    #[test]
    fn comment_closes_the_open_transcript() {
        let gff = "\
chr1\tsrc\tmRNA\t1\t400\t.\t+\t.\tID=T1
chr1\tsrc\texon\t1\t100\t.\t+\t.\tParent=T1
#break
chr1\tsrc\texon\t201\t300\t.\t+\t.\tParent=T1
";
        let text = annotate(gff);
        assert!(!text.contains("intron"));
        assert!(text.contains("ID=T1_exon1\n#break\n"));
        assert!(text.ends_with("exon\t201\t300\t.\t+\t.\tParent=T1\n"));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let once = annotate(&three_exon_gene("-"));
        let twice = annotate(&once);
        assert_eq!(once, twice);

        let introns = twice.lines().filter(|l| l.contains("\tintron\t")).count();
        assert_eq!(introns, 2);
    }

    #[test]
    fn existing_odd_introns_are_kept_after_inferred_ones() {
        let gff = "\
chr1\tsrc\tmRNA\t1\t400\t.\t+\t.\tID=T1
chr1\tsrc\tintron\t101\t200\t.\t+\t.\tID=T1_intron1
chr1\tsrc\tintron\t150\t160\t.\t+\t.\tID=custom
chr1\tsrc\texon\t1\t100\t.\t+\t.\tParent=T1
chr1\tsrc\texon\t201\t300\t.\t+\t.\tParent=T1
";
        let types = FeatureTypes::default();
        let mut out = Vec::new();
        let report = IntronAnnotator::new(&types)
            .run(Cursor::new(gff.as_bytes()), &mut out)
            .unwrap();

        let got = features(&String::from_utf8(out).unwrap());
        assert_eq!(
            got[1..],
            [
                f("exon", 1, 100, "T1_exon1"),
                f("exon", 201, 300, "T1_exon2"),
                f("intron", 101, 200, "T1_intron1"),
                f("intron", 150, 160, "custom"),
            ]
        );
        assert_eq!(report.introns_replaced, 1);
        assert_eq!(report.introns_inferred, 1);
    }

    #[test]
    fn intron_takes_template_seqid_source_and_transcript_strand() {
        let gff = "\
chrX\tmapper\tmRNA\t1\t400\t.\t-\t.\tID=T1
chrX\tmapper\texon\t201\t300\t.\t+\t.\tParent=T1
chrX\tother\texon\t1\t100\t.\t+\t.\tParent=T1
";
        let text = annotate(gff);
        assert!(text.contains("chrX\tother\tintron\t101\t200\t.\t-\t.\tID=T1_intron1\n"));
    }
}
