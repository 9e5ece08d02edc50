use std::collections::HashSet;
use std::fs;

use gff_intron_stats::{
    annotate_path, normalize_path, process_source, process_sources, FeatureTypes, Hierarchy, Source,
    SourceList,
};

const GFF: &str = "\
##gff-version 3
chr1\tsrc\tgene\t100\t1000\t.\t-\t.\tID=G1
chr1\tsrc\tmRNA\t100\t1000\t.\t-\t.\tID=G1_T001;Parent=G1
chr1\tsrc\texon\t100\t199\t.\t-\t.\tID=a;Parent=G1_T001
chr1\tsrc\tCDS\t150\t199\t.\t-\t0\tID=c;Parent=G1_T001
chr1\tsrc\texon\t500\t599\t.\t-\t.\tID=b;Parent=G1_T001
chr1\tsrc\texon\t900\t1000\t.\t-\t.\tID=x;Parent=G1_T001

chr2\tsrc\tgene\t1\t300\t.\t+\t.\tID=G2
chr2\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=G2_T001;Parent=G2
chr2\tsrc\texon\t1\t100\t.\t+\t.\tID=e1;Parent=G2_T001
chr2\tsrc\texon\t201\t300\t.\t+\t.\tID=e2;Parent=G2_T001
";

#[test]
fn add_introns_then_stats() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.gff3");
    let with_introns = dir.path().join("out.gff3.gz");
    fs::write(&input, GFF).unwrap();

    let types = FeatureTypes::default();
    let report = annotate_path(&input, &with_introns, &types).unwrap();
    assert_eq!(report.transcripts, 2);
    assert_eq!(report.introns_inferred, 3);

    // the gz output reads back into a hierarchy with the renamed ids
    let h = Hierarchy::from_path(&with_introns, &types).unwrap();
    let tx = h.transcript("G1_T001").unwrap();
    let exon_ids: Vec<_> = tx.exons().iter().map(|e| e.id.clone().unwrap()).collect();
    assert_eq!(exon_ids, vec!["G1_T001_exon1", "G1_T001_exon2", "G1_T001_exon3"]);
    let intron_ids: Vec<_> = tx.introns().iter().map(|e| e.id.clone().unwrap()).collect();
    assert_eq!(intron_ids, vec!["G1_T001_intron1", "G1_T001_intron2"]);
    // introns keep genomic numbering on the minus strand
    assert_eq!(tx.introns()[0].interval.start, 200);
    assert_eq!(tx.introns()[0].interval.end, 499);

    let outdir = dir.path().join("stats");
    fs::create_dir_all(&outdir).unwrap();
    let stats = process_source("S1", &with_introns, Some(outdir.as_path()), &types).unwrap();

    let detail = fs::read_to_string(outdir.join("S1.gene.information.stat.tsv")).unwrap();
    let features = fs::read_to_string(outdir.join("S1.intron.exon.cds.stat.tsv")).unwrap();
    let summary = fs::read_to_string(outdir.join("S1.summary.information.stat.tsv")).unwrap();

    assert_eq!(detail.lines().count(), 3);
    assert_eq!(features.lines().count(), 1 + stats.features.len());
    assert_eq!(summary.lines().count(), 2);
    assert!(summary.lines().nth(1).unwrap().starts_with("S1\t2\t"));

    // every feature row resolves to a transcript row of the detail table
    let known: HashSet<(String, String)> = detail
        .lines()
        .skip(1)
        .map(|l| {
            let cols: Vec<&str> = l.split('\t').collect();
            (cols[3].to_string(), cols[5].to_string())
        })
        .collect();
    for line in features.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        assert!(known.contains(&(cols[5].to_string(), cols[6].to_string())), "{line}");
    }

    let g1 = &stats.transcripts[0];
    assert_eq!((g1.exon_count, g1.intron_count, g1.cds_count), (3, 2, 1));
    assert_eq!(g1.intron_total_length, 300 + 300);
}

#[test]
fn second_pass_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.gff3");
    let once = dir.path().join("once.gff3");
    let twice = dir.path().join("twice.gff3");
    fs::write(&input, GFF).unwrap();

    let types = FeatureTypes::default();
    annotate_path(&input, &once, &types).unwrap();
    let report = annotate_path(&once, &twice, &types).unwrap();

    assert_eq!(report.introns_replaced, 3);
    assert_eq!(fs::read_to_string(&once).unwrap(), fs::read_to_string(&twice).unwrap());
}

#[test]
fn multi_source_stats_and_normalize() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.gff3");
    let b = dir.path().join("b.gff3");
    fs::write(&a, GFF).unwrap();
    fs::write(&b, GFF.replace("G2_T001", "G2_T001_1")).unwrap();

    let sources = SourceList {
        sources: vec![
            Source { sample: "A".into(), path: a },
            Source { sample: "B".into(), path: b },
        ],
    };
    let outdir = dir.path();
    let reports = process_sources(&sources, Some(outdir), &FeatureTypes::default()).unwrap();
    assert_eq!(reports.len(), 2);
    assert!(outdir.join("A.summary.information.stat.tsv").exists());
    assert!(outdir.join("B.summary.information.stat.tsv").exists());

    let normalized = dir.path().join("B.change.tsv");
    let rows = normalize_path(outdir.join("B.intron.exon.cds.stat.tsv"), &normalized).unwrap();
    assert_eq!(rows, reports[1].features.len());

    let text = fs::read_to_string(&normalized).unwrap();
    assert!(text.lines().skip(1).all(|l| !l.split('\t').nth(6).unwrap().ends_with("_1")));
}
