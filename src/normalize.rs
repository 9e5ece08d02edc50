//! Normalise the per-feature table of a projected annotation.
//!
//! A projection tool appends copy/version infixes to the identifiers it
//! carries over (`Zm00001d000001_T001_1_exon3`). Folding them back lets the
//! table be joined against the reference table on `feature_id`.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::annotation::io::{create_writer, open_bufread};

const FEATURE_ID_COL: usize = 3;
const GENE_ID_COL: usize = 5;
const MRNA_ID_COL: usize = 6;

/// `a_b_..._z` -> `a_b_z`; ids with fewer than three parts are kept.
pub fn normalize_feature_id(id: &str) -> String {
    let parts: Vec<&str> = id.split('_').collect();
    if parts.len() >= 3 {
        format!("{}_{}_{}", parts[0], parts[1], parts[parts.len() - 1])
    } else {
        id.to_string()
    }
}

/// Text before the first `_`.
pub fn normalize_gene_id(id: &str) -> String {
    id.split('_').next().unwrap_or(id).to_string()
}

/// First two `_` parts; ids without an underscore are kept.
pub fn normalize_mrna_id(id: &str) -> String {
    let mut parts = id.split('_');
    match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => format!("{a}_{b}"),
        _ => id.to_string(),
    }
}

/// Rewrite the id columns of one data row. Short rows keep what they have.
pub fn normalize_row(row: &csv::StringRecord) -> Vec<String> {
    row.iter()
        .enumerate()
        .map(|(i, field)| match i {
            FEATURE_ID_COL => normalize_feature_id(field),
            GENE_ID_COL => normalize_gene_id(field),
            MRNA_ID_COL => normalize_mrna_id(field),
            _ => field.to_string(),
        })
        .collect()
}

/// Copy the header row verbatim and normalise every following row.
/// Returns the number of data rows written.
pub fn normalize_table<R: Read, W: Write>(reader: R, writer: W) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    let mut rows = 0usize;
    for (i, record) in rdr.records().enumerate() {
        let record = record.context("read feature table row")?;
        if i == 0 {
            wtr.write_record(&record)?;
            continue;
        }
        wtr.write_record(normalize_row(&record))?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

/// File-to-file [`normalize_table`]; `.gz` paths are handled on both sides.
pub fn normalize_path<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let reader = open_bufread(input).with_context(|| format!("open {}", input.display()))?;
    let mut writer = create_writer(output).with_context(|| format!("create {}", output.display()))?;

    let rows = normalize_table(reader, &mut writer)
        .with_context(|| format!("normalise {} -> {}", input.display(), output.display()))?;
    writer
        .finish()
        .with_context(|| format!("finish {}", output.display()))?;
    log::info!("{}: normalised {rows} rows", output.display());
    Ok(rows)
}
