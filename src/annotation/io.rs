use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::annotation::attributes::Attributes;
use crate::config::{FeatureKind, FeatureTypes};
use crate::types::{Interval, Strand};

/// A single parsed GFF3 data line.
///
/// Coordinates are kept as written: 1-based, inclusive.
/// Score and phase are opaque and re-emitted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub seqid: String,        // chromosome / contig
    pub source: String,       // column 2
    pub feature_type: String, // column 3
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: Strand,
    pub phase: String,
    pub attrs: Attributes,
    /// Columns past the ninth, carried through untouched.
    pub extra: Vec<String>,
    /// The line as read, kept in step by [`Record::set_attr`]; `None` for
    /// records built in code.
    pub raw: Option<String>,
}

impl Record {
    /// Convenience: get an attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key)
    }

    pub fn kind(&self, types: &FeatureTypes) -> FeatureKind {
        types.kind_of(&self.feature_type)
    }

    pub fn interval(&self) -> Interval {
        // start <= end is checked by parse_record_line
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    pub fn id(&self, types: &FeatureTypes) -> Option<&str> {
        self.attr(&types.id_key).filter(|v| !v.is_empty())
    }

    /// Set one attribute. Only column 9 of the kept line is rewritten.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        self.attrs.set(key, value);
        if let Some(raw) = &self.raw {
            let mut cols: Vec<String> = raw.split('\t').map(str::to_string).collect();
            if let Some(col) = cols.get_mut(8) {
                *col = self.attrs.to_string();
            }
            self.raw = Some(cols.join("\t"));
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw) = &self.raw {
            return f.write_str(raw);
        }
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.source,
            self.feature_type,
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
            self.attrs
        )?;
        for col in &self.extra {
            write!(f, "\t{col}")?;
        }
        Ok(())
    }
}

/// One line of an annotation stream.
///
/// Everything except `Record` is written back exactly as it was read.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Starts with `#`
    Comment(String),
    /// Empty or whitespace only
    Blank(String),
    /// Data line that is not a usable record (too few fields, bad coordinates, ...)
    Opaque(String),
    Record(Record),
}

impl Line {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Line::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Comments and blank lines close a gene module.
    pub fn is_structural_break(&self) -> bool {
        matches!(self, Line::Comment(_) | Line::Blank(_))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Comment(s) | Line::Blank(s) | Line::Opaque(s) => f.write_str(s),
            Line::Record(r) => write!(f, "{r}"),
        }
    }
}

/// Parsing errors for GFF3.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error while reading '{path}': {source}")]
    IoPath {
        path: String,
        source: std::io::Error,
    },
    #[error("Malformed GFF line: {line}")]
    MalformedLine { line: String },
    #[error("Bad coordinates in line: {line}")]
    BadCoordinates { line: String },
}

/// Streaming line reader for GFF3 files.
///
/// Unlike a record-only parser this keeps every line (comments, blanks and
/// unusable data lines included), so the stream can be written back with
/// only the intended edits.
///
/// # Example
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use gff_intron_stats::annotation::io::{AnnotationReader, Line};
///
/// let file = File::open("genes.gff3").unwrap();
/// let rdr = AnnotationReader::new(BufReader::new(file));
/// for line in rdr.lines() {
///     if let Line::Record(rec) = line.unwrap() {
///         println!("{} {}-{}", rec.seqid, rec.start, rec.end);
///     }
/// }
/// ```
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
        }
    }

    /// Returns an iterator over classified lines. Only I/O fails.
    pub fn lines(mut self) -> impl Iterator<Item = Result<Line, ParseError>> {
        std::iter::from_fn(move || {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => None,
                Ok(_) => {
                    let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
                    Some(Ok(classify_line(line)))
                }
                Err(e) => Some(Err(ParseError::IoPath {
                    path: "<stream>".to_string(),
                    source: e,
                })),
            }
        })
    }

    /// Only the data records, skipping everything else.
    pub fn records(self) -> impl Iterator<Item = Result<Record, ParseError>> {
        self.lines().filter_map(|line| match line {
            Ok(Line::Record(r)) => Some(Ok(r)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }
}

/// Sort one raw line (without terminator) into a [`Line`]. Never fails.
pub fn classify_line(line: &str) -> Line {
    if line.starts_with('#') {
        return Line::Comment(line.to_string());
    }
    if line.trim().is_empty() {
        return Line::Blank(line.to_string());
    }
    match parse_record_line(line) {
        Ok(rec) => Line::Record(rec),
        Err(e) => {
            log::debug!("passing through unusable line: {e}");
            Line::Opaque(line.to_string())
        }
    }
}

/// Parse a single non-comment line into a [`Record`].
pub fn parse_record_line(line: &str) -> Result<Record, ParseError> {
    // seqid source type start end score strand phase attributes [extra...]
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < 9 {
        return Err(ParseError::MalformedLine {
            line: line.to_string(),
        });
    }

    let start: u64 = cols[3].trim().parse().map_err(|_| ParseError::BadCoordinates {
        line: line.to_string(),
    })?;
    let end: u64 = cols[4].trim().parse().map_err(|_| ParseError::BadCoordinates {
        line: line.to_string(),
    })?;

    if start == 0 || end < start {
        return Err(ParseError::BadCoordinates {
            line: line.to_string(),
        });
    }

    let strand = Strand::from_column(cols[6]);

    Ok(Record {
        seqid: cols[0].to_string(),
        source: cols[1].to_string(),
        feature_type: cols[2].to_string(),
        start,
        end,
        score: cols[5].to_string(),
        strand,
        phase: cols[7].to_string(),
        attrs: Attributes::parse(cols[8]),
        extra: cols[9..].iter().map(|s| s.to_string()).collect(),
        raw: Some(line.to_string()),
    })
}

fn is_gz(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Open a plain or gzipped (by `.gz` extension) text file.
pub fn open_bufread(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let f = File::open(path).map_err(|e| ParseError::IoPath {
        path: path.display().to_string(),
        source: e,
    })?;

    if is_gz(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// Output file, plain or gzip. Call [`OutputWriter::finish`] when done so
/// the gzip trailer and any buffered bytes are written with errors reported.
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl OutputWriter {
    pub fn finish(self) -> std::io::Result<()> {
        match self {
            OutputWriter::Plain(mut w) => w.flush(),
            OutputWriter::Gz(enc) => enc.finish()?.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            OutputWriter::Plain(w) => w.write(buf),
            OutputWriter::Gz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            OutputWriter::Plain(w) => w.flush(),
            OutputWriter::Gz(w) => w.flush(),
        }
    }
}

/// Create a plain or gzipped (by `.gz` extension) output file.
pub fn create_writer(path: &Path) -> std::io::Result<OutputWriter> {
    let f = BufWriter::new(File::create(path)?);
    if is_gz(path) {
        Ok(OutputWriter::Gz(GzEncoder::new(f, Compression::default())))
    } else {
        Ok(OutputWriter::Plain(f))
    }
}
