//! gff_intron_stats
//!
//! Pure-Rust GFF3 gene-structure toolkit.
//! This crate rebuilds the gene -> transcript -> exon/CDS/UTR/intron
//! hierarchy from a flat GFF3 stream, inserts strand-aware numbered intron
//! records between exons, and aggregates per-transcript, per-feature and
//! per-source structural statistics (1-based, inclusive coordinates).

pub mod types;
pub mod config;
pub mod model;
pub mod annotation;
pub mod hierarchy;
pub mod introns;
pub mod stats;
pub mod normalize;

pub use config::{FeatureKind, FeatureTypes, Source, SourceList};

pub use annotation::{AnnotationBuilder, Attributes, Line, ParseError, Record};

pub use hierarchy::{Diagnostics, Hierarchy};
pub use introns::{annotate_path, InferenceReport, IntronAnnotator};
pub use stats::{process_source, process_sources, FeatureRow, OutputPaths, StatsReport, SummaryRow, TranscriptRow};
pub use normalize::normalize_path;

pub use types::{Interval, Strand};

pub use model::transcript::Transcript;
pub use model::gene::Gene;
pub use model::types::{Feature, GeneId, TranscriptId};
