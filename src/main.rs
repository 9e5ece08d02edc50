use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use log::LevelFilter;

use gff_intron_stats::{annotate_path, normalize_path, process_source, process_sources, FeatureTypes, SourceList};

/// Add introns to GFF3 files and summarise gene structure.
#[derive(Parser, Debug)]
#[command(name = "gff-intron-stats")]
#[command(author, version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert numbered intron records between exons and rename exon/CDS ids
    AddIntrons(AddIntronsArgs),

    /// Write per-transcript, per-feature and summary tables
    Stats(StatsArgs),

    /// Fold projected ids in a per-feature table back to reference form
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug)]
struct AddIntronsArgs {
    /// Input GFF3 (.gz accepted)
    #[arg(long, short)]
    input: PathBuf,

    /// Output GFF3 (.gz compresses)
    #[arg(long, short)]
    output: PathBuf,

    #[command(flatten)]
    types: FeatureTypeArgs,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["gff", "config"])))]
struct StatsArgs {
    /// Single GFF3 input
    #[arg(long, short, requires = "prefix")]
    gff: Option<PathBuf>,

    /// Output prefix for a single input
    #[arg(long, short, requires = "gff")]
    prefix: Option<String>,

    /// Text file of `<sample> <path>` lines, one source per line
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Directory for the output tables (default: current directory)
    #[arg(long)]
    outdir: Option<PathBuf>,

    #[command(flatten)]
    types: FeatureTypeArgs,
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    /// Per-feature table (`*.intron.exon.cds.stat.tsv`)
    #[arg(long, short)]
    input: PathBuf,

    /// Normalised output table
    #[arg(long, short)]
    output: PathBuf,
}

/// Feature-type vocabulary and attribute keys.
#[derive(Args, Debug)]
struct FeatureTypeArgs {
    /// Column-3 values treated as genes (repeatable)
    #[arg(long = "gene-type", value_name = "TYPE", num_args = 1.., default_values_t = vec!["gene".to_string()])]
    gene_types: Vec<String>,

    /// Column-3 values treated as transcripts (repeatable)
    #[arg(
        long = "transcript-type",
        value_name = "TYPE",
        num_args = 1..,
        default_values_t = vec!["mRNA".to_string(), "transcript".to_string()]
    )]
    transcript_types: Vec<String>,

    /// Column-3 values treated as exons (repeatable)
    #[arg(long = "exon-type", value_name = "TYPE", num_args = 1.., default_values_t = vec!["exon".to_string()])]
    exon_types: Vec<String>,

    /// Column-3 values treated as coding segments (repeatable)
    #[arg(long = "cds-type", value_name = "TYPE", num_args = 1.., default_values_t = vec!["CDS".to_string()])]
    cds_types: Vec<String>,

    /// Column-3 values treated as 5' UTRs (repeatable)
    #[arg(
        long = "five-prime-utr-type",
        value_name = "TYPE",
        num_args = 1..,
        default_values_t = vec!["five_prime_UTR".to_string()]
    )]
    five_prime_utr_types: Vec<String>,

    /// Column-3 values treated as 3' UTRs (repeatable)
    #[arg(
        long = "three-prime-utr-type",
        value_name = "TYPE",
        num_args = 1..,
        default_values_t = vec!["three_prime_UTR".to_string()]
    )]
    three_prime_utr_types: Vec<String>,

    /// Column-3 values treated as introns; the first one names inserted records
    #[arg(long = "intron-type", value_name = "TYPE", num_args = 1.., default_values_t = vec!["intron".to_string()])]
    intron_types: Vec<String>,

    /// Attribute holding a feature's own id
    #[arg(long = "id-key", value_name = "KEY", default_value = "ID")]
    id_key: String,

    /// Attribute linking a feature to its parents
    #[arg(long = "parent-key", value_name = "KEY", default_value = "Parent")]
    parent_key: String,
}

impl From<FeatureTypeArgs> for FeatureTypes {
    fn from(args: FeatureTypeArgs) -> Self {
        FeatureTypes {
            gene_types: args.gene_types,
            transcript_types: args.transcript_types,
            exon_types: args.exon_types,
            cds_types: args.cds_types,
            five_prime_utr_types: args.five_prime_utr_types,
            three_prime_utr_types: args.three_prime_utr_types,
            intron_types: args.intron_types,
            id_key: args.id_key,
            parent_key: args.parent_key,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::AddIntrons(args) => {
            let types = FeatureTypes::from(args.types);
            let report = annotate_path(&args.input, &args.output, &types)?;
            eprintln!("{report}");
            eprintln!("Annotation written to {}", args.output.display());
        }

        Command::Stats(args) => {
            let types = FeatureTypes::from(args.types);
            if let Some(dir) = &args.outdir {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create output directory {}", dir.display()))?;
            }
            let outdir = args.outdir.as_deref();

            match (args.gff, args.prefix, args.config) {
                (Some(gff), Some(prefix), _) => {
                    process_source(&prefix, &gff, outdir, &types)?;
                }
                (_, _, Some(config)) => {
                    let sources = SourceList::from_path(&config)?;
                    if sources.is_empty() {
                        log::warn!("{}: no sources listed", config.display());
                    }
                    let reports = process_sources(&sources, outdir, &types)?;
                    eprintln!("Statistics written for {} sources", reports.len());
                }
                _ => anyhow::bail!("either --gff with --prefix, or --config is required"),
            }
        }

        Command::Normalize(args) => {
            let rows = normalize_path(&args.input, &args.output)?;
            eprintln!("{rows} rows written to {}", args.output.display());
        }
    }

    Ok(())
}
