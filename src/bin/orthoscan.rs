//! orthoscan - orthogroup expansion/contraction CLI
//!
//! Command-line interface for detecting expanded and contracted orthogroups
//! and following them up with domain annotation.

use clap::{Parser, Subcommand, ValueEnum};
use orthoscan::annotate::{
    members_from_report, members_from_table, read_orthogroup_list, submit_all, InterProClient,
    SubmitOptions, INTERPRO_URL,
};
use orthoscan::config::{self, RunConfig};
use orthoscan::data::{parse_target_list, OrthogroupTable, SequenceIndex, TableFormat};
use orthoscan::detect::{detect_outliers, OutlierConfig, OutlierReport, OutlierResult, ScoreMethod};
use orthoscan::error::{OrthoError, Result};
use orthoscan::extract::write_outlier_fasta;
use orthoscan::mapping::{map_orthogroups, mapping_warnings, format_mapping, write_mappings, DEFAULT_WARN_THRESHOLD};
use orthoscan::summarize::{summarize_pattern, write_summaries};
use std::path::PathBuf;
use std::time::Duration;

/// CLI-friendly table format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFormat {
    /// Integer counts in every cell
    Counts,
    /// OrthoFinder Orthogroups.tsv with member sequence lists
    Members,
}

impl From<CliFormat> for TableFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Counts => TableFormat::Counts,
            CliFormat::Members => TableFormat::Members,
        }
    }
}

/// CLI-friendly scoring method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMethod {
    /// Standardize per-group count sums across orthogroups
    #[value(name = "group_sum")]
    GroupSum,
    /// Standardize each orthogroup across organisms, average per group
    #[value(name = "row_profile")]
    RowProfile,
}

impl From<CliMethod> for ScoreMethod {
    fn from(method: CliMethod) -> Self {
        match method {
            CliMethod::GroupSum => ScoreMethod::GroupSum,
            CliMethod::RowProfile => ScoreMethod::RowProfile,
        }
    }
}

/// Orthogroup expansion/contraction analysis
#[derive(Parser)]
#[command(name = "orthoscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find expanded and contracted orthogroups
    Outliers {
        /// Orthogroup table (tab delimited)
        #[arg(short = 'g', long)]
        orthogroup: PathBuf,

        /// Number of top/bottom orthogroups to report
        #[arg(short, long)]
        ntop: usize,

        /// Total fraction of observations to trim in mean/std. dev., in [0, 0.5)
        #[arg(short, long)]
        fraction: f64,

        /// Comma delimited list of target organisms
        #[arg(short, long)]
        target: String,

        /// JSON output file for the ranked report
        #[arg(short, long)]
        json: PathBuf,

        /// TSV output file for the normalized counts
        #[arg(short = 'v', long)]
        tsv: PathBuf,

        /// Cell layout of the orthogroup table
        #[arg(long, value_enum, default_value = "counts")]
        format: CliFormat,

        /// How per-group deviates are computed
        #[arg(long, value_enum, default_value = "group_sum")]
        method: CliMethod,
    },

    /// Run outlier detection from a YAML configuration file
    Run {
        /// Path to run configuration YAML
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate an example run configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "outliers.yaml")]
        output: PathBuf,
    },

    /// Write FASTA files with the member sequences of reported orthogroups
    Fasta {
        /// JSON report from `outliers`
        #[arg(short, long)]
        json: PathBuf,

        /// FASTA files or directories holding the proteomes
        #[arg(short, long, num_args = 1.., required = true)]
        fasta: Vec<PathBuf>,

        /// Output file prefix
        #[arg(short, long, default_value = "outlier")]
        prefix: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Maximum orthogroups taken from each list (default: all)
        #[arg(short, long)]
        ntop: Option<usize>,
    },

    /// Submit orthogroup sequences to InterProScan
    Annotate {
        /// JSON report from `outliers`; its expanded and contracted groups are submitted
        #[arg(short, long, conflicts_with_all = ["orthogroup", "list"])]
        report: Option<PathBuf>,

        /// OrthoFinder Orthogroups.tsv (use with --list)
        #[arg(short = 'g', long, requires = "list")]
        orthogroup: Option<PathBuf>,

        /// File with one orthogroup identifier per line (use with --orthogroup)
        #[arg(short, long, requires = "orthogroup")]
        list: Option<PathBuf>,

        /// FASTA files or directories holding the proteomes
        #[arg(short, long, num_args = 1.., required = true)]
        fasta: Vec<PathBuf>,

        /// Output directory for per-sequence results
        #[arg(short, long, default_value = "annotation")]
        out: PathBuf,

        /// Contact email required by the service
        #[arg(short, long)]
        email: String,

        /// Do not resubmit sequences that already have a result file
        #[arg(long)]
        skip_existing: bool,

        /// Maximum orthogroups taken from each report list (default: all)
        #[arg(short, long)]
        ntop: Option<usize>,

        /// Service endpoint
        #[arg(long, default_value = INTERPRO_URL)]
        base_url: String,

        /// Seconds between job status checks
        #[arg(long, default_value = "15")]
        poll: u64,
    },

    /// Summarize cached annotation results by orthogroup
    Summarize {
        /// Glob pattern selecting result files
        #[arg(default_value = "annotation/*.json")]
        input: String,

        /// Output text file
        #[arg(default_value = "og.analysis.txt")]
        output: PathBuf,
    },

    /// Map orthogroups of a new clustering run onto an old one
    Map {
        /// Orthogroups.tsv of the old run
        #[arg(long)]
        old: PathBuf,

        /// Orthogroups.tsv of the new run
        #[arg(long)]
        new: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "og.map.out")]
        output: PathBuf,

        /// Warn when the best old orthogroup holds less than this share of members
        #[arg(long, default_value_t = DEFAULT_WARN_THRESHOLD)]
        warn: f64,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Outliers {
            orthogroup,
            ntop,
            fraction,
            target,
            json,
            tsv,
            format,
            method,
        } => cmd_outliers(&orthogroup, ntop, fraction, &target, &json, &tsv, format, method),

        Commands::Run { config } => cmd_run(&config),

        Commands::Example { output } => cmd_example(&output),

        Commands::Fasta {
            json,
            fasta,
            prefix,
            out,
            ntop,
        } => cmd_fasta(&json, &fasta, &prefix, &out, ntop),

        Commands::Annotate {
            report,
            orthogroup,
            list,
            fasta,
            out,
            email,
            skip_existing,
            ntop,
            base_url,
            poll,
        } => cmd_annotate(
            report, orthogroup, list, &fasta, &out, &email, skip_existing, ntop, &base_url, poll,
        ),

        Commands::Summarize { input, output } => cmd_summarize(&input, &output),

        Commands::Map {
            old,
            new,
            output,
            warn,
        } => cmd_map(&old, &new, &output, warn),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Detect outliers from command-line parameters
#[allow(clippy::too_many_arguments)]
fn cmd_outliers(
    orthogroup: &PathBuf,
    ntop: usize,
    fraction: f64,
    target: &str,
    json: &PathBuf,
    tsv: &PathBuf,
    format: CliFormat,
    method: CliMethod,
) -> Result<()> {
    log::info!("Trim fraction: {}", fraction);
    log::info!("Top groups: {}", ntop);
    log::info!("Targets: {}", target);

    let table = OrthogroupTable::from_tsv(orthogroup, format.into())?;
    log::info!(
        "Loaded {} orthogroups x {} organisms from {}",
        table.n_orthogroups(),
        table.n_organisms(),
        orthogroup.display()
    );

    let config = OutlierConfig::new(ntop, fraction, parse_target_list(target)).with_method(method.into());
    let result = detect_outliers(&table, &config)?;
    config::write_outputs(&result, json, tsv)?;
    print_result(&result);
    Ok(())
}

/// Detect outliers from a YAML configuration
fn cmd_run(config_path: &PathBuf) -> Result<()> {
    log::info!("Loading run configuration from {}", config_path.display());
    let config = RunConfig::from_file(config_path)?;
    let result = config::run(&config)?;
    print_result(&result);
    Ok(())
}

fn print_result(result: &OutlierResult) {
    let report = result.report();
    print!("{}", report);
    log::info!(
        "Done! {} orthogroups ranked, {} expanded / {} contracted reported",
        result.len(),
        report.expanded.len(),
        report.contracted.len()
    );
}

/// Write an example configuration
fn cmd_example(output: &PathBuf) -> Result<()> {
    let yaml = RunConfig::example().to_yaml()?;
    std::fs::write(output, yaml)?;
    log::info!("Example configuration written to {}", output.display());
    Ok(())
}

/// Write outlier FASTA files
fn cmd_fasta(
    json: &PathBuf,
    fasta: &[PathBuf],
    prefix: &str,
    out: &PathBuf,
    ntop: Option<usize>,
) -> Result<()> {
    let report = OutlierReport::from_json(json)?;
    log::info!(
        "{} expanded and {} contracted orthogroups in {}",
        report.expanded.len(),
        report.contracted.len(),
        json.display()
    );
    let index = SequenceIndex::from_paths(fasta)?;
    log::info!("{} sequences indexed", index.len());

    let summary = write_outlier_fasta(&report, &index, out, prefix, ntop)?;
    println!(
        "{} sequences written to {} files ({} missing)",
        summary.n_sequences,
        summary.files.len(),
        summary.missing.len()
    );
    Ok(())
}

/// Submit sequences for annotation
#[allow(clippy::too_many_arguments)]
fn cmd_annotate(
    report: Option<PathBuf>,
    orthogroup: Option<PathBuf>,
    list: Option<PathBuf>,
    fasta: &[PathBuf],
    out: &PathBuf,
    email: &str,
    skip_existing: bool,
    ntop: Option<usize>,
    base_url: &str,
    poll: u64,
) -> Result<()> {
    let groups = match (report, orthogroup, list) {
        (Some(path), _, _) => {
            let mut report = OutlierReport::from_json(&path)?;
            if let Some(n) = ntop {
                report.expanded.truncate(n);
                report.contracted.truncate(n);
            }
            members_from_report(&report)
        }
        (None, Some(table_path), Some(list_path)) => {
            let ids = read_orthogroup_list(&list_path)?;
            log::info!("{} orthogroups read from {}", ids.len(), list_path.display());
            let table = OrthogroupTable::from_tsv(&table_path, TableFormat::Members)?;
            members_from_table(&table, &ids)?
        }
        _ => {
            return Err(OrthoError::InvalidArgument(
                "give either --report or both --orthogroup and --list".to_string(),
            ))
        }
    };

    let index = SequenceIndex::from_paths(fasta)?;
    log::info!("{} sequences indexed", index.len());

    let client = InterProClient::new(email)?
        .with_base_url(base_url)
        .with_polling(Duration::from_secs(poll), Duration::from_secs(3600));
    let options = SubmitOptions { skip_existing };

    let summary = submit_all(&client, &groups, &index, out, &options)?;
    print!("{}", summary);
    Ok(())
}

/// Summarize cached annotation results
fn cmd_summarize(input: &str, output: &PathBuf) -> Result<()> {
    log::info!("OG input: {}", input);
    let summaries = summarize_pattern(input)?;
    write_summaries(&summaries, output)?;

    let n_skipped: usize = summaries.iter().map(|s| s.skipped.len()).sum();
    log::info!(
        "{} orthogroups summarized to {} ({} files skipped)",
        summaries.len(),
        output.display(),
        n_skipped
    );
    Ok(())
}

/// Map orthogroups between runs
fn cmd_map(old: &PathBuf, new: &PathBuf, output: &PathBuf, warn: f64) -> Result<()> {
    let old_table = OrthogroupTable::from_tsv(old, TableFormat::Members)?;
    let new_table = OrthogroupTable::from_tsv(new, TableFormat::Members)?;
    let mappings = map_orthogroups(&old_table, &new_table)?;
    write_mappings(&mappings, output)?;

    let warnings = mapping_warnings(&mappings, warn);
    println!(
        "{} conversion warnings, best match below {:.1}%",
        warnings.len(),
        warn * 100.0
    );
    for mapping in warnings {
        println!("{}", format_mapping(mapping));
    }
    Ok(())
}
