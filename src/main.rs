use anyhow::Result;
use capice_quick_filter::{pipeline, score_table, types::FilterConfig, vcf_reader};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "capice-quick-filter")]
#[command(version)]
#[command(about = "Quick filter for CAPICE-annotated VCF files", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter an annotated VCF down to candidate variants for one case sample
    Filter {
        /// Input VCF file (gzipped, CAPICE and VEP CSQ annotated)
        #[arg(short, long)]
        input: String,

        /// Output report file path (must not exist)
        #[arg(short, long)]
        output: String,

        /// Minimum CAPICE score to retain a variant
        #[arg(long, default_value = "0.2")]
        capice: f64,

        /// Maximum GnomAD allele frequency to retain a variant
        #[arg(long, default_value = "0.05")]
        gnomad: f64,

        /// Sample ID of the case (patient)
        #[arg(long)]
        case: String,

        /// Comma-separated sample IDs of the controls (parents)
        #[arg(long)]
        controls: Option<String>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Validate the structure of a precomputed per-position score table
    Validate {
        /// Input score table (gzipped, tab-separated)
        #[arg(short, long)]
        input: String,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },
}

macro_rules! progress {
    ($quiet:expr) => {
        if !$quiet {
            eprintln!();
        }
    };
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

fn make_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("  {spinner} [{elapsed_precise}] {pos} {msg}")
            .unwrap(),
    );
    pb
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Filter {
            input,
            output,
            capice,
            gnomad,
            case,
            controls,
            quiet,
        } => run_filter(
            &input,
            &output,
            capice,
            gnomad,
            &case,
            controls.as_deref(),
            quiet,
        ),
        Command::Validate { input, quiet } => run_validate(&input, quiet),
    }
}

fn run_filter(
    input: &str,
    output: &str,
    capice: f64,
    gnomad: f64,
    case: &str,
    controls: Option<&str>,
    quiet: bool,
) -> Result<()> {
    if !input.ends_with(".vcf.gz") {
        anyhow::bail!("Input file must be a gzipped VCF (.vcf.gz): {}", input);
    }
    if !Path::new(input).exists() {
        anyhow::bail!("Input file not found: {}", input);
    }
    if Path::new(output).exists() {
        anyhow::bail!("Output file already exists: {}", output);
    }
    if !(0.0..=1.0).contains(&capice) {
        anyhow::bail!("Invalid --capice '{}'. Must be between 0 and 1", capice);
    }
    if !(0.0..=1.0).contains(&gnomad) {
        anyhow::bail!("Invalid --gnomad '{}'. Must be between 0 and 1", gnomad);
    }
    if case.is_empty() {
        anyhow::bail!("--case must not be empty");
    }
    let control_ids: Vec<String> = match controls {
        Some(list) => {
            let ids: Vec<String> = list.split(',').map(|s| s.to_string()).collect();
            if ids.iter().any(|id| id.is_empty()) {
                anyhow::bail!("Invalid --controls '{}'. Sample IDs must not be empty", list);
            }
            ids
        }
        None => Vec::new(),
    };

    let config = FilterConfig {
        capice_threshold: capice,
        gnomad_threshold: gnomad,
        case_sample_id: case.to_string(),
        control_sample_ids: control_ids,
    };

    progress!(quiet, "CAPICE Quick Filter");
    progress!(quiet, "=========================================");
    progress!(quiet, "Input VCF: {}", input);
    progress!(quiet, "Output report: {}", output);
    progress!(quiet, "CAPICE threshold: {}", config.capice_threshold);
    progress!(quiet, "GnomAD threshold: {}", config.gnomad_threshold);
    progress!(quiet, "Case sample: {}", config.case_sample_id);
    progress!(
        quiet,
        "Control samples: {}",
        config.control_sample_ids.join(", ")
    );
    progress!(quiet);

    let start = Instant::now();

    let reader = vcf_reader::open_gz(Path::new(input))?;
    let writer = BufWriter::new(std::fs::File::create(output)?);

    let pb = make_spinner(quiet);
    pb.set_message("variants processed");
    pipeline::run_quick_filter(&config, reader, writer, input, output, quiet, Some(&pb))?;
    pb.finish_and_clear();

    progress!(quiet);
    progress!(
        quiet,
        "Done! Filtering completed in {}ms, report written to: {}",
        start.elapsed().as_millis(),
        output
    );

    Ok(())
}

fn run_validate(input: &str, quiet: bool) -> Result<()> {
    if !input.ends_with(".gz") {
        anyhow::bail!("Input file must be gzipped (.gz): {}", input);
    }
    if !Path::new(input).exists() {
        anyhow::bail!("Input file not found: {}", input);
    }

    progress!(quiet, "CAPICE Score Table Validator");
    progress!(quiet, "=========================================");
    progress!(quiet, "Input table: {}", input);
    progress!(quiet);

    let start = Instant::now();

    let reader = vcf_reader::open_gz(Path::new(input))?;
    let summary = score_table::validate(reader, quiet)?;

    println!("Done checking {} lines (excl. header)", summary.lines);
    for range in &summary.ranges {
        println!("{} -> {} to {}", range.chrom, range.min_pos, range.max_pos);
    }

    progress!(quiet);
    progress!(
        quiet,
        "Done! Validation completed in {}ms",
        start.elapsed().as_millis()
    );

    Ok(())
}
