//! Wiring of one filtering run: record source -> classifier -> compound-het
//! resolution -> report. Generic over the reader and writer so tests can
//! drive it from in-memory buffers.

use crate::classifier::Classifier;
use crate::report;
use crate::types::{FilterConfig, RunSummary, SampleLayout};
use crate::vcf_reader::VcfStream;
use anyhow::Result;
use indicatif::ProgressBar;
use std::io::{BufRead, Write};

macro_rules! progress {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

/// Run the quick filter over an annotated VCF stream and write the report.
///
/// The compound-het resolution pass only observes the gene buckets after the
/// forward pass has consumed the entire stream; `Classifier::finish` is that
/// barrier.
pub fn run_quick_filter<R: BufRead, W: Write>(
    config: &FilterConfig,
    reader: R,
    writer: W,
    input_label: &str,
    output_label: &str,
    quiet: bool,
    spinner: Option<&ProgressBar>,
) -> Result<RunSummary> {
    let mut stream = VcfStream::new(reader)?;

    let layout = SampleLayout::resolve(
        stream.sample_names().to_vec(),
        &config.case_sample_id,
        &config.control_sample_ids,
    )?;
    progress!(
        quiet,
        "Case sample (index {}): {}",
        layout.case_index,
        config.case_sample_id
    );
    for (idx, name) in layout
        .control_indices
        .iter()
        .zip(&config.control_sample_ids)
    {
        progress!(quiet, "Control sample (index {}): {}", idx, name);
    }

    let mut classifier = Classifier::new(config, layout.clone());
    for record in &mut stream {
        let record = record?;
        classifier.classify(&record)?;
        if let Some(pb) = spinner {
            pb.inc(1);
        }
        if classifier.counters().total % 100_000 == 0 {
            progress!(
                quiet,
                "Processed {} variants...",
                classifier.counters().total
            );
        }
    }

    let outcome = classifier.finish();

    report::write_report(
        writer,
        config,
        &layout,
        input_label,
        output_label,
        &outcome.counters,
        &outcome.reported,
    )?;

    let summary = RunSummary {
        reported: std::array::from_fn(|i| {
            outcome.reported.count(crate::types::ReportCategory::ALL[i])
        }),
        counters: outcome.counters,
    };

    progress!(quiet, "Total variants: {}", summary.counters.total);
    progress!(
        quiet,
        "Potential candidates: {} ({} dropped)",
        summary.total_reported(),
        summary.counters.total_dropped()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config() -> FilterConfig {
        FilterConfig {
            capice_threshold: 0.2,
            gnomad_threshold: 0.05,
            case_sample_id: "S1".to_string(),
            control_sample_ids: vec!["S2".to_string()],
        }
    }

    #[test]
    fn test_unknown_sample_fails_before_processing() {
        let vcf = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB\n";
        let mut out = Vec::new();
        let result = run_quick_filter(
            &config(),
            Cursor::new(vcf),
            &mut out,
            "in",
            "out",
            true,
            None,
        );
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_stream_writes_zeroed_report() {
        let vcf = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n";
        let mut out = Vec::new();
        let summary = run_quick_filter(
            &config(),
            Cursor::new(vcf),
            &mut out,
            "in",
            "out",
            true,
            None,
        )
        .unwrap();
        assert_eq!(summary.counters.total, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("## Total number of variants processed: 0"));
    }
}
