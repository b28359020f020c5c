//! Serialization of the final decisions into the report artifact: a `##`
//! metadata/summary block, truncated per-category previews, a VCF-style
//! column header and the reported record lines in declared category order.

use crate::types::{CategorizedRecords, FilterConfig, ReportCategory, RunCounters, SampleLayout};
use anyhow::Result;
use std::io::Write;

const PREVIEW_CHARS: usize = 50;

/// Reduce a raw VCF line to the header columns plus the genotype columns for
/// the retained sample indices, in ascending index order.
pub fn retain_sample_columns(line: &str, retained_indices: &[usize]) -> String {
    line.split('\t')
        .enumerate()
        .filter(|(i, _)| *i < 9 || retained_indices.contains(&(i - 9)))
        .map(|(_, field)| field)
        .collect::<Vec<_>>()
        .join("\t")
}

/// First ~50 characters of a record, tabs flattened to spaces, for the
/// side-by-side preview block.
fn preview(line: &str) -> String {
    let cut = line
        .char_indices()
        .nth(PREVIEW_CHARS)
        .map_or(line.len(), |(i, _)| i);
    line[..cut].replace('\t', " ")
}

/// Write the complete report. Layout is part of the output contract:
/// metadata block, previews, column header, then records in
/// `ReportCategory::ALL` order.
pub fn write_report<W: Write>(
    mut out: W,
    config: &FilterConfig,
    layout: &SampleLayout,
    input_label: &str,
    output_label: &str,
    counters: &RunCounters,
    reported: &CategorizedRecords,
) -> Result<()> {
    writeln!(
        out,
        "## Output of capice-quick-filter v{}",
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out, "## Settings:")?;
    writeln!(out, "## - Input file: {}", input_label)?;
    writeln!(out, "## - Output file: {}", output_label)?;
    writeln!(out, "## - CAPICE threshold: {}", config.capice_threshold)?;
    writeln!(out, "## - GnomAD threshold: {}", config.gnomad_threshold)?;
    writeln!(out, "## - Case sample ID: {}", config.case_sample_id)?;
    writeln!(
        out,
        "## - Control sample IDs: [{}]",
        config.control_sample_ids.join(", ")
    )?;
    writeln!(
        out,
        "## Total number of variants processed: {}",
        counters.total
    )?;
    writeln!(
        out,
        "## Total number of potential candidates found: {}",
        reported.total()
    )?;
    writeln!(out, "## Breakdown of potential candidates by type:")?;
    for category in ReportCategory::ALL {
        writeln!(
            out,
            "## - {}{}",
            category.label(),
            reported.count(category)
        )?;
    }
    writeln!(
        out,
        "## Total number of variants dropped: {}",
        counters.total_dropped()
    )?;
    writeln!(out, "## Breakdown of dropped variants by reason:")?;
    writeln!(
        out,
        "## - CAPICE score below threshold: {}",
        counters.dropped_low_capice
    )?;
    writeln!(
        out,
        "## - GnomAD allele frequency over threshold: {}",
        counters.dropped_common_gnomad
    )?;
    writeln!(
        out,
        "## - Case genotype null or reference: {}",
        counters.dropped_case_not_informative
    )?;
    writeln!(
        out,
        "## - Homozygous control was present: {}",
        counters.dropped_control_hom_alt
    )?;
    writeln!(
        out,
        "## - Flagged for compound but no second hit: {}",
        counters.dropped_no_second_hit
    )?;
    writeln!(out, "## Additional information:")?;
    writeln!(
        out,
        "## - Variants without GnomAD annotation: {}",
        counters.missing_gnomad
    )?;
    writeln!(
        out,
        "## - Variants without CAPICE annotation: {}",
        counters.missing_capice
    )?;
    writeln!(
        out,
        "## Potential candidates categorized by type (full info below, can be copy-pasted side by side):"
    )?;
    for category in ReportCategory::ALL {
        for record in reported.get(category) {
            writeln!(out, "## {}{}", category.label(), preview(record))?;
        }
    }

    let mut header = String::from("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT");
    for &index in &layout.retained_indices {
        header.push('\t');
        header.push_str(&layout.names[index]);
    }
    writeln!(out, "{}", header)?;

    for category in ReportCategory::ALL {
        for record in reported.get(category) {
            writeln!(out, "{}", record)?;
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleLayout;

    #[test]
    fn test_retain_sample_columns_subsets_genotypes() {
        let line = "1\t100\t.\tA\tT\t50\tPASS\tDP=30\tGT\t0/1\t0/0\t1/1";
        let kept = retain_sample_columns(line, &[0, 2]);
        assert_eq!(kept, "1\t100\t.\tA\tT\t50\tPASS\tDP=30\tGT\t0/1\t1/1");
    }

    #[test]
    fn test_retain_sample_columns_keeps_all_header_columns() {
        let line = "1\t100\t.\tA\tT\t50\tPASS\tDP=30\tGT\t0/1";
        assert_eq!(retain_sample_columns(line, &[0]), line);
    }

    #[test]
    fn test_preview_truncates_and_flattens_tabs() {
        let long = format!("1\t100\t.\tA\tT\t{}", "x".repeat(100));
        let p = preview(&long);
        assert_eq!(p.chars().count(), 50);
        assert!(!p.contains('\t'));
        assert!(p.starts_with("1 100 . A T"));
    }

    #[test]
    fn test_preview_short_line_unchanged_length() {
        assert_eq!(preview("1\t100"), "1 100");
    }

    #[test]
    fn test_report_layout() {
        let config = FilterConfig {
            capice_threshold: 0.2,
            gnomad_threshold: 0.05,
            case_sample_id: "S1".to_string(),
            control_sample_ids: vec!["S2".to_string()],
        };
        let layout = SampleLayout::resolve(
            vec!["S1".to_string(), "S2".to_string()],
            "S1",
            &["S2".to_string()],
        )
        .unwrap();

        let counters = RunCounters {
            total: 3,
            dropped_low_capice: 1,
            ..Default::default()
        };
        let mut reported = CategorizedRecords::default();
        reported.push(
            ReportCategory::DeNovo,
            "1\t100\t.\tA\tT\t.\tPASS\t.\tGT\t0/1\t0/0".to_string(),
        );
        reported.push(
            ReportCategory::CompHet,
            "1\t200\t.\tG\tC\t.\tPASS\t.\tGT\t0/1\t0/1".to_string(),
        );

        let mut buf = Vec::new();
        write_report(
            &mut buf,
            &config,
            &layout,
            "in.vcf.gz",
            "out.vcf",
            &counters,
            &reported,
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("## Total number of variants processed: 3"));
        assert!(text.contains("## Total number of potential candidates found: 2"));
        assert!(text.contains("## - CAPICE score below threshold: 1"));
        assert!(text.contains("## - Control sample IDs: [S2]"));
        assert!(text.contains("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2"));

        // Records come after the column header, DeNovo before CompHet.
        let header_at = text.find("#CHROM").unwrap();
        let denovo_at = text.rfind("1\t100").unwrap();
        let comphet_at = text.rfind("1\t200").unwrap();
        assert!(header_at < denovo_at);
        assert!(denovo_at < comphet_at);
    }
}
