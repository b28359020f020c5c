use anyhow::{Context, Result};
use std::collections::BTreeSet;

/// A single parsed VCF data line.
///
/// The raw line is retained: record identity (compound-het deduplication) and
/// report output are both defined over the original text, not over a subset
/// of parsed fields.
#[derive(Debug, Clone)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    pub alternates: Vec<String>,
    /// INFO entries in file order. Keys may repeat.
    pub info: Vec<(String, String)>,
    /// Resolved allele calls per sample, aligned to the header sample order.
    /// "0" is resolved to the reference base, "1".. to alternate bases, and
    /// "." stays as the missing-allele marker.
    pub genotypes: Vec<Vec<String>>,
    pub raw: String,
}

/// Fixed sample ordering resolved once from the VCF header, with the case and
/// control samples located by index.
#[derive(Debug, Clone)]
pub struct SampleLayout {
    pub names: Vec<String>,
    pub case_index: usize,
    pub control_indices: Vec<usize>,
    /// Case + control indices in ascending order; the report keeps exactly
    /// these genotype columns.
    pub retained_indices: Vec<usize>,
}

impl SampleLayout {
    /// Resolve the case and control sample IDs against the header sample
    /// names. Unknown IDs are a configuration error: the run fails before any
    /// record is processed.
    pub fn resolve(names: Vec<String>, case_id: &str, control_ids: &[String]) -> Result<Self> {
        let case_index = resolve_sample_index(&names, case_id)
            .with_context(|| format!("case sample id not found: {}", case_id))?;
        let mut control_indices = Vec::with_capacity(control_ids.len());
        for control in control_ids {
            let idx = resolve_sample_index(&names, control)
                .with_context(|| format!("control sample id not found: {}", control))?;
            control_indices.push(idx);
        }

        let mut retained_indices = control_indices.clone();
        retained_indices.push(case_index);
        retained_indices.sort_unstable();
        retained_indices.dedup();

        Ok(SampleLayout {
            names,
            case_index,
            control_indices,
            retained_indices,
        })
    }
}

fn resolve_sample_index(names: &[String], name: &str) -> Result<usize> {
    names.iter().position(|s| s == name).with_context(|| {
        format!(
            "Sample '{}' not found in VCF header. Available samples: {:?}",
            name, names
        )
    })
}

/// Thresholds and sample selection for one filtering run.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Inclusive lower bound: variants scoring below this are dropped.
    pub capice_threshold: f64,
    /// Inclusive upper bound: variants more frequent than this are dropped.
    pub gnomad_threshold: f64,
    pub case_sample_id: String,
    pub control_sample_ids: Vec<String>,
}

/// Why a variant left the run without being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    LowCapiceScore,
    CommonInGnomad,
    CaseGenotypeNotInformative,
    ControlHomozygousAlt,
    /// Flagged as a compound-het candidate but no second hit in any gene.
    NoSecondHit,
}

/// Report category for a retained variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportCategory {
    HomozygousAlt,
    DeNovo,
    CompHet,
    NonAutosomal,
}

impl ReportCategory {
    /// Declared iteration order; the report layout depends on it.
    pub const ALL: [ReportCategory; 4] = [
        ReportCategory::HomozygousAlt,
        ReportCategory::DeNovo,
        ReportCategory::CompHet,
        ReportCategory::NonAutosomal,
    ];

    /// Fixed-width labels so previews line up in the report header.
    pub fn label(self) -> &'static str {
        match self {
            ReportCategory::HomozygousAlt => "Potential homozygous                    : ",
            ReportCategory::DeNovo => "Potential de novo/uncontrolled hetzygote: ",
            ReportCategory::CompHet => "Potential compound heterozygote         : ",
            ReportCategory::NonAutosomal => "Potential non-autosomal                 : ",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ReportCategory::HomozygousAlt => 0,
            ReportCategory::DeNovo => 1,
            ReportCategory::CompHet => 2,
            ReportCategory::NonAutosomal => 3,
        }
    }
}

/// The classifier's verdict for one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Dropped(DropReason),
    Reported(ReportCategory),
    /// Candidate heterozygote filed under every annotated gene, resolved
    /// after the full stream has been consumed.
    Deferred(BTreeSet<String>),
}

/// Run-scoped tallies. Exactly one drop counter is incremented per terminal
/// drop; the missing-annotation tallies are independent of the terminal
/// decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total: u64,
    pub dropped_low_capice: u64,
    pub dropped_common_gnomad: u64,
    pub dropped_case_not_informative: u64,
    pub dropped_control_hom_alt: u64,
    pub dropped_no_second_hit: u64,
    pub missing_capice: u64,
    pub missing_gnomad: u64,
}

impl RunCounters {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::LowCapiceScore => self.dropped_low_capice += 1,
            DropReason::CommonInGnomad => self.dropped_common_gnomad += 1,
            DropReason::CaseGenotypeNotInformative => self.dropped_case_not_informative += 1,
            DropReason::ControlHomozygousAlt => self.dropped_control_hom_alt += 1,
            DropReason::NoSecondHit => self.dropped_no_second_hit += 1,
        }
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped_low_capice
            + self.dropped_common_gnomad
            + self.dropped_case_not_informative
            + self.dropped_control_hom_alt
            + self.dropped_no_second_hit
    }
}

/// Reported record lines grouped by category.
#[derive(Debug, Clone, Default)]
pub struct CategorizedRecords {
    by_category: [Vec<String>; 4],
}

impl CategorizedRecords {
    pub fn push(&mut self, category: ReportCategory, line: String) {
        self.by_category[category.index()].push(line);
    }

    pub fn get(&self, category: ReportCategory) -> &[String] {
        &self.by_category[category.index()]
    }

    pub fn count(&self, category: ReportCategory) -> u64 {
        self.by_category[category.index()].len() as u64
    }

    pub fn total(&self) -> u64 {
        self.by_category.iter().map(|v| v.len() as u64).sum()
    }
}

/// Final outcome of a filtering run, after compound-het resolution.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counters: RunCounters,
    /// Reported record counts aligned to `ReportCategory::ALL`.
    pub reported: [u64; 4],
}

impl RunSummary {
    pub fn total_reported(&self) -> u64 {
        self.reported.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_resolves_indices() {
        let names = vec!["S1".to_string(), "S2".to_string(), "S3".to_string()];
        let layout = SampleLayout::resolve(names, "S2", &["S3".to_string(), "S1".to_string()])
            .expect("all samples present");
        assert_eq!(layout.case_index, 1);
        assert_eq!(layout.control_indices, vec![2, 0]);
        assert_eq!(layout.retained_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_layout_unknown_case_fails() {
        let names = vec!["S1".to_string()];
        assert!(SampleLayout::resolve(names, "S9", &[]).is_err());
    }

    #[test]
    fn test_layout_unknown_control_fails() {
        let names = vec!["S1".to_string(), "S2".to_string()];
        assert!(SampleLayout::resolve(names, "S1", &["S9".to_string()]).is_err());
    }

    #[test]
    fn test_counters_drop_routing() {
        let mut c = RunCounters::default();
        c.record_drop(DropReason::LowCapiceScore);
        c.record_drop(DropReason::CommonInGnomad);
        c.record_drop(DropReason::CommonInGnomad);
        c.record_drop(DropReason::NoSecondHit);
        assert_eq!(c.dropped_low_capice, 1);
        assert_eq!(c.dropped_common_gnomad, 2);
        assert_eq!(c.dropped_no_second_hit, 1);
        assert_eq!(c.total_dropped(), 4);
    }

    #[test]
    fn test_categorized_records() {
        let mut r = CategorizedRecords::default();
        r.push(ReportCategory::CompHet, "a".to_string());
        r.push(ReportCategory::CompHet, "b".to_string());
        r.push(ReportCategory::DeNovo, "c".to_string());
        assert_eq!(r.get(ReportCategory::CompHet), ["a", "b"]);
        assert_eq!(r.count(ReportCategory::DeNovo), 1);
        assert_eq!(r.total(), 3);
    }
}
