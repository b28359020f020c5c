//! Second-pass resolution of deferred heterozygotes.
//!
//! Runs strictly after the forward pass has consumed the whole stream: a gene
//! with two or more deferred records promotes all of them to compound
//! heterozygote reports; a singleton gene's record becomes a drop. Both sets
//! are deduplicated by full record identity, since one variant can sit in
//! several gene buckets.

use crate::report;
use crate::types::{CategorizedRecords, DropReason, ReportCategory, RunCounters};
use std::collections::{BTreeMap, HashSet};

pub fn resolve(
    gene_buckets: BTreeMap<String, Vec<String>>,
    retained_indices: &[usize],
    counters: &mut RunCounters,
    reported: &mut CategorizedRecords,
) {
    let mut promoted: HashSet<&str> = HashSet::new();
    let mut dropped: HashSet<&str> = HashSet::new();

    for records in gene_buckets.values() {
        if records.len() < 2 {
            continue;
        }
        for record in records {
            if promoted.insert(record) {
                reported.push(
                    ReportCategory::CompHet,
                    report::retain_sample_columns(record, retained_indices),
                );
            }
        }
    }

    // Leftovers: singleton genes whose record was not promoted elsewhere.
    // Each record is counted dropped at most once.
    for records in gene_buckets.values() {
        if records.len() != 1 {
            continue;
        }
        let record = records[0].as_str();
        if !promoted.contains(record) && dropped.insert(record) {
            counters.record_drop(DropReason::NoSecondHit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buckets(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(gene, records)| {
                (
                    gene.to_string(),
                    records.iter().map(|r| r.to_string()).collect(),
                )
            })
            .collect()
    }

    fn run(buckets: BTreeMap<String, Vec<String>>) -> (RunCounters, CategorizedRecords) {
        let mut counters = RunCounters::default();
        let mut reported = CategorizedRecords::default();
        resolve(buckets, &[0], &mut counters, &mut reported);
        (counters, reported)
    }

    const REC_A: &str = "1\t100\t.\tA\tT\t.\t.\t.\tGT\t0/1";
    const REC_B: &str = "1\t200\t.\tG\tC\t.\t.\t.\tGT\t0/1";
    const REC_C: &str = "1\t300\t.\tT\tA\t.\t.\t.\tGT\t0/1";

    #[test]
    fn test_pair_in_one_gene_promotes_both() {
        let (counters, reported) = run(buckets(&[("G1", &[REC_A, REC_B])]));
        assert_eq!(reported.count(ReportCategory::CompHet), 2);
        assert_eq!(counters.dropped_no_second_hit, 0);
    }

    #[test]
    fn test_singleton_gene_drops() {
        let (counters, reported) = run(buckets(&[("G1", &[REC_A])]));
        assert_eq!(reported.count(ReportCategory::CompHet), 0);
        assert_eq!(counters.dropped_no_second_hit, 1);
    }

    #[test]
    fn test_multi_gene_record_promoted_once() {
        // REC_A sits in G1 (promoted) and in singleton G2: exactly one
        // report line, no drop.
        let (counters, reported) =
            run(buckets(&[("G1", &[REC_A, REC_B]), ("G2", &[REC_A])]));
        assert_eq!(reported.count(ReportCategory::CompHet), 2);
        assert_eq!(counters.dropped_no_second_hit, 0);
    }

    #[test]
    fn test_record_in_two_promoting_genes_not_duplicated() {
        let (_, reported) =
            run(buckets(&[("G1", &[REC_A, REC_B]), ("G2", &[REC_A, REC_C])]));
        assert_eq!(reported.count(ReportCategory::CompHet), 3);
    }

    #[test]
    fn test_singleton_in_two_genes_dropped_once() {
        let (counters, _) = run(buckets(&[("G1", &[REC_A]), ("G2", &[REC_A])]));
        assert_eq!(counters.dropped_no_second_hit, 1);
    }

    #[test]
    fn test_exact_duplicate_lines_in_one_gene() {
        // Two identical lines count as one record identity: promoted once.
        let (_, reported) = run(buckets(&[("G1", &[REC_A, REC_A])]));
        assert_eq!(reported.count(ReportCategory::CompHet), 1);
    }
}
