//! The per-variant decision state machine.
//!
//! One forward pass over the record stream: each variant is dropped,
//! reported, or deferred for cross-gene resolution. All run-scoped state
//! (counters, reported records, gene buckets) lives on the `Classifier` and
//! is finalized exactly once.

use crate::annotations;
use crate::comp_het;
use crate::error::DataError;
use crate::genotypes;
use crate::report;
use crate::types::{
    CategorizedRecords, Decision, DropReason, FilterConfig, ReportCategory, RunCounters,
    SampleLayout, VcfRecord,
};
use std::collections::BTreeMap;

/// Counters and categorized records after compound-het resolution.
#[derive(Debug)]
pub struct FilterOutcome {
    pub counters: RunCounters,
    pub reported: CategorizedRecords,
}

pub struct Classifier {
    capice_threshold: f64,
    gnomad_threshold: f64,
    layout: SampleLayout,
    counters: RunCounters,
    reported: CategorizedRecords,
    /// Gene symbol -> raw record lines deferred under that gene. A variant
    /// annotated with multiple genes appears in every one of its buckets.
    gene_buckets: BTreeMap<String, Vec<String>>,
}

impl Classifier {
    pub fn new(config: &FilterConfig, layout: SampleLayout) -> Self {
        Classifier {
            capice_threshold: config.capice_threshold,
            gnomad_threshold: config.gnomad_threshold,
            layout,
            counters: RunCounters::default(),
            reported: CategorizedRecords::default(),
            gene_buckets: BTreeMap::new(),
        }
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Classify one variant, applying all side effects (counters, reported
    /// records, gene buckets). First matching rule wins.
    pub fn classify(&mut self, record: &VcfRecord) -> Result<Decision, DataError> {
        self.counters.total += 1;

        let capice = annotations::highest_capice(&record.info)?;
        let gnomad = annotations::lowest_gnomad(&record.info)?;

        // Absence never drops a variant, but is tallied regardless of the
        // terminal decision.
        if capice.is_none() {
            self.counters.missing_capice += 1;
        }
        if gnomad.is_none() {
            self.counters.missing_gnomad += 1;
        }

        // Inclusive thresholds: a score exactly at the bound is retained.
        if let Some(score) = capice {
            if score < self.capice_threshold {
                return Ok(self.drop(DropReason::LowCapiceScore));
            }
        }
        if let Some(af) = gnomad {
            if af > self.gnomad_threshold {
                return Ok(self.drop(DropReason::CommonInGnomad));
            }
        }

        let case_alt = self.alt_count(record, self.layout.case_index)?;
        if case_alt == 0 {
            return Ok(self.drop(DropReason::CaseGenotypeNotInformative));
        }

        // A single homozygous-alt control kills the variant outright,
        // whatever the case genotype looks like.
        let mut any_het_control = false;
        let mut hom_alt_control = false;
        for &idx in &self.layout.control_indices {
            match self.alt_count(record, idx)? {
                2 => {
                    hom_alt_control = true;
                    break;
                }
                1 => any_het_control = true,
                _ => {}
            }
        }
        if hom_alt_control {
            return Ok(self.drop(DropReason::ControlHomozygousAlt));
        }

        let autosomal = is_autosomal(&record.chrom);
        if case_alt == 2 {
            let category = if autosomal {
                ReportCategory::HomozygousAlt
            } else {
                ReportCategory::NonAutosomal
            };
            return Ok(self.report(category, record));
        }

        if case_alt == 1 && !any_het_control {
            let category = if autosomal {
                ReportCategory::DeNovo
            } else {
                ReportCategory::NonAutosomal
            };
            return Ok(self.report(category, record));
        }

        if case_alt == 1 {
            // Could be compound heterozygous, but only the rest of the gene's
            // variants can tell. Allosomal variants are always reported.
            if !autosomal {
                return Ok(self.report(ReportCategory::NonAutosomal, record));
            }
            let genes = annotations::genes(&record.info)?;
            if genes.is_empty() {
                // No gene to pair a second hit in, so the resolution pass
                // could never promote it. Settle it as a drop now.
                return Ok(self.drop(DropReason::NoSecondHit));
            }
            for gene in &genes {
                self.gene_buckets
                    .entry(gene.clone())
                    .or_default()
                    .push(record.raw.clone());
            }
            return Ok(Decision::Deferred(genes));
        }

        // Diploid calls leave case_alt in {0, 1, 2}, all handled above.
        Err(DataError::InconsistentGenotypeState {
            record: record.raw.clone(),
        })
    }

    /// Resolve the deferred heterozygotes and hand back the final state.
    pub fn finish(self) -> FilterOutcome {
        let Classifier {
            layout,
            mut counters,
            mut reported,
            gene_buckets,
            ..
        } = self;
        comp_het::resolve(
            gene_buckets,
            &layout.retained_indices,
            &mut counters,
            &mut reported,
        );
        FilterOutcome { counters, reported }
    }

    fn alt_count(&self, record: &VcfRecord, sample: usize) -> Result<u8, DataError> {
        let call = record.genotypes.get(sample).ok_or_else(|| {
            DataError::record(format!("no genotype for sample index {}", sample), &record.raw)
        })?;
        genotypes::alt_allele_count(call, &record.reference).ok_or_else(|| {
            DataError::NonDiploidGenotype {
                sample,
                found: call.len(),
                record: record.raw.clone(),
            }
        })
    }

    fn drop(&mut self, reason: DropReason) -> Decision {
        self.counters.record_drop(reason);
        Decision::Dropped(reason)
    }

    fn report(&mut self, category: ReportCategory, record: &VcfRecord) -> Decision {
        let line = report::retain_sample_columns(&record.raw, &self.layout.retained_indices);
        self.reported.push(category, line);
        Decision::Reported(category)
    }
}

/// Autosomal chromosomes are named as pure numbers, optionally with a
/// sub-allele/decimal suffix (e.g. "7" or "7.1"). Everything else (X, Y, MT,
/// contigs) is non-autosomal.
pub fn is_autosomal(chrom: &str) -> bool {
    let (whole, fraction) = match chrom.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (chrom, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}
