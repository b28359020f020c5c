//! Per-sample genotype analysis. Stateless: the classifier owns all
//! cross-record bookkeeping.

/// The VCF missing-allele marker after genotype resolution.
pub const MISSING_ALLELE: &str = ".";

/// Count the alt alleles in one diploid call: alleles that are neither the
/// missing marker nor equal to the reference allele.
///
/// Returns `None` when the call is not diploid (anything other than exactly
/// two allele slots); the caller treats that as a data-consistency error.
pub fn alt_allele_count(call: &[String], reference: &str) -> Option<u8> {
    if call.len() != 2 {
        return None;
    }
    let count = call
        .iter()
        .filter(|a| a.as_str() != MISSING_ALLELE && a.as_str() != reference)
        .count();
    Some(count as u8)
}
