//! Extraction of CAPICE scores, GnomAD allele frequencies and gene symbols
//! from the INFO annotation pairs of a variant.
//!
//! The CSQ layout (one comma-separated entry per alt allele/transcript, each
//! a pipe-delimited record with fixed field offsets) is an upstream contract;
//! a record too short for the expected offsets is a data error, not a miss.

use crate::error::DataError;
use std::collections::BTreeSet;

pub const CSQ_KEY: &str = "CSQ";
pub const CAPICE_KEY: &str = "CAPICE";

/// Gene symbol offset within a pipe-delimited CSQ transcript record
/// (VEP default field layout).
pub const CSQ_GENE_FIELD: usize = 3;
/// GnomAD allele frequency offset within a CSQ transcript record.
pub const CSQ_GNOMAD_AF_FIELD: usize = 26;

/// Collect the gene symbols annotated on this variant, across all CSQ
/// entries and transcripts. Empty symbols are skipped; an absent CSQ key
/// yields the empty set.
pub fn genes(info: &[(String, String)]) -> Result<BTreeSet<String>, DataError> {
    let mut genes = BTreeSet::new();
    for (key, value) in info {
        if key != CSQ_KEY {
            continue;
        }
        for transcript in value.split(',') {
            let gene = csq_field(transcript, CSQ_GENE_FIELD)?;
            if !gene.is_empty() {
                genes.insert(gene.to_string());
            }
        }
    }
    Ok(genes)
}

/// Highest CAPICE score across all entries and comma-separated values, or
/// `None` if the key never occurs.
///
/// No per-allele alignment: if any annotation scores high enough, the
/// variant is retained for further inspection.
pub fn highest_capice(info: &[(String, String)]) -> Result<Option<f64>, DataError> {
    let mut highest: Option<f64> = None;
    for (key, value) in info {
        if key != CAPICE_KEY {
            continue;
        }
        for raw in value.split(',') {
            let score: f64 = raw.parse().map_err(|_| DataError::MalformedAnnotation {
                key: CAPICE_KEY,
                value: raw.to_string(),
            })?;
            if highest.map_or(true, |h| score > h) {
                highest = Some(score);
            }
        }
    }
    Ok(highest)
}

/// Lowest GnomAD allele frequency across all CSQ transcripts, or `None` if
/// the sub-field is never populated for this variant.
///
/// As with the score, no per-allele alignment: if any annotation is rare
/// enough, the variant is retained for further inspection.
pub fn lowest_gnomad(info: &[(String, String)]) -> Result<Option<f64>, DataError> {
    let mut lowest: Option<f64> = None;
    for (key, value) in info {
        if key != CSQ_KEY {
            continue;
        }
        for transcript in value.split(',') {
            let raw = csq_field(transcript, CSQ_GNOMAD_AF_FIELD)?;
            if raw.is_empty() {
                continue;
            }
            let af: f64 = raw.parse().map_err(|_| DataError::MalformedAnnotation {
                key: CSQ_KEY,
                value: raw.to_string(),
            })?;
            if lowest.map_or(true, |l| af < l) {
                lowest = Some(af);
            }
        }
    }
    Ok(lowest)
}

fn csq_field(transcript: &str, index: usize) -> Result<&str, DataError> {
    transcript
        .split('|')
        .nth(index)
        .ok_or_else(|| DataError::TruncatedCsqRecord {
            needed: index + 1,
            found: transcript.split('|').count(),
            value: transcript.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn info(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// A CSQ transcript record with the given gene symbol and gnomAD AF at
    /// their expected offsets, all other fields empty.
    fn csq(gene: &str, af: &str) -> String {
        let mut fields = vec![""; CSQ_GNOMAD_AF_FIELD + 1];
        fields[CSQ_GENE_FIELD] = gene;
        fields[CSQ_GNOMAD_AF_FIELD] = af;
        fields.join("|")
    }

    #[test]
    fn test_genes_across_transcripts() {
        let value = format!("{},{},{}", csq("BRCA1", ""), csq("BRCA1", ""), csq("TP53", ""));
        let g = genes(&info(&[("CSQ", &value)])).unwrap();
        assert_eq!(
            g.into_iter().collect::<Vec<_>>(),
            vec!["BRCA1".to_string(), "TP53".to_string()]
        );
    }

    #[test]
    fn test_genes_skips_empty_symbols() {
        let value = format!("{},{}", csq("", ""), csq("PKD1", ""));
        let g = genes(&info(&[("CSQ", &value)])).unwrap();
        assert_eq!(g.len(), 1);
        assert!(g.contains("PKD1"));
    }

    #[test]
    fn test_genes_absent_key_is_empty() {
        let g = genes(&info(&[("DP", "30")])).unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn test_genes_truncated_record_fails() {
        let result = genes(&info(&[("CSQ", "a|b")]));
        assert!(matches!(result, Err(DataError::TruncatedCsqRecord { .. })));
    }

    #[test]
    fn test_highest_capice_across_entries_and_values() {
        let pairs = info(&[("CAPICE", "0.1,0.8"), ("DP", "10"), ("CAPICE", "0.3")]);
        let score = highest_capice(&pairs).unwrap().unwrap();
        assert_relative_eq!(score, 0.8);
    }

    #[test]
    fn test_highest_capice_absent() {
        assert_eq!(highest_capice(&info(&[("DP", "10")])).unwrap(), None);
    }

    #[test]
    fn test_highest_capice_malformed_is_fatal() {
        let result = highest_capice(&info(&[("CAPICE", "0.1,oops")]));
        assert!(matches!(result, Err(DataError::MalformedAnnotation { .. })));
    }

    #[test]
    fn test_lowest_gnomad_across_transcripts() {
        let value = format!("{},{},{}", csq("G1", "0.2"), csq("G1", ""), csq("G2", "0.004"));
        let af = lowest_gnomad(&info(&[("CSQ", &value)])).unwrap().unwrap();
        assert_relative_eq!(af, 0.004);
    }

    #[test]
    fn test_lowest_gnomad_never_populated() {
        let value = csq("G1", "");
        assert_eq!(lowest_gnomad(&info(&[("CSQ", &value)])).unwrap(), None);
    }

    #[test]
    fn test_lowest_gnomad_malformed_is_fatal() {
        let value = csq("G1", "abc");
        let result = lowest_gnomad(&info(&[("CSQ", &value)]));
        assert!(matches!(result, Err(DataError::MalformedAnnotation { .. })));
    }
}
