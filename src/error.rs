use thiserror::Error;

/// Data-consistency failures.
///
/// The input stream broke its documented contract (pre-sorted, diploid,
/// fixed annotation layout). There is no recovery path: the run aborts and
/// the offending line or record is carried along for diagnosis.
#[derive(Debug, Error)]
pub enum DataError {
    /// The classifier's branching is exhaustive for diploid calls; reaching
    /// this means the stream violated an assumption we could not detect earlier.
    #[error("bad state: all genotype possibilities should be covered by now. Offending variant: {record}")]
    InconsistentGenotypeState { record: String },

    #[error("expected a diploid call (2 alleles) but sample {sample} has {found} in: {record}")]
    NonDiploidGenotype {
        sample: usize,
        found: usize,
        record: String,
    },

    #[error("unparsable number in {key} annotation: '{value}'")]
    MalformedAnnotation { key: &'static str, value: String },

    #[error("CSQ transcript record has {found} fields, need at least {needed}: '{value}'")]
    TruncatedCsqRecord {
        needed: usize,
        found: usize,
        value: String,
    },

    #[error("malformed VCF record: {msg}: {line}")]
    MalformedRecord { msg: String, line: String },

    #[error("{msg} at line: {line}")]
    MalformedScoreRow { msg: String, line: String },
}

impl DataError {
    pub fn score_row(msg: impl Into<String>, line: &str) -> Self {
        DataError::MalformedScoreRow {
            msg: msg.into(),
            line: line.to_string(),
        }
    }

    pub fn record(msg: impl Into<String>, line: &str) -> Self {
        DataError::MalformedRecord {
            msg: msg.into(),
            line: line.to_string(),
        }
    }
}
