//! Sequential invariant checking of a precomputed per-position score table.
//!
//! The table is expected to be sorted by chromosome then position, with
//! exactly three rows per position (one reference base, three distinct
//! alternates) and positions incrementing by one within a chromosome. The
//! validator walks the rows once and aborts on the first violation, carrying
//! the offending line in the error.

use crate::error::DataError;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::BufRead;

const EXPECTED_FIELDS: usize = 5;
const ROWS_PER_POSITION: usize = 3;
const PROGRESS_EVERY: u64 = 1_000_000;

macro_rules! progress {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

/// Observed position range for one chromosome, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromRange {
    pub chrom: String,
    pub min_pos: i64,
    pub max_pos: i64,
}

/// Result of a successful validation run.
#[derive(Debug, Clone)]
pub struct TableSummary {
    /// Data rows checked, excluding any skipped leading lines.
    pub lines: u64,
    pub ranges: Vec<ChromRange>,
}

#[derive(Debug)]
struct ScoreRow {
    chrom: String,
    pos: i64,
    reference: char,
    alt: char,
}

/// Walk a sorted score table and enforce its structural contract. Any
/// leading rows before the first line starting with '1' are skipped.
pub fn validate<R: BufRead>(reader: R, quiet: bool) -> Result<TableSummary> {
    let mut lines_checked: u64 = 0;
    let mut started = false;

    // Chromosomes already seen and closed; reappearance means the input
    // ordering is broken.
    let mut stale_chroms: HashSet<String> = HashSet::new();
    let mut ranges: Vec<ChromRange> = Vec::new();
    let mut current: Option<ChromRange> = None;

    // Rolling window for the active position.
    let mut previous_pos: Option<i64> = None;
    let mut refs: HashSet<char> = HashSet::new();
    let mut alts: HashSet<char> = HashSet::new();
    let mut rows_for_pos: usize = 0;

    for line in reader.lines() {
        let line = line.context("Failed to read score table line")?;

        if !started {
            if line.starts_with('1') {
                started = true;
            } else {
                continue;
            }
        }

        let row = parse_row(&line)?;

        // Chromosome change: the previous chromosome is closed with its
        // last-seen position, and the whole position window resets.
        let changed = current.as_ref().is_some_and(|c| c.chrom != row.chrom);
        if changed {
            if stale_chroms.contains(&row.chrom) {
                return Err(DataError::score_row(
                    "Current chrom seen before, is your ordering correct?",
                    &line,
                )
                .into());
            }
            let mut finished = current.take().expect("change implies an active chromosome");
            if let Some(pos) = previous_pos {
                finished.max_pos = pos;
            }
            stale_chroms.insert(finished.chrom.clone());
            ranges.push(finished);

            previous_pos = None;
            refs.clear();
            alts.clear();
            rows_for_pos = 0;
        }
        if current.is_none() {
            current = Some(ChromRange {
                chrom: row.chrom.clone(),
                min_pos: row.pos,
                max_pos: row.pos,
            });
        }

        if let Some(prev) = previous_pos {
            if row.pos < prev {
                return Err(DataError::score_row(
                    format!("Current pos precedes previous pos: {} < {}", row.pos, prev),
                    &line,
                )
                .into());
            }
            if row.pos != prev {
                if row.pos - prev != 1 {
                    return Err(
                        DataError::score_row("Position increment not 1", &line).into()
                    );
                }
                if rows_for_pos != ROWS_PER_POSITION {
                    return Err(DataError::score_row(
                        format!(
                            "Expecting {} lines per unique position but found {}",
                            ROWS_PER_POSITION, rows_for_pos
                        ),
                        &line,
                    )
                    .into());
                }
                if refs.len() != 1 {
                    return Err(DataError::score_row("Non-unique ref", &line).into());
                }
                if alts.len() != ROWS_PER_POSITION {
                    return Err(DataError::score_row(
                        format!("Expected 3 alts but found {}", alts.len()),
                        &line,
                    )
                    .into());
                }
                refs.clear();
                alts.clear();
                rows_for_pos = 0;
            }
        }

        refs.insert(row.reference);
        alts.insert(row.alt);
        previous_pos = Some(row.pos);
        rows_for_pos += 1;
        lines_checked += 1;

        if lines_checked % PROGRESS_EVERY == 0 {
            progress!(quiet, "Processed {} lines...", lines_checked);
        }
    }

    if let Some(mut last) = current.take() {
        if let Some(pos) = previous_pos {
            last.max_pos = pos;
        }
        ranges.push(last);
    }

    Ok(TableSummary {
        lines: lines_checked,
        ranges,
    })
}

fn parse_row(line: &str) -> Result<ScoreRow, DataError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != EXPECTED_FIELDS {
        return Err(DataError::score_row(
            format!(
                "Expected length == {} but found {}",
                EXPECTED_FIELDS,
                fields.len()
            ),
            line,
        ));
    }

    let pos: i64 = fields[1]
        .parse()
        .map_err(|_| DataError::score_row(format!("Unparsable position: {}", fields[1]), line))?;
    let score: f64 = fields[4]
        .parse()
        .map_err(|_| DataError::score_row(format!("Unparsable score: {}", fields[4]), line))?;

    if !(0.0..=1.0).contains(&score) {
        return Err(DataError::score_row(
            format!("CAPICE score outside 0-1 range: {}", score),
            line,
        ));
    }
    if pos < 0 {
        return Err(DataError::score_row(
            format!("Position negative: {}", pos),
            line,
        ));
    }

    let reference = single_base(fields[2], "Ref", line)?;
    let alt = single_base(fields[3], "Alt", line)?;

    Ok(ScoreRow {
        chrom: fields[0].to_string(),
        pos,
        reference,
        alt,
    })
}

fn single_base(field: &str, what: &str, line: &str) -> Result<char, DataError> {
    let mut chars = field.chars();
    let base = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(DataError::score_row(
                format!("{} not 1 char", what),
                line,
            ))
        }
    };
    if !matches!(base, 'A' | 'T' | 'G' | 'C') {
        return Err(DataError::score_row(
            format!("{} does not equal A, T, G or C", what),
            line,
        ));
    }
    Ok(base)
}
