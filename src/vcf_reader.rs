//! Line-oriented reading of gzip-compressed, annotated VCF files.
//!
//! Only the structure the decision engines need is parsed: chromosome,
//! position, alleles, INFO key/value pairs (keys may repeat) and per-sample
//! genotype calls resolved to allele bases. The raw line is kept verbatim.

use crate::error::DataError;
use crate::types::VcfRecord;
use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Minimum column count for a record with genotype data:
/// CHROM POS ID REF ALT QUAL FILTER INFO FORMAT + samples.
const FIXED_COLUMNS: usize = 9;

/// Open a `.vcf.gz` (or any gzip member stream, BGZF included) for line
/// reading.
pub fn open_gz(path: &Path) -> Result<BufReader<MultiGzDecoder<File>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    Ok(BufReader::new(MultiGzDecoder::new(file)))
}

/// Forward-only VCF record source. Consumes the meta/header block on
/// construction and exposes the declared sample-name ordering before
/// iteration, as the classifier requires.
pub struct VcfStream<R: BufRead> {
    lines: Lines<R>,
    sample_names: Vec<String>,
}

impl<R: BufRead> VcfStream<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let sample_names = loop {
            let line = match lines.next() {
                Some(line) => line.context("Failed to read VCF header line")?,
                None => bail!("VCF input ended before the #CHROM header line"),
            };
            if line.starts_with("##") || line.is_empty() {
                continue;
            }
            if line.starts_with("#CHROM") {
                let fields: Vec<&str> = line.split('\t').collect();
                break fields
                    .iter()
                    .skip(FIXED_COLUMNS)
                    .map(|s| s.to_string())
                    .collect();
            }
            bail!("Unexpected line before #CHROM header: {}", line);
        };
        Ok(VcfStream {
            lines,
            sample_names,
        })
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }
}

impl<R: BufRead> Iterator for VcfStream<R> {
    type Item = Result<VcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e).context("Failed to read VCF record line")),
            };
            if line.is_empty() {
                continue;
            }
            return Some(
                parse_record(&line, self.sample_names.len()).map_err(anyhow::Error::from),
            );
        }
    }
}

/// Parse one VCF data line into a typed record.
pub fn parse_record(line: &str, sample_count: usize) -> Result<VcfRecord, DataError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIXED_COLUMNS + sample_count {
        return Err(DataError::record(
            format!(
                "expected {} columns for {} sample(s) but found {}",
                FIXED_COLUMNS + sample_count,
                sample_count,
                fields.len()
            ),
            line,
        ));
    }

    let chrom = fields[0].to_string();
    let pos: u64 = fields[1]
        .parse()
        .map_err(|_| DataError::record(format!("unparsable position '{}'", fields[1]), line))?;
    let reference = fields[3].to_string();
    let alternates: Vec<String> = fields[4].split(',').map(|s| s.to_string()).collect();
    let info = parse_info(fields[7]);

    let gt_index = fields[8]
        .split(':')
        .position(|f| f == "GT")
        .ok_or_else(|| DataError::record("FORMAT column has no GT field", line))?;

    let mut genotypes = Vec::with_capacity(sample_count);
    for sample in &fields[FIXED_COLUMNS..] {
        let gt = sample.split(':').nth(gt_index).ok_or_else(|| {
            DataError::record(format!("sample column '{}' has no GT value", sample), line)
        })?;
        genotypes.push(resolve_alleles(gt, &reference, &alternates, line)?);
    }

    Ok(VcfRecord {
        chrom,
        pos,
        reference,
        alternates,
        info,
        genotypes,
        raw: line.to_string(),
    })
}

/// Split the INFO column into key/value pairs, in file order. Flags carry an
/// empty value; a "." column yields no pairs.
fn parse_info(info: &str) -> Vec<(String, String)> {
    if info == "." || info.is_empty() {
        return Vec::new();
    }
    info.split(';')
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.to_string(), String::new()),
        })
        .collect()
}

/// Resolve a GT value like `0/1` or `1|1` to allele bases; `.` stays as the
/// missing marker.
fn resolve_alleles(
    gt: &str,
    reference: &str,
    alternates: &[String],
    line: &str,
) -> Result<Vec<String>, DataError> {
    let mut alleles = Vec::with_capacity(2);
    for token in gt.split(['/', '|']) {
        if token == "." {
            alleles.push(".".to_string());
            continue;
        }
        let index: usize = token.parse().map_err(|_| {
            DataError::record(format!("unparsable allele index '{}'", token), line)
        })?;
        if index == 0 {
            alleles.push(reference.to_string());
        } else {
            let alt = alternates.get(index - 1).ok_or_else(|| {
                DataError::record(format!("allele index {} out of range", index), line)
            })?;
            alleles.push(alt.clone());
        }
    }
    Ok(alleles)
}
