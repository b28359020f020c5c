pub mod annotations;
pub mod classifier;
pub mod comp_het;
pub mod error;
pub mod genotypes;
pub mod pipeline;
pub mod report;
pub mod score_table;
pub mod types;
pub mod vcf_reader;
