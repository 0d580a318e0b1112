//! Population differentiation statistics for SNP and presence/absence genotype matrices.
//!
//! The engines take a read-only [`GenotypeMatrix`] and a [`PopulationPartition`]
//! and return freshly allocated result tables; nothing is mutated in place.

// Module declarations
pub mod config;
pub mod error;
pub mod filter;
pub mod genotype;
pub mod ld;
pub mod missing;
pub mod poisson;
pub mod private_alleles;
pub mod secondaries;
pub mod stats;
pub mod table;

#[cfg(test)]
mod tests;

pub use crate::config::{
    AnalysisConfig, ComparisonMethod, DiversityOptions, LdOptions, LdWindow, MafThreshold, PrivateAlleleOptions,
    SecondariesOptions,
};
pub use crate::error::PopGenError;
pub use crate::filter::{filter_maf, filter_secondaries, filter_secondaries_with_rng, SecondaryPolicy};
pub use crate::genotype::{AlleleCounts, DataType, GenotypeMatrix, LocusInfo, Population, PopulationPartition};
pub use crate::ld::{scan_ld, LdNotice, LdPairResult, LdScan};
pub use crate::missing::{
    all_missing_loci_by_population, filter_all_missing, filter_call_rate, scan_missingness, CallRateAxis,
    MissingnessScan,
};
pub use crate::poisson::{estimate_zero_class, fit_truncated_poisson, PoissonFit, ZeroClassEstimate};
pub use crate::private_alleles::{
    private_alleles, private_alleles_with_rng, PairLoci, PairResult, PrivateAlleleMatrix, PrivateAlleleReport,
};
pub use crate::secondaries::{report_secondaries, SecondariesReport, TagLengthSource};
pub use crate::stats::{basic_stats, population_heterozygosity, BasicStats, Differentiation, PopulationHeterozygosity};
