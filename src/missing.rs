// missing.rs

use crate::error::PopGenError;
use crate::genotype::{GenotypeMatrix, PopulationPartition};

use log::{debug, info};
use std::collections::BTreeSet;

/// Loci and individuals with no calls at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingnessScan {
    /// Loci entirely missing (globally, or within at least one population in by-population mode).
    pub loci: BTreeSet<usize>,
    /// Individuals entirely missing once `loci` are removed, indexed in the original matrix.
    pub individuals: BTreeSet<usize>,
}

impl MissingnessScan {
    pub fn is_empty(&self) -> bool {
        self.loci.is_empty() && self.individuals.is_empty()
    }
}

/// Loci with no call among `rows`. An empty row set yields no loci.
pub fn all_missing_loci(matrix: &GenotypeMatrix, rows: &[usize]) -> BTreeSet<usize> {
    if rows.is_empty() {
        return BTreeSet::new();
    }
    (0..matrix.n_loci())
        .filter(|&l| {
            let column = matrix.locus_calls(l);
            rows.iter().all(|&r| column[r].is_none())
        })
        .collect()
}

/// Union over populations of the loci entirely missing within that population.
///
/// Populations are visited in partition (sorted label) order; empty populations are skipped.
pub fn all_missing_loci_by_population(
    matrix: &GenotypeMatrix,
    partition: &PopulationPartition,
) -> Result<BTreeSet<usize>, PopGenError> {
    partition.check_matches(matrix)?;
    let mut union = BTreeSet::new();
    for population in partition.populations() {
        if population.is_empty() {
            debug!("Population '{}' has no individuals, skipping", population.label);
            continue;
        }
        let missing = all_missing_loci(matrix, &population.rows);
        if !missing.is_empty() {
            debug!(
                "Population '{}': {} loci with no calls",
                population.label,
                missing.len()
            );
        }
        union.extend(missing);
    }
    Ok(union)
}

/// Individuals with no call among the loci not listed in `excluded_loci`.
pub fn all_missing_individuals(matrix: &GenotypeMatrix, excluded_loci: &BTreeSet<usize>) -> BTreeSet<usize> {
    let kept: Vec<usize> = (0..matrix.n_loci()).filter(|l| !excluded_loci.contains(l)).collect();
    (0..matrix.n_individuals())
        .filter(|&i| {
            let row = matrix.individual_calls(i);
            kept.iter().all(|&l| row[l].is_none())
        })
        .collect()
}

/// Full scan: all-missing loci first, then individuals left with no calls after those loci are gone.
pub fn scan_missingness(
    matrix: &GenotypeMatrix,
    partition: Option<&PopulationPartition>,
) -> Result<MissingnessScan, PopGenError> {
    let loci = match partition {
        Some(partition) => all_missing_loci_by_population(matrix, partition)?,
        None => {
            let rows: Vec<usize> = (0..matrix.n_individuals()).collect();
            all_missing_loci(matrix, &rows)
        }
    };
    let individuals = all_missing_individuals(matrix, &loci);
    Ok(MissingnessScan { loci, individuals })
}

/// Applies [`scan_missingness`], returning the reduced matrix, the matching partition and the scan.
pub fn filter_all_missing(
    matrix: &GenotypeMatrix,
    partition: &PopulationPartition,
    by_population: bool,
) -> Result<(GenotypeMatrix, PopulationPartition, MissingnessScan), PopGenError> {
    partition.check_matches(matrix)?;
    let scan = scan_missingness(matrix, by_population.then_some(partition))?;
    let filtered = matrix.drop_loci(&scan.loci).drop_individuals(&scan.individuals);
    let filtered_partition = partition.drop_rows(&scan.individuals);
    info!(
        "Removed {} all-missing loci and {} all-missing individuals",
        scan.loci.len(),
        scan.individuals.len()
    );
    Ok((filtered, filtered_partition, scan))
}

/// Which margin a call-rate filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRateAxis {
    Loci,
    Individuals,
}

/// Indices whose call rate falls below `threshold` on the given axis.
pub fn low_call_rate(matrix: &GenotypeMatrix, threshold: f64, axis: CallRateAxis) -> BTreeSet<usize> {
    match axis {
        CallRateAxis::Loci => (0..matrix.n_loci())
            .filter(|&l| matrix.locus_call_rate(l) < threshold)
            .collect(),
        CallRateAxis::Individuals => (0..matrix.n_individuals())
            .filter(|&i| matrix.individual_call_rate(i) < threshold)
            .collect(),
    }
}

/// Removes loci or individuals below a call-rate threshold in [0, 1].
pub fn filter_call_rate(
    matrix: &GenotypeMatrix,
    threshold: f64,
    axis: CallRateAxis,
) -> Result<(GenotypeMatrix, BTreeSet<usize>), PopGenError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PopGenError::InvalidConfig(format!(
            "call rate threshold must lie in [0, 1], got {}",
            threshold
        )));
    }
    let removed = low_call_rate(matrix, threshold, axis);
    let filtered = match axis {
        CallRateAxis::Loci => matrix.drop_loci(&removed),
        CallRateAxis::Individuals => matrix.drop_individuals(&removed),
    };
    info!(
        "Call rate filter ({:?}, threshold {}): removed {}",
        axis,
        threshold,
        removed.len()
    );
    Ok((filtered, removed))
}
