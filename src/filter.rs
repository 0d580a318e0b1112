// filter.rs
//
// Locus filters that return a new matrix plus the indices they removed.

use crate::config::MafThreshold;
use crate::error::PopGenError;
use crate::genotype::GenotypeMatrix;
use crate::secondaries::loci_by_tag;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// Loci below the minor allele threshold, computed over all individuals. Uncalled loci always fail.
pub fn low_maf_loci(matrix: &GenotypeMatrix, threshold: MafThreshold) -> BTreeSet<usize> {
    let ploidy = matrix.ploidy();
    (0..matrix.n_loci())
        .filter(|&l| {
            let counts = matrix.locus_counts(l);
            if counts.called == 0 {
                return true;
            }
            match threshold {
                MafThreshold::Frequency(min) => {
                    let q = counts.frequency(ploidy);
                    q.min(1.0 - q) < min
                }
                MafThreshold::MinCount(min) => counts.minor_allele_count(ploidy) < min,
            }
        })
        .collect()
}

pub fn filter_maf(
    matrix: &GenotypeMatrix,
    threshold: MafThreshold,
) -> Result<(GenotypeMatrix, BTreeSet<usize>), PopGenError> {
    if let MafThreshold::Frequency(f) = threshold {
        if !(0.0..=0.5).contains(&f) {
            return Err(PopGenError::InvalidConfig(format!(
                "maf frequency must lie in [0, 0.5], got {}",
                f
            )));
        }
    }
    let removed = low_maf_loci(matrix, threshold);
    info!("MAF filter ({}): removed {} of {} loci", threshold, removed.len(), matrix.n_loci());
    Ok((matrix.drop_loci(&removed), removed))
}

/// Which locus survives on a tag carrying several SNPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryPolicy {
    /// The first locus in matrix order.
    First,
    /// A uniformly chosen locus.
    Random { seed: Option<u64> },
}

/// Keeps one locus per tag id; loci without a tag id are always kept.
pub fn filter_secondaries(matrix: &GenotypeMatrix, policy: SecondaryPolicy) -> (GenotypeMatrix, BTreeSet<usize>) {
    match policy {
        SecondaryPolicy::First => {
            let removed: BTreeSet<usize> = loci_by_tag(matrix)
                .values()
                .flat_map(|loci| loci.iter().skip(1).copied())
                .collect();
            log_secondaries(removed.len());
            (matrix.drop_loci(&removed), removed)
        }
        SecondaryPolicy::Random { seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            filter_secondaries_with_rng(matrix, &mut rng)
        }
    }
}

/// Keeps one uniformly chosen locus per tag id, drawing from `rng`.
pub fn filter_secondaries_with_rng<R: Rng + ?Sized>(
    matrix: &GenotypeMatrix,
    rng: &mut R,
) -> (GenotypeMatrix, BTreeSet<usize>) {
    let mut removed = BTreeSet::new();
    for loci in loci_by_tag(matrix).values() {
        let keep = loci[rng.gen_range(0..loci.len())];
        removed.extend(loci.iter().copied().filter(|&l| l != keep));
    }
    log_secondaries(removed.len());
    (matrix.drop_loci(&removed), removed)
}

fn log_secondaries(removed: usize) {
    info!("Removed {} secondary SNPs", removed);
}
