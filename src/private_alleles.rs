// private_alleles.rs

use crate::config::{ComparisonMethod, PrivateAlleleOptions};
use crate::error::PopGenError;
use crate::genotype::{AlleleCounts, DataType, GenotypeMatrix, PopulationPartition};
use crate::stats::ratio;

use itertools::Itertools;
use log::{debug, info};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Label given to the pooled remainder in one-vs-rest comparisons.
pub const REST_LABEL: &str = "rest";

/// Summary row for one compared pair of populations.
#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    pub pop1: String,
    pub pop2: String,
    pub n1: usize,
    pub n2: usize,
    /// Loci monomorphic for opposite alleles.
    pub fixed: usize,
    /// Alleles seen in `pop1` but absent from `pop2`.
    pub priv1: usize,
    pub priv2: usize,
    pub totalpriv: usize,
    /// Lower-bound estimate of private alleles in `pop1` including undetected ones (SNP data only).
    pub chao1: Option<f64>,
    pub chao2: Option<f64>,
    /// Mean absolute allele frequency difference.
    pub afd: f64,
    /// Share of the private alleles that belong to `pop1`; 0.5 on ties.
    pub asym: f64,
    pub asym_p: Option<f64>,
}

/// Locus ids behind the counts of one [`PairResult`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PairLoci {
    pub pop1: String,
    pub pop2: String,
    pub private1: Vec<String>,
    pub private2: Vec<String>,
    pub fixed: Vec<String>,
}

/// Cell `(i, j)` holds the number of alleles private to population `j` relative to population `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateAlleleMatrix {
    pub populations: Vec<String>,
    pub counts: Array2<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivateAlleleReport {
    pub method: ComparisonMethod,
    pub pairs: Vec<PairResult>,
    /// Present when `return_loci` was requested.
    pub loci: Option<Vec<PairLoci>>,
    /// Present for pairwise comparisons.
    pub matrix: Option<PrivateAlleleMatrix>,
}

/// Per-locus classification for two groups of individuals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupComparison {
    pub private_a: Vec<usize>,
    pub private_b: Vec<usize>,
    pub fixed: Vec<usize>,
    pub afd: f64,
    /// Copies of the private allele carried by group A, parallel to `private_a`.
    pub private_a_copies: Vec<u32>,
    pub private_b_copies: Vec<u32>,
    /// Called allele copies in group A at each of its private loci.
    pub private_a_called: Vec<u32>,
    pub private_b_called: Vec<u32>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fixation {
    Absent,
    Fixed,
    Polymorphic,
}

fn fixation(counts: &AlleleCounts, ploidy: u8) -> Fixation {
    let copies = counts.called as u32 * ploidy as u32;
    if counts.dosage_sum == 0 {
        Fixation::Absent
    } else if counts.dosage_sum == copies {
        Fixation::Fixed
    } else {
        Fixation::Polymorphic
    }
}

/// Copies, in the polymorphic group, of the allele missing from the monomorphic group.
fn private_copies(poly: &AlleleCounts, mono: Fixation, ploidy: u8) -> u32 {
    match mono {
        Fixation::Absent => poly.dosage_sum,
        _ => poly.called as u32 * ploidy as u32 - poly.dosage_sum,
    }
}

/// Classifies every locus for the individuals in `rows_a` against those in `rows_b`.
///
/// A locus is private to A when B is monomorphic and A still carries the other
/// allele without being fixed for it; loci fixed for opposite alleles count as
/// fixed differences only. Loci uncalled in either group are ignored.
pub fn compare_groups(matrix: &GenotypeMatrix, rows_a: &[usize], rows_b: &[usize]) -> GroupComparison {
    let ploidy = matrix.ploidy();
    let mut result = GroupComparison::default();
    let mut diff_sum = 0.0;
    let mut diff_count = 0usize;

    for l in 0..matrix.n_loci() {
        let a = matrix.allele_counts(l, rows_a);
        let b = matrix.allele_counts(l, rows_b);
        if a.called == 0 || b.called == 0 {
            continue;
        }
        diff_sum += (a.frequency(ploidy) - b.frequency(ploidy)).abs();
        diff_count += 1;

        match (fixation(&a, ploidy), fixation(&b, ploidy)) {
            (Fixation::Absent, Fixation::Fixed) | (Fixation::Fixed, Fixation::Absent) => {
                result.fixed.push(l);
            }
            (Fixation::Polymorphic, mono @ (Fixation::Absent | Fixation::Fixed)) => {
                result.private_a.push(l);
                result.private_a_copies.push(private_copies(&a, mono, ploidy));
                result.private_a_called.push(a.called as u32 * ploidy as u32);
            }
            (mono @ (Fixation::Absent | Fixation::Fixed), Fixation::Polymorphic) => {
                result.private_b.push(l);
                result.private_b_copies.push(private_copies(&b, mono, ploidy));
                result.private_b_called.push(b.called as u32 * ploidy as u32);
            }
            _ => {}
        }
    }
    result.afd = if diff_count == 0 {
        f64::NAN
    } else {
        diff_sum / diff_count as f64
    };
    result
}

/// Only the private allele counts, for bootstrap replicates.
fn private_counts(matrix: &GenotypeMatrix, rows_a: &[usize], rows_b: &[usize]) -> (usize, usize) {
    let ploidy = matrix.ploidy();
    let mut counts = (0, 0);
    for l in 0..matrix.n_loci() {
        let a = matrix.allele_counts(l, rows_a);
        let b = matrix.allele_counts(l, rows_b);
        if a.called == 0 || b.called == 0 {
            continue;
        }
        match (fixation(&a, ploidy), fixation(&b, ploidy)) {
            (Fixation::Polymorphic, Fixation::Absent | Fixation::Fixed) => counts.0 += 1,
            (Fixation::Absent | Fixation::Fixed, Fixation::Polymorphic) => counts.1 += 1,
            _ => {}
        }
    }
    counts
}

/// Bias-corrected Chao1 richness from observed private alleles and their copy numbers.
///
/// `copies` holds, for each private locus, how many copies of the private allele
/// were sampled; `allele_copies` is the number of called allele copies in the group.
pub fn chao_estimate(copies: &[u32], allele_copies: f64) -> f64 {
    let observed = copies.len() as f64;
    let f1 = copies.iter().filter(|&&c| c == 1).count() as f64;
    let f2 = copies.iter().filter(|&&c| c == 2).count() as f64;
    let n = allele_copies;
    let scale = if n > 0.0 { (n - 1.0) / n } else { 1.0 };
    if f2 > 0.0 {
        observed + scale * f1 * f1 / (2.0 * f2)
    } else {
        observed + scale * f1 * (f1 - 1.0).max(0.0) / 2.0
    }
}

/// Mean called allele copies over a group's private loci; 0 when it has none.
fn mean_called_copies(called: &[u32]) -> f64 {
    if called.is_empty() {
        0.0
    } else {
        called.iter().map(|&c| c as f64).sum::<f64>() / called.len() as f64
    }
}

/// Share of private alleles held by the first group; exactly 0.5 when both counts agree.
pub fn asymmetry(priv1: usize, priv2: usize) -> f64 {
    if priv1 == priv2 {
        0.5
    } else {
        ratio(priv1 as f64, (priv1 + priv2) as f64)
    }
}

/// Empirical p-value for the observed asymmetry.
///
/// Both groups are pooled; each replicate draws two pseudo-populations of the
/// smaller group's size with replacement and recomputes the asymmetry. The
/// p-value is the fraction of replicates exceeding the observed value.
pub fn asymmetry_p_value<R: Rng + ?Sized>(
    matrix: &GenotypeMatrix,
    rows_a: &[usize],
    rows_b: &[usize],
    observed: f64,
    replicates: usize,
    rng: &mut R,
) -> Option<f64> {
    let size = rows_a.len().min(rows_b.len());
    if replicates == 0 || size == 0 {
        return None;
    }
    let pool: Vec<usize> = rows_a.iter().chain(rows_b.iter()).copied().collect();
    let mut sample_a = vec![0; size];
    let mut sample_b = vec![0; size];
    let mut exceed = 0usize;
    for _ in 0..replicates {
        for slot in sample_a.iter_mut() {
            *slot = pool[rng.gen_range(0..pool.len())];
        }
        for slot in sample_b.iter_mut() {
            *slot = pool[rng.gen_range(0..pool.len())];
        }
        let (p1, p2) = private_counts(matrix, &sample_a, &sample_b);
        if asymmetry(p1, p2) > observed {
            exceed += 1;
        }
    }
    Some(exceed as f64 / replicates as f64)
}

struct Comparison<'a> {
    label_a: &'a str,
    label_b: &'a str,
    rows_a: Vec<usize>,
    rows_b: Vec<usize>,
}

/// Private alleles, fixed differences and AFD between populations, seeding the
/// bootstrap from `options.seed` (or from entropy when unset).
pub fn private_alleles(
    matrix: &GenotypeMatrix,
    partition: &PopulationPartition,
    options: &PrivateAlleleOptions,
) -> Result<PrivateAlleleReport, PopGenError> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    private_alleles_with_rng(matrix, partition, options, &mut rng)
}

/// As [`private_alleles`], drawing bootstrap samples from `rng`.
pub fn private_alleles_with_rng<R: Rng + ?Sized>(
    matrix: &GenotypeMatrix,
    partition: &PopulationPartition,
    options: &PrivateAlleleOptions,
    rng: &mut R,
) -> Result<PrivateAlleleReport, PopGenError> {
    partition.check_matches(matrix)?;
    options.validate()?;
    let populations = partition.populations();
    if populations.len() < 2 {
        return Err(PopGenError::TooFewPopulations {
            operation: "private allele comparison",
            found: populations.len(),
        });
    }

    let comparisons: Vec<Comparison> = match options.method {
        ComparisonMethod::Pairwise => (0..populations.len())
            .combinations(2)
            .map(|pair| Comparison {
                label_a: &populations[pair[0]].label,
                label_b: &populations[pair[1]].label,
                rows_a: populations[pair[0]].rows.clone(),
                rows_b: populations[pair[1]].rows.clone(),
            })
            .collect(),
        ComparisonMethod::OneVsRest => populations
            .iter()
            .enumerate()
            .map(|(i, focal)| Comparison {
                label_a: &focal.label,
                label_b: REST_LABEL,
                rows_a: focal.rows.clone(),
                rows_b: populations
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .flat_map(|(_, p)| p.rows.iter().copied())
                    .sorted()
                    .collect(),
            })
            .collect(),
    };
    info!(
        "Running {} {:?} private allele comparisons",
        comparisons.len(),
        options.method
    );

    let snp = matrix.data_type() == DataType::Snp;
    let mut pairs = Vec::with_capacity(comparisons.len());
    let mut pair_loci = Vec::new();

    for comparison in &comparisons {
        let groups = compare_groups(matrix, &comparison.rows_a, &comparison.rows_b);
        let priv1 = groups.private_a.len();
        let priv2 = groups.private_b.len();
        let asym = asymmetry(priv1, priv2);
        let asym_p = if options.test_asym {
            asymmetry_p_value(
                matrix,
                &comparison.rows_a,
                &comparison.rows_b,
                asym,
                options.test_asym_boot,
                &mut *rng,
            )
        } else {
            None
        };
        let (chao1, chao2) = if snp {
            (
                Some(chao_estimate(
                    &groups.private_a_copies,
                    mean_called_copies(&groups.private_a_called),
                )),
                Some(chao_estimate(
                    &groups.private_b_copies,
                    mean_called_copies(&groups.private_b_called),
                )),
            )
        } else {
            (None, None)
        };
        debug!(
            "{} vs {}: fixed {}, private {}/{}, AFD {:.4}",
            comparison.label_a,
            comparison.label_b,
            groups.fixed.len(),
            priv1,
            priv2,
            groups.afd
        );

        if options.return_loci {
            let ids = |loci: &[usize]| -> Vec<String> {
                loci.iter().map(|&l| matrix.loci()[l].id.clone()).collect()
            };
            pair_loci.push(PairLoci {
                pop1: comparison.label_a.to_string(),
                pop2: comparison.label_b.to_string(),
                private1: ids(&groups.private_a),
                private2: ids(&groups.private_b),
                fixed: ids(&groups.fixed),
            });
        }

        pairs.push(PairResult {
            pop1: comparison.label_a.to_string(),
            pop2: comparison.label_b.to_string(),
            n1: comparison.rows_a.len(),
            n2: comparison.rows_b.len(),
            fixed: groups.fixed.len(),
            priv1,
            priv2,
            totalpriv: priv1 + priv2,
            chao1,
            chao2,
            afd: groups.afd,
            asym,
            asym_p,
        });
    }

    let matrix_out = match options.method {
        ComparisonMethod::Pairwise => {
            let index = |label: &str| populations.iter().position(|p| p.label == label);
            let mut counts = Array2::<usize>::zeros((populations.len(), populations.len()));
            for pair in &pairs {
                if let (Some(i), Some(j)) = (index(&pair.pop1), index(&pair.pop2)) {
                    counts[[i, j]] = pair.priv2;
                    counts[[j, i]] = pair.priv1;
                }
            }
            Some(PrivateAlleleMatrix {
                populations: populations.iter().map(|p| p.label.clone()).collect(),
                counts,
            })
        }
        ComparisonMethod::OneVsRest => None,
    };

    Ok(PrivateAlleleReport {
        method: options.method,
        pairs,
        loci: options.return_loci.then_some(pair_loci),
        matrix: matrix_out,
    })
}
