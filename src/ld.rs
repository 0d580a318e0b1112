// ld.rs

use crate::config::{LdOptions, LdWindow, MafThreshold};
use crate::error::PopGenError;
use crate::genotype::{GenotypeMatrix, PopulationPartition};

use itertools::Itertools;
use log::{info, warn};
use std::cmp::Ordering;

/// Chromosome name used when the scan runs without map positions.
pub const SYNTHETIC_CHROMOSOME: &str = "unmapped";

/// LD between two loci within one population.
#[derive(Debug, Clone, PartialEq)]
pub struct LdPairResult {
    pub population: String,
    pub chromosome: String,
    /// Map positions and their distance; `None` when the scan ran without a map.
    pub position_a: Option<u64>,
    pub position_b: Option<u64>,
    pub distance: Option<u64>,
    /// Squared dosage correlation (r²).
    pub ld_statistic: f64,
    pub locus_a: String,
    pub locus_b: String,
}

/// Work the scan skipped or degraded, reported next to the results.
#[derive(Debug, Clone, PartialEq)]
pub enum LdNotice {
    /// No usable map: all loci were scanned as one synthetic chromosome.
    UnmappedFallback { unmapped_loci: usize },
    PopulationSkipped {
        population: String,
        individuals: usize,
        ind_limit: usize,
    },
    DuplicatePositions {
        population: String,
        chromosome: String,
        dropped: Vec<String>,
    },
    ChromosomeSkipped {
        population: String,
        chromosome: String,
        loci: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LdScan {
    /// Whether map positions were used.
    pub mapped: bool,
    pub pairs: Vec<LdPairResult>,
    pub notices: Vec<LdNotice>,
}

/// r² between the dosages of two loci over individuals called at both.
///
/// NaN with fewer than two shared calls or when either locus does not vary.
pub fn genotype_r2(matrix: &GenotypeMatrix, locus_a: usize, locus_b: usize, rows: &[usize]) -> f64 {
    let a = matrix.locus_calls(locus_a);
    let b = matrix.locus_calls(locus_b);
    let shared: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|&r| match (a[r], b[r]) {
            (Some(x), Some(y)) => Some((x as f64, y as f64)),
            _ => None,
        })
        .collect();
    if shared.len() < 2 {
        return f64::NAN;
    }
    let n = shared.len() as f64;
    let mean_x = shared.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = shared.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &shared {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy * sxy) / (sxx * syy)
}

/// Numeric chromosomes (with or without a `chr` prefix) sort numerically, before named ones.
fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| s.trim_start_matches("chr").parse::<u64>().ok();
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn passes_maf(matrix: &GenotypeMatrix, locus: usize, rows: &[usize], threshold: MafThreshold) -> bool {
    let counts = matrix.allele_counts(locus, rows);
    if counts.called == 0 {
        return false;
    }
    match threshold {
        MafThreshold::Frequency(min) => {
            let q = counts.frequency(matrix.ploidy());
            q.min(1.0 - q) >= min
        }
        MafThreshold::MinCount(min) => counts.minor_allele_count(matrix.ploidy()) >= min,
    }
}

struct PlacedLocus<'a> {
    chromosome: &'a str,
    position: u64,
    index: usize,
}

/// Pairwise LD per population and chromosome, restricted to pairs inside the distance window.
///
/// Loci are ordered by chromosome then position; of several loci at one position
/// the first in matrix order is kept. Without complete map data (or with
/// [`LdWindow::Unmapped`]) all loci form one synthetic chromosome in matrix
/// order, every pair is reported once and positions and distances are left undefined.
pub fn scan_ld(
    matrix: &GenotypeMatrix,
    partition: &PopulationPartition,
    options: &LdOptions,
) -> Result<LdScan, PopGenError> {
    partition.check_matches(matrix)?;
    options.validate()?;

    let mut notices = Vec::new();
    let unmapped_loci = matrix.loci().iter().filter(|l| !l.is_mapped()).count();
    let max_distance = match options.ld_max_pairwise {
        LdWindow::MaxDistance(bp) if unmapped_loci == 0 => Some(bp),
        LdWindow::MaxDistance(_) => {
            warn!(
                "{} loci lack chromosome/position data; scanning all pairs on one synthetic chromosome",
                unmapped_loci
            );
            notices.push(LdNotice::UnmappedFallback { unmapped_loci });
            None
        }
        LdWindow::Unmapped => None,
    };
    let mapped = max_distance.is_some();

    let mut pairs = Vec::new();
    for population in partition.populations() {
        if population.len() <= options.ind_limit {
            warn!(
                "Skipping population '{}': {} individuals (limit {})",
                population.label,
                population.len(),
                options.ind_limit
            );
            notices.push(LdNotice::PopulationSkipped {
                population: population.label.clone(),
                individuals: population.len(),
                ind_limit: options.ind_limit,
            });
            continue;
        }

        let mut placed: Vec<PlacedLocus> = (0..matrix.n_loci())
            .filter(|&l| passes_maf(matrix, l, &population.rows, options.maf))
            .map(|l| {
                let info = &matrix.loci()[l];
                match (mapped, info.chromosome.as_deref(), info.position) {
                    (true, Some(chromosome), Some(position)) => PlacedLocus {
                        chromosome,
                        position,
                        index: l,
                    },
                    _ => PlacedLocus {
                        chromosome: SYNTHETIC_CHROMOSOME,
                        position: l as u64 + 1,
                        index: l,
                    },
                }
            })
            .collect();
        // Stable: ties keep matrix order, so deduplication keeps the first locus.
        placed.sort_by(|a, b| {
            compare_chromosomes(a.chromosome, b.chromosome).then(a.position.cmp(&b.position))
        });

        for (chromosome, group) in &placed.iter().group_by(|p| p.chromosome) {
            let mut loci: Vec<&PlacedLocus> = Vec::new();
            let mut dropped = Vec::new();
            for locus in group {
                let duplicate = loci.last().map_or(false, |prev| prev.position == locus.position);
                if duplicate {
                    dropped.push(matrix.loci()[locus.index].id.clone());
                } else {
                    loci.push(locus);
                }
            }
            if !dropped.is_empty() {
                notices.push(LdNotice::DuplicatePositions {
                    population: population.label.clone(),
                    chromosome: chromosome.to_string(),
                    dropped,
                });
            }
            if loci.len() <= 1 {
                notices.push(LdNotice::ChromosomeSkipped {
                    population: population.label.clone(),
                    chromosome: chromosome.to_string(),
                    loci: loci.len(),
                });
                continue;
            }

            for (i, first) in loci.iter().enumerate() {
                for second in &loci[i + 1..] {
                    let distance = second.position - first.position;
                    if matches!(max_distance, Some(max) if distance > max) {
                        break;
                    }
                    pairs.push(LdPairResult {
                        population: population.label.clone(),
                        chromosome: chromosome.to_string(),
                        position_a: mapped.then_some(first.position),
                        position_b: mapped.then_some(second.position),
                        distance: mapped.then_some(distance),
                        ld_statistic: genotype_r2(matrix, first.index, second.index, &population.rows),
                        locus_a: matrix.loci()[first.index].id.clone(),
                        locus_b: matrix.loci()[second.index].id.clone(),
                    });
                }
            }
        }
    }

    info!(
        "LD scan finished: {} locus pairs, {} notices",
        pairs.len(),
        notices.len()
    );
    Ok(LdScan {
        mapped,
        pairs,
        notices,
    })
}
