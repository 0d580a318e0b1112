// stats.rs
//
// Heterozygosity and differentiation statistics (Nei 1987 estimators).

use crate::config::DiversityOptions;
use crate::error::PopGenError;
use crate::genotype::{GenotypeMatrix, PopulationPartition};

use log::{debug, info};
use ndarray::Array2;

/// Differentiation indices for one locus, or for the whole data set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Differentiation {
    /// Mean observed heterozygosity across populations.
    pub ho: f64,
    /// Mean bias-corrected within-population gene diversity.
    pub hs: f64,
    pub ht: f64,
    pub dst: f64,
    /// Finite-sample corrected total heterozygosity.
    pub htp: f64,
    pub dstp: f64,
    pub fst: f64,
    pub fstp: f64,
    pub fis: f64,
    pub dest: f64,
    pub gst_max: f64,
    pub gst_h: f64,
    /// Populations contributing data (averaged over loci for the overall row).
    pub n_pop: f64,
}

impl Differentiation {
    fn rounded(&self, digits: u32) -> Differentiation {
        let r = |x: f64| round_to(x, digits);
        Differentiation {
            ho: r(self.ho),
            hs: r(self.hs),
            ht: r(self.ht),
            dst: r(self.dst),
            htp: r(self.htp),
            dstp: r(self.dstp),
            fst: r(self.fst),
            fstp: r(self.fstp),
            fis: r(self.fis),
            dest: r(self.dest),
            gst_max: r(self.gst_max),
            gst_h: r(self.gst_h),
            n_pop: self.n_pop,
        }
    }

    pub const COLUMNS: [&'static str; 13] = [
        "Ho", "Hs", "Ht", "Dst", "Htp", "Dstp", "Fst", "Fstp", "Fis", "Dest", "Gst_max", "Gst_H", "n_pop",
    ];

    pub fn values(&self) -> [f64; 13] {
        [
            self.ho, self.hs, self.ht, self.dst, self.htp, self.dstp, self.fst, self.fstp, self.fis,
            self.dest, self.gst_max, self.gst_h, self.n_pop,
        ]
    }
}

/// Output of [`basic_stats`]. Per-population tables are loci x populations.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicStats {
    pub populations: Vec<String>,
    pub locus_ids: Vec<String>,
    /// Non-missing genotypes per locus and population.
    pub n_called: Array2<usize>,
    pub allele_freq: Array2<f64>,
    pub ho: Array2<f64>,
    pub hs: Array2<f64>,
    pub fis: Array2<f64>,
    /// Harmonic mean sample size per locus.
    pub n_effective: Vec<f64>,
    pub per_locus: Vec<Differentiation>,
    pub overall: Differentiation,
}

/// Quotient that is NaN, never infinite, when the denominator is zero.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

pub(crate) fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits as i32);
    (value * scale).round() / scale
}

/// Mean of the finite values; NaN when there are none.
pub(crate) fn nan_mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Harmonic mean of the non-zero sample sizes: `1 / mean(1 / n)`.
fn harmonic_mean(sizes: &[usize]) -> f64 {
    let present: Vec<f64> = sizes.iter().filter(|&&n| n > 0).map(|&n| n as f64).collect();
    match present.len() {
        0 => f64::NAN,
        1 => present[0],
        k => k as f64 / present.iter().map(|n| 1.0 / n).sum::<f64>(),
    }
}

/// Within-population gene diversity, corrected for sample size and observed heterozygosity.
pub fn within_population_diversity(q: f64, ho: f64, n: usize) -> f64 {
    let n = n as f64;
    ratio(n, n - 1.0) * (2.0 * q * (1.0 - q) - ratio(ho, 2.0 * n))
}

/// Per-locus differentiation from per-population frequencies, heterozygosities and sample sizes.
///
/// Slices are indexed by population; populations with `n == 0` contribute nothing.
pub fn locus_differentiation(q: &[f64], ho: &[f64], n: &[usize]) -> (Differentiation, f64) {
    let mn = harmonic_mean(n);
    let n_pop = n.iter().filter(|&&c| c > 0).count() as f64;

    let m_ho = nan_mean(ho.iter().copied());
    let mean_sq = nan_mean(q.iter().map(|&p| p * p + (1.0 - p) * (1.0 - p)));
    let hs = ratio(mn, mn - 1.0) * (1.0 - mean_sq - ratio(m_ho, 2.0 * mn));

    let q_mean = nan_mean(q.iter().copied());
    let ht = 2.0 * q_mean * (1.0 - q_mean);
    let htp = ht + ratio(hs, mn) - ratio(m_ho, 2.0 * mn * n_pop);

    let dst = ht - hs;
    let dstp = ratio(n_pop * (htp - hs), n_pop - 1.0);
    let fstp = ratio(dstp, htp);
    let gst_max = ratio((n_pop - 1.0) * (1.0 - hs), n_pop - 1.0 + hs);

    let stats = Differentiation {
        ho: m_ho,
        hs,
        ht,
        dst,
        htp,
        dstp,
        fst: ratio(dst, ht),
        fstp,
        fis: 1.0 - ratio(m_ho, hs),
        dest: ratio(htp - hs, 1.0 - hs) * ratio(n_pop, n_pop - 1.0),
        gst_max,
        gst_h: ratio(fstp, gst_max),
        n_pop,
    };
    (stats, mn)
}

/// Genome-wide values: column means of the per-locus table, with the ratio
/// statistics recomputed from the averaged components.
pub fn overall_differentiation(per_locus: &[Differentiation]) -> Differentiation {
    let mean = |f: fn(&Differentiation) -> f64| nan_mean(per_locus.iter().map(f));
    let ho = mean(|d| d.ho);
    let hs = mean(|d| d.hs);
    let ht = mean(|d| d.ht);
    let dst = mean(|d| d.dst);
    let htp = mean(|d| d.htp);
    let dstp = mean(|d| d.dstp);
    let n_pop = mean(|d| d.n_pop);

    let fstp = ratio(dstp, htp);
    let gst_max = ratio((n_pop - 1.0) * (1.0 - hs), n_pop - 1.0 + hs);
    Differentiation {
        ho,
        hs,
        ht,
        dst,
        htp,
        dstp,
        fst: ratio(dst, ht),
        fstp,
        fis: 1.0 - ratio(ho, hs),
        dest: ratio(dstp, 1.0 - hs),
        gst_max,
        gst_h: ratio(fstp, gst_max),
        n_pop,
    }
}

fn check_population_sizes(partition: &PopulationPartition) -> Result<(), PopGenError> {
    if partition.is_empty() {
        return Err(PopGenError::Metadata("population partition is empty".to_string()));
    }
    if let Some(small) = partition.populations().iter().find(|p| p.len() <= 1) {
        return Err(PopGenError::PopulationTooSmall {
            population: small.label.clone(),
            count: small.len(),
        });
    }
    Ok(())
}

/// Computes Ho, Hs, Ht and the derived differentiation indices per locus and overall.
///
/// Every population needs at least two individuals. `options.digits` rounds every
/// returned table; overall values are derived from the unrounded per-locus table.
pub fn basic_stats(
    matrix: &GenotypeMatrix,
    partition: &PopulationPartition,
    options: &DiversityOptions,
) -> Result<BasicStats, PopGenError> {
    partition.check_matches(matrix)?;
    options.validate()?;
    check_population_sizes(partition)?;

    let n_loci = matrix.n_loci();
    let n_pops = partition.len();
    let ploidy = matrix.ploidy();
    info!(
        "Computing basic statistics for {} loci across {} populations",
        n_loci, n_pops
    );

    let mut n_called = Array2::<usize>::zeros((n_loci, n_pops));
    let mut allele_freq = Array2::<f64>::from_elem((n_loci, n_pops), f64::NAN);
    let mut ho = Array2::<f64>::from_elem((n_loci, n_pops), f64::NAN);
    let mut hs = Array2::<f64>::from_elem((n_loci, n_pops), f64::NAN);
    let mut fis = Array2::<f64>::from_elem((n_loci, n_pops), f64::NAN);

    for (p, population) in partition.populations().iter().enumerate() {
        for l in 0..n_loci {
            let counts = matrix.allele_counts(l, &population.rows);
            if counts.called == 0 {
                continue;
            }
            let q = counts.frequency(ploidy);
            let h_obs = counts.observed_heterozygosity();
            let h_s = within_population_diversity(q, h_obs, counts.called);
            n_called[[l, p]] = counts.called;
            allele_freq[[l, p]] = q;
            ho[[l, p]] = h_obs;
            hs[[l, p]] = h_s;
            // Kept in this form for compatibility with published tables; reduces to 1 / Ho.
            fis[[l, p]] = ratio(ratio(h_s, h_obs), h_s);
        }
    }

    let mut per_locus = Vec::with_capacity(n_loci);
    let mut n_effective = Vec::with_capacity(n_loci);
    for l in 0..n_loci {
        let q_row: Vec<f64> = allele_freq.row(l).to_vec();
        let ho_row: Vec<f64> = ho.row(l).to_vec();
        let n_row: Vec<usize> = n_called.row(l).to_vec();
        let (stats, mn) = locus_differentiation(&q_row, &ho_row, &n_row);
        per_locus.push(stats);
        n_effective.push(mn);
    }

    let overall = overall_differentiation(&per_locus);
    debug!("Overall Fst {:.4}, Fis {:.4}", overall.fst, overall.fis);

    let (per_locus, overall) = match options.digits {
        Some(d) => {
            for table in [&mut allele_freq, &mut ho, &mut hs, &mut fis] {
                table.mapv_inplace(|x| round_to(x, d));
            }
            for n in n_effective.iter_mut() {
                *n = round_to(*n, d);
            }
            (
                per_locus.iter().map(|s| s.rounded(d)).collect(),
                overall.rounded(d),
            )
        }
        None => (per_locus, overall),
    };

    Ok(BasicStats {
        populations: partition.labels().iter().map(|s| s.to_string()).collect(),
        locus_ids: matrix.loci().iter().map(|l| l.id.clone()).collect(),
        n_called,
        allele_freq,
        ho,
        hs,
        fis,
        n_effective,
        per_locus,
        overall,
    })
}

/// Heterozygosity summary for one population.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationHeterozygosity {
    pub population: String,
    pub n_individuals: usize,
    /// Loci with at least one call in the population.
    pub n_loci: usize,
    pub polymorphic_loci: usize,
    pub ho: f64,
    /// Expected heterozygosity, 2pq.
    pub he: f64,
    /// He corrected for the number of sampled allele copies.
    pub unbiased_he: f64,
    pub fis: f64,
}

/// Mean observed and expected heterozygosity per population, ignoring missing calls.
pub fn population_heterozygosity(
    matrix: &GenotypeMatrix,
    partition: &PopulationPartition,
) -> Result<Vec<PopulationHeterozygosity>, PopGenError> {
    partition.check_matches(matrix)?;
    let ploidy = matrix.ploidy();

    let summaries = partition
        .populations()
        .iter()
        .map(|population| {
            let mut n_loci = 0;
            let mut polymorphic_loci = 0;
            let mut ho_values = Vec::new();
            let mut he_values = Vec::new();
            let mut uhe_values = Vec::new();
            for l in 0..matrix.n_loci() {
                let counts = matrix.allele_counts(l, &population.rows);
                if counts.called == 0 {
                    continue;
                }
                n_loci += 1;
                let q = counts.frequency(ploidy);
                if q > 0.0 && q < 1.0 {
                    polymorphic_loci += 1;
                }
                let he = 2.0 * q * (1.0 - q);
                let copies = (counts.called * ploidy as usize) as f64;
                ho_values.push(counts.observed_heterozygosity());
                he_values.push(he);
                uhe_values.push(ratio(copies, copies - 1.0) * he);
            }
            let ho = nan_mean(ho_values);
            let he = nan_mean(he_values);
            PopulationHeterozygosity {
                population: population.label.clone(),
                n_individuals: population.len(),
                n_loci,
                polymorphic_loci,
                ho,
                he,
                unbiased_he: nan_mean(uhe_values),
                fis: 1.0 - ratio(ho, he),
            }
        })
        .collect();
    Ok(summaries)
}
