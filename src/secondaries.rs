// secondaries.rs

use crate::config::SecondariesOptions;
use crate::error::PopGenError;
use crate::genotype::GenotypeMatrix;
use crate::poisson::{estimate_zero_class, ZeroClassEstimate};

use log::{info, warn};
use std::collections::BTreeMap;

/// Where the mean tag length of a [`SecondariesReport`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLengthSource {
    /// Averaged over the tag lengths recorded on the loci.
    Loci,
    /// No locus carried a tag length; the configured `taglength` was used.
    Fallback,
}

/// Distribution of SNPs per sequence tag and the implied number of invariant tags.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondariesReport {
    pub n_loci: usize,
    /// Loci with no tag id; they take no part in the tag counts.
    pub untagged_loci: usize,
    pub n_tags: usize,
    /// Tagged loci beyond the first on each tag.
    pub n_secondaries: usize,
    /// Number of SNPs on a tag -> number of tags with that many SNPs.
    pub snps_per_tag: BTreeMap<u64, u64>,
    pub mean_tag_length: f64,
    pub tag_length_source: TagLengthSource,
    /// `None` when the zero-class search failed; see `failure`.
    pub estimate: Option<ZeroClassEstimate>,
    /// Estimated invariant tags times the mean tag length.
    pub invariant_sites: Option<f64>,
    pub failure: Option<String>,
}

/// Tag id -> loci on it, in matrix order.
pub(crate) fn loci_by_tag(matrix: &GenotypeMatrix) -> BTreeMap<&str, Vec<usize>> {
    let mut tags: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (l, info) in matrix.loci().iter().enumerate() {
        if let Some(tag) = info.tag_id.as_deref() {
            tags.entry(tag).or_default().push(l);
        }
    }
    tags
}

/// Counts SNPs per tag and estimates the invariant tags that carry none.
///
/// A failed estimate does not fail the report: the estimate fields are left
/// empty and the reason is recorded in `failure`.
pub fn report_secondaries(
    matrix: &GenotypeMatrix,
    options: &SecondariesOptions,
) -> Result<SecondariesReport, PopGenError> {
    options.validate()?;
    let tags = loci_by_tag(matrix);
    let untagged_loci = matrix.loci().iter().filter(|l| l.tag_id.is_none()).count();
    let tagged_loci = matrix.n_loci() - untagged_loci;

    let mut snps_per_tag: BTreeMap<u64, u64> = BTreeMap::new();
    for loci in tags.values() {
        *snps_per_tag.entry(loci.len() as u64).or_insert(0) += 1;
    }

    let lengths: Vec<usize> = tags
        .values()
        .filter_map(|loci| loci.iter().find_map(|&l| matrix.loci()[l].tag_length))
        .collect();
    let (mean_tag_length, tag_length_source) = if lengths.is_empty() {
        (options.taglength as f64, TagLengthSource::Fallback)
    } else {
        (
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
            TagLengthSource::Loci,
        )
    };

    let (estimate, failure) = if snps_per_tag.is_empty() {
        (None, Some("no locus carries a tag id".to_string()))
    } else {
        match estimate_zero_class(&snps_per_tag, options.nsim, options.tolerance) {
            Ok(estimate) => (Some(estimate), None),
            Err(e) => {
                warn!("Invariant tag count unavailable: {}", e);
                (None, Some(e.to_string()))
            }
        }
    };
    let invariant_sites = estimate.map(|e| e.zero_class as f64 * mean_tag_length);

    info!(
        "{} tags carry {} loci ({} secondaries)",
        tags.len(),
        tagged_loci,
        tagged_loci - tags.len()
    );
    Ok(SecondariesReport {
        n_loci: matrix.n_loci(),
        untagged_loci,
        n_tags: tags.len(),
        n_secondaries: tagged_loci - tags.len(),
        snps_per_tag,
        mean_tag_length,
        tag_length_source,
        estimate,
        invariant_sites,
        failure,
    })
}
