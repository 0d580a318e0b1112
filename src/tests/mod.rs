mod filter_tests;
mod missing_tests;
mod poisson_tests;

use crate::genotype::{DataType, GenotypeMatrix};

/// Builds a SNP matrix from per-individual dosage rows, `None` for a missing call.
pub(crate) fn snp_matrix(rows: Vec<Vec<Option<u8>>>) -> GenotypeMatrix {
    GenotypeMatrix::from_rows(rows, DataType::Snp).expect("valid test matrix")
}

/// Individuals with the listed dosages at a single locus.
pub(crate) fn single_locus(dosages: &[u8]) -> Vec<Vec<Option<u8>>> {
    dosages.iter().map(|&d| vec![Some(d)]).collect()
}

/// Population labels: `count` copies of each label, in order.
pub(crate) fn labels(groups: &[(&str, usize)]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|&(label, count)| std::iter::repeat(label.to_string()).take(count))
        .collect()
}

pub(crate) fn assert_close(actual: f64, expected: f64, tolerance: f64, what: &str) {
    assert!(
        (actual - expected).abs() < tolerance,
        "{}: expected {}, got {}",
        what,
        expected,
        actual
    );
}
