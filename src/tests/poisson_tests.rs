#[cfg(test)]
mod poisson_tests {
    use super::super::{assert_close, snp_matrix};
    use crate::config::SecondariesOptions;
    use crate::error::PopGenError;
    use crate::genotype::{GenotypeMatrix, LocusInfo};
    use crate::poisson::*;
    use crate::secondaries::*;
    use std::collections::BTreeMap;

    /// Truncated Poisson(1.5) counts for 1,000,000 units, zero class removed.
    fn poisson_table() -> BTreeMap<u64, u64> {
        BTreeMap::from([
            (1, 334_695),
            (2, 251_021),
            (3, 125_511),
            (4, 47_067),
            (5, 14_120),
            (6, 3_530),
            (7, 756),
            (8, 142),
            (9, 24),
            (10, 4),
        ])
    }

    #[test]
    fn test_recovers_lambda_and_zero_class() {
        let estimate = estimate_zero_class(&poisson_table(), DEFAULT_NSIM, DEFAULT_TOLERANCE).unwrap();
        assert!(estimate.fit.converged);
        assert!(estimate.fit.iterations < 100);
        assert_close(estimate.fit.lambda, 1.5, 0.015, "lambda");
        assert_eq!(estimate.n_observed, 776_870);
        // 1,000,000 * exp(-1.5) = 223,130
        let zero = estimate.zero_class as f64;
        assert!((zero - 223_130.0).abs() / 223_130.0 < 0.01, "zero class {}", zero);
    }

    #[test]
    fn test_fit_truncated_poisson() {
        let fit = fit_truncated_poisson(5.0, 1000, 1e-8);
        assert!(fit.converged);
        // Fixed point of k = 5 (1 - exp(-k))
        assert_close(fit.lambda, 5.0 * (1.0 - (-fit.lambda).exp()), 1e-7, "fixed point");
        assert_close(dpois_zero(0.0), 1.0, 1e-15, "p0 at zero");
    }

    #[test]
    fn test_non_convergence_is_an_error() {
        // A truncated mean of 1 creeps towards zero far too slowly for five iterations.
        let table = BTreeMap::from([(1, 100)]);
        match estimate_zero_class(&table, 5, 1e-5) {
            Err(PopGenError::EstimationFailure { iterations, last_lambda }) => {
                assert_eq!(iterations, 5);
                assert!(last_lambda > 0.0 && last_lambda < 1.0);
            }
            other => panic!("expected EstimationFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_tables() {
        let with_zero = BTreeMap::from([(0, 10), (1, 5)]);
        assert!(matches!(
            estimate_zero_class(&with_zero, 100, 1e-5),
            Err(PopGenError::InvalidConfig(_))
        ));
        assert!(matches!(
            estimate_zero_class(&BTreeMap::new(), 100, 1e-5),
            Err(PopGenError::InvalidConfig(_))
        ));
    }

    /// Tags T1 x3, T2 x1, T3 x2, T4 x1 plus one untagged locus.
    fn tagged(lengths: bool) -> GenotypeMatrix {
        let tag = |id: &str, t: &str, len: usize| {
            LocusInfo::new(id).with_tag(t, if lengths { Some(len) } else { None })
        };
        let loci = vec![
            tag("s1", "T1", 100),
            tag("s2", "T1", 100),
            tag("s3", "T1", 100),
            tag("s4", "T2", 50),
            tag("s5", "T3", 80),
            tag("s6", "T3", 80),
            tag("s7", "T4", 70),
            LocusInfo::new("s8"),
        ];
        snp_matrix(vec![vec![Some(1); 8]; 2]).with_loci(loci).unwrap()
    }

    #[test]
    fn test_secondaries_report() {
        let report = report_secondaries(&tagged(false), &SecondariesOptions::default()).unwrap();
        assert_eq!(report.n_loci, 8);
        assert_eq!(report.untagged_loci, 1);
        assert_eq!(report.n_tags, 4);
        assert_eq!(report.n_secondaries, 3);
        assert_eq!(report.snps_per_tag, BTreeMap::from([(1, 2), (2, 1), (3, 1)]));
        assert_eq!(report.tag_length_source, TagLengthSource::Fallback);
        assert_eq!(report.mean_tag_length, 69.0);

        let estimate = report.estimate.expect("estimate");
        assert!(report.failure.is_none());
        assert_close(estimate.fit.truncated_mean, 1.75, 1e-12, "truncated mean");
        assert_close(
            report.invariant_sites.unwrap(),
            estimate.zero_class as f64 * 69.0,
            1e-9,
            "invariant sites",
        );
    }

    #[test]
    fn test_secondaries_report_uses_locus_tag_lengths() {
        let report = report_secondaries(&tagged(true), &SecondariesOptions::default()).unwrap();
        assert_eq!(report.tag_length_source, TagLengthSource::Loci);
        assert_close(report.mean_tag_length, 75.0, 1e-12, "mean tag length");
    }

    #[test]
    fn test_secondaries_report_failure_is_recorded() {
        let options = SecondariesOptions {
            nsim: 1,
            ..Default::default()
        };
        let report = report_secondaries(&tagged(false), &options).unwrap();
        assert!(report.estimate.is_none());
        assert!(report.invariant_sites.is_none());
        assert!(report.failure.is_some());
        assert_eq!(report.n_tags, 4);
    }

    #[test]
    fn test_secondaries_report_without_tags() {
        let matrix = snp_matrix(vec![vec![Some(0), Some(1)]]);
        let report = report_secondaries(&matrix, &SecondariesOptions::default()).unwrap();
        assert_eq!(report.n_tags, 0);
        assert!(report.snps_per_tag.is_empty());
        assert!(report.estimate.is_none());
        assert!(report.failure.is_some());
    }
}
