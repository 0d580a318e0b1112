#[cfg(test)]
mod filter_tests {
    use super::super::snp_matrix;
    use crate::config::MafThreshold;
    use crate::error::PopGenError;
    use crate::filter::*;
    use crate::genotype::{GenotypeMatrix, LocusInfo};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    /// Four individuals: q = 0.125, q = 0.25, uncalled, fixed.
    fn maf_matrix() -> GenotypeMatrix {
        snp_matrix(vec![
            vec![Some(0), Some(1), None, Some(2)],
            vec![Some(0), Some(1), None, Some(2)],
            vec![Some(0), Some(0), None, Some(2)],
            vec![Some(1), Some(0), None, Some(2)],
        ])
    }

    /// Tags T1 (three loci), T2 (one locus) and one untagged locus.
    fn tagged_matrix() -> GenotypeMatrix {
        let rows = vec![vec![Some(0), Some(1), Some(2), Some(1), Some(0)]; 3];
        snp_matrix(rows)
            .with_loci(vec![
                LocusInfo::new("a").with_tag("T1", Some(69)),
                LocusInfo::new("b").with_tag("T1", Some(69)),
                LocusInfo::new("c").with_tag("T2", None),
                LocusInfo::new("d"),
                LocusInfo::new("e").with_tag("T1", Some(69)),
            ])
            .unwrap()
    }

    fn ids(matrix: &GenotypeMatrix) -> Vec<&str> {
        matrix.loci().iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_filter_maf_frequency() {
        let (filtered, removed) = filter_maf(&maf_matrix(), MafThreshold::Frequency(0.2)).unwrap();
        assert_eq!(removed, BTreeSet::from([0, 2, 3]));
        assert_eq!(ids(&filtered), vec!["loc2"]);
        assert_eq!(filtered.n_individuals(), 4);
    }

    #[test]
    fn test_filter_maf_count() {
        let matrix = maf_matrix();
        let (_, removed) = filter_maf(&matrix, MafThreshold::MinCount(2)).unwrap();
        assert_eq!(removed, BTreeSet::from([0, 2, 3]));
        let (_, removed) = filter_maf(&matrix, MafThreshold::MinCount(1)).unwrap();
        assert_eq!(removed, BTreeSet::from([2, 3]));
    }

    #[test]
    fn test_filter_maf_rejects_bad_frequency() {
        assert!(matches!(
            filter_maf(&maf_matrix(), MafThreshold::Frequency(0.7)),
            Err(PopGenError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_filter_secondaries_first() {
        let matrix = tagged_matrix();
        let (filtered, removed) = filter_secondaries(&matrix, SecondaryPolicy::First);
        assert_eq!(removed, BTreeSet::from([1, 4]));
        assert_eq!(ids(&filtered), vec!["a", "c", "d"]);
        // Input untouched
        assert_eq!(matrix.n_loci(), 5);
    }

    #[test]
    fn test_filter_secondaries_random_keeps_one_per_tag() {
        let matrix = tagged_matrix();
        let (filtered, removed) = filter_secondaries(&matrix, SecondaryPolicy::Random { seed: Some(11) });
        assert_eq!(removed.len(), 2);
        assert_eq!(filtered.n_loci(), 3);
        let kept = ids(&filtered);
        assert!(kept.contains(&"c"));
        assert!(kept.contains(&"d"));
        let t1 = kept.iter().filter(|id| ["a", "b", "e"].contains(id)).count();
        assert_eq!(t1, 1);

        let (_, again) = filter_secondaries(&matrix, SecondaryPolicy::Random { seed: Some(11) });
        assert_eq!(removed, again);
        let (_, with_rng) = filter_secondaries_with_rng(&matrix, &mut StdRng::seed_from_u64(11));
        assert_eq!(removed, with_rng);
    }
}
