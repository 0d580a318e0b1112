#[cfg(test)]
mod missing_tests {
    use super::super::{labels, snp_matrix};
    use crate::error::PopGenError;
    use crate::genotype::{GenotypeMatrix, PopulationPartition};
    use crate::missing::*;
    use std::collections::BTreeSet;

    /// Locus 0 is uncalled in A, locus 1 is uncalled everywhere, and ind4
    /// only has a call at locus 0.
    fn patchy() -> (GenotypeMatrix, PopulationPartition) {
        let matrix = snp_matrix(vec![
            vec![None, None, Some(0)],
            vec![None, None, Some(1)],
            vec![Some(1), None, Some(2)],
            vec![Some(2), None, None],
        ]);
        let partition = PopulationPartition::from_assignments(&labels(&[("A", 2), ("B", 2)]));
        (matrix, partition)
    }

    #[test]
    fn test_global_scan() {
        let (matrix, _) = patchy();
        let scan = scan_missingness(&matrix, None).unwrap();
        assert_eq!(scan.loci, BTreeSet::from([1]));
        assert!(scan.individuals.is_empty());
    }

    #[test]
    fn test_by_population_scan_takes_union() {
        let (matrix, partition) = patchy();
        assert_eq!(
            all_missing_loci_by_population(&matrix, &partition).unwrap(),
            BTreeSet::from([0, 1])
        );
        let scan = scan_missingness(&matrix, Some(&partition)).unwrap();
        assert_eq!(scan.loci, BTreeSet::from([0, 1]));
        // ind4 has nothing left once locus 0 is gone
        assert_eq!(scan.individuals, BTreeSet::from([3]));
    }

    #[test]
    fn test_empty_population_is_skipped() {
        let (matrix, _) = patchy();
        let partition = PopulationPartition::from_groups(
            vec![
                ("A".to_string(), vec![0, 1]),
                ("B".to_string(), vec![2, 3]),
                ("C".to_string(), vec![]),
            ],
            4,
        )
        .unwrap();
        let scan = scan_missingness(&matrix, Some(&partition)).unwrap();
        assert_eq!(scan.loci, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_filter_all_missing() {
        let (matrix, partition) = patchy();
        let (filtered, filtered_partition, scan) = filter_all_missing(&matrix, &partition, true).unwrap();
        assert!(!scan.is_empty());
        assert_eq!(filtered.n_loci(), 1);
        assert_eq!(filtered.n_individuals(), 3);
        assert_eq!(filtered.loci()[0].id, "loc3");
        assert_eq!(filtered.individuals(), &["ind1", "ind2", "ind3"]);
        assert_eq!(filtered_partition.n_individuals(), 3);
        assert_eq!(filtered_partition.get("A").unwrap().rows, vec![0, 1]);
        assert_eq!(filtered_partition.get("B").unwrap().rows, vec![2]);
        assert!(filtered_partition.check_matches(&filtered).is_ok());
        // Source matrix untouched
        assert_eq!(matrix.n_loci(), 3);
    }

    #[test]
    fn test_nothing_missing() {
        let matrix = snp_matrix(vec![vec![Some(0), Some(1)], vec![Some(2), Some(1)]]);
        let partition = PopulationPartition::from_assignments(&labels(&[("A", 1), ("B", 1)]));
        let (filtered, _, scan) = filter_all_missing(&matrix, &partition, true).unwrap();
        assert!(scan.is_empty());
        assert_eq!(filtered, matrix);
    }

    #[test]
    fn test_partition_mismatch() {
        let (matrix, _) = patchy();
        let partition = PopulationPartition::from_assignments(&labels(&[("A", 3)]));
        assert!(matches!(
            filter_all_missing(&matrix, &partition, true),
            Err(PopGenError::PartitionMismatch { assigned: 3, individuals: 4 })
        ));
    }

    #[test]
    fn test_filter_call_rate() {
        let (matrix, _) = patchy();
        let (by_locus, removed) = filter_call_rate(&matrix, 0.5, CallRateAxis::Loci).unwrap();
        assert_eq!(removed, BTreeSet::from([1]));
        assert_eq!(by_locus.n_loci(), 2);

        let (by_individual, removed) = filter_call_rate(&matrix, 0.5, CallRateAxis::Individuals).unwrap();
        assert_eq!(removed, BTreeSet::from([0, 1, 3]));
        assert_eq!(by_individual.individuals(), &["ind3"]);

        assert!(matches!(
            filter_call_rate(&matrix, 1.5, CallRateAxis::Loci),
            Err(PopGenError::InvalidConfig(_))
        ));
    }
}
