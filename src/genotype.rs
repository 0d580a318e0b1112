// genotype.rs

use crate::error::PopGenError;

use ndarray::{Array2, ArrayView1, Axis};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of marker stored in a [`GenotypeMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Biallelic SNP, dosage in {0, 1, 2}.
    Snp,
    /// Presence/absence marker, dosage in {0, 1}.
    PresenceAbsence,
}

impl DataType {
    pub fn ploidy(self) -> u8 {
        match self {
            DataType::Snp => 2,
            DataType::PresenceAbsence => 1,
        }
    }
}

/// Per-locus metadata carried alongside the genotype calls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocusInfo {
    pub id: String,
    pub chromosome: Option<String>,
    pub position: Option<u64>,
    /// Sequence tag (clone) the SNP was called on; loci sharing a tag are secondaries.
    pub tag_id: Option<String>,
    pub tag_length: Option<usize>,
}

impl LocusInfo {
    pub fn new(id: impl Into<String>) -> Self {
        LocusInfo {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn mapped(id: impl Into<String>, chromosome: impl Into<String>, position: u64) -> Self {
        LocusInfo {
            id: id.into(),
            chromosome: Some(chromosome.into()),
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag_id: impl Into<String>, tag_length: Option<usize>) -> Self {
        self.tag_id = Some(tag_id.into());
        self.tag_length = tag_length;
        self
    }

    pub fn is_mapped(&self) -> bool {
        self.chromosome.is_some() && self.position.is_some()
    }
}

/// Allele tallies for one locus over a set of individuals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlleleCounts {
    /// Individuals with a non-missing call.
    pub called: usize,
    /// Sum of dosages over called individuals.
    pub dosage_sum: u32,
    /// Calls strictly between 0 and ploidy.
    pub heterozygotes: usize,
}

impl AlleleCounts {
    /// Mean dosage divided by ploidy; NaN when nothing was called.
    pub fn frequency(&self, ploidy: u8) -> f64 {
        if self.called == 0 {
            f64::NAN
        } else {
            self.dosage_sum as f64 / (self.called as f64 * ploidy as f64)
        }
    }

    /// Fraction of heterozygous calls; NaN when nothing was called.
    pub fn observed_heterozygosity(&self) -> f64 {
        if self.called == 0 {
            f64::NAN
        } else {
            self.heterozygotes as f64 / self.called as f64
        }
    }

    /// Copies of the less common allele among called individuals.
    pub fn minor_allele_count(&self, ploidy: u8) -> u32 {
        let total = self.called as u32 * ploidy as u32;
        self.dosage_sum.min(total - self.dosage_sum)
    }
}

/// Individuals (rows) x loci (columns) matrix of allele dosages.
///
/// The matrix is a value: every filtering step returns a new matrix and leaves
/// the original untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeMatrix {
    calls: Array2<Option<u8>>,
    data_type: DataType,
    individuals: Vec<String>,
    loci: Vec<LocusInfo>,
}

impl GenotypeMatrix {
    /// Builds a matrix from a row-major numeric buffer where `missing` marks an absent call.
    pub fn from_raw(
        values: &[u8],
        missing: u8,
        data_type: DataType,
        individuals: Vec<String>,
        loci: Vec<LocusInfo>,
    ) -> Result<Self, PopGenError> {
        let (n_ind, n_loci) = (individuals.len(), loci.len());
        if values.len() != n_ind * n_loci {
            return Err(PopGenError::Shape {
                found: values.len(),
                individuals: n_ind,
                loci: n_loci,
            });
        }
        let cells: Vec<Option<u8>> = values
            .iter()
            .map(|&v| if v == missing { None } else { Some(v) })
            .collect();
        let calls = Array2::from_shape_vec((n_ind, n_loci), cells).map_err(|_| PopGenError::Shape {
            found: values.len(),
            individuals: n_ind,
            loci: n_loci,
        })?;
        Self::from_calls(calls, data_type, individuals, loci)
    }

    pub fn from_calls(
        calls: Array2<Option<u8>>,
        data_type: DataType,
        individuals: Vec<String>,
        loci: Vec<LocusInfo>,
    ) -> Result<Self, PopGenError> {
        if calls.nrows() != individuals.len() {
            return Err(PopGenError::Metadata(format!(
                "{} individual names for {} matrix rows",
                individuals.len(),
                calls.nrows()
            )));
        }
        if calls.ncols() != loci.len() {
            return Err(PopGenError::Metadata(format!(
                "{} locus records for {} matrix columns",
                loci.len(),
                calls.ncols()
            )));
        }
        let ploidy = data_type.ploidy();
        for ((individual, locus), call) in calls.indexed_iter() {
            if let Some(value) = *call {
                if value > ploidy {
                    return Err(PopGenError::InvalidDosage {
                        individual,
                        locus,
                        value,
                        ploidy,
                    });
                }
            }
        }
        Ok(GenotypeMatrix {
            calls,
            data_type,
            individuals,
            loci,
        })
    }

    /// Row-per-individual constructor with generated labels (`ind1..`, `loc1..`).
    pub fn from_rows(rows: Vec<Vec<Option<u8>>>, data_type: DataType) -> Result<Self, PopGenError> {
        let n_ind = rows.len();
        let n_loci = rows.first().map_or(0, Vec::len);
        if let Some((row, bad)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_loci) {
            return Err(PopGenError::Metadata(format!(
                "row {} has {} calls, expected {}",
                row,
                bad.len(),
                n_loci
            )));
        }
        let cells: Vec<Option<u8>> = rows.into_iter().flatten().collect();
        let calls = Array2::from_shape_vec((n_ind, n_loci), cells).map_err(|_| PopGenError::Shape {
            found: n_ind * n_loci,
            individuals: n_ind,
            loci: n_loci,
        })?;
        let individuals = (1..=n_ind).map(|i| format!("ind{}", i)).collect();
        let loci = (1..=n_loci).map(|j| LocusInfo::new(format!("loc{}", j))).collect();
        Self::from_calls(calls, data_type, individuals, loci)
    }

    /// Replaces the locus metadata, keeping the calls.
    pub fn with_loci(self, loci: Vec<LocusInfo>) -> Result<Self, PopGenError> {
        Self::from_calls(self.calls, self.data_type, self.individuals, loci)
    }

    pub fn n_individuals(&self) -> usize {
        self.calls.nrows()
    }

    pub fn n_loci(&self) -> usize {
        self.calls.ncols()
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn ploidy(&self) -> u8 {
        self.data_type.ploidy()
    }

    pub fn individuals(&self) -> &[String] {
        &self.individuals
    }

    pub fn loci(&self) -> &[LocusInfo] {
        &self.loci
    }

    pub fn calls(&self) -> &Array2<Option<u8>> {
        &self.calls
    }

    pub fn get(&self, individual: usize, locus: usize) -> Option<u8> {
        self.calls[[individual, locus]]
    }

    pub fn locus_calls(&self, locus: usize) -> ArrayView1<'_, Option<u8>> {
        self.calls.column(locus)
    }

    pub fn individual_calls(&self, individual: usize) -> ArrayView1<'_, Option<u8>> {
        self.calls.row(individual)
    }

    /// Tallies one locus over the given rows.
    pub fn allele_counts(&self, locus: usize, rows: &[usize]) -> AlleleCounts {
        let ploidy = self.ploidy();
        let column = self.calls.column(locus);
        let mut counts = AlleleCounts::default();
        for &row in rows {
            if let Some(dosage) = column[row] {
                counts.called += 1;
                counts.dosage_sum += dosage as u32;
                if dosage > 0 && dosage < ploidy {
                    counts.heterozygotes += 1;
                }
            }
        }
        counts
    }

    /// Tallies one locus over every individual.
    pub fn locus_counts(&self, locus: usize) -> AlleleCounts {
        let ploidy = self.ploidy();
        let mut counts = AlleleCounts::default();
        for dosage in self.calls.column(locus).iter().flatten() {
            counts.called += 1;
            counts.dosage_sum += *dosage as u32;
            if *dosage > 0 && *dosage < ploidy {
                counts.heterozygotes += 1;
            }
        }
        counts
    }

    pub fn allele_frequency(&self, locus: usize, rows: &[usize]) -> f64 {
        self.allele_counts(locus, rows).frequency(self.ploidy())
    }

    /// Minor allele frequency over all individuals; NaN for an uncalled locus.
    pub fn minor_allele_frequency(&self, locus: usize) -> f64 {
        let q = self.locus_counts(locus).frequency(self.ploidy());
        q.min(1.0 - q)
    }

    pub fn locus_call_rate(&self, locus: usize) -> f64 {
        if self.n_individuals() == 0 {
            return f64::NAN;
        }
        let called = self.calls.column(locus).iter().filter(|c| c.is_some()).count();
        called as f64 / self.n_individuals() as f64
    }

    pub fn individual_call_rate(&self, individual: usize) -> f64 {
        if self.n_loci() == 0 {
            return f64::NAN;
        }
        let called = self.calls.row(individual).iter().filter(|c| c.is_some()).count();
        called as f64 / self.n_loci() as f64
    }

    /// New matrix holding only the listed loci, in the listed order.
    pub fn select_loci(&self, keep: &[usize]) -> GenotypeMatrix {
        GenotypeMatrix {
            calls: self.calls.select(Axis(1), keep),
            data_type: self.data_type,
            individuals: self.individuals.clone(),
            loci: keep.iter().map(|&l| self.loci[l].clone()).collect(),
        }
    }

    pub fn drop_loci(&self, drop: &BTreeSet<usize>) -> GenotypeMatrix {
        let keep: Vec<usize> = (0..self.n_loci()).filter(|l| !drop.contains(l)).collect();
        self.select_loci(&keep)
    }

    /// New matrix holding only the listed individuals, in the listed order.
    pub fn select_individuals(&self, keep: &[usize]) -> GenotypeMatrix {
        GenotypeMatrix {
            calls: self.calls.select(Axis(0), keep),
            data_type: self.data_type,
            individuals: keep.iter().map(|&i| self.individuals[i].clone()).collect(),
            loci: self.loci.clone(),
        }
    }

    pub fn drop_individuals(&self, drop: &BTreeSet<usize>) -> GenotypeMatrix {
        let keep: Vec<usize> = (0..self.n_individuals()).filter(|i| !drop.contains(i)).collect();
        self.select_individuals(&keep)
    }
}

/// One population of a [`PopulationPartition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    pub label: String,
    pub rows: Vec<usize>,
}

impl Population {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read-only index from population label to matrix rows, built once and shared by every engine.
///
/// Populations are kept in sorted label order so that every iteration over the
/// partition is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationPartition {
    populations: Vec<Population>,
    n_individuals: usize,
}

impl PopulationPartition {
    /// Builds the partition from a per-individual population label vector.
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Self {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, label) in assignments.iter().enumerate() {
            groups.entry(label.as_ref()).or_default().push(row);
        }
        let populations = groups
            .into_iter()
            .map(|(label, rows)| Population {
                label: label.to_string(),
                rows,
            })
            .collect();
        PopulationPartition {
            populations,
            n_individuals: assignments.len(),
        }
    }

    /// Builds the partition from explicit groups. Every row in `0..n_individuals`
    /// must appear in exactly one group; empty groups are allowed.
    pub fn from_groups(groups: Vec<(String, Vec<usize>)>, n_individuals: usize) -> Result<Self, PopGenError> {
        let mut seen = vec![false; n_individuals];
        for (label, rows) in &groups {
            for &row in rows {
                if row >= n_individuals || seen[row] {
                    return Err(PopGenError::Metadata(format!(
                        "row {} of population '{}' is out of range or assigned twice",
                        row, label
                    )));
                }
                seen[row] = true;
            }
        }
        if let Some(row) = seen.iter().position(|s| !s) {
            return Err(PopGenError::Metadata(format!("row {} has no population", row)));
        }
        let mut populations: Vec<Population> = groups
            .into_iter()
            .map(|(label, mut rows)| {
                rows.sort_unstable();
                Population { label, rows }
            })
            .collect();
        populations.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(PopulationPartition {
            populations,
            n_individuals,
        })
    }

    pub fn n_individuals(&self) -> usize {
        self.n_individuals
    }

    pub fn len(&self) -> usize {
        self.populations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.populations.is_empty()
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn labels(&self) -> Vec<&str> {
        self.populations.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn get(&self, label: &str) -> Option<&Population> {
        self.populations.iter().find(|p| p.label == label)
    }

    /// Checks that the partition describes the rows of `matrix`.
    pub fn check_matches(&self, matrix: &GenotypeMatrix) -> Result<(), PopGenError> {
        if self.n_individuals != matrix.n_individuals() {
            return Err(PopGenError::PartitionMismatch {
                assigned: self.n_individuals,
                individuals: matrix.n_individuals(),
            });
        }
        Ok(())
    }

    /// Partition for a matrix reduced to the `keep` rows (as produced by
    /// [`GenotypeMatrix::select_individuals`]). Populations left empty are retained.
    pub fn select_rows(&self, keep: &[usize]) -> PopulationPartition {
        let mut new_index = vec![None; self.n_individuals];
        for (new_row, &old_row) in keep.iter().enumerate() {
            new_index[old_row] = Some(new_row);
        }
        let populations = self
            .populations
            .iter()
            .map(|p| {
                let mut rows: Vec<usize> = p.rows.iter().filter_map(|&r| new_index[r]).collect();
                rows.sort_unstable();
                Population {
                    label: p.label.clone(),
                    rows,
                }
            })
            .collect();
        PopulationPartition {
            populations,
            n_individuals: keep.len(),
        }
    }

    pub fn drop_rows(&self, drop: &BTreeSet<usize>) -> PopulationPartition {
        let keep: Vec<usize> = (0..self.n_individuals).filter(|r| !drop.contains(r)).collect();
        self.select_rows(&keep)
    }
}
