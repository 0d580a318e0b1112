use std::io;

// Custom error type shared by every engine
#[derive(Debug, thiserror::Error)]
pub enum PopGenError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Genotype buffer holds {found} values, expected {individuals} individuals x {loci} loci")]
    Shape {
        found: usize,
        individuals: usize,
        loci: usize,
    },

    #[error("Metadata mismatch: {0}")]
    Metadata(String),

    #[error("Dosage {value} for individual {individual} at locus {locus} exceeds ploidy {ploidy}")]
    InvalidDosage {
        individual: usize,
        locus: usize,
        value: u8,
        ploidy: u8,
    },

    #[error("Population assignment covers {assigned} individuals but the matrix has {individuals}")]
    PartitionMismatch { assigned: usize, individuals: usize },

    #[error("Population '{population}' has {count} individual(s); at least 2 are required")]
    PopulationTooSmall { population: String, count: usize },

    #[error("{operation} requires at least 2 populations, found {found}")]
    TooFewPopulations { operation: &'static str, found: usize },

    #[error("Zero-class estimation did not converge after {iterations} iterations (last lambda {last_lambda})")]
    EstimationFailure { iterations: usize, last_lambda: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
