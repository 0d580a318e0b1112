use crate::error::PopGenError;

use clap::{Args, Parser, ValueEnum};
use std::fmt;
use std::str::FromStr;

/// How populations are paired up by the private-allele engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ComparisonMethod {
    /// Every unordered pair of populations.
    Pairwise,
    /// Each population against the pooled remainder.
    OneVsRest,
}

/// Distance window for the LD scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdWindow {
    /// Only pairs at most this many base pairs apart.
    MaxDistance(u64),
    /// Ignore map positions and scan all pairs on one synthetic chromosome.
    Unmapped,
}

impl FromStr for LdWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unmapped") {
            return Ok(LdWindow::Unmapped);
        }
        match s.parse::<u64>() {
            Ok(0) => Err("LD window must be a positive integer".to_string()),
            Ok(bp) => Ok(LdWindow::MaxDistance(bp)),
            Err(_) => Err(format!("expected a positive integer or 'unmapped', got '{}'", s)),
        }
    }
}

impl fmt::Display for LdWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LdWindow::MaxDistance(bp) => write!(f, "{}", bp),
            LdWindow::Unmapped => write!(f, "unmapped"),
        }
    }
}

/// Minor allele threshold: a frequency (`0.05`) or a minimum count of minor allele copies (`3`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MafThreshold {
    Frequency(f64),
    MinCount(u32),
}

impl FromStr for MafThreshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('.') || s.contains('e') || s.contains('E') {
            let freq: f64 = s
                .parse()
                .map_err(|_| format!("invalid MAF frequency '{}'", s))?;
            if !(0.0..=0.5).contains(&freq) {
                return Err(format!("MAF frequency must lie in [0, 0.5], got {}", freq));
            }
            Ok(MafThreshold::Frequency(freq))
        } else {
            s.parse::<u32>()
                .map(MafThreshold::MinCount)
                .map_err(|_| format!("invalid minor allele count '{}'", s))
        }
    }
}

impl fmt::Display for MafThreshold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MafThreshold::Frequency(freq) => write!(f, "{:?}", freq),
            MafThreshold::MinCount(count) => write!(f, "{}", count),
        }
    }
}

/// Largest `digits` value that still changes an f64 when rounding.
pub const MAX_DIGITS: u32 = 15;

#[derive(Args, Debug, Clone, PartialEq)]
pub struct DiversityOptions {
    /// Decimal places kept in the per-locus and overall tables; `None` keeps full precision
    #[arg(long, default_value = "4")]
    pub digits: Option<u32>,
}

impl Default for DiversityOptions {
    fn default() -> Self {
        DiversityOptions { digits: Some(4) }
    }
}

impl DiversityOptions {
    /// Options that leave every statistic at full precision.
    pub fn unrounded() -> Self {
        DiversityOptions { digits: None }
    }

    pub fn validate(&self) -> Result<(), PopGenError> {
        match self.digits {
            Some(d) if d > MAX_DIGITS => Err(PopGenError::InvalidConfig(format!(
                "digits must be at most {}, got {}",
                MAX_DIGITS, d
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PrivateAlleleOptions {
    #[arg(long, value_enum, default_value_t = ComparisonMethod::Pairwise)]
    pub method: ComparisonMethod,

    /// Run the bootstrap test for asymmetry of private allele counts
    #[arg(long, default_value_t = false)]
    pub test_asym: bool,

    #[arg(long, default_value_t = 100)]
    pub test_asym_boot: usize,

    /// Seed for the bootstrap; drawn from entropy when absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the locus ids behind each private/fixed count
    #[arg(long, default_value_t = false)]
    pub return_loci: bool,
}

impl Default for PrivateAlleleOptions {
    fn default() -> Self {
        PrivateAlleleOptions {
            method: ComparisonMethod::Pairwise,
            test_asym: false,
            test_asym_boot: 100,
            seed: None,
            return_loci: false,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct LdOptions {
    /// Maximum distance in bp between SNP pairs, or 'unmapped'
    #[arg(long, default_value_t = LdWindow::MaxDistance(10_000_000))]
    pub ld_max_pairwise: LdWindow,

    /// Minor allele threshold applied within each population; 0 disables the filter
    #[arg(long, default_value_t = MafThreshold::Frequency(0.05))]
    pub maf: MafThreshold,

    /// Populations with this many individuals or fewer are skipped
    #[arg(long, default_value_t = 10)]
    pub ind_limit: usize,
}

impl Default for LdOptions {
    fn default() -> Self {
        LdOptions {
            ld_max_pairwise: LdWindow::MaxDistance(10_000_000),
            maf: MafThreshold::Frequency(0.05),
            ind_limit: 10,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SecondariesOptions {
    /// Iteration cap for the zero-class fixed-point search
    #[arg(long, default_value_t = 1000)]
    pub nsim: usize,

    #[arg(long, default_value_t = 1e-5)]
    pub tolerance: f64,

    /// Mean tag length used when loci carry no tag length
    #[arg(long, default_value_t = 69)]
    pub taglength: usize,
}

impl Default for SecondariesOptions {
    fn default() -> Self {
        SecondariesOptions {
            nsim: 1000,
            tolerance: 1e-5,
            taglength: 69,
        }
    }
}

/// Every option recognised by the engines, ready to be embedded in a command line.
#[derive(Parser, Debug, Clone, PartialEq, Default)]
#[command(author, version, about, long_about = None)]
pub struct AnalysisConfig {
    #[command(flatten)]
    pub diversity: DiversityOptions,

    #[command(flatten)]
    pub private_alleles: PrivateAlleleOptions,

    #[command(flatten)]
    pub ld: LdOptions,

    #[command(flatten)]
    pub secondaries: SecondariesOptions,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), PopGenError> {
        self.diversity.validate()?;
        self.private_alleles.validate()?;
        self.ld.validate()?;
        self.secondaries.validate()
    }
}

impl PrivateAlleleOptions {
    pub fn validate(&self) -> Result<(), PopGenError> {
        if self.test_asym && self.test_asym_boot == 0 {
            return Err(PopGenError::InvalidConfig(
                "test-asym-boot must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

impl LdOptions {
    pub fn validate(&self) -> Result<(), PopGenError> {
        if let LdWindow::MaxDistance(0) = self.ld_max_pairwise {
            return Err(PopGenError::InvalidConfig(
                "ld-max-pairwise must be a positive integer".to_string(),
            ));
        }
        if self.ind_limit == 0 {
            return Err(PopGenError::InvalidConfig(
                "ind-limit must be a positive integer".to_string(),
            ));
        }
        if let MafThreshold::Frequency(f) = self.maf {
            if !(0.0..=0.5).contains(&f) {
                return Err(PopGenError::InvalidConfig(format!(
                    "maf frequency must lie in [0, 0.5], got {}",
                    f
                )));
            }
        }
        Ok(())
    }
}

impl SecondariesOptions {
    pub fn validate(&self) -> Result<(), PopGenError> {
        if self.nsim == 0 {
            return Err(PopGenError::InvalidConfig("nsim must be a positive integer".to_string()));
        }
        if self.taglength == 0 {
            return Err(PopGenError::InvalidConfig(
                "taglength must be a positive integer".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(PopGenError::InvalidConfig("tolerance must be positive".to_string()));
        }
        Ok(())
    }
}
