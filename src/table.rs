// table.rs
//
// CSV export of result tables for downstream reporting.

use crate::error::PopGenError;
use crate::ld::LdScan;
use crate::private_alleles::{PrivateAlleleMatrix, PrivateAlleleReport};
use crate::secondaries::SecondariesReport;
use crate::stats::{BasicStats, Differentiation};

use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn create_csv_writer(output_file: &Path) -> Result<csv::Writer<BufWriter<File>>, PopGenError> {
    let file = File::create(output_file)?;
    Ok(WriterBuilder::new().from_writer(BufWriter::new(file)))
}

/// Formats an Option<f64>, writing None or NaN as "NA".
fn format_optional_float(val_opt: Option<f64>) -> String {
    match val_opt {
        Some(f) if f.is_nan() => "NA".to_string(),
        Some(f) => format!("{:.6}", f),
        None => "NA".to_string(),
    }
}

fn format_optional_count(val_opt: Option<u64>) -> String {
    val_opt.map_or_else(|| "NA".to_string(), |v| v.to_string())
}

fn format_float(f: f64) -> String {
    format_optional_float(Some(f))
}

fn differentiation_fields(stats: &Differentiation) -> Vec<String> {
    stats.values().iter().map(|&v| format_float(v)).collect()
}

/// Per-locus table followed by one `overall` row.
pub fn write_basic_stats<W: Write>(writer: &mut csv::Writer<W>, stats: &BasicStats) -> Result<(), PopGenError> {
    let mut header = vec!["locus"];
    header.extend(Differentiation::COLUMNS);
    writer.write_record(&header)?;
    for (id, row) in stats.locus_ids.iter().zip(&stats.per_locus) {
        let mut record = vec![id.clone()];
        record.extend(differentiation_fields(row));
        writer.write_record(&record)?;
    }
    let mut overall = vec!["overall".to_string()];
    overall.extend(differentiation_fields(&stats.overall));
    writer.write_record(&overall)?;
    writer.flush()?;
    Ok(())
}

pub fn write_private_alleles<W: Write>(
    writer: &mut csv::Writer<W>,
    report: &PrivateAlleleReport,
) -> Result<(), PopGenError> {
    writer.write_record([
        "pop1", "pop2", "N1", "N2", "fixed", "priv1", "priv2", "totalpriv", "Chao1", "Chao2", "AFD", "asym",
        "asym_p",
    ])?;
    for pair in &report.pairs {
        writer.write_record(&[
            pair.pop1.clone(),
            pair.pop2.clone(),
            pair.n1.to_string(),
            pair.n2.to_string(),
            pair.fixed.to_string(),
            pair.priv1.to_string(),
            pair.priv2.to_string(),
            pair.totalpriv.to_string(),
            format_optional_float(pair.chao1),
            format_optional_float(pair.chao2),
            format_float(pair.afd),
            format_float(pair.asym),
            format_optional_float(pair.asym_p),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Square matrix with population labels as the first column and the header.
pub fn write_private_matrix<W: Write>(
    writer: &mut csv::Writer<W>,
    matrix: &PrivateAlleleMatrix,
) -> Result<(), PopGenError> {
    let mut header = vec![String::new()];
    header.extend(matrix.populations.iter().cloned());
    writer.write_record(&header)?;
    for (label, row) in matrix.populations.iter().zip(matrix.counts.rows()) {
        let mut record = vec![label.clone()];
        record.extend(row.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_ld_pairs<W: Write>(writer: &mut csv::Writer<W>, scan: &LdScan) -> Result<(), PopGenError> {
    writer.write_record([
        "population", "chromosome", "position_a", "position_b", "ld_statistic", "distance", "locus_a", "locus_b",
    ])?;
    for pair in &scan.pairs {
        writer.write_record(&[
            pair.population.clone(),
            pair.chromosome.clone(),
            format_optional_count(pair.position_a),
            format_optional_count(pair.position_b),
            format_float(pair.ld_statistic),
            format_optional_count(pair.distance),
            pair.locus_a.clone(),
            pair.locus_b.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// SNPs-per-tag frequency table, with the estimated zero class as the `0` row when available.
pub fn write_secondaries<W: Write>(
    writer: &mut csv::Writer<W>,
    report: &SecondariesReport,
) -> Result<(), PopGenError> {
    writer.write_record(["snps_per_tag", "tags"])?;
    match &report.estimate {
        Some(estimate) => writer.write_record(["0".to_string(), estimate.zero_class.to_string()])?,
        None => writer.write_record(["0", "NA"])?,
    }
    for (snps, tags) in &report.snps_per_tag {
        writer.write_record([snps.to_string(), tags.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}
