use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::Observation;
use crate::error::DashError;
use crate::table::CombinedTable;

#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    #[serde(rename = "CodigoISO3")]
    iso3: &'a str,
    #[serde(rename = "Pais")]
    country: &'a str,
    #[serde(rename = "Anio")]
    year: i32,
    #[serde(rename = "Valor")]
    value: f64,
    #[serde(rename = "Indicador")]
    indicator: &'a str,
}

impl<'a> From<&'a Observation> for ExportRecord<'a> {
    fn from(row: &'a Observation) -> Self {
        Self {
            iso3: &row.iso3,
            country: &row.country,
            year: row.year,
            value: row.value,
            indicator: &row.indicator,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub path: String,
    pub rows: usize,
}

pub fn export_file_name(indicator: &str) -> String {
    format!("latam_{}.csv", indicator.replace(' ', "_"))
}

pub fn write_csv<W: Write>(
    table: &CombinedTable,
    indicator: &str,
    writer: W,
) -> Result<usize, DashError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(["CodigoISO3", "Pais", "Anio", "Valor", "Indicador"])
        .map_err(|err| DashError::Export(err.to_string()))?;

    let mut rows = 0usize;
    for row in table.indicator_rows(indicator) {
        csv.serialize(ExportRecord::from(row))
            .map_err(|err| DashError::Export(err.to_string()))?;
        rows += 1;
    }
    csv.flush()
        .map_err(|err| DashError::Export(err.to_string()))?;
    Ok(rows)
}

pub fn export_indicator(
    table: &CombinedTable,
    indicator: &str,
    out_dir: &Utf8Path,
) -> Result<ExportResult, DashError> {
    std::fs::create_dir_all(out_dir.as_std_path())
        .map_err(|err| DashError::Filesystem(err.to_string()))?;
    let dest: Utf8PathBuf = out_dir.join(export_file_name(indicator));

    let mut temp = tempfile::Builder::new()
        .prefix("latam-export")
        .tempfile_in(out_dir.as_std_path())
        .map_err(|err| DashError::Filesystem(err.to_string()))?;
    let rows = write_csv(table, indicator, temp.as_file_mut())?;
    temp.persist(dest.as_std_path())
        .map_err(|err| DashError::Filesystem(err.to_string()))?;

    Ok(ExportResult {
        path: dest.to_string(),
        rows,
    })
}
