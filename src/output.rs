use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::aggregate::IndicatorOutcome;
use crate::app::{ProgressEvent, ProgressSink, Summary};
use crate::domain::ValueUnit;
use crate::export::ExportResult;
use crate::kpi::KpiBundle;
use crate::views::{BarChart, ChoroplethMap, LineChart};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}", event.message
            ),
            None => info!("{}", event.message),
        }
    }
}

impl TextOutput {
    pub fn print_summary(summary: &Summary) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Cargado: {}", summary.loaded_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out, "Filas: {}", summary.rows)?;
        writeln!(out, "Rango solicitado: {}", summary.requested_years)?;
        match summary.observed_years {
            Some(years) => writeln!(out, "Rango observado: {years}")?,
            None => writeln!(out, "Rango observado: N/A")?,
        }
        for report in &summary.indicators {
            let status = match &report.outcome {
                IndicatorOutcome::Loaded { rows } => format!("{rows} filas"),
                IndicatorOutcome::Empty => "sin datos".to_string(),
                IndicatorOutcome::Failed { message } => format!("error: {message}"),
            };
            writeln!(out, "  {} [{}]: {status}", report.indicator, report.code)?;
        }
        Ok(())
    }

    pub fn print_kpis(kpis: &KpiBundle) -> io::Result<()> {
        let display = kpis.display();
        let mut out = io::stdout().lock();
        writeln!(out, "{} — {}", kpis.indicator, kpis.country)?;
        writeln!(out, "Último valor: {} ({})", display.value, display.year)?;
        writeln!(
            out,
            "Variación vs. año previo: {} ({})",
            display.pct_change, display.abs_change
        )?;
        writeln!(out, "CAGR en rango: {} ({})", display.cagr, display.range)?;
        writeln!(out, "Ranking LATAM: {} ({})", display.rank, display.rank_year)?;
        Ok(())
    }

    pub fn print_line_chart(chart: &LineChart) -> io::Result<()> {
        let unit = ValueUnit::for_indicator(&chart.indicator);
        let mut out = io::stdout().lock();
        writeln!(out, "{}", chart.title)?;
        for series in &chart.series {
            writeln!(out, "{} ({})", series.country, series.iso3)?;
            for point in &series.points {
                writeln!(out, "  {}  {}", point.year, unit.format(point.value))?;
            }
        }
        Ok(())
    }

    pub fn print_bar_chart(chart: &BarChart) -> io::Result<()> {
        let unit = ValueUnit::for_indicator(&chart.indicator);
        let mut out = io::stdout().lock();
        writeln!(out, "{}", chart.title)?;
        for bar in &chart.bars {
            writeln!(
                out,
                "  {:<22} {}  {}",
                bar.country,
                bar.year,
                unit.format(bar.value)
            )?;
        }
        Ok(())
    }

    pub fn print_choropleth(map: &ChoroplethMap) -> io::Result<()> {
        let unit = ValueUnit::for_indicator(&map.indicator);
        let mut out = io::stdout().lock();
        writeln!(out, "{}", map.title)?;
        for cell in &map.cells {
            writeln!(
                out,
                "  {}  {:<22} {}",
                cell.iso3,
                cell.country,
                unit.format(cell.value)
            )?;
        }
        Ok(())
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        println!("{} filas -> {}", result.rows, result.path);
        Ok(())
    }
}
