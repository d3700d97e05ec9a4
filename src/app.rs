use std::time::Duration;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{IndicatorOutcome, IndicatorReport, build_combined_table};
use crate::config::ResolvedConfig;
use crate::domain::{CountryRegistry, Indicator, IndicatorRegistry, YearRange};
use crate::error::DashError;
use crate::export::{ExportResult, export_indicator};
use crate::kpi::{KpiBundle, compute_kpis};
use crate::table::CombinedTable;
use crate::views::{BarChart, ChoroplethMap, LineChart, bar_chart, choropleth, line_chart};
use crate::worldbank::{Fetcher, WorldBankClient};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub loaded_at: DateTime<Utc>,
    pub rows: usize,
    pub requested_years: YearRange,
    pub observed_years: Option<YearRange>,
    pub indicators: Vec<IndicatorReport>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    table: CombinedTable,
    countries: CountryRegistry,
    indicators: IndicatorRegistry,
    requested_years: YearRange,
    reports: Vec<IndicatorReport>,
    loaded_at: DateTime<Utc>,
}

impl Dashboard {
    pub fn load<C: WorldBankClient>(
        fetcher: &Fetcher<C>,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Self {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {} indicators x {} countries, {}",
                config.indicators.len(),
                config.countries.len(),
                config.years
            ),
            elapsed: None,
        });
        let start = std::time::Instant::now();
        let aggregate = build_combined_table(
            fetcher,
            &config.countries,
            &config.indicators,
            config.years,
            sink,
        );
        sink.event(ProgressEvent {
            message: format!("phase=Combine; {} rows", aggregate.table.len()),
            elapsed: Some(start.elapsed()),
        });

        Self {
            table: aggregate.table,
            countries: config.countries.clone(),
            indicators: config.indicators.clone(),
            requested_years: config.years,
            reports: aggregate.reports,
            loaded_at: Utc::now(),
        }
    }

    pub fn from_table(
        table: CombinedTable,
        countries: CountryRegistry,
        indicators: IndicatorRegistry,
        requested_years: YearRange,
    ) -> Self {
        let reports = indicators
            .iter()
            .map(|indicator| {
                let rows = table.indicator_rows(&indicator.name).count();
                IndicatorReport {
                    indicator: indicator.name.clone(),
                    code: indicator.code.clone(),
                    outcome: if rows == 0 {
                        IndicatorOutcome::Empty
                    } else {
                        IndicatorOutcome::Loaded { rows }
                    },
                }
            })
            .collect();
        Self {
            table,
            countries,
            indicators,
            requested_years,
            reports,
            loaded_at: Utc::now(),
        }
    }

    pub fn table(&self) -> &CombinedTable {
        &self.table
    }

    pub fn countries(&self) -> &CountryRegistry {
        &self.countries
    }

    pub fn indicators(&self) -> &IndicatorRegistry {
        &self.indicators
    }

    pub fn reports(&self) -> &[IndicatorReport] {
        &self.reports
    }

    pub fn year_bounds(&self) -> YearRange {
        self.table.year_bounds().unwrap_or(self.requested_years)
    }

    pub fn resolve_years(&self, requested: Option<YearRange>) -> YearRange {
        match requested {
            Some(years) => self.table.clamp_range(years),
            None => self.year_bounds(),
        }
    }

    pub fn indicator(&self, name: &str) -> Result<&Indicator, DashError> {
        self.indicators
            .get(name)
            .ok_or_else(|| DashError::UnknownIndicator(name.to_string()))
    }

    pub fn check_country(&self, name: &str) -> Result<(), DashError> {
        let known = self.countries.get(name).is_some()
            || self.table.rows().iter().any(|row| row.country == name);
        if known {
            Ok(())
        } else {
            Err(DashError::UnknownCountry(name.to_string()))
        }
    }

    pub fn kpis(
        &self,
        indicator: &str,
        country: &str,
        years: Option<YearRange>,
    ) -> Result<KpiBundle, DashError> {
        let indicator = self.indicator(indicator)?;
        self.check_country(country)?;
        Ok(compute_kpis(
            &self.table,
            &indicator.name,
            country,
            self.resolve_years(years),
        ))
    }

    pub fn line_chart(
        &self,
        indicator: &str,
        countries: &[String],
        years: Option<YearRange>,
    ) -> Result<LineChart, DashError> {
        let indicator = self.indicator(indicator)?;
        for country in countries {
            self.check_country(country)?;
        }
        Ok(line_chart(
            &self.table,
            &indicator.name,
            countries,
            self.resolve_years(years),
        ))
    }

    pub fn bar_chart(
        &self,
        indicator: &str,
        years: Option<YearRange>,
    ) -> Result<BarChart, DashError> {
        let indicator = self.indicator(indicator)?;
        Ok(bar_chart(
            &self.table,
            &indicator.name,
            self.resolve_years(years),
        ))
    }

    pub fn choropleth(
        &self,
        indicator: &str,
        years: Option<YearRange>,
    ) -> Result<ChoroplethMap, DashError> {
        let indicator = self.indicator(indicator)?;
        Ok(choropleth(
            &self.table,
            &indicator.name,
            self.resolve_years(years),
        ))
    }

    pub fn export(&self, indicator: &str, out_dir: &Utf8Path) -> Result<ExportResult, DashError> {
        let indicator = self.indicator(indicator)?;
        export_indicator(&self.table, &indicator.name, out_dir)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            loaded_at: self.loaded_at,
            rows: self.table.len(),
            requested_years: self.requested_years,
            observed_years: self.table.year_bounds(),
            indicators: self.reports.clone(),
        }
    }
}
