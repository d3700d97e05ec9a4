use serde::Serialize;
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{CountryRegistry, IndicatorRegistry, YearRange};
use crate::normalize::normalize;
use crate::table::{CombinedTable, IndicatorTable};
use crate::worldbank::{Fetcher, WorldBankClient};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorOutcome {
    Loaded { rows: usize },
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub indicator: String,
    pub code: String,
    #[serde(flatten)]
    pub outcome: IndicatorOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub table: CombinedTable,
    pub reports: Vec<IndicatorReport>,
}

pub fn build_combined_table<C: WorldBankClient>(
    fetcher: &Fetcher<C>,
    countries: &CountryRegistry,
    indicators: &IndicatorRegistry,
    years: YearRange,
    sink: &dyn ProgressSink,
) -> Aggregate {
    let codes = countries.joined_codes();
    let mut tables: Vec<IndicatorTable> = Vec::with_capacity(indicators.len());
    let mut reports = Vec::with_capacity(indicators.len());

    for indicator in indicators.iter() {
        sink.event(ProgressEvent {
            message: format!("phase=Fetch; {}", indicator.name),
            elapsed: None,
        });
        let start = std::time::Instant::now();

        let outcome = match fetcher.fetch_indicator(&codes, &indicator.code, years) {
            Ok(rows) => {
                let table = normalize(&rows, &indicator.name, countries);
                if table.is_empty() {
                    info!(indicator = %indicator.name, "no data");
                    IndicatorOutcome::Empty
                } else {
                    info!(indicator = %indicator.name, rows = table.len(), "loaded");
                    let rows = table.len();
                    tables.push(table);
                    IndicatorOutcome::Loaded { rows }
                }
            }
            Err(err) => {
                warn!(indicator = %indicator.name, error = %err, "skipping indicator");
                IndicatorOutcome::Failed {
                    message: err.to_string(),
                }
            }
        };

        sink.event(ProgressEvent {
            message: match &outcome {
                IndicatorOutcome::Loaded { rows } => format!("loaded {} rows={rows}", indicator.name),
                IndicatorOutcome::Empty => format!("empty {}", indicator.name),
                IndicatorOutcome::Failed { message } => {
                    format!("failed {}: {message}", indicator.name)
                }
            },
            elapsed: Some(start.elapsed()),
        });
        reports.push(IndicatorReport {
            indicator: indicator.name.clone(),
            code: indicator.code.clone(),
            outcome,
        });
    }

    Aggregate {
        table: CombinedTable::from_tables(tables),
        reports,
    }
}
