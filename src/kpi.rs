use serde::Serialize;

use crate::domain::{Observation, ValueUnit, YearRange, format_grouped};
use crate::table::CombinedTable;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiBundle {
    pub indicator: String,
    pub country: String,
    pub years: YearRange,
    pub last_value: Option<f64>,
    pub last_year: Option<i32>,
    pub pct_change: Option<f64>,
    pub abs_change: Option<f64>,
    pub cagr: Option<f64>,
    pub cagr_periods: Option<i32>,
    pub rank: Option<usize>,
    pub ranked_total: Option<usize>,
    // Latest year of the indicator across the whole table, not the range.
    pub rank_year: Option<i32>,
}

impl KpiBundle {
    fn not_available(indicator: &str, country: &str, years: YearRange) -> Self {
        Self {
            indicator: indicator.to_string(),
            country: country.to_string(),
            years,
            last_value: None,
            last_year: None,
            pct_change: None,
            abs_change: None,
            cagr: None,
            cagr_periods: None,
            rank: None,
            ranked_total: None,
            rank_year: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_value.is_none()
    }

    pub fn display(&self) -> KpiDisplay {
        if self.is_empty() {
            return KpiDisplay::not_available();
        }
        let unit = ValueUnit::for_indicator(&self.indicator);
        let or_na = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_string());

        KpiDisplay {
            value: or_na(self.last_value.map(|value| unit.format(value))),
            year: or_na(self.last_year.map(|year| format!("Año {year}"))),
            pct_change: or_na(self.pct_change.map(|pct| format!("{}%", format_grouped(pct)))),
            abs_change: format!(
                "Δ {}",
                or_na(self.abs_change.map(|delta| unit.format(delta)))
            ),
            cagr: or_na(self.cagr.map(|cagr| format!("{}%", format_grouped(cagr)))),
            range: self.years.to_string(),
            rank: match (self.rank, self.ranked_total) {
                (Some(rank), Some(total)) => format!("#{rank} de {total}"),
                _ => NOT_AVAILABLE.to_string(),
            },
            rank_year: self
                .rank_year
                .map(|year| format!("Año {year}"))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiDisplay {
    pub value: String,
    pub year: String,
    pub pct_change: String,
    pub abs_change: String,
    pub cagr: String,
    pub range: String,
    pub rank: String,
    pub rank_year: String,
}

impl KpiDisplay {
    pub fn not_available() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            value: na(),
            year: na(),
            pct_change: na(),
            abs_change: na(),
            cagr: na(),
            range: na(),
            rank: na(),
            rank_year: na(),
        }
    }

    pub fn fields(&self) -> [&str; 8] {
        [
            self.value.as_str(),
            self.year.as_str(),
            self.pct_change.as_str(),
            self.abs_change.as_str(),
            self.cagr.as_str(),
            self.range.as_str(),
            self.rank.as_str(),
            self.rank_year.as_str(),
        ]
    }
}

pub fn compute_kpis(
    table: &CombinedTable,
    indicator: &str,
    country: &str,
    years: YearRange,
) -> KpiBundle {
    let mut rows: Vec<&Observation> = table
        .select(indicator, years)
        .filter(|row| row.country == country)
        .collect();
    rows.sort_by_key(|row| row.year);

    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return KpiBundle::not_available(indicator, country, years);
    };

    let (pct_change, abs_change) = match rows.len() {
        0 | 1 => (None, None),
        len => {
            let previous = rows[len - 2].value;
            (
                percent_change(previous, last.value),
                Some(last.value - previous),
            )
        }
    };

    // Single-year windows still count as one period.
    let periods = (last.year - first.year).max(1);
    let cagr = compound_growth(first.value, last.value, periods);

    let (rank, ranked_total, rank_year) = match regional_rank(table, indicator, country) {
        Some(standing) => (standing.rank, Some(standing.total), Some(standing.year)),
        None => (None, None, None),
    };

    KpiBundle {
        indicator: indicator.to_string(),
        country: country.to_string(),
        years,
        last_value: Some(last.value),
        last_year: Some(last.year),
        pct_change,
        abs_change,
        cagr,
        cagr_periods: Some(periods),
        rank,
        ranked_total,
        rank_year,
    }
}

pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

pub fn compound_growth(first: f64, last: f64, periods: i32) -> Option<f64> {
    if first == 0.0 || periods < 1 {
        return None;
    }
    let rate = ((last / first).powf(1.0 / f64::from(periods)) - 1.0) * 100.0;
    rate.is_finite().then_some(rate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub year: i32,
    pub rank: Option<usize>,
    pub total: usize,
}

pub fn regional_rank(table: &CombinedTable, indicator: &str, country: &str) -> Option<Standing> {
    let year = table.last_year_for(indicator)?;
    let mut peers: Vec<&Observation> = table
        .indicator_rows(indicator)
        .filter(|row| row.year == year)
        .collect();
    peers.sort_by(|a, b| b.value.total_cmp(&a.value));

    let rank = peers
        .iter()
        .position(|row| row.country == country)
        .map(|idx| idx + 1);
    Some(Standing {
        year,
        rank,
        total: peers.len(),
    })
}
