use serde::Serialize;

use crate::domain::{Observation, YearRange};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorTable {
    indicator: String,
    rows: Vec<Observation>,
}

impl IndicatorTable {
    pub(crate) fn from_sorted(indicator: &str, rows: Vec<Observation>) -> Self {
        Self {
            indicator: indicator.to_string(),
            rows,
        }
    }

    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedTable {
    rows: Vec<Observation>,
}

impl CombinedTable {
    pub fn new(mut rows: Vec<Observation>) -> Self {
        rows.sort_by(|a, b| {
            a.indicator
                .cmp(&b.indicator)
                .then(a.country.cmp(&b.country))
                .then(a.year.cmp(&b.year))
        });
        Self { rows }
    }

    pub fn from_tables(tables: Vec<IndicatorTable>) -> Self {
        Self::new(tables.into_iter().flat_map(IndicatorTable::into_rows).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn indicators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if names.last() != Some(&row.indicator.as_str()) {
                names.push(&row.indicator);
            }
        }
        names
    }

    pub fn indicator_rows<'a>(
        &'a self,
        indicator: &'a str,
    ) -> impl Iterator<Item = &'a Observation> + 'a {
        self.rows.iter().filter(move |row| row.indicator == indicator)
    }

    pub fn select<'a>(
        &'a self,
        indicator: &'a str,
        years: YearRange,
    ) -> impl Iterator<Item = &'a Observation> + 'a {
        self.indicator_rows(indicator)
            .filter(move |row| years.contains(row.year))
    }

    pub fn year_bounds(&self) -> Option<YearRange> {
        let min = self.rows.iter().map(|row| row.year).min()?;
        let max = self.rows.iter().map(|row| row.year).max()?;
        YearRange::new(min, max).ok()
    }

    pub fn last_year_for(&self, indicator: &str) -> Option<i32> {
        self.indicator_rows(indicator).map(|row| row.year).max()
    }

    pub fn clamp_range(&self, requested: YearRange) -> YearRange {
        let Some(bounds) = self.year_bounds() else {
            return requested;
        };
        let start = requested.start().max(bounds.start());
        let end = requested.end().min(bounds.end());
        // Disjoint ranges stay as requested and select nothing.
        YearRange::new(start, end).unwrap_or(requested)
    }
}
