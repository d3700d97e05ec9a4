use serde::Serialize;

use crate::domain::{Observation, YearRange};
use crate::table::CombinedTable;

pub const NO_DATA_MESSAGE: &str = "No hay datos para la selección actual";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub country: String,
    pub iso3: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub indicator: String,
    pub years: YearRange,
    pub series: Vec<Series>,
}

impl LineChart {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

pub fn line_chart(
    table: &CombinedTable,
    indicator: &str,
    countries: &[String],
    years: YearRange,
) -> LineChart {
    let mut series: Vec<Series> = Vec::new();
    for row in table
        .select(indicator, years)
        .filter(|row| countries.iter().any(|country| *country == row.country))
    {
        let point = Point {
            year: row.year,
            value: row.value,
        };
        match series.last_mut() {
            Some(current) if current.country == row.country => current.points.push(point),
            _ => series.push(Series {
                country: row.country.clone(),
                iso3: row.iso3.clone(),
                points: vec![point],
            }),
        }
    }

    let title = if series.is_empty() {
        NO_DATA_MESSAGE.to_string()
    } else {
        format!("Evolución de {indicator} ({years})")
    };
    LineChart {
        title,
        indicator: indicator.to_string(),
        years,
        series,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub country: String,
    pub iso3: String,
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub indicator: String,
    pub years: YearRange,
    pub bars: Vec<Bar>,
}

impl BarChart {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

pub fn bar_chart(table: &CombinedTable, indicator: &str, years: YearRange) -> BarChart {
    let mut peaks: Vec<&Observation> = Vec::new();
    for row in table.select(indicator, years) {
        match peaks.iter_mut().find(|peak| peak.country == row.country) {
            Some(peak) if row.value > peak.value => *peak = row,
            Some(_) => {}
            None => peaks.push(row),
        }
    }
    peaks.sort_by(|a, b| b.value.total_cmp(&a.value));

    let bars = peaks
        .into_iter()
        .map(|row| Bar {
            country: row.country.clone(),
            iso3: row.iso3.clone(),
            year: row.year,
            value: row.value,
        })
        .collect::<Vec<_>>();
    let title = if bars.is_empty() {
        NO_DATA_MESSAGE.to_string()
    } else {
        format!("{indicator} — comparación entre países ({years})")
    };
    BarChart {
        title,
        indicator: indicator.to_string(),
        years,
        bars,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapCell {
    pub iso3: String,
    pub country: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethMap {
    pub title: String,
    pub indicator: String,
    pub year: Option<i32>,
    pub cells: Vec<MapCell>,
}

impl ChoroplethMap {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

pub fn choropleth(table: &CombinedTable, indicator: &str, years: YearRange) -> ChoroplethMap {
    let Some(year) = table.select(indicator, years).map(|row| row.year).max() else {
        return ChoroplethMap {
            title: NO_DATA_MESSAGE.to_string(),
            indicator: indicator.to_string(),
            year: None,
            cells: Vec::new(),
        };
    };

    let cells = table
        .select(indicator, years)
        .filter(|row| row.year == year)
        .map(|row| MapCell {
            iso3: row.iso3.clone(),
            country: row.country.clone(),
            value: row.value,
        })
        .collect();
    ChoroplethMap {
        title: format!("{indicator} — {year}"),
        indicator: indicator.to_string(),
        year: Some(year),
        cells,
    }
}
