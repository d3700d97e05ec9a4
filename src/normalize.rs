use serde_json::Value;

use crate::domain::{CountryRegistry, Observation};
use crate::table::IndicatorTable;
use crate::worldbank::RawRow;

pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

pub fn coerce_year(value: &Value) -> Option<i32> {
    let year = coerce_number(value)?;
    if year.fract() != 0.0 || year < i32::MIN as f64 || year > i32::MAX as f64 {
        return None;
    }
    Some(year as i32)
}

pub fn normalize(
    rows: &[RawRow],
    indicator_name: &str,
    countries: &CountryRegistry,
) -> IndicatorTable {
    let mut observations = rows
        .iter()
        .filter_map(|row| {
            let year = coerce_year(&row.date)?;
            let value = coerce_number(&row.value)?;
            let iso3 = row.iso3.clone().unwrap_or_default();
            let country = countries
                .name_for(&iso3)
                .map(|name| name.to_string())
                .or_else(|| row.country.clone())
                .unwrap_or_default();
            Some(Observation {
                iso3,
                country,
                year,
                value,
                indicator: indicator_name.to_string(),
            })
        })
        .collect::<Vec<_>>();

    observations.sort_by(|a, b| a.country.cmp(&b.country).then(a.year.cmp(&b.year)));
    IndicatorTable::from_sorted(indicator_name, observations)
}
