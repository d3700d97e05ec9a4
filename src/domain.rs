use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DashError;

pub const DEFAULT_START_YEAR: i32 = 2000;
pub const DEFAULT_END_YEAR: i32 = 2024;
pub const DEFAULT_INDICATOR: &str = "PIB per cápita (US$)";
pub const DEFAULT_COUNTRY: &str = "Chile";

static ISO3_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());
static YEAR_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(?:\s*(?::|-|\.\.)\s*(\d{4}))?$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Iso3Code(String);

impl Iso3Code {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iso3Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Iso3Code {
    type Err = DashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !ISO3_RE.is_match(&normalized) {
            return Err(DashError::InvalidIso3(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self, DashError> {
        if start > end {
            return Err(DashError::InvalidYearRange(format!("{start}:{end}")));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    pub fn as_query(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_YEAR,
            end: DEFAULT_END_YEAR,
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.end)
    }
}

impl FromStr for YearRange {
    type Err = DashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let captures = YEAR_RANGE_RE
            .captures(trimmed)
            .ok_or_else(|| DashError::InvalidYearRange(value.to_string()))?;
        let parse = |text: &str| {
            text.parse::<i32>()
                .map_err(|_| DashError::InvalidYearRange(value.to_string()))
        };
        let start = parse(&captures[1])?;
        let end = match captures.get(2) {
            Some(end) => parse(end.as_str())?,
            None => start,
        };
        Self::new(start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub iso3: String,
    pub country: String,
    pub year: i32,
    pub value: f64,
    pub indicator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub iso3: Iso3Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountryRegistry {
    entries: Vec<Country>,
}

impl CountryRegistry {
    pub fn new(entries: Vec<Country>) -> Self {
        Self { entries }
    }

    pub fn latin_america() -> Self {
        let pairs = [
            ("Argentina", "ARG"),
            ("Bolivia", "BOL"),
            ("Brasil", "BRA"),
            ("Chile", "CHL"),
            ("Colombia", "COL"),
            ("Costa Rica", "CRI"),
            ("Cuba", "CUB"),
            ("Ecuador", "ECU"),
            ("El Salvador", "SLV"),
            ("Guatemala", "GTM"),
            ("Honduras", "HND"),
            ("México", "MEX"),
            ("Nicaragua", "NIC"),
            ("Panamá", "PAN"),
            ("Paraguay", "PRY"),
            ("Perú", "PER"),
            ("República Dominicana", "DOM"),
            ("Uruguay", "URY"),
            ("Venezuela", "VEN"),
        ];
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, iso3)| Country {
                    name: name.to_string(),
                    iso3: Iso3Code(iso3.to_string()),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Country> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_for(&self, iso3: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|country| country.iso3.as_str() == iso3)
            .map(|country| country.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Country> {
        self.entries.iter().find(|country| country.name == name)
    }

    pub fn joined_codes(&self) -> String {
        self.entries
            .iter()
            .map(|country| country.iso3.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndicatorRegistry {
    entries: Vec<Indicator>,
}

impl IndicatorRegistry {
    pub fn new(entries: Vec<Indicator>) -> Self {
        Self { entries }
    }

    pub fn development() -> Self {
        let pairs = [
            ("PIB per cápita (US$)", "NY.GDP.PCAP.CD"),
            ("Tasa de Inflación Anual (%)", "FP.CPI.TOTL.ZG"),
            ("Tasa de Desempleo (%)", "SL.UEM.TOTL.ZS"),
            ("Esperanza de Vida (años)", "SP.DYN.LE00.IN"),
            ("Gasto en Salud per cápita (US$)", "SH.XPD.CHEX.PC.CD"),
            ("Acceso a Electricidad (% población)", "EG.ELC.ACCS.ZS"),
            ("Emisiones de CO2 (t per cápita)", "EN.ATM.CO2E.PC"),
            ("Usuarios de Internet (% población)", "IT.NET.USER.ZS"),
        ];
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, code)| Indicator {
                    name: name.to_string(),
                    code: code.to_string(),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Indicator> {
        self.entries.iter().find(|indicator| indicator.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueUnit {
    Percent,
    Usd,
    Plain,
}

impl ValueUnit {
    pub fn for_indicator(name: &str) -> Self {
        if name.contains('%') {
            ValueUnit::Percent
        } else if name.contains("US$") {
            ValueUnit::Usd
        } else {
            ValueUnit::Plain
        }
    }

    pub fn format(self, value: f64) -> String {
        let number = format_grouped(value);
        match self {
            ValueUnit::Percent => format!("{number}%"),
            ValueUnit::Usd => format!("US$ {number}"),
            ValueUnit::Plain => number,
        }
    }
}

pub fn format_grouped(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.chars().any(|ch| ch != '0' && ch != '.') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped},{frac_part}")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_iso3_valid() {
        let code: Iso3Code = " chl ".parse().unwrap();
        assert_eq!(code.as_str(), "CHL");
    }

    #[test]
    fn parse_iso3_invalid() {
        let err = "CL".parse::<Iso3Code>().unwrap_err();
        assert_matches!(err, DashError::InvalidIso3(_));
    }

    #[test]
    fn parse_year_range_forms() {
        assert_eq!(
            "2000:2024".parse::<YearRange>().unwrap(),
            YearRange::new(2000, 2024).unwrap()
        );
        assert_eq!(
            "2019-2021".parse::<YearRange>().unwrap(),
            YearRange::new(2019, 2021).unwrap()
        );
        assert_eq!(
            "2010".parse::<YearRange>().unwrap(),
            YearRange::new(2010, 2010).unwrap()
        );
    }

    #[test]
    fn reversed_year_range_is_rejected() {
        let err = "2024:2000".parse::<YearRange>().unwrap_err();
        assert_matches!(err, DashError::InvalidYearRange(_));
    }

    #[test]
    fn registry_reverse_lookup() {
        let registry = CountryRegistry::latin_america();
        assert_eq!(registry.len(), 19);
        assert_eq!(registry.name_for("MEX"), Some("México"));
        assert_eq!(registry.name_for("USA"), None);
        assert_eq!(registry.name_for("mex"), None);
        assert!(registry.joined_codes().starts_with("ARG;BOL;BRA"));
    }

    #[test]
    fn grouped_formatting() {
        assert_eq!(format_grouped(1234567.891), "1.234.567,89");
        assert_eq!(format_grouped(-1234.5), "-1.234,50");
        assert_eq!(format_grouped(12.0), "12,00");
        assert_eq!(format_grouped(-0.001), "0,00");
    }

    #[test]
    fn unit_from_indicator_name() {
        assert_eq!(
            ValueUnit::for_indicator("Tasa de Desempleo (%)"),
            ValueUnit::Percent
        );
        assert_eq!(
            ValueUnit::for_indicator("PIB per cápita (US$)"),
            ValueUnit::Usd
        );
        assert_eq!(
            ValueUnit::for_indicator("Esperanza de Vida (años)"),
            ValueUnit::Plain
        );
        assert_eq!(ValueUnit::Usd.format(15000.0), "US$ 15.000,00");
    }
}
