use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::DEFAULT_CAPACITY;
use crate::domain::{Country, CountryRegistry, Indicator, IndicatorRegistry, Iso3Code, YearRange};
use crate::error::DashError;
use crate::worldbank::{DEFAULT_BASE_URL, DEFAULT_PER_PAGE, DEFAULT_TIMEOUT_SECS};

pub const DEFAULT_CONFIG_FILE: &str = "latam-dash.json";
pub const BASE_URL_ENV: &str = "LATAM_DASH_BASE_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub cache_capacity: Option<usize>,
    #[serde(default)]
    pub years: Option<String>,
    #[serde(default)]
    pub countries: Option<CountryEntries>,
    #[serde(default)]
    pub indicators: Option<IndicatorEntries>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CountryEntries {
    Map(Map<String, Value>),
    List(Vec<CountryEntry>),
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum IndicatorEntries {
    Map(Map<String, Value>),
    List(Vec<IndicatorEntry>),
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CountryEntry {
    Shorthand(String),
    Detailed(CountryEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CountryEntryObject {
    pub name: String,
    pub iso3: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum IndicatorEntry {
    Shorthand(String),
    Detailed(IndicatorEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndicatorEntryObject {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub per_page: u32,
    pub timeout: Duration,
    pub cache_capacity: usize,
    pub years: YearRange,
    pub countries: CountryRegistry,
    pub indicators: IndicatorRegistry,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_capacity: DEFAULT_CAPACITY,
            years: YearRange::default(),
            countries: CountryRegistry::latin_america(),
            indicators: IndicatorRegistry::development(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DashError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| DashError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| DashError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                resolved.base_url = base_url.trim().to_string();
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, DashError> {
        let defaults = ResolvedConfig::default();

        let per_page = config.per_page.unwrap_or(defaults.per_page);
        if per_page == 0 {
            return Err(DashError::InvalidConfig("per_page must be positive".to_string()));
        }
        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(DashError::InvalidConfig(
                "timeout_secs must be positive".to_string(),
            ));
        }

        let years = match config.years {
            Some(value) => value.parse()?,
            None => defaults.years,
        };

        let countries = match config.countries {
            Some(entries) => resolve_countries(entries, &defaults.countries)?,
            None => defaults.countries,
        };
        if countries.is_empty() {
            return Err(DashError::InvalidConfig("no countries configured".to_string()));
        }

        let indicators = match config.indicators {
            Some(entries) => resolve_indicators(entries, &defaults.indicators)?,
            None => defaults.indicators,
        };
        if indicators.is_empty() {
            return Err(DashError::InvalidConfig(
                "no indicators configured".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            base_url: config.base_url.unwrap_or(defaults.base_url),
            per_page,
            timeout: Duration::from_secs(timeout_secs),
            cache_capacity: config.cache_capacity.unwrap_or(defaults.cache_capacity),
            years,
            countries,
            indicators,
        })
    }
}

fn map_pairs(map: Map<String, Value>, what: &str) -> Result<Vec<(String, String)>, DashError> {
    map.into_iter()
        .map(|(name, value)| match value {
            Value::String(code) => Ok((name, code)),
            _ => Err(DashError::InvalidConfig(format!(
                "{what} '{name}' must map to a string"
            ))),
        })
        .collect()
}

fn resolve_countries(
    entries: CountryEntries,
    known: &CountryRegistry,
) -> Result<CountryRegistry, DashError> {
    let pairs = match entries {
        CountryEntries::Map(map) => map_pairs(map, "country")?
            .into_iter()
            .map(|(name, code)| Ok(Country { name, iso3: code.parse()? }))
            .collect::<Result<Vec<_>, DashError>>()?,
        CountryEntries::List(list) => list
            .into_iter()
            .map(|entry| match entry {
                CountryEntry::Shorthand(code) => {
                    let iso3: Iso3Code = code.parse()?;
                    let name = known
                        .name_for(iso3.as_str())
                        .unwrap_or(iso3.as_str())
                        .to_string();
                    Ok(Country { name, iso3 })
                }
                CountryEntry::Detailed(obj) => Ok(Country {
                    name: obj.name,
                    iso3: obj.iso3.parse()?,
                }),
            })
            .collect::<Result<Vec<_>, DashError>>()?,
    };
    Ok(CountryRegistry::new(pairs))
}

fn resolve_indicators(
    entries: IndicatorEntries,
    known: &IndicatorRegistry,
) -> Result<IndicatorRegistry, DashError> {
    let indicators = match entries {
        IndicatorEntries::Map(map) => map_pairs(map, "indicator")?
            .into_iter()
            .map(|(name, code)| Indicator { name, code })
            .collect(),
        IndicatorEntries::List(list) => list
            .into_iter()
            .map(|entry| match entry {
                IndicatorEntry::Shorthand(code) => {
                    let name = known
                        .iter()
                        .find(|indicator| indicator.code == code)
                        .map(|indicator| indicator.name.clone())
                        .unwrap_or_else(|| code.clone());
                    Indicator { name, code }
                }
                IndicatorEntry::Detailed(obj) => Indicator {
                    name: obj.name,
                    code: obj.code,
                },
            })
            .collect(),
    };
    Ok(IndicatorRegistry::new(indicators))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.per_page, 2000);
        assert_eq!(resolved.timeout, Duration::from_secs(30));
        assert_eq!(resolved.cache_capacity, 64);
        assert_eq!(resolved.years, YearRange::new(2000, 2024).unwrap());
        assert_eq!(resolved.countries.len(), 19);
        assert_eq!(resolved.indicators.len(), 8);
    }

    #[test]
    fn shorthand_entries_borrow_known_names() {
        let config = Config {
            countries: Some(CountryEntries::List(vec![
                CountryEntry::Shorthand("chl".to_string()),
                CountryEntry::Shorthand("USA".to_string()),
            ])),
            indicators: Some(IndicatorEntries::List(vec![IndicatorEntry::Shorthand(
                "SL.UEM.TOTL.ZS".to_string(),
            )])),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.countries.name_for("CHL"), Some("Chile"));
        assert_eq!(resolved.countries.name_for("USA"), Some("USA"));
        assert!(resolved.indicators.get("Tasa de Desempleo (%)").is_some());
    }
}
