use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::PageCache;
use crate::domain::YearRange;
use crate::error::DashError;
use crate::normalize::coerce_number;

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";
pub const DEFAULT_PER_PAGE: u32 = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MAX_PAGES: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub countries: String,
    pub indicator: String,
    pub years: YearRange,
    pub page: u32,
    pub per_page: u32,
}

pub trait WorldBankClient: Send + Sync {
    fn fetch_page(&self, request: &PageRequest) -> Result<Value, DashError>;
}

#[derive(Clone)]
pub struct WorldBankHttpClient {
    client: Client,
    base_url: String,
}

impl WorldBankHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("latam-dash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DashError::WorldBankHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| DashError::WorldBankHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn page_url(&self, request: &PageRequest) -> String {
        format!(
            "{}/country/{}/indicator/{}?date={}&format=json&per_page={}&page={}",
            self.base_url,
            request.countries,
            request.indicator,
            request.years.as_query(),
            request.per_page,
            request.page
        )
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, DashError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "World Bank request failed".to_string());
        Err(DashError::WorldBankStatus { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, DashError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        debug!(status, attempt, "worldbank.retry");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        debug!(error = %err, attempt, "worldbank.retry");
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(DashError::WorldBankHttp(err.to_string()));
                }
            }
        }
    }
}

impl WorldBankClient for WorldBankHttpClient {
    fn fetch_page(&self, request: &PageRequest) -> Result<Value, DashError> {
        let url = self.page_url(request);
        debug!(%url, "worldbank.request");
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        response
            .json::<Value>()
            .map_err(|err| DashError::WorldBankDecode(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub iso3: Option<String>,
    pub country: Option<String>,
    pub date: Value,
    pub value: Value,
}

impl RawRow {
    pub fn from_json(row: &Value) -> Self {
        Self {
            iso3: row
                .get("countryiso3code")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            country: row
                .get("country")
                .and_then(|v| v.get("value"))
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            date: row.get("date").cloned().unwrap_or(Value::Null),
            value: row.get("value").cloned().unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    pub pages: u32,
    pub rows: Vec<RawRow>,
}

impl RawPage {
    pub fn from_envelope(body: &Value) -> Option<Self> {
        let envelope = body.as_array()?;
        if envelope.len() < 2 {
            return None;
        }
        let rows = envelope[1].as_array()?;
        if rows.is_empty() {
            return None;
        }
        Some(Self {
            pages: page_count(&envelope[0]),
            rows: rows.iter().map(RawRow::from_json).collect(),
        })
    }
}

fn page_count(meta: &Value) -> u32 {
    let Some(pages) = meta.get("pages").and_then(coerce_number) else {
        return 1;
    };
    if pages.fract() != 0.0 || pages < 1.0 || pages > f64::from(u32::MAX) {
        warn!(pages, "worldbank.pages_invalid");
        return 1;
    }
    let pages = pages as u32;
    if pages > MAX_PAGES {
        warn!(pages, max = MAX_PAGES, "worldbank.pages_capped");
    }
    pages.min(MAX_PAGES)
}

pub struct Fetcher<C: WorldBankClient> {
    client: C,
    per_page: u32,
    cache: PageCache<PageRequest, Value>,
}

impl<C: WorldBankClient> Fetcher<C> {
    pub fn new(client: C, per_page: u32, cache_capacity: usize) -> Self {
        Self {
            client,
            per_page,
            cache: PageCache::new(cache_capacity),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache_stats(&self) -> (u64, u64) {
        (self.cache.hits(), self.cache.misses())
    }

    pub fn fetch_page(
        &self,
        countries: &str,
        indicator_code: &str,
        years: YearRange,
        page: u32,
    ) -> Result<Value, DashError> {
        let request = PageRequest {
            countries: countries.to_string(),
            indicator: indicator_code.to_string(),
            years,
            page,
            per_page: self.per_page,
        };
        if let Some(hit) = self.cache.get(&request) {
            debug!(indicator = indicator_code, page, "worldbank.cache_hit");
            return Ok(hit);
        }
        let body = self.client.fetch_page(&request)?;
        self.cache.insert(request, body.clone());
        Ok(body)
    }

    pub fn fetch_indicator(
        &self,
        countries: &str,
        indicator_code: &str,
        years: YearRange,
    ) -> Result<Vec<RawRow>, DashError> {
        let first = self.fetch_page(countries, indicator_code, years, 1)?;
        let Some(first) = RawPage::from_envelope(&first) else {
            debug!(indicator = indicator_code, "worldbank.empty");
            return Ok(Vec::new());
        };

        // Any failing page fails the whole indicator.
        let mut rows = first.rows;
        for page in 2..=first.pages {
            let body = self.fetch_page(countries, indicator_code, years, page)?;
            if let Some(next) = RawPage::from_envelope(&body) {
                rows.extend(next.rows);
            }
        }
        Ok(rows)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
