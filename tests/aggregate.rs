use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use latam_indicators::aggregate::{IndicatorOutcome, build_combined_table};
use latam_indicators::app::{Dashboard, ProgressEvent, ProgressSink};
use latam_indicators::config::ResolvedConfig;
use latam_indicators::domain::{CountryRegistry, Indicator, IndicatorRegistry, YearRange};
use latam_indicators::error::DashError;
use latam_indicators::normalize::normalize;
use latam_indicators::worldbank::{Fetcher, PageRequest, RawRow, WorldBankClient};

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
struct MockWorldBank {
    pages: HashMap<(String, u32), Value>,
    calls: Mutex<usize>,
}

impl MockWorldBank {
    fn with_page(mut self, indicator: &str, page: u32, body: Value) -> Self {
        self.pages.insert((indicator.to_string(), page), body);
        self
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl WorldBankClient for MockWorldBank {
    fn fetch_page(&self, request: &PageRequest) -> Result<Value, DashError> {
        *self.calls.lock().unwrap() += 1;
        self.pages
            .get(&(request.indicator.clone(), request.page))
            .cloned()
            .ok_or(DashError::WorldBankStatus {
                status: 503,
                message: "unavailable".to_string(),
            })
    }
}

fn row(iso3: &str, name: &str, year: &str, value: Value) -> Value {
    json!({
        "indicator": {"id": "X", "value": "X"},
        "country": {"id": "XX", "value": name},
        "countryiso3code": iso3,
        "date": year,
        "value": value,
    })
}

fn envelope(page: u32, pages: u32, rows: Vec<Value>) -> Value {
    json!([{"page": page, "pages": pages, "per_page": 2, "total": rows.len()}, rows])
}

fn indicators() -> IndicatorRegistry {
    IndicatorRegistry::new(vec![
        Indicator {
            name: "PIB per cápita (US$)".to_string(),
            code: "NY.GDP.PCAP.CD".to_string(),
        },
        Indicator {
            name: "Tasa de Desempleo (%)".to_string(),
            code: "SL.UEM.TOTL.ZS".to_string(),
        },
        Indicator {
            name: "Esperanza de Vida (años)".to_string(),
            code: "SP.DYN.LE00.IN".to_string(),
        },
    ])
}

fn years() -> YearRange {
    YearRange::new(2000, 2024).unwrap()
}

#[test]
fn paginated_indicator_is_concatenated_and_sorted() {
    let client = MockWorldBank::default()
        .with_page(
            "NY.GDP.PCAP.CD",
            1,
            envelope(
                1,
                2,
                vec![
                    row("PER", "Peru", "2021", json!(7000.0)),
                    row("CHL", "Chile", "2021", json!(16000.0)),
                ],
            ),
        )
        .with_page(
            "NY.GDP.PCAP.CD",
            2,
            envelope(
                2,
                2,
                vec![
                    row("CHL", "Chile", "2020", json!(13000.0)),
                    row("CHL", "Chile", "2019", Value::Null),
                ],
            ),
        );
    let fetcher = Fetcher::new(client, 2, 64);

    let aggregate = build_combined_table(
        &fetcher,
        &CountryRegistry::latin_america(),
        &indicators(),
        years(),
        &NoopSink,
    );

    let keys = aggregate
        .table
        .rows()
        .iter()
        .map(|row| (row.country.as_str(), row.year))
        .collect::<Vec<_>>();
    assert_eq!(keys, vec![("Chile", 2020), ("Chile", 2021), ("Perú", 2021)]);
    assert_eq!(
        aggregate.reports[0].outcome,
        IndicatorOutcome::Loaded { rows: 3 }
    );
}

#[test]
fn failing_indicators_are_skipped() {
    let client = MockWorldBank::default()
        .with_page(
            "SL.UEM.TOTL.ZS",
            1,
            envelope(1, 1, vec![row("CHL", "Chile", "2022", json!(8.1))]),
        )
        // Page 2 of GDP is missing, so the whole indicator fails.
        .with_page(
            "NY.GDP.PCAP.CD",
            1,
            envelope(1, 2, vec![row("CHL", "Chile", "2022", json!(15000.0))]),
        );
    let fetcher = Fetcher::new(client, 2000, 64);

    let aggregate = build_combined_table(
        &fetcher,
        &CountryRegistry::latin_america(),
        &indicators(),
        years(),
        &NoopSink,
    );

    assert_eq!(aggregate.table.len(), 1);
    assert_eq!(aggregate.table.indicators(), vec!["Tasa de Desempleo (%)"]);
    assert!(matches!(
        aggregate.reports[0].outcome,
        IndicatorOutcome::Failed { .. }
    ));
    assert_eq!(
        aggregate.reports[1].outcome,
        IndicatorOutcome::Loaded { rows: 1 }
    );
    assert!(matches!(
        aggregate.reports[2].outcome,
        IndicatorOutcome::Failed { .. }
    ));
}

#[test]
fn all_failures_give_empty_table() {
    let fetcher = Fetcher::new(MockWorldBank::default(), 2000, 64);

    let aggregate = build_combined_table(
        &fetcher,
        &CountryRegistry::latin_america(),
        &indicators(),
        years(),
        &NoopSink,
    );

    assert!(aggregate.table.is_empty());
    assert_eq!(aggregate.reports.len(), 3);
    assert!(
        aggregate
            .reports
            .iter()
            .all(|report| matches!(report.outcome, IndicatorOutcome::Failed { .. }))
    );
}

#[test]
fn malformed_first_page_is_no_data() {
    let client = MockWorldBank::default()
        .with_page(
            "NY.GDP.PCAP.CD",
            1,
            json!([{"message": [{"id": "175", "value": "Indicator archived"}]}]),
        )
        .with_page("SL.UEM.TOTL.ZS", 1, json!([{"pages": 0}, null]))
        .with_page("SP.DYN.LE00.IN", 1, json!([{"pages": 1}, []]));
    let fetcher = Fetcher::new(client, 2000, 64);

    let aggregate = build_combined_table(
        &fetcher,
        &CountryRegistry::latin_america(),
        &indicators(),
        years(),
        &NoopSink,
    );

    assert!(aggregate.table.is_empty());
    assert!(
        aggregate
            .reports
            .iter()
            .all(|report| report.outcome == IndicatorOutcome::Empty)
    );
}

#[test]
fn repeated_page_requests_hit_the_cache() {
    let client = MockWorldBank::default().with_page(
        "NY.GDP.PCAP.CD",
        1,
        envelope(1, 1, vec![row("CHL", "Chile", "2022", json!(15000.0))]),
    );
    let fetcher = Fetcher::new(client, 2000, 64);
    let codes = CountryRegistry::latin_america().joined_codes();

    let first = fetcher
        .fetch_indicator(&codes, "NY.GDP.PCAP.CD", years())
        .unwrap();
    let second = fetcher
        .fetch_indicator(&codes, "NY.GDP.PCAP.CD", years())
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.client().calls(), 1);
    assert_eq!(fetcher.cache_stats(), (1, 1));

    // A different range is a different key.
    let other_range = YearRange::new(2010, 2020).unwrap();
    fetcher
        .fetch_indicator(&codes, "NY.GDP.PCAP.CD", other_range)
        .unwrap();
    assert_eq!(fetcher.client().calls(), 2);
}

#[test]
fn failed_pages_are_not_cached() {
    let fetcher = Fetcher::new(MockWorldBank::default(), 2000, 64);
    let codes = "CHL";

    assert!(fetcher.fetch_page(codes, "X", years(), 1).is_err());
    assert!(fetcher.fetch_page(codes, "X", years(), 1).is_err());
    assert_eq!(fetcher.client().calls(), 2);
}

#[test]
fn renormalizing_output_is_identity() {
    let rows = vec![
        RawRow::from_json(&row("CHL", "Chile", "2020", json!("13000.5"))),
        RawRow::from_json(&row("USA", "United States", "2021", json!(70000))),
        RawRow::from_json(&row("BOL", "Bolivia", "x", json!(1.0))),
    ];
    let countries = CountryRegistry::latin_america();
    let table = normalize(&rows, "PIB per cápita (US$)", &countries);

    let reserialized = table
        .rows()
        .iter()
        .map(|obs| {
            RawRow::from_json(&row(
                &obs.iso3,
                &obs.country,
                &obs.year.to_string(),
                json!(obs.value),
            ))
        })
        .collect::<Vec<_>>();
    let again = normalize(&reserialized, "PIB per cápita (US$)", &countries);

    assert_eq!(table.len(), 2);
    assert_eq!(again, table);
}

#[test]
fn dashboard_load_survives_total_outage() {
    let fetcher = Fetcher::new(MockWorldBank::default(), 2000, 64);
    let config = ResolvedConfig {
        indicators: indicators(),
        ..ResolvedConfig::default()
    };

    let dashboard = Dashboard::load(&fetcher, &config, &NoopSink);

    assert!(dashboard.table().is_empty());
    assert_eq!(dashboard.year_bounds(), config.years);
    let kpis = dashboard
        .kpis("PIB per cápita (US$)", "Chile", None)
        .unwrap();
    assert!(kpis.is_empty());
    let summary = dashboard.summary();
    assert_eq!(summary.rows, 0);
    assert_eq!(summary.observed_years, None);
}
