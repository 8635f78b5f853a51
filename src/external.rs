//! Optional enrichment lookups: crude benchmarks and country facts.
//!
//! Both always produce a value. Without an API key, or on any network or
//! decoding failure, the hardcoded fallback is returned and the failure is
//! only logged.

use crate::config::ExternalConfig;
use crate::util::round_to;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceSource {
    Eia,
    /// Derived from another benchmark.
    Approx,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkQuote {
    pub price: f64,
    pub unit: &'static str,
    pub source: PriceSource,
}

impl BenchmarkQuote {
    fn usd_bbl(price: f64, source: PriceSource) -> Self {
        Self {
            price,
            unit: "USD/bbl",
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Benchmarks {
    pub brent: BenchmarkQuote,
    pub wti: BenchmarkQuote,
    pub dubai: BenchmarkQuote,
}

impl Benchmarks {
    pub fn fallback() -> Self {
        Self {
            brent: BenchmarkQuote::usd_bbl(86.2, PriceSource::Fallback),
            wti: BenchmarkQuote::usd_bbl(82.7, PriceSource::Fallback),
            dubai: BenchmarkQuote::usd_bbl(83.9, PriceSource::Fallback),
        }
    }

    /// Build from EIA spot prices. Dubai has no EIA series; it is
    /// approximated as Brent minus two dollars.
    pub fn from_eia(brent: f64, wti: f64) -> Self {
        Self {
            brent: BenchmarkQuote::usd_bbl(brent, PriceSource::Eia),
            wti: BenchmarkQuote::usd_bbl(wti, PriceSource::Eia),
            dubai: BenchmarkQuote::usd_bbl(round_to((brent - 2.0).max(0.0), 1), PriceSource::Approx),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryFacts {
    pub capital: String,
    pub population: u64,
    pub region: String,
    pub subregion: String,
    pub languages: String,
    pub flag: String,
}

impl CountryFacts {
    pub fn fallback() -> Self {
        Self {
            capital: "Juba".to_string(),
            population: 11_000_000,
            region: "Africa".to_string(),
            subregion: "Eastern Africa".to_string(),
            languages: "English, Arabic, indigenous languages".to_string(),
            flag: String::new(),
        }
    }

    /// Read a REST Countries response. Missing pieces take fallback values;
    /// a response without a country entry yields `None`.
    pub fn from_json(body: &Value) -> Option<Self> {
        let item = body.as_array()?.first()?;
        let fallback = Self::fallback();
        let text = |v: Option<&Value>, default: String| {
            v.and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(default)
        };
        let languages = item
            .get("languages")
            .and_then(Value::as_object)
            .map(|langs| {
                langs
                    .values()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "n/a".to_string());
        let flags = item.get("flags");
        Some(Self {
            capital: text(item.get("capital").and_then(|c| c.get(0)), fallback.capital),
            population: item
                .get("population")
                .and_then(Value::as_u64)
                .filter(|p| *p > 0)
                .unwrap_or(fallback.population),
            region: text(item.get("region"), fallback.region),
            subregion: text(item.get("subregion"), fallback.subregion),
            languages,
            flag: text(
                flags.and_then(|f| f.get("svg").or_else(|| f.get("png"))),
                String::new(),
            ),
        })
    }
}

/// Latest value of an EIA v1 series response (`series[0].data[0][1]`).
pub fn eia_latest_price(body: &Value) -> Option<f64> {
    let point = body.get("series")?.get(0)?.get("data")?.get(0)?.get(1)?;
    point
        .as_f64()
        .or_else(|| point.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Lookup client; holds the HTTP client and endpoint settings.
pub struct ExternalData {
    client: reqwest::Client,
    config: ExternalConfig,
}

impl ExternalData {
    pub fn new(config: ExternalConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "HTTP client setup failed, using defaults");
                reqwest::Client::new()
            });
        Self { client, config }
    }

    pub async fn benchmarks(&self) -> Benchmarks {
        let Some(key) = self.config.eia_api_key.as_deref().filter(|k| !k.is_empty()) else {
            debug!("No EIA API key configured, using fallback benchmarks");
            return Benchmarks::fallback();
        };
        let brent = self.eia_series(key, &self.config.brent_series);
        let wti = self.eia_series(key, &self.config.wti_series);
        match tokio::join!(brent, wti) {
            (Ok(brent), Ok(wti)) => Benchmarks::from_eia(brent, wti),
            (brent, wti) => {
                warn!(
                    brent_error = ?brent.err(),
                    wti_error = ?wti.err(),
                    "Benchmark lookup failed, using fallback prices"
                );
                Benchmarks::fallback()
            }
        }
    }

    async fn eia_series(&self, key: &str, series: &str) -> anyhow::Result<f64> {
        let body: Value = self
            .client
            .get(&self.config.eia_url)
            .query(&[("api_key", key), ("series_id", series)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        eia_latest_price(&body).ok_or_else(|| anyhow::anyhow!("no data point in series {}", series))
    }

    pub async fn country_facts(&self) -> CountryFacts {
        match self.fetch_country().await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "Country facts lookup failed, using fallback");
                CountryFacts::fallback()
            }
        }
    }

    async fn fetch_country(&self) -> anyhow::Result<CountryFacts> {
        let body: Value = self
            .client
            .get(&self.config.country_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        CountryFacts::from_json(&body).ok_or_else(|| anyhow::anyhow!("no country in response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eia_price_is_read_from_first_point() {
        let body = json!({"series": [{"data": [["20240105", 78.25], ["20240104", 77.1]]}]});
        assert_eq!(eia_latest_price(&body), Some(78.25));
        let text = json!({"series": [{"data": [["20240105", "79.5"]]}]});
        assert_eq!(eia_latest_price(&text), Some(79.5));
        assert_eq!(eia_latest_price(&json!({"error": "invalid key"})), None);
    }

    #[test]
    fn dubai_tracks_brent() {
        let b = Benchmarks::from_eia(80.04, 76.0);
        assert_eq!(b.dubai.price, 78.0);
        assert_eq!(b.dubai.source, PriceSource::Approx);
        assert_eq!(Benchmarks::from_eia(1.0, 1.0).dubai.price, 0.0);
    }

    #[test]
    fn country_facts_fill_gaps_from_fallback() {
        let body = json!([{
            "capital": ["Juba"],
            "population": 11193729,
            "region": "Africa",
            "languages": {"eng": "English"},
            "flags": {"png": "https://example.org/ss.png"}
        }]);
        let facts = CountryFacts::from_json(&body).unwrap();
        assert_eq!(facts.population, 11193729);
        assert_eq!(facts.subregion, "Eastern Africa");
        assert_eq!(facts.languages, "English");
        assert_eq!(facts.flag, "https://example.org/ss.png");
        assert_eq!(CountryFacts::from_json(&json!([])), None);
        assert_eq!(CountryFacts::from_json(&json!({"status": 404})), None);
    }

    #[tokio::test]
    async fn no_api_key_means_fallback_benchmarks() {
        let external = ExternalData::new(ExternalConfig::default());
        assert_eq!(external.benchmarks().await, Benchmarks::fallback());
    }

    #[tokio::test]
    async fn unreachable_country_service_falls_back() {
        let config = ExternalConfig {
            country_url: "http://127.0.0.1:9/unreachable".to_string(),
            timeout_secs: 1,
            ..ExternalConfig::default()
        };
        let external = ExternalData::new(config);
        assert_eq!(external.country_facts().await, CountryFacts::fallback());
    }
}
