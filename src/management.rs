//! Management uploads: regional price data and well logs.
//!
//! Unlike the well data loader these uploads have required columns. A file
//! missing any of them is rejected with the list of missing headers and the
//! previously loaded data stays in place.

use crate::error::UploadError;
use crate::parser::{parse_csv, ParsedCsv, RowPolicy};
use crate::util::parse_float_prefix;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tabled::Tabled;
use tracing::info;

/// Towns shown in the price fluctuation chart.
pub const PRICE_CHART_TOWNS: usize = 5;
/// Towns listed in the price summary.
pub const PRICE_SUMMARY_TOWNS: usize = 8;

pub const WELL_LOG_HEADERS: [&str; 8] = [
    "Depth", "WOB", "SURF_RPM", "ROP_AVG", "PHIF", "VSH", "SW", "KLOGH",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub town: String,
    pub state: String,
    pub date: String,
    /// `None` leaves a gap in the chart series.
    pub price: Option<f64>,
    pub index: Option<String>,
}

/// Column positions located by case-insensitive substring match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceColumns {
    pub town: usize,
    pub state: usize,
    pub date: usize,
    pub price: usize,
    pub index: Option<usize>,
}

impl PriceColumns {
    /// Locate the price columns, or name every required one that is missing.
    pub fn locate(parsed: &ParsedCsv) -> Result<Self, UploadError> {
        let upper: Vec<String> = parsed.headers().iter().map(|h| h.to_uppercase()).collect();
        let find = |token: &str| upper.iter().position(|h| h.contains(token));

        let required = ["TOWN", "STATE", "DATE", "PRICE"].map(|t| (t, find(t)));
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, pos)| pos.is_none())
            .map(|(t, _)| t.to_string())
            .collect();
        match required {
            [(_, Some(town)), (_, Some(state)), (_, Some(date)), (_, Some(price))] => Ok(Self {
                town,
                state,
                date,
                price,
                index: find("INDEX"),
            }),
            _ => Err(UploadError::MissingHeaders(missing)),
        }
    }
}

pub fn parse_price_csv(text: &str) -> Result<Vec<PriceRecord>, UploadError> {
    let parsed = parse_csv(text, RowPolicy::DropMismatched);
    if parsed.headers().is_empty() {
        return Err(UploadError::Empty);
    }
    let cols = PriceColumns::locate(&parsed)?;
    if parsed.is_empty() {
        return Err(UploadError::Empty);
    }

    let cell = |rec: &csv::StringRecord, i: usize| rec.get(i).unwrap_or("").to_string();
    let records: Vec<PriceRecord> = parsed
        .records()
        .iter()
        .map(|rec| PriceRecord {
            town: cell(rec, cols.town),
            state: cell(rec, cols.state),
            date: cell(rec, cols.date),
            price: rec.get(cols.price).and_then(parse_float_prefix),
            index: cols.index.map(|i| cell(rec, i)).filter(|s| !s.is_empty()),
        })
        .collect();

    info!(rows = records.len(), "Loaded price data");
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TownPriceSummary {
    #[tabled(rename = "Town")]
    pub town: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Avg Price (USD/bbl)")]
    #[tabled(display_with = "display_price")]
    pub avg_price: f64,
}

fn display_price(v: &f64) -> String {
    format!("${:.2}", v)
}

/// Towns ranked by mean price, highest first, capped at `limit`.
///
/// Rows without a parsable price do not count toward a town's mean; a town
/// with no parsable price at all is left out.
pub fn price_summary(records: &[PriceRecord], limit: usize) -> Vec<TownPriceSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut acc: HashMap<&str, (f64, usize, &str)> = HashMap::new();
    for r in records {
        let e = acc.entry(r.town.as_str()).or_insert_with(|| {
            order.push(r.town.as_str());
            (0.0, 0, r.state.as_str())
        });
        if let Some(p) = r.price {
            e.0 += p;
            e.1 += 1;
        }
    }

    let mut rows: Vec<TownPriceSummary> = order
        .into_iter()
        .filter_map(|town| {
            let (total, count, state) = acc.get(town)?;
            (*count > 0).then(|| TownPriceSummary {
                town: town.to_string(),
                state: state.to_string(),
                avg_price: total / *count as f64,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.avg_price.partial_cmp(&a.avg_price).unwrap_or(Ordering::Equal));
    rows.truncate(limit);
    rows
}

/// One line of the price fluctuation chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownSeries {
    pub town: String,
    pub prices: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChart {
    pub dates: Vec<String>,
    pub towns: Vec<TownSeries>,
}

/// Parse the date layouts seen in price exports. Unknown layouts sort first.
pub fn parse_price_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    const DATE_FORMATS: [&str; 6] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d %b %Y", "%b %d %Y"];
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        })
}

/// Chart series for the first `max_towns` towns (appearance order) over every
/// distinct date, sorted chronologically. Missing or unparsable prices are gaps.
pub fn price_chart(records: &[PriceRecord], max_towns: usize) -> PriceChart {
    let mut dates: Vec<&str> = Vec::new();
    let mut towns: Vec<&str> = Vec::new();
    let mut lookup: HashMap<(&str, &str), Option<f64>> = HashMap::new();
    for r in records {
        if !dates.contains(&r.date.as_str()) {
            dates.push(&r.date);
        }
        let town = r.town.as_str();
        if !town.is_empty() && town != "null" && town != "undefined" && !towns.contains(&town) {
            towns.push(town);
        }
        // First record for a (town, date) pair wins.
        lookup.entry((town, r.date.as_str())).or_insert(r.price);
    }
    // Stable sort keeps source order for dates that do not parse.
    dates.sort_by_key(|d| parse_price_date(d));

    let towns = towns
        .into_iter()
        .take(max_towns)
        .map(|town| TownSeries {
            town: town.to_string(),
            prices: dates
                .iter()
                .map(|d| lookup.get(&(town, *d)).copied().flatten())
                .collect(),
        })
        .collect();

    PriceChart {
        dates: dates.into_iter().map(str::to_string).collect(),
        towns,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellLogRecord {
    pub depth: Option<f64>,
    pub wob: Option<f64>,
    pub surf_rpm: Option<f64>,
    pub rop_avg: Option<f64>,
    pub phif: Option<f64>,
    pub vsh: Option<f64>,
    pub sw: Option<f64>,
    pub klogh: Option<f64>,
}

pub fn parse_well_logs_csv(text: &str) -> Result<Vec<WellLogRecord>, UploadError> {
    let parsed = parse_csv(text, RowPolicy::DropMismatched);
    if parsed.headers().is_empty() {
        return Err(UploadError::Empty);
    }
    let missing: Vec<String> = WELL_LOG_HEADERS
        .iter()
        .filter(|h| !parsed.has_header(h))
        .map(|h| h.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(UploadError::MissingHeaders(missing));
    }
    if parsed.is_empty() {
        return Err(UploadError::Empty);
    }

    // Every header is present, so each lookup below resolves.
    let idx: Vec<usize> = WELL_LOG_HEADERS
        .iter()
        .filter_map(|h| parsed.header_index(h))
        .collect();
    let value = |rec: &csv::StringRecord, col: usize| rec.get(idx[col]).and_then(parse_float_prefix);

    let logs: Vec<WellLogRecord> = parsed
        .records()
        .iter()
        .map(|rec| WellLogRecord {
            depth: value(rec, 0),
            wob: value(rec, 1),
            surf_rpm: value(rec, 2),
            rop_avg: value(rec, 3),
            phif: value(rec, 4),
            vsh: value(rec, 5),
            sw: value(rec, 6),
            klogh: value(rec, 7),
        })
        .collect();

    info!(rows = logs.len(), "Loaded well logs");
    Ok(logs)
}

/// Depth-indexed ROP and porosity series for the well logs chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellLogChart {
    pub depths: Vec<Option<f64>>,
    pub rop: Vec<Option<f64>>,
    /// PHIF as a percentage.
    pub porosity_pct: Vec<Option<f64>>,
}

pub fn well_log_chart(logs: &[WellLogRecord]) -> WellLogChart {
    WellLogChart {
        depths: logs.iter().map(|l| l.depth).collect(),
        rop: logs.iter().map(|l| l.rop_avg).collect(),
        porosity_pct: logs.iter().map(|l| l.phif.map(|p| p * 100.0)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICES: &str = "\
Town Name,State,Dates,Prices (USD/bbl),Price Index
Juba,Central Equatoria,2024-02-01,84.5,101
Malakal,Upper Nile,2024-01-01,90,108
Juba,Central Equatoria,2024-01-01,82.5,99
Bentiu,Unity,2024-01-01,n/a,
Malakal,Upper Nile,2024-02-01,92,110
";

    #[test]
    fn price_headers_match_by_substring() {
        let records = parse_price_csv(PRICES).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].town, "Juba");
        assert_eq!(records[0].price, Some(84.5));
        assert_eq!(records[0].index.as_deref(), Some("101"));
        assert_eq!(records[3].price, None);
        assert_eq!(records[3].index, None);
    }

    #[test]
    fn missing_price_headers_are_named() {
        let err = parse_price_csv("Town,Value\nJuba,1\n").unwrap_err();
        match &err {
            UploadError::MissingHeaders(missing) => {
                assert_eq!(missing, &vec!["STATE", "DATE", "PRICE"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.to_string(), "Missing headers: STATE, DATE, PRICE");
    }

    #[test]
    fn empty_price_file_is_rejected() {
        assert!(matches!(parse_price_csv(""), Err(UploadError::Empty)));
    }

    #[test]
    fn summary_ranks_towns_by_mean_price() {
        let records = parse_price_csv(PRICES).unwrap();
        let summary = price_summary(&records, PRICE_SUMMARY_TOWNS);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].town, "Malakal");
        assert_eq!(summary[0].state, "Upper Nile");
        assert_eq!(summary[0].avg_price, 91.0);
        assert_eq!(summary[1].avg_price, 83.5);
        assert_eq!(price_summary(&records, 1).len(), 1);
    }

    #[test]
    fn chart_sorts_dates_and_leaves_gaps() {
        let records = parse_price_csv(PRICES).unwrap();
        let chart = price_chart(&records, PRICE_CHART_TOWNS);
        assert_eq!(chart.dates, vec!["2024-01-01", "2024-02-01"]);
        let towns: Vec<&str> = chart.towns.iter().map(|t| t.town.as_str()).collect();
        assert_eq!(towns, vec!["Juba", "Malakal", "Bentiu"]);
        assert_eq!(chart.towns[0].prices, vec![Some(82.5), Some(84.5)]);
        assert_eq!(chart.towns[2].prices, vec![None, None]);

        let two = price_chart(&records, 2);
        assert_eq!(two.towns.len(), 2);
    }

    #[test]
    fn price_dates_in_several_layouts() {
        assert!(parse_price_date("2024-03-01").is_some());
        assert!(parse_price_date("03/01/2024").is_some());
        assert!(parse_price_date("2024/03/01").is_some());
        assert!(parse_price_date("2024-03-01 12:30:00").is_some());
        assert!(parse_price_date("March").is_none());
        assert!(parse_price_date("2024-01-01") < parse_price_date("2024-02-01"));
    }

    const LOGS: &str = "\
Depth,WOB,SURF_RPM,ROP_AVG,PHIF,VSH,SW,KLOGH
1000,25,120,55.2,0.18,0.3,0.4,120
1010,26,118,-,0.2,0.31,0.42,118
1020,27
";

    #[test]
    fn well_logs_parse_and_chart() {
        let logs = parse_well_logs_csv(LOGS).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].depth, Some(1000.0));
        assert_eq!(logs[1].rop_avg, None);

        let chart = well_log_chart(&logs);
        assert_eq!(chart.depths, vec![Some(1000.0), Some(1010.0)]);
        assert_eq!(chart.rop, vec![Some(55.2), None]);
        assert!((chart.porosity_pct[0].unwrap() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn well_logs_require_exact_headers() {
        let err = parse_well_logs_csv("depth,WOB,SURF_RPM,ROP_AVG,PHIF,VSH,SW\n1,2,3,4,5,6,7\n")
            .unwrap_err();
        match err {
            UploadError::MissingHeaders(missing) => assert_eq!(missing, vec!["Depth", "KLOGH"]),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(parse_well_logs_csv(WELL_LOG_HEADERS.join(",").as_str()), Err(UploadError::Empty)));
    }

    #[test]
    fn wrong_log_headers_are_named_even_when_every_row_is_dropped() {
        let err = parse_well_logs_csv("Depth,WOB,X
1000,25
1010
").unwrap_err();
        match err {
            UploadError::MissingHeaders(missing) => {
                assert_eq!(missing, vec!["SURF_RPM", "ROP_AVG", "PHIF", "VSH", "SW", "KLOGH"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(parse_well_logs_csv(""), Err(UploadError::Empty)));
    }
}
