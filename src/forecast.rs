//! Forecast upload interpretation.
//!
//! Forecast files come in three shapes. Two are "wide" (one column per
//! month, headers like `Jan-24`); the third is a plain two-column
//! month/production listing. [`sniff_schema`] decides which one a header
//! row describes, and [`interpret_forecast_csv`] folds the rows into a
//! [`ForecastUploadData`].

use crate::error::ForecastError;
use crate::parser::{parse_csv, RowPolicy};
use crate::types::{ForecastFormat, ForecastUploadData};
use crate::util::{parse_f64_safe, parse_stripped_f64};
use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, info};

static MONTH_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3}-\d{2}$").expect("valid regex"));

/// Only this category contributes in the production layout.
pub const OIL_CATEGORY: &str = "Oil Production";

/// A header that names a month, e.g. `Jan-24` at column 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthColumn {
    pub index: usize,
    pub label: String,
}

/// Layout of a forecast upload plus where its columns live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastSchema {
    /// `Category,Field,<months>...`; only oil production rows count.
    Production {
        category: usize,
        field: usize,
        months: Vec<MonthColumn>,
    },
    /// `<field>,<months>...`
    Regional { field: usize, months: Vec<MonthColumn> },
    /// One `(month, production)` pair per row.
    Simple { month: usize, production: usize },
}

impl ForecastSchema {
    pub fn format(&self) -> ForecastFormat {
        match self {
            ForecastSchema::Production { .. } => ForecastFormat::Production,
            ForecastSchema::Regional { .. } => ForecastFormat::Regional,
            ForecastSchema::Simple { .. } => ForecastFormat::Simple,
        }
    }
}

pub fn is_month_label(header: &str) -> bool {
    MONTH_COLUMN.is_match(header)
}

/// Pick the layout a header row describes.
///
/// Precedence matters because a file can look like more than one shape:
/// month columns win over the simple layout, and among wide files the
/// `Category` + `Field` pair selects the production layout.
pub fn sniff_schema(headers: &StringRecord) -> Result<ForecastSchema, ForecastError> {
    if headers.is_empty() {
        return Err(ForecastError::NoHeader);
    }

    let months: Vec<MonthColumn> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| is_month_label(h))
        .map(|(index, h)| MonthColumn {
            index,
            label: h.to_string(),
        })
        .collect();

    if !months.is_empty() {
        let category = headers.iter().position(|h| h == "Category");
        let field = headers.iter().position(|h| h == "Field");
        return Ok(match (category, field) {
            (Some(category), Some(field)) => ForecastSchema::Production {
                category,
                field,
                months,
            },
            _ => ForecastSchema::Regional {
                field: 0,
                months: months.into_iter().filter(|m| m.index != 0).collect(),
            },
        });
    }

    // Month and production must be different columns.
    let find = |needles: &[&str], skip: Option<usize>| {
        headers.iter().enumerate().position(|(i, h)| {
            let lower = h.to_lowercase();
            Some(i) != skip && needles.iter().any(|n| lower.contains(n))
        })
    };
    let month = find(&["month", "date"], None).ok_or(ForecastError::UnrecognizedLayout {
        missing: "month/date",
    })?;
    let production =
        find(&["production", "boe"], Some(month)).ok_or(ForecastError::UnrecognizedLayout {
            missing: "production/boe",
        })?;
    Ok(ForecastSchema::Simple { month, production })
}

/// Parse a forecast upload of any supported layout.
///
/// An unrecognized layout is an `Err`, never a panic; the caller keeps
/// whatever forecast it had.
pub fn interpret_forecast_csv(text: &str) -> Result<ForecastUploadData, ForecastError> {
    let parsed = parse_csv(text, RowPolicy::DropMismatched);
    let schema = sniff_schema(parsed.headers())?;
    debug!(format = ?schema.format(), rows = parsed.len(), "Detected forecast layout");

    let data = match schema {
        ForecastSchema::Production {
            category,
            field,
            months,
        } => {
            let mut acc = WideAccumulator::new(months);
            for rec in parsed.records() {
                if rec.get(category) != Some(OIL_CATEGORY) {
                    continue;
                }
                acc.add_row(rec.get(field).unwrap_or(""), rec);
            }
            acc.finish(ForecastFormat::Production)
        }
        ForecastSchema::Regional { field, months } => {
            let mut acc = WideAccumulator::new(months);
            for rec in parsed.records() {
                acc.add_row(rec.get(field).unwrap_or(""), rec);
            }
            acc.finish(ForecastFormat::Regional)
        }
        ForecastSchema::Simple { month, production } => {
            let mut months = Vec::new();
            let mut total = Vec::new();
            for rec in parsed.records() {
                let label = rec.get(month).unwrap_or("");
                if label.is_empty() {
                    continue;
                }
                months.push(label.to_string());
                total.push(
                    rec.get(production)
                        .and_then(parse_stripped_f64)
                        .unwrap_or(0.0),
                );
            }
            ForecastUploadData {
                format: ForecastFormat::Simple,
                months,
                total,
                fields: BTreeMap::new(),
            }
        }
    };

    info!(
        format = ?data.format,
        months = data.months.len(),
        fields = data.fields.len(),
        "Interpreted forecast upload"
    );
    Ok(data)
}

/// Sums wide-layout rows into per-field and per-month totals.
struct WideAccumulator {
    months: Vec<MonthColumn>,
    total: Vec<f64>,
    fields: BTreeMap<String, BTreeMap<String, f64>>,
}

impl WideAccumulator {
    fn new(months: Vec<MonthColumn>) -> Self {
        let total = vec![0.0; months.len()];
        Self {
            months,
            total,
            fields: BTreeMap::new(),
        }
    }

    fn add_row(&mut self, field: &str, rec: &StringRecord) {
        if field.is_empty() || field.eq_ignore_ascii_case("total") {
            return;
        }
        for (slot, col) in self.months.iter().enumerate() {
            let raw = rec.get(col.index).unwrap_or("");
            if raw == "-" {
                continue;
            }
            let Some(value) = parse_f64_safe(Some(raw)) else {
                continue;
            };
            *self
                .fields
                .entry(field.to_string())
                .or_default()
                .entry(col.label.clone())
                .or_insert(0.0) += value;
            self.total[slot] += value;
        }
    }

    fn finish(self, format: ForecastFormat) -> ForecastUploadData {
        ForecastUploadData {
            format,
            months: self.months.into_iter().map(|m| m.label).collect(),
            total: self.total,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(line: &str) -> StringRecord {
        StringRecord::from(line.split(',').collect::<Vec<_>>())
    }

    #[test]
    fn month_pattern() {
        assert!(is_month_label("Jan-24"));
        assert!(is_month_label("sep-99"));
        assert!(!is_month_label("January-24"));
        assert!(!is_month_label("Jan-2024"));
        assert!(!is_month_label("Jan 24"));
    }

    #[test]
    fn category_and_field_select_production_layout() {
        let schema = sniff_schema(&headers("Category,Field,Jan-24,Feb-24,Unit")).unwrap();
        assert_eq!(schema.format(), ForecastFormat::Production);
        match schema {
            ForecastSchema::Production {
                category,
                field,
                months,
            } => {
                assert_eq!((category, field), (0, 1));
                assert_eq!(months.iter().map(|m| m.index).collect::<Vec<_>>(), vec![2, 3]);
            }
            other => panic!("unexpected schema {:?}", other),
        }
    }

    #[test]
    fn month_columns_without_category_select_regional_layout() {
        let schema = sniff_schema(&headers("Field,Jan-24,Feb-24")).unwrap();
        assert_eq!(schema.format(), ForecastFormat::Regional);
        // Only one of the pair is not enough for the production layout.
        let schema = sniff_schema(&headers("Category,Jan-24")).unwrap();
        assert_eq!(schema.format(), ForecastFormat::Regional);
    }

    #[test]
    fn month_columns_take_precedence_over_simple_headers() {
        let schema = sniff_schema(&headers("Month,Production,Jan-24")).unwrap();
        assert_eq!(schema.format(), ForecastFormat::Regional);
    }

    #[test]
    fn fuzzy_headers_select_simple_layout() {
        let schema = sniff_schema(&headers("Month,Production (BOE/d)")).unwrap();
        assert_eq!(
            schema,
            ForecastSchema::Simple {
                month: 0,
                production: 1
            }
        );
        let schema = sniff_schema(&headers("Total BOE,Report Date")).unwrap();
        assert_eq!(
            schema,
            ForecastSchema::Simple {
                month: 1,
                production: 0
            }
        );
    }

    #[test]
    fn month_and_production_are_distinct_columns() {
        let schema = sniff_schema(&headers("Production Date,BOE")).unwrap();
        assert_eq!(
            schema,
            ForecastSchema::Simple {
                month: 0,
                production: 1
            }
        );
        assert_eq!(
            sniff_schema(&headers("Production Date,Rate")),
            Err(ForecastError::UnrecognizedLayout {
                missing: "production/boe"
            })
        );

        let data = interpret_forecast_csv("Production Date,BOE\nJan-24,100\nFeb-24,90\n").unwrap();
        assert_eq!(data.months, vec!["Jan-24", "Feb-24"]);
        assert_eq!(data.total, vec![100.0, 90.0]);
    }

    #[test]
    fn unrecognized_headers_fail() {
        assert_eq!(
            sniff_schema(&headers("Well,Rate")),
            Err(ForecastError::UnrecognizedLayout {
                missing: "month/date"
            })
        );
        assert_eq!(
            sniff_schema(&headers("Month,Rate")),
            Err(ForecastError::UnrecognizedLayout {
                missing: "production/boe"
            })
        );
        assert_eq!(sniff_schema(&StringRecord::new()), Err(ForecastError::NoHeader));
    }

    #[test]
    fn production_layout_keeps_oil_rows_only() {
        let text = "\
Category,Field,Jan-24,Feb-24,Unit
Oil Production,Paloch,100,90,BOE/d
Oil Production,Adar Yale,50,-,BOE/d
Gas Production,Paloch,999,999,MMscf
Oil Production,Total,150,90,BOE/d
Oil Production,TOTAL,150,90,BOE/d
-,-,-,-,-
Oil Production,Paloch,10,10,BOE/d
";
        let data = interpret_forecast_csv(text).unwrap();
        assert_eq!(data.format, ForecastFormat::Production);
        assert_eq!(data.months, vec!["Jan-24", "Feb-24"]);
        assert_eq!(data.total, vec![160.0, 100.0]);
        assert_eq!(data.fields.len(), 2);
        assert_eq!(data.fields["Paloch"]["Jan-24"], 110.0);
        assert_eq!(data.fields["Adar Yale"].get("Feb-24"), None);
        assert!(!data.fields.keys().any(|k| k.eq_ignore_ascii_case("total")));
    }

    #[test]
    fn production_layout_drops_misaligned_rows() {
        let text = "\
Category,Field,Jan-24,Feb-24
Oil Production,Paloch,100
Oil Production,Unity,20,30
";
        let data = interpret_forecast_csv(text).unwrap();
        assert_eq!(data.total, vec![20.0, 30.0]);
        assert!(!data.fields.contains_key("Paloch"));
    }

    #[test]
    fn regional_layout_sums_fields() {
        let text = "\
Region,Jan-24,Feb-24,Mar-24
Paloch,1000,950,900
Heglig,400,,380
Total,1400,950,1280
";
        let data = interpret_forecast_csv(text).unwrap();
        assert_eq!(data.format, ForecastFormat::Regional);
        assert_eq!(data.months, vec!["Jan-24", "Feb-24", "Mar-24"]);
        assert_eq!(data.total, vec![1400.0, 950.0, 1280.0]);
        assert_eq!(data.fields["Heglig"].len(), 2);
    }

    #[test]
    fn simple_layout_strips_units() {
        let text = "\
Month,Production (BOE/d)
Jan-24,\"25000\"
Feb-24,24250 BOE
,100
Mar-24,n/a
";
        let data = interpret_forecast_csv(text).unwrap();
        assert_eq!(data.format, ForecastFormat::Simple);
        assert_eq!(data.months, vec!["Jan-24", "Feb-24", "Mar-24"]);
        assert_eq!(data.total, vec![25000.0, 24250.0, 0.0]);
        assert!(data.fields.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error_not_a_panic() {
        assert!(interpret_forecast_csv("Well,Rate\nA,1\n").is_err());
        assert_eq!(interpret_forecast_csv(""), Err(ForecastError::NoHeader));
    }
}
