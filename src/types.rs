use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// Operational state of a well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WellStatus {
    Producing,
    #[serde(rename = "Shut-in")]
    ShutIn,
    Abandoned,
    Drilling,
    Unknown,
}

impl WellStatus {
    /// Statuses the sample generator draws from, in weight order.
    pub const GENERATED: [WellStatus; 4] = [
        WellStatus::Producing,
        WellStatus::ShutIn,
        WellStatus::Abandoned,
        WellStatus::Drilling,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WellStatus::Producing => "Producing",
            WellStatus::ShutIn => "Shut-in",
            WellStatus::Abandoned => "Abandoned",
            WellStatus::Drilling => "Drilling",
            WellStatus::Unknown => "Unknown",
        }
    }

    /// Match a status label, ignoring case and surrounding whitespace.
    pub fn from_label(s: &str) -> Option<WellStatus> {
        let s = s.trim();
        [
            WellStatus::Producing,
            WellStatus::ShutIn,
            WellStatus::Abandoned,
            WellStatus::Drilling,
            WellStatus::Unknown,
        ]
        .into_iter()
        .find(|st| st.label().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for WellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One observation of one well in the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellRecord {
    pub id: u32,
    pub name: String,
    pub field: String,
    pub status: WellStatus,
    /// BOE/d; 0 for non-producing wells.
    pub production: i64,
    /// Period-over-period production delta, percent.
    pub change: f64,
    pub water_cut: f64,
}

impl WellRecord {
    pub fn is_producing(&self) -> bool {
        self.status == WellStatus::Producing
    }
}

/// Well data CSV row as uploaded. Every column is optional.
#[derive(Debug, Default, Deserialize)]
pub struct RawWellRow {
    #[serde(rename = "Well Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Field", default)]
    pub field: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Production (BOE/d)", default)]
    pub production: Option<String>,
    #[serde(rename = "% Change", default)]
    pub change: Option<String>,
    #[serde(rename = "Water Cut (%)", default)]
    pub water_cut: Option<String>,
}

/// Well data CSV row as exported; same column set as [`RawWellRow`].
/// Decimals print in shortest form (`20`, `1.5`).
#[derive(Debug, Serialize)]
pub struct WellCsvRow<'a> {
    #[serde(rename = "Well Name")]
    pub name: &'a str,
    #[serde(rename = "Field")]
    pub field: &'a str,
    #[serde(rename = "Status")]
    pub status: &'static str,
    #[serde(rename = "Production (BOE/d)")]
    pub production: i64,
    #[serde(rename = "% Change")]
    pub change: String,
    #[serde(rename = "Water Cut (%)")]
    pub water_cut: String,
}

impl<'a> From<&'a WellRecord> for WellCsvRow<'a> {
    fn from(w: &'a WellRecord) -> Self {
        WellCsvRow {
            name: &w.name,
            field: &w.field,
            status: w.status.label(),
            production: w.production,
            change: w.change.to_string(),
            water_cut: w.water_cut.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_wells: usize,
    pub producing_wells: usize,
    pub total_production: i64,
    pub avg_production: f64,
    pub avg_water_cut: f64,
}

/// Why a well was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AnomalyReason {
    LargeChange(f64),
    HighWaterCut(f64),
    ZeroProductionWhileProducing,
}

impl fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyReason::LargeChange(v) => write!(f, "Large change: {}%", v),
            AnomalyReason::HighWaterCut(v) => write!(f, "High water cut: {}%", v),
            AnomalyReason::ZeroProductionWhileProducing => {
                f.write_str("Zero production while Producing")
            }
        }
    }
}

/// A well with at least one triggered rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub well: WellRecord,
    pub flags: Vec<AnomalyReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldForecast {
    /// Summed Producing production the projection starts from.
    pub current: i64,
    pub series: Vec<i64>,
}

/// Field name → projected monthly production.
pub type ForecastSeries = BTreeMap<String, FieldForecast>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForecastFormat {
    Production,
    Regional,
    Simple,
}

/// Uploaded forecast, normalized from any of the three layouts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastUploadData {
    pub format: ForecastFormat,
    pub months: Vec<String>,
    pub total: Vec<f64>,
    pub fields: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub producing: usize,
    pub shut_in: usize,
    pub abandoned: usize,
    pub drilling: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldProduction {
    pub field: String,
    pub production: i64,
}

// Console table rows. Values are pre-formatted strings, like the CSV
// reports they mirror.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WellTableRow {
    #[tabled(rename = "ID")]
    pub id: u32,
    #[tabled(rename = "Well Name")]
    pub name: String,
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Production (BOE/d)")]
    pub production: String,
    #[tabled(rename = "% Change")]
    pub change: String,
    #[tabled(rename = "Water Cut (%)")]
    pub water_cut: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AnomalyRow {
    #[tabled(rename = "Well Name")]
    pub name: String,
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Production (BOE/d)")]
    pub production: String,
    #[tabled(rename = "Flags")]
    pub flags: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ForecastRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Current")]
    pub current: String,
    #[tabled(rename = "M1")]
    pub first: String,
    #[tabled(rename = "Last")]
    pub last: String,
}

/// JSON snapshot written by the `export` command alongside the CSV.
#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: chrono::DateTime<chrono::Local>,
    pub kpis: KpiSummary,
    pub status_counts: StatusCounts,
    pub anomalies: Vec<Anomaly>,
    pub forecast: ForecastSeries,
}
