use crate::analytics::{decline_series, DeclineParams};
use crate::dashboard::{DashboardView, ForecastTarget, NoticeLevel, TablePage};
use crate::management::{PriceChart, TownPriceSummary, WellLogChart};
use crate::types::{
    Anomaly, AnomalyRow, FieldProduction, ForecastRow, ForecastSeries, ForecastUploadData,
    KpiSummary, StatusCounts, WellCsvRow, WellRecord, WellTableRow,
};
use crate::util::{average, format_int, format_number, format_signed_pct};
use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::io;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub const WELL_CSV_HEADERS: [&str; 6] = [
    "Well Name",
    "Field",
    "Status",
    "Production (BOE/d)",
    "% Change",
    "Water Cut (%)",
];

/// Starting rate and monthly decline of the forecast template.
const TEMPLATE_BASE_BOE: i64 = 25_000;
const TEMPLATE_DECLINE: f64 = 0.02;
const TEMPLATE_MONTHS: usize = 12;

/// Render wells in the upload layout so an export can be re-uploaded.
/// No quoting; the header is written even for an empty set.
pub fn wells_to_csv(wells: &[WellRecord]) -> csv::Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    if wells.is_empty() {
        wtr.write_record(WELL_CSV_HEADERS)?;
    }
    for w in wells {
        wtr.serialize(WellCsvRow::from(w))?;
    }
    let bytes = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn well_template_csv() -> String {
    format!(
        "{}\nEF #101-205,Eagle Ford,Producing,1250,1.5,22.1\n",
        WELL_CSV_HEADERS.join(",")
    )
}

/// Simple-layout forecast with `Mon-YY` labels from `start`, declining
/// geometrically.
pub fn forecast_template_csv(start: NaiveDate) -> String {
    let params = DeclineParams {
        monthly_decline: TEMPLATE_DECLINE,
        months: TEMPLATE_MONTHS - 1,
    };
    let values = std::iter::once(TEMPLATE_BASE_BOE).chain(decline_series(TEMPLATE_BASE_BOE, &params));

    let mut out = String::from("Month,Production (BOE/d)\n");
    for (i, value) in values.enumerate() {
        let Some(month) = start.checked_add_months(Months::new(i as u32)) else {
            break;
        };
        out.push_str(&format!("{},{}\n", month.format("%b-%y"), value));
    }
    out
}

pub fn write_text(path: &Path, contents: &str) -> io::Result<()> {
    std::fs::write(path, contents)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)
}

pub fn print_table<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

impl From<&WellRecord> for WellTableRow {
    fn from(w: &WellRecord) -> Self {
        WellTableRow {
            id: w.id,
            name: w.name.clone(),
            field: w.field.clone(),
            status: w.status.label().to_string(),
            production: format_int(w.production),
            change: format_signed_pct(w.change),
            water_cut: format!("{}%", format_number(w.water_cut, 1)),
        }
    }
}

impl From<&Anomaly> for AnomalyRow {
    fn from(a: &Anomaly) -> Self {
        AnomalyRow {
            name: a.well.name.clone(),
            field: a.well.field.clone(),
            production: format_int(a.well.production),
            flags: a
                .flags
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

pub fn forecast_rows(series: &ForecastSeries) -> Vec<ForecastRow> {
    series
        .iter()
        .map(|(field, fc)| ForecastRow {
            field: field.clone(),
            current: format_int(fc.current),
            first: fc.series.first().map(|v| format_int(*v)).unwrap_or_default(),
            last: fc.series.last().map(|v| format_int(*v)).unwrap_or_default(),
        })
        .collect()
}

pub fn print_kpis(kpis: &KpiSummary) {
    println!("Total Production: {} BOE/d", format_int(kpis.total_production));
    println!(
        "Active Wells: {} of {}",
        format_int(kpis.producing_wells as i64),
        format_int(kpis.total_wells as i64)
    );
    println!("Avg Production: {} BOE/d", format_number(kpis.avg_production, 0));
    println!("Avg Water Cut: {}%\n", format_number(kpis.avg_water_cut, 1));
}

pub fn print_anomalies(anomalies: &[Anomaly]) {
    println!("Anomalies ({})", anomalies.len());
    let rows: Vec<AnomalyRow> = anomalies.iter().map(AnomalyRow::from).collect();
    print_table(&rows, rows.len());
}

pub fn print_forecast(labels: &[String], series: &ForecastSeries) {
    let horizon = labels.last().map(String::as_str).unwrap_or("-");
    println!("Decline Forecast (M1..{})", horizon);
    let rows = forecast_rows(series);
    print_table(&rows, rows.len());
}

pub fn print_forecast_upload(data: &ForecastUploadData) {
    println!(
        "{:?} layout, {} months, {} fields",
        data.format,
        data.months.len(),
        data.fields.len()
    );
    for (month, total) in data.months.iter().zip(&data.total) {
        println!("  {:<8} {:>12} BOE/d", month, format_number(*total, 0));
    }
    println!();
}

pub fn print_prices(summary: &[TownPriceSummary], chart: &PriceChart) {
    println!("Average Price by Town");
    print_table(summary, summary.len());
    println!(
        "Price fluctuation: {} dates, towns: {}\n",
        chart.dates.len(),
        chart
            .towns
            .iter()
            .map(|t| t.town.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
}

pub fn print_well_logs(chart: &WellLogChart) {
    let depths: Vec<f64> = chart.depths.iter().flatten().copied().collect();
    let min = depths.iter().copied().fold(f64::INFINITY, f64::min);
    let max = depths.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    println!("Well Logs: {} samples", chart.depths.len());
    if !depths.is_empty() {
        println!("  Depth {} to {}", format_number(min, 1), format_number(max, 1));
    }
    let rop: Vec<f64> = chart.rop.iter().flatten().copied().collect();
    let phi: Vec<f64> = chart.porosity_pct.iter().flatten().copied().collect();
    println!("  Mean ROP: {}", format_number(average(&rop), 2));
    println!("  Mean porosity: {}%\n", format_number(average(&phi), 1));
}

/// Terminal dashboard. `notices_only` suppresses the panels and keeps
/// upload notices, for one-shot commands that print their own output.
pub struct ConsoleView {
    notices_only: bool,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self { notices_only: false }
    }

    pub fn notices_only() -> Self {
        Self { notices_only: true }
    }
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardView for ConsoleView {
    fn update_kpis(&mut self, kpis: &KpiSummary) {
        if self.notices_only {
            return;
        }
        println!("== Overview ==");
        print_kpis(kpis);
    }

    fn update_top_wells(&mut self, wells: &[WellRecord]) {
        if self.notices_only {
            return;
        }
        println!("Top Producing Wells");
        let rows: Vec<WellTableRow> = wells.iter().map(WellTableRow::from).collect();
        print_table(&rows, rows.len());
    }

    fn show_anomalies(&mut self, anomalies: &[Anomaly]) {
        if !self.notices_only {
            print_anomalies(anomalies);
        }
    }

    fn render_status_distribution(&mut self, counts: &StatusCounts) {
        if self.notices_only {
            return;
        }
        println!(
            "Status: Producing {} | Shut-in {} | Abandoned {} | Drilling {}",
            counts.producing, counts.shut_in, counts.abandoned, counts.drilling
        );
        if counts.unknown > 0 {
            println!("        Unknown {}", counts.unknown);
        }
    }

    fn render_field_production(&mut self, fields: &[FieldProduction]) {
        if self.notices_only {
            return;
        }
        println!("Production by Field");
        for f in fields {
            println!("  {:<16} {:>10} BOE/d", f.field, format_int(f.production));
        }
    }

    fn render_water_cut(&mut self, fields: &[(String, f64)]) {
        if self.notices_only {
            return;
        }
        println!("Water Cut by Field");
        for (field, cut) in fields {
            println!("  {:<16} {:>6}%", field, format_number(*cut, 1));
        }
    }

    fn render_production_mix(&mut self, shares: [u32; 3]) {
        if self.notices_only {
            return;
        }
        println!(
            "Production Mix: Oil {}% | Gas {}% | NGL {}%\n",
            shares[0], shares[1], shares[2]
        );
    }

    fn render_forecast(&mut self, labels: &[String], series: &ForecastSeries) {
        if !self.notices_only {
            print_forecast(labels, series);
        }
    }

    fn populate_table(&mut self, page: &TablePage) {
        if self.notices_only {
            return;
        }
        println!("Wells");
        let rows: Vec<WellTableRow> = page.rows.iter().map(WellTableRow::from).collect();
        print_table(&rows, rows.len());
        println!(
            "Page {} of {} ({} wells)\n",
            page.page,
            page.total_pages,
            format_int(page.total_rows as i64)
        );
    }

    fn render_forecast_upload(&mut self, target: ForecastTarget, data: &ForecastUploadData) {
        // Both targets receive the same data; print it once.
        if target == ForecastTarget::Dashboard {
            println!("Uploaded Forecast");
            print_forecast_upload(data);
        }
    }

    fn render_prices(&mut self, summary: &[TownPriceSummary], chart: &PriceChart) {
        print_prices(summary, chart);
    }

    fn render_well_logs(&mut self, chart: &WellLogChart) {
        print_well_logs(chart);
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => println!("{}", message),
            NoticeLevel::Warning => println!("Warning: {}", message),
            NoticeLevel::Error => eprintln!("Error: {}", message),
        }
    }
}
