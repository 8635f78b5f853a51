//! Application state and the render flow around it.
//!
//! [`Dashboard`] owns the current well set and everything derived from
//! user interaction (filter, page, uploaded datasets). It never draws
//! anything itself; every visible change goes through a [`DashboardView`].

use crate::analytics::{
    calc_kpis, detect_anomalies, field_production, field_water_cut, forecast_decline,
    forecast_month_labels, status_counts, top_producers,
};
use crate::config::{AnalyticsConfig, DashboardConfig, SampleConfig};
use crate::error::{ForecastError, UploadError};
use crate::forecast::interpret_forecast_csv;
use crate::loader::load_wells;
use crate::management::{
    parse_price_csv, parse_well_logs_csv, price_chart, price_summary, well_log_chart, PriceChart,
    PriceRecord, TownPriceSummary, WellLogChart, WellLogRecord, PRICE_CHART_TOWNS,
    PRICE_SUMMARY_TOWNS,
};
use crate::output::wells_to_csv;
use crate::sample::SampleGenerator;
use crate::source::DataSource;
use crate::types::{
    Anomaly, DashboardSnapshot, FieldProduction, ForecastSeries, ForecastUploadData, KpiSummary,
    StatusCounts, WellRecord,
};
use crate::util::slugify;
use chrono::{DateTime, Local};
use rand::Rng;
use tracing::{debug, info, warn};

/// Filter value that shows every field.
pub const ALL_FIELDS: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Where an uploaded forecast is shown. Both receive the same data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastTarget {
    Dashboard,
    Management,
}

/// One page of the (filtered) well table.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePage {
    pub rows: Vec<WellRecord>,
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    /// Rows matching the filter, across all pages.
    pub total_rows: usize,
}

impl TablePage {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Presentation sink. Every method defaults to a no-op so a view only
/// implements the panels it actually has.
pub trait DashboardView {
    fn update_kpis(&mut self, _kpis: &KpiSummary) {}
    fn update_top_wells(&mut self, _wells: &[WellRecord]) {}
    fn show_anomalies(&mut self, _anomalies: &[Anomaly]) {}
    fn render_status_distribution(&mut self, _counts: &StatusCounts) {}
    fn render_field_production(&mut self, _fields: &[FieldProduction]) {}
    fn render_water_cut(&mut self, _fields: &[(String, f64)]) {}
    /// Oil, gas and NGL shares in whole percent.
    fn render_production_mix(&mut self, _shares: [u32; 3]) {}
    fn render_forecast(&mut self, _labels: &[String], _series: &ForecastSeries) {}
    fn populate_table(&mut self, _page: &TablePage) {}
    fn render_forecast_upload(&mut self, _target: ForecastTarget, _data: &ForecastUploadData) {}
    fn render_prices(&mut self, _summary: &[TownPriceSummary], _chart: &PriceChart) {}
    fn render_well_logs(&mut self, _chart: &WellLogChart) {}
    fn notify(&mut self, _level: NoticeLevel, _message: &str) {}
}

/// Proof of having started a load. Only the most recent ticket may finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Bundled,
    Sample,
    Upload,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { origin: LoadOrigin, wells: usize },
    /// Nothing usable to apply; the previous set stays.
    Rejected,
    /// A load started later has already been applied; this result was dropped.
    Stale,
}

pub struct Dashboard {
    wells: Vec<WellRecord>,
    /// Last ticket handed out.
    generation: u64,
    /// Ticket of the load currently on screen.
    applied: u64,
    field_filter: String,
    /// 0-based internally.
    page: usize,
    rows_per_page: usize,
    analytics: AnalyticsConfig,
    sample: SampleConfig,
    forecast_upload: Option<ForecastUploadData>,
    prices: Vec<PriceRecord>,
    well_logs: Vec<WellLogRecord>,
    last_refreshed: Option<DateTime<Local>>,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            wells: Vec::new(),
            generation: 0,
            applied: 0,
            field_filter: ALL_FIELDS.to_string(),
            page: 0,
            rows_per_page: config.table.rows_per_page.max(1),
            analytics: config.analytics.clone(),
            sample: config.sample.clone(),
            forecast_upload: None,
            prices: Vec::new(),
            well_logs: Vec::new(),
            last_refreshed: None,
        }
    }

    pub fn wells(&self) -> &[WellRecord] {
        &self.wells
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn field_filter(&self) -> &str {
        &self.field_filter
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn forecast_upload(&self) -> Option<&ForecastUploadData> {
        self.forecast_upload.as_ref()
    }

    pub fn prices(&self) -> &[PriceRecord] {
        &self.prices
    }

    pub fn well_logs(&self) -> &[WellLogRecord] {
        &self.well_logs
    }

    // ---- loading ----

    /// Start a load. Once it applies, every ticket issued before it is stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Replace the well set unless a newer load already landed, then redraw.
    ///
    /// An empty set is never applied, and a load that is rejected or still
    /// in flight does not invalidate older tickets.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        origin: LoadOrigin,
        wells: Vec<WellRecord>,
        view: &mut dyn DashboardView,
    ) -> LoadOutcome {
        if ticket.generation < self.applied {
            debug!(
                ticket = ticket.generation,
                applied = self.applied,
                ?origin,
                "Discarding stale load"
            );
            return LoadOutcome::Stale;
        }
        if wells.is_empty() {
            warn!(?origin, ticket = ticket.generation, "Load produced no wells");
            return LoadOutcome::Rejected;
        }
        let count = wells.len();
        self.apply(origin, wells, view);
        self.applied = ticket.generation;
        info!(?origin, wells = count, generation = self.applied, "Well data replaced");
        LoadOutcome::Applied {
            origin,
            wells: count,
        }
    }

    fn apply(&mut self, origin: LoadOrigin, wells: Vec<WellRecord>, view: &mut dyn DashboardView) {
        self.wells = wells;
        if origin != LoadOrigin::Refresh {
            self.page = 0;
        }
        self.clamp_page();
        self.last_refreshed = Some(Local::now());
        self.render_all(view);
    }

    /// First load: the bundled CSV if it could be read and has records,
    /// synthetic wells otherwise.
    pub fn load_initial<E, R>(
        &mut self,
        ticket: LoadTicket,
        bundled: Result<String, E>,
        rng: &mut R,
        view: &mut dyn DashboardView,
    ) -> LoadOutcome
    where
        E: std::fmt::Display,
        R: Rng + ?Sized,
    {
        let wells = match bundled {
            Ok(text) => load_wells(&text).0,
            Err(e) => {
                warn!(error = %e, "Bundled well data unavailable");
                Vec::new()
            }
        };
        if !wells.is_empty() {
            return self.finish_load(ticket, LoadOrigin::Bundled, wells, view);
        }
        info!("Falling back to generated sample data");
        let generated = SampleGenerator::new(&self.sample.fields, &self.sample.status_weights)
            .generate(rng);
        self.finish_load(ticket, LoadOrigin::Sample, generated, view)
    }

    /// User-supplied well data. A file with no records is rejected and the
    /// current set kept.
    pub fn upload_wells(
        &mut self,
        ticket: LoadTicket,
        text: &str,
        view: &mut dyn DashboardView,
    ) -> LoadOutcome {
        let (wells, report) = load_wells(text);
        if wells.is_empty() {
            warn!("Well upload contained no records");
            view.notify(NoticeLevel::Error, "Invalid CSV file: no data rows");
            return LoadOutcome::Rejected;
        }
        let outcome = self.finish_load(ticket, LoadOrigin::Upload, wells, view);
        if let LoadOutcome::Applied { wells, .. } = outcome {
            let mut message = format!("Data processed successfully ({} wells).", wells);
            if report.unrecognized_status > 0 {
                message.push_str(&format!(
                    " {} unrecognized status value(s) set to Unknown.",
                    report.unrecognized_status
                ));
            }
            view.notify(NoticeLevel::Info, &message);
        }
        outcome
    }

    /// One refresh tick. Skipped until some load has applied; never
    /// supersedes a load that is still in flight.
    pub fn refresh(
        &mut self,
        source: &mut dyn DataSource,
        view: &mut dyn DashboardView,
    ) -> LoadOutcome {
        if self.wells.is_empty() {
            debug!("Refresh skipped, nothing loaded yet");
            return LoadOutcome::Rejected;
        }
        let next = source.next_snapshot(&self.wells);
        debug!(source = source.source_name(), "Refresh tick");
        if next.is_empty() {
            warn!(source = source.source_name(), "Refresh produced no wells");
            return LoadOutcome::Rejected;
        }
        let count = next.len();
        self.apply(LoadOrigin::Refresh, next, view);
        LoadOutcome::Applied {
            origin: LoadOrigin::Refresh,
            wells: count,
        }
    }

    // ---- derived data ----

    pub fn kpis(&self) -> KpiSummary {
        calc_kpis(&self.wells)
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        detect_anomalies(&self.wells, &self.analytics.thresholds())
    }

    pub fn forecast(&self) -> ForecastSeries {
        forecast_decline(&self.wells, &self.analytics.decline())
    }

    pub fn forecast_labels(&self) -> Vec<String> {
        forecast_month_labels(self.analytics.forecast_months)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            generated_at: Local::now(),
            kpis: self.kpis(),
            status_counts: status_counts(&self.wells),
            anomalies: self.anomalies(),
            forecast: self.forecast(),
        }
    }

    pub fn well_details(&self, id: u32) -> Option<&WellRecord> {
        self.wells.iter().find(|w| w.id == id)
    }

    /// Distinct fields as (filter slug, display name), first-appearance order.
    pub fn field_options(&self) -> Vec<(String, String)> {
        let mut options: Vec<(String, String)> = Vec::new();
        for w in &self.wells {
            let slug = slugify(&w.field);
            if !options.iter().any(|(s, _)| *s == slug) {
                options.push((slug, w.field.clone()));
            }
        }
        options
    }

    /// Every loaded well in the well-data CSV layout, ignoring the filter.
    pub fn export_csv(&self) -> csv::Result<String> {
        wells_to_csv(&self.wells)
    }

    // ---- table ----

    fn filtered(&self) -> Vec<&WellRecord> {
        if self.field_filter == ALL_FIELDS {
            return self.wells.iter().collect();
        }
        self.wells
            .iter()
            .filter(|w| slugify(&w.field) == self.field_filter)
            .collect()
    }

    fn total_pages(&self, rows: usize) -> usize {
        rows.div_ceil(self.rows_per_page).max(1)
    }

    fn clamp_page(&mut self) {
        let last = self.total_pages(self.filtered().len()) - 1;
        self.page = self.page.min(last);
    }

    pub fn table_page(&self) -> TablePage {
        let filtered = self.filtered();
        let total_rows = filtered.len();
        let start = self.page * self.rows_per_page;
        TablePage {
            rows: filtered
                .into_iter()
                .skip(start)
                .take(self.rows_per_page)
                .cloned()
                .collect(),
            page: self.page + 1,
            total_pages: self.total_pages(total_rows),
            total_rows,
        }
    }

    /// `all` or a field slug. Resets to the first page.
    pub fn set_field_filter(&mut self, filter: &str, view: &mut dyn DashboardView) {
        self.field_filter = filter.trim().to_lowercase();
        self.page = 0;
        view.populate_table(&self.table_page());
    }

    pub fn set_rows_per_page(&mut self, rows: usize, view: &mut dyn DashboardView) {
        self.rows_per_page = rows.max(1);
        self.page = 0;
        view.populate_table(&self.table_page());
    }

    /// Returns false (and renders nothing) when already on the last page.
    pub fn next_page(&mut self, view: &mut dyn DashboardView) -> bool {
        if self.page + 1 >= self.total_pages(self.filtered().len()) {
            return false;
        }
        self.page += 1;
        view.populate_table(&self.table_page());
        true
    }

    pub fn prev_page(&mut self, view: &mut dyn DashboardView) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        view.populate_table(&self.table_page());
        true
    }

    // ---- management uploads ----

    /// Interpret a forecast upload and show it on both forecast panels.
    pub fn upload_forecast(
        &mut self,
        text: &str,
        view: &mut dyn DashboardView,
    ) -> Result<(), ForecastError> {
        match interpret_forecast_csv(text) {
            Ok(data) => {
                view.render_forecast_upload(ForecastTarget::Dashboard, &data);
                view.render_forecast_upload(ForecastTarget::Management, &data);
                view.notify(
                    NoticeLevel::Info,
                    &format!("Forecast loaded ({} months).", data.months.len()),
                );
                self.forecast_upload = Some(data);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Forecast upload rejected");
                view.notify(NoticeLevel::Error, &format!("Error processing forecast: {}", e));
                Err(e)
            }
        }
    }

    pub fn upload_prices(
        &mut self,
        text: &str,
        view: &mut dyn DashboardView,
    ) -> Result<(), UploadError> {
        match parse_price_csv(text) {
            Ok(records) => {
                view.notify(
                    NoticeLevel::Info,
                    &format!("Price data loaded ({} rows).", records.len()),
                );
                self.apply_prices(records, view);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Price upload rejected");
                view.notify(NoticeLevel::Error, &format!("Error processing price data: {}", e));
                Err(e)
            }
        }
    }

    /// Price data shipped next to the well data. Optional: a missing or
    /// malformed file is logged and otherwise ignored.
    pub fn load_bundled_prices<E: std::fmt::Display>(
        &mut self,
        bundled: Result<String, E>,
        view: &mut dyn DashboardView,
    ) -> bool {
        let text = match bundled {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "No bundled price data");
                return false;
            }
        };
        match parse_price_csv(&text) {
            Ok(records) => {
                self.apply_prices(records, view);
                true
            }
            Err(e) => {
                warn!(error = %e, "Bundled price data ignored");
                false
            }
        }
    }

    fn apply_prices(&mut self, records: Vec<PriceRecord>, view: &mut dyn DashboardView) {
        let summary = price_summary(&records, PRICE_SUMMARY_TOWNS);
        let chart = price_chart(&records, PRICE_CHART_TOWNS);
        view.render_prices(&summary, &chart);
        self.prices = records;
    }

    pub fn upload_well_logs(
        &mut self,
        text: &str,
        view: &mut dyn DashboardView,
    ) -> Result<(), UploadError> {
        match parse_well_logs_csv(text) {
            Ok(logs) => {
                view.render_well_logs(&well_log_chart(&logs));
                view.notify(
                    NoticeLevel::Info,
                    &format!("Well logs loaded ({} rows).", logs.len()),
                );
                self.well_logs = logs;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Well logs upload rejected");
                view.notify(NoticeLevel::Error, &format!("Error processing well logs: {}", e));
                Err(e)
            }
        }
    }

    /// Redraw every panel that depends on the well set.
    pub fn render_all(&self, view: &mut dyn DashboardView) {
        view.update_kpis(&self.kpis());
        view.update_top_wells(&top_producers(&self.wells, self.analytics.top_wells));
        view.render_status_distribution(&status_counts(&self.wells));
        view.render_field_production(&field_production(&self.wells));
        view.render_water_cut(&field_water_cut(&self.wells));
        view.render_production_mix(self.analytics.production_mix.percentages());
        view.render_forecast(&self.forecast_labels(), &self.forecast());
        view.populate_table(&self.table_page());
        view.show_anomalies(&self.anomalies());
    }
}
