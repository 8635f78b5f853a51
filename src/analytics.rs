use crate::types::{
    Anomaly, AnomalyReason, FieldForecast, FieldProduction, ForecastSeries, KpiSummary,
    StatusCounts, WellRecord, WellStatus,
};
use crate::util::average;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Anomaly rule thresholds, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// Flag when `|change|` reaches this many percent.
    pub change_pct: f64,
    pub water_cut_pct: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            change_pct: 15.0,
            water_cut_pct: 50.0,
        }
    }
}

/// Exponential decline projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeclineParams {
    pub monthly_decline: f64,
    pub months: usize,
}

impl Default for DeclineParams {
    fn default() -> Self {
        Self {
            monthly_decline: 0.07,
            months: 12,
        }
    }
}

pub fn calc_kpis(wells: &[WellRecord]) -> KpiSummary {
    let mut producing = 0usize;
    let mut total_production = 0i64;
    let mut water_cut_sum = 0.0;
    for w in wells.iter().filter(|w| w.is_producing()) {
        producing += 1;
        total_production += w.production;
        water_cut_sum += w.water_cut;
    }
    let (avg_production, avg_water_cut) = if producing == 0 {
        (0.0, 0.0)
    } else {
        (
            total_production as f64 / producing as f64,
            water_cut_sum / producing as f64,
        )
    };
    KpiSummary {
        total_wells: wells.len(),
        producing_wells: producing,
        total_production,
        avg_production,
        avg_water_cut,
    }
}

/// Wells that trip at least one rule, in input order.
pub fn detect_anomalies(wells: &[WellRecord], thresholds: &AnomalyThresholds) -> Vec<Anomaly> {
    wells
        .iter()
        .filter_map(|w| {
            let mut flags = Vec::new();
            if w.change.abs() >= thresholds.change_pct {
                flags.push(AnomalyReason::LargeChange(w.change));
            }
            if w.water_cut >= thresholds.water_cut_pct {
                flags.push(AnomalyReason::HighWaterCut(w.water_cut));
            }
            if w.production == 0 && w.is_producing() {
                flags.push(AnomalyReason::ZeroProductionWhileProducing);
            }
            if flags.is_empty() {
                None
            } else {
                Some(Anomaly {
                    well: w.clone(),
                    flags,
                })
            }
        })
        .collect()
}

/// Geometric decline from `base`, rounding at every step.
///
/// Each month starts from the previous month's rounded value, so rounding
/// error compounds instead of being recomputed from `base`.
pub fn decline_series(base: i64, params: &DeclineParams) -> Vec<i64> {
    let factor = 1.0 - params.monthly_decline;
    let mut q = base as f64;
    (0..params.months)
        .map(|_| {
            q = (q * factor).round().max(0.0);
            q as i64
        })
        .collect()
}

/// Per-field projection from current Producing totals. Fields without a
/// Producing well are absent.
pub fn forecast_decline(wells: &[WellRecord], params: &DeclineParams) -> ForecastSeries {
    let mut bases: HashMap<&str, i64> = HashMap::new();
    for w in wells.iter().filter(|w| w.is_producing()) {
        *bases.entry(w.field.as_str()).or_default() += w.production;
    }
    bases
        .into_iter()
        .map(|(field, base)| {
            (
                field.to_string(),
                FieldForecast {
                    current: base,
                    series: decline_series(base, params),
                },
            )
        })
        .collect()
}

/// `M1..Mn` axis labels for a forecast horizon.
pub fn forecast_month_labels(months: usize) -> Vec<String> {
    (1..=months).map(|m| format!("M{}", m)).collect()
}

pub fn status_counts(wells: &[WellRecord]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for w in wells {
        match w.status {
            WellStatus::Producing => counts.producing += 1,
            WellStatus::ShutIn => counts.shut_in += 1,
            WellStatus::Abandoned => counts.abandoned += 1,
            WellStatus::Drilling => counts.drilling += 1,
            WellStatus::Unknown => counts.unknown += 1,
        }
    }
    counts
}

/// Producing output per field, fields in first-appearance order.
pub fn field_production(wells: &[WellRecord]) -> Vec<FieldProduction> {
    let mut rows: Vec<FieldProduction> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for w in wells {
        let i = *index.entry(w.field.as_str()).or_insert_with(|| {
            rows.push(FieldProduction {
                field: w.field.clone(),
                production: 0,
            });
            rows.len() - 1
        });
        if w.is_producing() {
            rows[i].production += w.production;
        }
    }
    rows
}

/// Highest producing wells, best first.
pub fn top_producers(wells: &[WellRecord], n: usize) -> Vec<WellRecord> {
    let mut producing: Vec<&WellRecord> = wells.iter().filter(|w| w.is_producing()).collect();
    producing.sort_by(|a, b| b.production.cmp(&a.production));
    producing.into_iter().take(n).cloned().collect()
}

/// Mean water cut per field over Producing wells, first-appearance order.
pub fn field_water_cut(wells: &[WellRecord]) -> Vec<(String, f64)> {
    let mut order: Vec<&str> = Vec::new();
    let mut cuts: HashMap<&str, Vec<f64>> = HashMap::new();
    for w in wells.iter().filter(|w| w.is_producing()) {
        cuts.entry(w.field.as_str())
            .or_insert_with(|| {
                order.push(w.field.as_str());
                Vec::new()
            })
            .push(w.water_cut);
    }
    order
        .into_iter()
        .map(|f| (f.to_string(), cuts.get(f).map(|v| average(v)).unwrap_or(0.0)))
        .collect()
}

/// Share of output by product type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionMix {
    pub oil: f64,
    pub gas: f64,
    pub ngl: f64,
}

impl Default for ProductionMix {
    fn default() -> Self {
        Self {
            oil: 0.9,
            gas: 0.08,
            ngl: 0.02,
        }
    }
}

impl ProductionMix {
    /// Whole-number percentages for oil, gas and NGL.
    pub fn percentages(&self) -> [u32; 3] {
        [self.oil, self.gas, self.ngl].map(|s| (s * 100.0).round().max(0.0) as u32)
    }
}
