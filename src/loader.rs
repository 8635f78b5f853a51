use crate::parser::{parse_csv, RowPolicy};
use crate::types::{RawWellRow, WellRecord, WellStatus};
use crate::util::{parse_float_prefix, parse_int_prefix};
use tracing::{debug, info};

/// What happened while normalizing one well data upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub defaulted_names: usize,
    pub unrecognized_status: usize,
    pub numeric_fallbacks: usize,
}

/// Parse well data CSV text into canonical records.
///
/// Never fails: missing columns take defaults and unparsable numbers
/// become 0. Ids are 1-based row positions within this call.
pub fn load_wells(text: &str) -> (Vec<WellRecord>, LoadReport) {
    let parsed = parse_csv(text, RowPolicy::PadMissing);
    let mut report = LoadReport::default();
    let mut wells = Vec::with_capacity(parsed.len());

    for (index, result) in parsed.deserialize::<RawWellRow>().enumerate() {
        report.total_rows += 1;
        let row = result.unwrap_or_else(|e| {
            // All columns are optional strings, so this only trips on
            // malformed headers; treat it as a row of defaults.
            debug!(row = index + 1, error = %e, "Well row did not deserialize");
            RawWellRow::default()
        });
        wells.push(normalize_row(index + 1, row, &mut report));
    }

    info!(
        rows = report.total_rows,
        defaulted_names = report.defaulted_names,
        unrecognized_status = report.unrecognized_status,
        numeric_fallbacks = report.numeric_fallbacks,
        "Loaded well data"
    );
    (wells, report)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse a present cell, counting the ones that fall back to zero.
fn coerce<T: Default>(raw: Option<&str>, parse: fn(&str) -> Option<T>, report: &mut LoadReport) -> T {
    match raw {
        Some(s) => parse(s).unwrap_or_else(|| {
            report.numeric_fallbacks += 1;
            T::default()
        }),
        None => T::default(),
    }
}

fn normalize_row(position: usize, row: RawWellRow, report: &mut LoadReport) -> WellRecord {
    let id = position as u32;

    let name = non_empty(row.name).unwrap_or_else(|| {
        report.defaulted_names += 1;
        format!("Well #{}", id)
    });
    let field = non_empty(row.field).unwrap_or_else(|| "Unknown".to_string());

    let status = match non_empty(row.status) {
        Some(label) => WellStatus::from_label(&label).unwrap_or_else(|| {
            debug!(row = id, status = %label, "Unrecognized well status");
            report.unrecognized_status += 1;
            WellStatus::Unknown
        }),
        None => WellStatus::Unknown,
    };

    let production = coerce(row.production.as_deref(), parse_int_prefix, report);
    let change = coerce(row.change.as_deref(), parse_float_prefix, report);
    let water_cut = coerce(row.water_cut.as_deref(), parse_float_prefix, report);

    WellRecord {
        id,
        name,
        field,
        status,
        production,
        change,
        water_cut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Well Name,Field,Status,Production (BOE/d),% Change,Water Cut (%)";

    #[test]
    fn maps_all_columns() {
        let csv = format!("{HEADER}\nPaloch #101-202,Paloch,Producing,1250,1.5,22.1\n");
        let (wells, report) = load_wells(&csv);
        assert_eq!(wells.len(), 1);
        let w = &wells[0];
        assert_eq!(w.id, 1);
        assert_eq!(w.name, "Paloch #101-202");
        assert_eq!(w.field, "Paloch");
        assert_eq!(w.status, WellStatus::Producing);
        assert_eq!(w.production, 1250);
        assert_eq!(w.change, 1.5);
        assert_eq!(w.water_cut, 22.1);
        assert_eq!(report, LoadReport { total_rows: 1, ..Default::default() });
    }

    #[test]
    fn missing_columns_take_defaults() {
        let (wells, report) = load_wells("Status\nProducing\nShut-in\n");
        assert_eq!(wells[0].name, "Well #1");
        assert_eq!(wells[1].name, "Well #2");
        assert_eq!(wells[1].field, "Unknown");
        assert_eq!(wells[1].status, WellStatus::ShutIn);
        assert_eq!(wells[1].production, 0);
        assert_eq!(report.defaulted_names, 2);
        assert_eq!(report.numeric_fallbacks, 0);
    }

    #[test]
    fn unparsable_numbers_become_zero() {
        let csv = format!("{HEADER}\nA,F,Producing,lots,n/a,??\nB,F,Producing,980.6,-2.5%,41.0\n");
        let (wells, report) = load_wells(&csv);
        assert_eq!(wells[0].production, 0);
        assert_eq!(wells[0].change, 0.0);
        assert_eq!(wells[0].water_cut, 0.0);
        assert_eq!(wells[1].production, 980);
        assert_eq!(wells[1].change, -2.5);
        assert_eq!(report.numeric_fallbacks, 3);
    }

    #[test]
    fn short_rows_are_padded() {
        let csv = format!("{HEADER}\nA,Heglig,Producing\n");
        let (wells, _) = load_wells(&csv);
        assert_eq!(wells.len(), 1);
        assert_eq!(wells[0].field, "Heglig");
        assert_eq!(wells[0].production, 0);
    }

    #[test]
    fn status_is_normalized() {
        let csv = format!("{HEADER}\nA,F,producing,1,0,0\nB,F,Workover,1,0,0\nC,F,,1,0,0\n");
        let (wells, report) = load_wells(&csv);
        assert_eq!(wells[0].status, WellStatus::Producing);
        assert_eq!(wells[1].status, WellStatus::Unknown);
        assert_eq!(wells[2].status, WellStatus::Unknown);
        assert_eq!(report.unrecognized_status, 1);
    }

    #[test]
    fn ids_restart_per_call() {
        let csv = format!("{HEADER}\nA,F,Producing,1,0,0\nB,F,Producing,2,0,0\n");
        let (first, _) = load_wells(&csv);
        let (second, _) = load_wells(&csv);
        assert_eq!(first.iter().map(|w| w.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(second.iter().map(|w| w.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn header_only_yields_nothing() {
        let (wells, report) = load_wells(HEADER);
        assert!(wells.is_empty());
        assert_eq!(report.total_rows, 0);
    }
}
