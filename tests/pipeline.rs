use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::PathBuf;
use welldash::analytics::{calc_kpis, decline_series, forecast_decline, DeclineParams};
use welldash::config::DashboardConfig;
use welldash::dashboard::{
    Dashboard, DashboardView, ForecastTarget, LoadOrigin, LoadOutcome, NoticeLevel,
};
use welldash::loader::load_wells;
use welldash::sample::{default_fields, SampleGenerator, DEFAULT_STATUS_WEIGHTS};
use welldash::source::RandomWalkSource;
use welldash::types::{AnomalyReason, ForecastFormat, ForecastUploadData, WellStatus};

#[derive(Default)]
struct Collector {
    uploads: Vec<(ForecastTarget, ForecastUploadData)>,
    errors: Vec<String>,
}

impl DashboardView for Collector {
    fn render_forecast_upload(&mut self, target: ForecastTarget, data: &ForecastUploadData) {
        self.uploads.push((target, data.clone()));
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        if level == NoticeLevel::Error {
            self.errors.push(message.to_string());
        }
    }
}

fn bundled_csv() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/data/south_sudan_wells.csv");
    std::fs::read_to_string(path).unwrap()
}

fn loaded_dashboard(config: &DashboardConfig) -> Dashboard {
    let mut dashboard = Dashboard::new(config);
    let ticket = dashboard.begin_load();
    let outcome = dashboard.load_initial(
        ticket,
        Ok::<_, std::io::Error>(bundled_csv()),
        &mut StdRng::seed_from_u64(1),
        &mut Collector::default(),
    );
    assert!(matches!(outcome, LoadOutcome::Applied { origin: LoadOrigin::Bundled, .. }));
    dashboard
}

#[test]
fn bundled_data_produces_expected_kpis_and_anomalies() {
    let dashboard = loaded_dashboard(&DashboardConfig::default());
    let kpis = dashboard.kpis();
    assert_eq!(kpis.total_wells, 22);
    assert_eq!(kpis.producing_wells, 15);
    assert_eq!(kpis.total_production, 16_025);

    let anomalies = dashboard.anomalies();
    let names: Vec<&str> = anomalies.iter().map(|a| a.well.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Paloch #125-310", "Paloch #140-275", "Heglig #507-311", "Bentiu #803-516"]
    );
    assert_eq!(
        anomalies[0].flags,
        vec![AnomalyReason::ZeroProductionWhileProducing]
    );
    assert_eq!(anomalies[1].flags.len(), 2);
}

#[test]
fn configured_thresholds_change_what_is_flagged() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[analytics]\nanomaly_change_pct = 50.0\nhigh_water_cut_pct = 90.0").unwrap();
    let config = DashboardConfig::load_from_file(file.path()).unwrap();

    let dashboard = loaded_dashboard(&config);
    let anomalies = dashboard.anomalies();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].well.name, "Paloch #125-310");
}

#[test]
fn exported_wells_upload_back_unchanged() {
    let config = DashboardConfig::default();
    let source = loaded_dashboard(&config);
    let csv = source.export_csv().unwrap();

    let mut target = Dashboard::new(&config);
    let ticket = target.begin_load();
    let outcome = target.upload_wells(ticket, &csv, &mut Collector::default());
    assert_eq!(
        outcome,
        LoadOutcome::Applied {
            origin: LoadOrigin::Upload,
            wells: 22
        }
    );
    assert_eq!(target.wells(), source.wells());
}

#[test]
fn every_forecast_layout_reaches_both_targets() {
    let layouts = [
        (
            "Category,Field,Jan-24,Feb-24\nOil Production,Paloch,100,90\nGas Production,Paloch,5,5\n",
            ForecastFormat::Production,
        ),
        ("Field,Jan-24,Feb-24\nPaloch,100,90\nTotal,100,90\n", ForecastFormat::Regional),
        ("Date,BOE\nJan-24,100\nFeb-24,90\n", ForecastFormat::Simple),
    ];
    for (text, format) in layouts {
        let mut dashboard = Dashboard::new(&DashboardConfig::default());
        let mut view = Collector::default();
        dashboard.upload_forecast(text, &mut view).unwrap();
        assert_eq!(view.uploads.len(), 2);
        assert_eq!(view.uploads[0].1, view.uploads[1].1);
        assert_eq!(view.uploads[0].1.format, format);
        assert_eq!(view.uploads[0].1.total, vec![100.0, 90.0]);
    }
}

#[test]
fn unrecognized_forecast_is_reported_not_fatal() {
    let mut dashboard = Dashboard::new(&DashboardConfig::default());
    let mut view = Collector::default();
    assert!(dashboard.upload_forecast("Well,Rate\nA,1\n", &mut view).is_err());
    assert!(view.uploads.is_empty());
    assert_eq!(view.errors.len(), 1);
    assert!(dashboard.forecast_upload().is_none());
}

#[test]
fn sample_data_kpis_and_forecast_hold_their_properties() {
    let fields = default_fields();
    let generator = SampleGenerator::new(&fields, &DEFAULT_STATUS_WEIGHTS);
    for seed in 0..5 {
        let wells = generator.generate(&mut StdRng::seed_from_u64(seed));
        assert_eq!(wells.len(), 122);

        let kpis = calc_kpis(&wells);
        let producing: Vec<_> = wells.iter().filter(|w| w.status == WellStatus::Producing).collect();
        assert_eq!(kpis.producing_wells, producing.len());
        assert_eq!(
            kpis.total_production,
            producing.iter().map(|w| w.production).sum::<i64>()
        );
        assert!(kpis.avg_water_cut >= 10.0 && kpis.avg_water_cut <= 35.0);

        let params = DeclineParams::default();
        for fc in forecast_decline(&wells, &params).values() {
            assert_eq!(fc.series.len(), 12);
            assert!(fc.series.windows(2).all(|w| w[1] <= w[0]));
            assert!(fc.series.iter().all(|v| *v >= 0));
        }
    }
}

#[test]
fn decline_rounds_each_month() {
    let series = decline_series(1000, &DeclineParams::default());
    assert_eq!(&series[..3], &[930, 865, 804]);
}

#[test]
fn stale_load_never_overwrites_newer_data() {
    let mut dashboard = Dashboard::new(&DashboardConfig::default());
    let mut view = Collector::default();
    let slow = dashboard.begin_load();
    let fast = dashboard.begin_load();

    let (fast_wells, _) = load_wells(&bundled_csv());
    dashboard.finish_load(fast, LoadOrigin::Upload, fast_wells, &mut view);
    let (slow_wells, _) = load_wells("Well Name\nOnly One\n");
    assert_eq!(
        dashboard.finish_load(slow, LoadOrigin::Bundled, slow_wells, &mut view),
        LoadOutcome::Stale
    );
    assert_eq!(dashboard.wells().len(), 22);
}

#[test]
fn refresh_ticks_keep_non_producing_wells_fixed() {
    let mut dashboard = loaded_dashboard(&DashboardConfig::default());
    let before = dashboard.wells().to_vec();
    let mut source = RandomWalkSource::new(StdRng::seed_from_u64(9));
    for _ in 0..10 {
        dashboard.refresh(&mut source, &mut Collector::default());
    }
    for (old, new) in before.iter().zip(dashboard.wells()) {
        assert_eq!(old.id, new.id);
        if old.status != WellStatus::Producing {
            assert_eq!(old, new);
        } else {
            assert!(new.production >= 0);
            assert!(new.change.abs() <= 2.0);
        }
    }
}
