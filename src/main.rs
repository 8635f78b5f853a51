// Entry point and high-level CLI flow.
//
// With a subcommand the binary runs once and exits. Without one it opens
// the interactive menu, which keeps a single dashboard alive so uploads,
// filters and pages carry over between choices.
use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use welldash::config::DashboardConfig;
use welldash::dashboard::{Dashboard, DashboardView, LoadOutcome, ALL_FIELDS};
use welldash::external::ExternalData;
use welldash::output::{self, ConsoleView};
use welldash::source::RandomWalkSource;
use welldash::util::format_int;

#[derive(Parser)]
#[command(name = "welldash", version, about = "Oil well dashboard data pipeline")]
struct Cli {
    /// Config file; overrides WELLDASH_CONFIG and ./welldash.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Well data CSV loaded at startup.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Seed for generated sample data and refresh ticks.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Render every dashboard panel once.
    Summary,
    /// List flagged wells.
    Anomalies,
    /// Per-field decline forecast.
    Forecast,
    /// Interpret a forecast CSV (production, regional or simple layout).
    UploadForecast { file: PathBuf },
    /// Summarize a regional price data CSV.
    Prices { file: PathBuf },
    /// Summarize a well logs CSV.
    WellLogs { file: PathBuf },
    /// Write the loaded wells as CSV, optionally with a JSON snapshot.
    Export {
        file: PathBuf,
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Write a CSV template.
    Template {
        kind: TemplateKind,
        file: PathBuf,
        /// First forecast month as YYYY-MM; defaults to next month.
        #[arg(long)]
        start: Option<String>,
    },
    /// Crude benchmarks and country facts.
    Benchmarks,
    /// Re-render on every refresh tick.
    Watch {
        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateKind {
    Well,
    Forecast,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::load(),
    };
    if let Some(data) = cli.data {
        config.data.wells_csv = data;
    }
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    runtime.block_on(run(cli.command, config, rng))
}

async fn run(command: Option<Command>, config: DashboardConfig, mut rng: StdRng) -> Result<()> {
    let mut dashboard = Dashboard::new(&config);
    let Some(command) = command else {
        load_bundled(&mut dashboard, &config, &mut rng, &mut ConsoleView::notices_only()).await;
        return menu(&mut dashboard, &mut io::stdin().lock()).await;
    };

    let mut quiet = ConsoleView::notices_only();
    match command {
        Command::Summary => {
            load_bundled(&mut dashboard, &config, &mut rng, &mut ConsoleView::new()).await;
        }
        Command::Anomalies => {
            load_bundled(&mut dashboard, &config, &mut rng, &mut quiet).await;
            output::print_anomalies(&dashboard.anomalies());
        }
        Command::Forecast => {
            load_bundled(&mut dashboard, &config, &mut rng, &mut quiet).await;
            output::print_forecast(&dashboard.forecast_labels(), &dashboard.forecast());
        }
        Command::UploadForecast { file } => {
            let text = read_upload(&file).await?;
            dashboard.upload_forecast(&text, &mut quiet)?;
        }
        Command::Prices { file } => {
            let text = read_upload(&file).await?;
            dashboard.upload_prices(&text, &mut quiet)?;
        }
        Command::WellLogs { file } => {
            let text = read_upload(&file).await?;
            dashboard.upload_well_logs(&text, &mut quiet)?;
        }
        Command::Export { file, json } => {
            load_bundled(&mut dashboard, &config, &mut rng, &mut quiet).await;
            export(&dashboard, &file, json.as_deref())?;
        }
        Command::Template { kind, file, start } => {
            let contents = match kind {
                TemplateKind::Well => output::well_template_csv(),
                TemplateKind::Forecast => {
                    output::forecast_template_csv(template_start(start.as_deref())?)
                }
            };
            output::write_text(&file, &contents)
                .with_context(|| format!("writing {}", file.display()))?;
            println!("Template written to {}", file.display());
        }
        Command::Benchmarks => {
            let external = ExternalData::new(config.external.clone());
            let (benchmarks, facts) = tokio::join!(external.benchmarks(), external.country_facts());
            println!("Crude Benchmarks");
            for (name, quote) in [
                ("Brent", &benchmarks.brent),
                ("WTI", &benchmarks.wti),
                ("Dubai", &benchmarks.dubai),
            ] {
                println!("  {:<6} {:>7.2} {} ({:?})", name, quote.price, quote.unit, quote.source);
            }
            println!("\nSouth Sudan");
            println!("  Capital: {}", facts.capital);
            println!("  Population: {}", format_int(facts.population));
            println!("  Region: {} / {}", facts.region, facts.subregion);
            println!("  Languages: {}", facts.languages);
        }
        Command::Watch { ticks } => {
            let mut view = ConsoleView::new();
            load_bundled(&mut dashboard, &config, &mut rng, &mut view).await;
            let Some(period) = config.refresh.interval() else {
                bail!("refresh is disabled (refresh.interval_ms = 0)");
            };
            let mut source = RandomWalkSource::new(rng);
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            let mut done = 0u64;
            while ticks.map_or(true, |limit| done < limit) {
                interval.tick().await;
                dashboard.refresh(&mut source, &mut view);
                done += 1;
                if let Some(at) = dashboard.last_refreshed() {
                    println!("Last updated: {}\n", at.format("%Y-%m-%d %H:%M:%S"));
                }
            }
        }
    }
    Ok(())
}

/// Startup load. The read is async, so the ticket is taken before it.
async fn load_bundled(
    dashboard: &mut Dashboard,
    config: &DashboardConfig,
    rng: &mut StdRng,
    view: &mut dyn DashboardView,
) -> LoadOutcome {
    let ticket = dashboard.begin_load();
    let bundled = tokio::fs::read_to_string(&config.data.wells_csv).await;
    let outcome = dashboard.load_initial(ticket, bundled, rng, view);
    info!(path = %config.data.wells_csv.display(), ?outcome, "Startup load finished");

    let prices = tokio::fs::read_to_string(&config.data.prices_csv).await;
    if dashboard.load_bundled_prices(prices, view) {
        info!(path = %config.data.prices_csv.display(), "Bundled price data loaded");
    }
    outcome
}

async fn read_upload(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

fn export(dashboard: &Dashboard, file: &Path, json: Option<&Path>) -> Result<()> {
    let csv = dashboard.export_csv().context("rendering well CSV")?;
    output::write_text(file, &csv).with_context(|| format!("writing {}", file.display()))?;
    println!(
        "Exported {} wells to {}",
        format_int(dashboard.wells().len()),
        file.display()
    );
    if let Some(json) = json {
        output::write_json(json, &dashboard.snapshot())
            .with_context(|| format!("writing {}", json.display()))?;
        println!("Snapshot written to {}", json.display());
    }
    Ok(())
}

/// `YYYY-MM` to the first of that month, or the first of next month.
fn template_start(arg: Option<&str>) -> Result<NaiveDate> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .with_context(|| format!("invalid start month {:?}, expected YYYY-MM", s)),
        None => {
            let today = Local::now().date_naive();
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1).context("computing next month")
        }
    }
}

/// Read a single line of input after printing `prompt`. `None` once input
/// is closed or unreadable.
fn read_line(input: &mut dyn BufRead, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf.trim().to_string()),
        Err(e) => {
            warn!(error = %e, "Failed to read input");
            None
        }
    }
}

/// Ask whether to go back to the menu. `true` for Y, `false` for N or
/// closed input.
fn prompt_back_to_menu(input: &mut dyn BufRead) -> bool {
    loop {
        let Some(answer) = read_line(input, "Back to Menu (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

async fn prompt_upload(input: &mut dyn BufRead, prompt: &str) -> Option<String> {
    let path = PathBuf::from(read_line(input, prompt)?);
    match read_upload(&path).await {
        Ok(text) => Some(text),
        Err(e) => {
            eprintln!("Failed to load file: {:#}\n", e);
            None
        }
    }
}

/// Table browser: next/prev page, field filter, rows per page.
fn browse(dashboard: &mut Dashboard, view: &mut ConsoleView, input: &mut dyn BufRead) {
    view.populate_table(&dashboard.table_page());
    let fields: Vec<String> = dashboard.field_options().into_iter().map(|(slug, _)| slug).collect();
    println!("Fields: {}, {}", ALL_FIELDS, fields.join(", "));
    println!(
        "Filter: {}, {} rows per page",
        dashboard.field_filter(),
        dashboard.rows_per_page()
    );
    loop {
        let Some(line) = read_line(
            input,
            "[n]ext, [p]rev, [f] <field>, [r] <rows>, [d] <id>, [b]ack: ",
        ) else {
            break;
        };
        let (cmd, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        match cmd {
            "n" => {
                if !dashboard.next_page(view) {
                    println!("Already on the last page.");
                }
            }
            "p" => {
                if !dashboard.prev_page(view) {
                    println!("Already on the first page.");
                }
            }
            "f" => dashboard.set_field_filter(if arg.is_empty() { ALL_FIELDS } else { arg }, view),
            "r" => match arg.trim().parse::<usize>() {
                Ok(rows) if rows > 0 => dashboard.set_rows_per_page(rows, view),
                _ => println!("Rows per page must be a positive number."),
            },
            "d" => match arg.trim().parse::<u32>().ok().and_then(|id| dashboard.well_details(id)) {
                Some(w) => println!(
                    "{} ({}): {}, {} BOE/d, change {}%, water cut {}%\n",
                    w.name,
                    w.field,
                    w.status,
                    format_int(w.production),
                    w.change,
                    w.water_cut
                ),
                None => println!("No well with that id."),
            },
            "b" => break,
            _ => println!("Unknown command."),
        }
    }
}

async fn menu(dashboard: &mut Dashboard, input: &mut dyn BufRead) -> Result<()> {
    let mut view = ConsoleView::new();
    loop {
        println!("Well Dashboard");
        println!("[1] Summary");
        println!("[2] Anomalies");
        println!("[3] Forecast");
        println!("[4] Browse wells");
        println!("[5] Upload well data");
        println!("[6] Upload forecast");
        println!("[7] Upload price data");
        println!("[8] Upload well logs");
        println!("[9] Export well data");
        println!("[0] Exit\n");
        let Some(choice) = read_line(input, "Enter choice: ") else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => dashboard.render_all(&mut view),
            "2" => output::print_anomalies(&dashboard.anomalies()),
            "3" => output::print_forecast(&dashboard.forecast_labels(), &dashboard.forecast()),
            "4" => browse(dashboard, &mut view, input),
            "5" => {
                if let Some(text) = prompt_upload(input, "Well data CSV path: ").await {
                    let ticket = dashboard.begin_load();
                    dashboard.upload_wells(ticket, &text, &mut view);
                }
            }
            // Upload failures are reported through the view.
            "6" => {
                if let Some(text) = prompt_upload(input, "Forecast CSV path: ").await {
                    let _ = dashboard.upload_forecast(&text, &mut view);
                }
            }
            "7" => {
                if let Some(text) = prompt_upload(input, "Price data CSV path: ").await {
                    let _ = dashboard.upload_prices(&text, &mut view);
                }
            }
            "8" => {
                if let Some(text) = prompt_upload(input, "Well logs CSV path: ").await {
                    let _ = dashboard.upload_well_logs(&text, &mut view);
                }
            }
            "9" => {
                if let Some(path) = read_line(input, "Export path: ") {
                    if let Err(e) = export(dashboard, Path::new(&path), None) {
                        eprintln!("Export failed: {:#}\n", e);
                    }
                }
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 0-9.\n");
                continue;
            }
        }
        if !prompt_back_to_menu(input) {
            println!("Exiting the program.");
            break;
        }
    }
    Ok(())
}
