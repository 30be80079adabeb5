use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use meet_program::batch::{BatchJob, CalendarRow};
use meet_program::catalog::{CatalogTable, City, GazetteerGeocoder, MemoryCatalog};
use meet_program::city::search_composed_name;
use meet_program::classifier::LineClass;
use meet_program::config::PipelineConfig;
use meet_program::fuzzy::FuzzyStringMatcher;
use meet_program::parser::parse_program;
use meet_program::scanner::scan_announcements;
use meet_program::summary::ProgramSummary;

const OUTPUT_DIR: &str = "output";

#[derive(Parser)]
#[command(
    name = "meet-program",
    about = "Swim-meet announcement parser and catalog reconciler"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the lines the parser keeps, with their classification
    Classify {
        file: PathBuf,
    },
    /// Parse an announcement file or a directory of them → output/*.json
    Parse {
        path: PathBuf,
        /// Reference date for year-less dates, e.g. 2022-03-01 (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Print sessions to stdout instead of writing output/
        #[arg(long)]
        stdout: bool,
    },
    /// Reconcile a calendar against a catalog file
    Reconcile {
        /// JSON array of calendar rows
        #[arg(long)]
        calendar: PathBuf,
        /// Catalog JSON (created when missing)
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        skip_geocoding: bool,
        /// Offline geocoder table; enables geocoding unless --skip-geocoding
        #[arg(long)]
        gazetteer: Option<PathBuf>,
    },
    /// Look up a city of the catalog by free text
    Match {
        query: Vec<String>,
        #[arg(long)]
        catalog: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, if cli.verbose { Level::DEBUG } else { Level::INFO });

    match cli.command {
        Command::Classify { file } => run_classify(&file),
        Command::Parse { path, date, stdout } => run_parse(&path, date, stdout),
        Command::Reconcile {
            calendar,
            catalog,
            config,
            dry_run,
            skip_geocoding,
            gazetteer,
        } => run_reconcile(
            &calendar,
            &catalog,
            config.as_deref(),
            dry_run,
            skip_geocoding,
            gazetteer.as_deref(),
        ),
        Command::Match { query, catalog } => run_match(&query.join(" "), &catalog),
    }
}

fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json().with_writer(std::io::stderr))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  OUTPUT FILE HELPERS
// ═══════════════════════════════════════════════════════════════════════

fn output_path(name: &str) -> PathBuf {
    Path::new(OUTPUT_DIR).join(name)
}

fn write_output(name: &str, contents: &str) -> Result<()> {
    std::fs::create_dir_all(OUTPUT_DIR).with_context(|| format!("cannot create {OUTPUT_DIR}/"))?;
    let path = output_path(name);
    std::fs::write(&path, contents).with_context(|| format!("cannot write {}", path.display()))?;
    eprintln!("  {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

fn write_json<T: serde::Serialize>(name: &str, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("JSON serialization failed")?;
    write_output(name, &json)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("cannot parse {}", path.display()))
}

// ═══════════════════════════════════════════════════════════════════════
//  CLASSIFY MODE: filtered lines with their predicate flags
// ═══════════════════════════════════════════════════════════════════════

fn run_classify(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let class = LineClass::of(line);
        let flags: String = [
            (class.date, 'D'),
            (class.time, 'T'),
            (class.style, 'S'),
            (class.relay, 'R'),
            (class.pool, 'P'),
            (class.footnote, 'N'),
            (class.warmup, 'W'),
            (class.skippable, 'X'),
        ]
        .iter()
        .map(|(on, c)| if *on { *c } else { '.' })
        .collect();
        let marker = if class.is_program_line() { '+' } else { ' ' };
        println!("{marker} {flags}  {line}");
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  PARSE MODE: announcements → sessions JSON
// ═══════════════════════════════════════════════════════════════════════

fn run_parse(root: &Path, date: Option<NaiveDate>, stdout: bool) -> Result<()> {
    let reference = date.unwrap_or_else(|| Local::now().date_naive());
    let announcements = scan_announcements(root);
    if announcements.is_empty() {
        bail!("no .txt announcements under {}", root.display());
    }
    eprintln!("Found {} announcements", announcements.len());

    let mut summaries = Vec::new();
    for announcement in &announcements {
        let text = std::fs::read_to_string(&announcement.path)
            .with_context(|| format!("cannot read {}", announcement.path.display()))?;
        let sessions = parse_program(&text, reference);
        let summary = ProgramSummary::from_sessions(&announcement.name, &sessions);
        eprintln!("{}", summary.line());

        if stdout {
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        } else {
            write_json(&format!("{}.json", announcement.name), &sessions)?;
        }
        summaries.push(summary);
    }

    let empty = summaries.iter().filter(|s| s.sessions == 0).count();
    eprintln!(
        "\nParsed {} announcements ({} without sessions)",
        summaries.len(),
        empty
    );
    if !stdout {
        write_json("parse_summary.json", &summaries)?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  RECONCILE MODE: calendar batch against the catalog
// ═══════════════════════════════════════════════════════════════════════

fn run_reconcile(
    calendar: &Path,
    catalog_path: &Path,
    config_path: Option<&Path>,
    dry_run: bool,
    skip_geocoding: bool,
    gazetteer: Option<&Path>,
) -> Result<()> {
    let mut config = PipelineConfig::load(config_path).context("cannot load configuration")?;
    config.dry_run |= dry_run;
    if gazetteer.is_some() {
        config.skip_geocoding = skip_geocoding;
    } else {
        config.skip_geocoding |= skip_geocoding;
    }

    let mut rows: Vec<CalendarRow> = read_json(calendar)?;
    let base = calendar.parent().unwrap_or(Path::new("."));
    for row in &mut rows {
        if let Some(file) = &mut row.program_file
            && file.is_relative()
        {
            *file = base.join(&*file);
        }
    }
    let mut catalog = MemoryCatalog::load(catalog_path)
        .with_context(|| format!("cannot load catalog {}", catalog_path.display()))?;
    let geocoder = gazetteer
        .map(|path| {
            GazetteerGeocoder::load(path)
                .map(|g| g.with_thresholds(config.matching))
                .with_context(|| format!("cannot load gazetteer {}", path.display()))
        })
        .transpose()?;

    info!(rows = rows.len(), dry_run = config.dry_run, "reconciling calendar");
    let mut job = BatchJob::new(config.resolver_options(), config.default_lanes);
    if let Some(geocoder) = &geocoder {
        job = job.with_geocoder(geocoder);
    }
    let summary = job.run(&mut catalog, &rows);

    eprintln!("\n══════════════════════════════════════════");
    eprintln!("  RECONCILIATION SUMMARY{}", if config.dry_run { " (dry run)" } else { "" });
    eprintln!("══════════════════════════════════════════");
    eprintln!("  Rows:      {}", summary.processed);
    eprintln!("  Created:   {}", summary.created);
    eprintln!("  Updated:   {}", summary.updated);
    eprintln!("  Unchanged: {}", summary.unchanged);
    eprintln!("  Errors:    {}", summary.errors);
    for error in &summary.error_rows {
        eprintln!("    {}: {}", error.code, error.detail);
    }
    eprintln!();

    write_output("diff.log", &summary.diff.to_text())?;
    write_json("summary.json", &summary)?;
    if !config.dry_run {
        catalog
            .save(catalog_path)
            .with_context(|| format!("cannot save catalog {}", catalog_path.display()))?;
        eprintln!("  catalog saved to {}", catalog_path.display());
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  MATCH MODE: deep fuzzy lookup over catalog cities
// ═══════════════════════════════════════════════════════════════════════

fn run_match(query: &str, catalog_path: &Path) -> Result<()> {
    if query.trim().is_empty() {
        bail!("empty query");
    }
    let catalog = MemoryCatalog::load(catalog_path)
        .with_context(|| format!("cannot load catalog {}", catalog_path.display()))?;
    let cities: Vec<City> = CatalogTable::<City>::candidates(&catalog, None);
    let matcher = FuzzyStringMatcher::new(&cities, |c| c.name.clone());

    let (best, ranked) = matcher.seek_deep_match(query);
    println!("Query: {query}  (best score {best:.3})");
    for candidate in ranked.iter().take(10) {
        println!(
            "  {:.3}  #{} {} ({})",
            candidate.score, candidate.row.id, candidate.row.name, candidate.row.area_code
        );
    }
    match search_composed_name(query, &cities, |c| c.name.clone(), matcher.thresholds()) {
        Some(city) => println!("Composed-name match: #{} {}", city.id, city.name),
        None => println!("Composed-name match: none"),
    }
    Ok(())
}
