mod db;
mod error;
mod page;
mod parser;
mod profile;
mod resolver;
mod settings;
mod snapshot;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use profile::{LayoutVariant, ProfileRecord};
use resolver::{ConsoleResolver, NonInteractive};
use settings::Settings;
use snapshot::SnapshotPage;

#[derive(Parser)]
#[command(name = "profile_scraper", about = "Structured profile extraction from rendered profile pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one saved profile page and print the record
    Extract {
        /// Rendered HTML snapshot
        path: PathBuf,
        /// URL the record is attributed to (defaults to the snapshot path)
        #[arg(long)]
        url: Option<String>,
        /// Print JSON instead of the text dump
        #[arg(long)]
        json: bool,
        /// Prompt on the terminal when the page is behind a login wall or challenge
        #[arg(short, long)]
        interactive: bool,
        /// Do not release the page when the pass ends
        #[arg(long)]
        keep_open: bool,
    },
    /// Register every *.html snapshot in a directory
    Import {
        dir: PathBuf,
    },
    /// Extract all unprocessed snapshots into the store
    Process {
        /// Max snapshots to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show store statistics
    Stats,
    /// Stored profiles overview table
    Overview {
        /// Filter by layout (authenticated, public)
        #[arg(short, long)]
        layout: Option<LayoutVariant>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Print one stored profile
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Extract {
            path,
            url,
            json,
            interactive,
            keep_open,
        } => {
            if keep_open {
                settings.release_on_complete = false;
            }
            let mut page = SnapshotPage::open(&path)?;
            info!(source = ?page.source(), interactive, "extracting");
            let url = url.unwrap_or_else(|| path.display().to_string());
            let record = if interactive {
                parser::extract_profile(&mut page, &mut ConsoleResolver::stdio(), &settings, Some(&url))?
            } else {
                parser::extract_profile(&mut page, &mut NonInteractive, &settings, Some(&url))?
            };
            print_record(&record, json)
        }
        Commands::Import { dir } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let found = find_snapshots(&dir)?;
            let rows: Vec<(String, Option<String>)> = found
                .iter()
                .map(|p| (p.display().to_string(), None))
                .collect();
            let inserted = db::insert_snapshots(&conn, &rows)?;
            println!("Registered {} new snapshots ({} found)", inserted, found.len());
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let snapshots = db::fetch_unprocessed(&conn, limit)?;
            if snapshots.is_empty() {
                println!("No unprocessed snapshots. Run 'import' first.");
                return Ok(());
            }
            println!("Processing {} snapshots...", snapshots.len());
            let counts = process_snapshots(&conn, &snapshots, &settings)?;
            counts.print();
            Ok(())
        }
        Commands::Overview { layout, limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, layout, limit)?;
            if rows.is_empty() {
                println!("No profiles found.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<24} | {:<13} | {:<28} | {:<20} | {:>3} | {:>3}",
                "ID", "Name", "Layout", "Title", "Location", "Exp", "Edu"
            );
            println!("{}", "-".repeat(112));

            for r in &rows {
                println!(
                    "{:>4} | {:<24} | {:<13} | {:<28} | {:<20} | {:>3} | {:>3}",
                    r.id,
                    truncate(&r.name, 24),
                    r.layout,
                    truncate(&r.title, 28),
                    truncate(&r.location, 20),
                    r.experience_count,
                    r.education_count
                );
            }

            println!("\n{} profiles | details: show <ID>", rows.len());
            Ok(())
        }
        Commands::Show { id, json } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            match db::fetch_profile(&conn, id)? {
                Some(record) => print_record(&record, json),
                None => {
                    println!("No profile with id {}.", id);
                    Ok(())
                }
            }
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Snapshots:     {}", s.snapshots);
            println!("Profiles:      {}", s.profiles);
            println!("  signed-in:   {}", s.authenticated);
            println!("  public:      {}", s.public);
            println!("Failures:      {}", s.failures);
            println!("Pending:       {}", s.pending);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_record(record: &ProfileRecord, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print!("{}", record);
    }
    Ok(())
}

/// `*.html` files directly under `dir`, sorted by path.
fn find_snapshots(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("html")) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

#[derive(Default)]
struct ProcessCounts {
    profiles: usize,
    failures: usize,
    experiences: usize,
    educations: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} profiles ({} experiences, {} educations), {} failures.",
            self.profiles, self.experiences, self.educations, self.failures,
        );
    }
}

fn process_snapshots(
    conn: &rusqlite::Connection,
    snapshots: &[db::SnapshotRow],
    settings: &Settings,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(snapshots.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts::default();

    for chunk in snapshots.chunks(settings.chunk_size.max(1)) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|s| parser::process_snapshot(s, settings))
            .collect();

        let mut profiles = Vec::new();
        let mut failures = Vec::new();

        for processed in results {
            match processed.result {
                Ok(record) => {
                    counts.experiences += record.experiences.len();
                    counts.educations += record.educations.len();
                    profiles.push((processed.snapshot_id, record));
                }
                Err(e) => {
                    warn!(snapshot_id = processed.snapshot_id, "{:#}", e);
                    failures.push(db::FailureRow::new(processed.snapshot_id, &e));
                }
            }
        }

        counts.profiles += db::save_profiles(conn, &profiles)?;
        counts.failures += failures.len();
        db::save_failures(conn, &failures)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!(profiles = counts.profiles, failures = counts.failures, "batch finished");
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
