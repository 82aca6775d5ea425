mod db;
mod error;
mod fetch;
mod model;
mod parser;
mod pipeline;
mod settings;
mod walker;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use fetch::HttpTransport;
use model::Film;
use settings::Settings;

#[derive(Parser)]
#[command(name = "film_scraper", about = "Highest-grossing films scraper")]
struct Cli {
    /// SQLite database path (overrides FILMS_DB_PATH / films.toml)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the listing and every linked film page, then store the films
    Run,
    /// Extract a single film page and print it as JSON (nothing is stored)
    Film {
        /// Absolute URL of the film article
        url: String,
    },
    /// Show store statistics and per-year / top-N aggregates
    Stats,
    /// Stored films ordered by worldwide gross
    Overview {
        /// Only films released in this year
        #[arg(short, long)]
        year: Option<i32>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Run => {
            let transport = HttpTransport::new(&settings.user_agent)?;
            let summary = pipeline::run_into_store(&transport, &settings).await?;

            println!(
                "Rows: {} visited, {} skipped, {} film pages failed.",
                summary.rows_visited, summary.rows_skipped, summary.detail_failures
            );
            println!(
                "Films: {} attempted ({} stored, {} failed).",
                summary.attempted, summary.succeeded, summary.failed
            );
            Ok(())
        }
        Commands::Film { url } => {
            let transport = HttpTransport::new(&settings.user_agent)?;
            let details = walker::scrape_film_page(&transport, &url).await?;
            let film = Film::from_details(details, &url);
            println!("{}", serde_json::to_string_pretty(&film)?);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            print_stats(&conn)
        }
        Commands::Overview { year, limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, year, limit)?;
            if rows.is_empty() {
                println!("No films found. Run 'run' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<32} | {:>4} | {:>14} | {:>14} | {:<16} | {:<24}",
                "#", "Title", "Year", "Worldwide", "Box office", "Country", "Directors"
            );
            println!("{}", "-".repeat(124));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<32} | {:>4} | {:>14} | {:>14} | {:<16} | {:<24}",
                    i + 1,
                    truncate(&r.title, 32),
                    year_label(r.release_year),
                    format_dollars(r.worldwide_gross),
                    format_dollars(r.box_office),
                    truncate(&r.country, 16),
                    truncate(&r.directors, 24),
                );
            }

            println!("\n{} films", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_stats(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    let s = db::get_stats(conn)?;
    println!("Films:              {}", s.films);
    println!("Directors:          {}", s.directors);
    println!("Countries:          {}", s.countries);
    println!("No box office:      {}", s.missing_box_office);
    println!("No country:         {}", s.missing_country);
    println!("Runs:               {}", s.runs);
    if let Some(run) = db::last_run(conn)? {
        println!(
            "Last run:           {} → {} ({} attempted, {} ok, {} failed)",
            run.started_at, run.finished_at, run.attempted, run.succeeded, run.failed
        );
    }
    if s.films == 0 {
        return Ok(());
    }

    let films = db::per_year(conn, db::YearMetric::Films)?;
    let box_office = db::per_year(conn, db::YearMetric::BoxOffice)?;
    let gross = db::per_year(conn, db::YearMetric::WorldwideGross)?;

    println!("\n--- Per year ---");
    println!("{:>7} | {:>5} | {:>16} | {:>16}", "Year", "Films", "Box office", "Worldwide");
    for ((year, count), ((_, bo), (_, ww))) in films.iter().zip(box_office.iter().zip(gross.iter())) {
        println!(
            "{:>7} | {:>5} | {:>16} | {:>16}",
            year_label(*year),
            count,
            format_dollars(*bo),
            format_dollars(*ww)
        );
    }

    println!("\n--- Top directors ---");
    for (name, n) in db::top_directors(conn, 3)? {
        println!("  {:<32} {}", truncate(&name, 32), n);
    }

    println!("\n--- Top countries ---");
    for (country, n) in db::top_countries(conn, 5)? {
        println!("  {:<32} {}", truncate(&country, 32), n);
    }
    Ok(())
}

fn year_label(year: i32) -> String {
    if year == 0 {
        "?".to_string()
    } else {
        year.to_string()
    }
}

/// `$1,234,567` style amount; `-` for the unknown sentinel.
fn format_dollars(amount: i64) -> String {
    if amount == 0 {
        return "-".to_string();
    }
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${}", out)
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
