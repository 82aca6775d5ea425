use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{debug, error, info};

use crate::db;
use crate::fetch::{self, Transport};
use crate::model::Film;
use crate::settings::Settings;
use crate::walker;

/// Where finished records go. Each insert stands alone.
pub trait FilmSink {
    fn insert(&mut self, film: &Film) -> Result<()>;
}

impl FilmSink for Connection {
    fn insert(&mut self, film: &Film) -> Result<()> {
        db::insert_film(self, film)?;
        Ok(())
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rows_visited: usize,
    pub rows_skipped: usize,
    pub detail_failures: usize,
}

/// Scrape the listing and every linked article, then store the films.
///
/// Failing to fetch or decode the listing page aborts the run. Anything
/// after that only degrades the result.
pub async fn run<T: Transport, S: FilmSink>(
    transport: &T,
    sink: &mut S,
    settings: &Settings,
) -> Result<RunSummary> {
    info!(url = %settings.listing_url, "Fetching main page");
    let listing = fetch::fetch_document(transport, &settings.listing_url)
        .await
        .context("Failed to fetch main page")?;

    let outcome = walker::walk(
        transport,
        &listing,
        &settings.site_origin,
        settings.request_delay(),
    )
    .await;
    info!(count = outcome.films.len(), "Completed scraping main page");

    let (succeeded, failed) = persist_all(sink, &outcome.films)?;

    let summary = RunSummary {
        attempted: outcome.films.len(),
        succeeded,
        failed,
        rows_visited: outcome.rows_visited,
        rows_skipped: outcome.rows_skipped,
        detail_failures: outcome.detail_failures,
    };
    info!(
        total_processed = summary.attempted,
        successful = summary.succeeded,
        failed = summary.failed,
        "Completed processing all films"
    );
    Ok(summary)
}

/// Open the store at `settings.db_path`, scrape into it and record the run.
///
/// The store is opened before the first request; failing to open it aborts the run.
pub async fn run_into_store<T: Transport>(transport: &T, settings: &Settings) -> Result<RunSummary> {
    info!(db = ?settings.db_path, "Connecting to database");
    let mut conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let started_at = Utc::now();
    let summary = run(transport, &mut conn, settings).await?;
    db::record_run(&conn, started_at, Utc::now(), &summary)?;
    Ok(summary)
}

/// Insert every film, counting (succeeded, failed). Failures are logged and skipped.
fn persist_all<S: FilmSink>(sink: &mut S, films: &[Film]) -> Result<(usize, usize)> {
    let pb = ProgressBar::new(films.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for film in films {
        debug!(title = %film.title, year = film.release_year, "Inserting film into database");
        match sink.insert(film) {
            Ok(()) => {
                debug!(title = %film.title, year = film.release_year, "Successfully inserted film");
                succeeded += 1;
            }
            Err(e) => {
                error!(title = %film.title, year = film.release_year, error = %e, "Failed to insert film");
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok((succeeded, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FixtureTransport;

    /// Rejects films whose title is listed, keeps the rest.
    struct FlakySink {
        reject: Vec<&'static str>,
        stored: Vec<Film>,
    }

    impl FilmSink for FlakySink {
        fn insert(&mut self, film: &Film) -> Result<()> {
            if self.reject.contains(&film.title.as_str()) {
                anyhow::bail!("constraint failed for {}", film.title);
            }
            self.stored.push(film.clone());
            Ok(())
        }
    }

    fn settings() -> Settings {
        Settings {
            request_delay_ms: 0,
            ..Settings::default()
        }
    }

    fn transport(settings: &Settings) -> FixtureTransport {
        FixtureTransport::new()
            .with_fixture(&settings.listing_url, "listing")
            .with_fixture("https://en.wikipedia.org/wiki/Example_Film", "example_film")
            .with_fixture("https://en.wikipedia.org/wiki/Example_Film_II", "sequel_film")
            .with_fixture("https://en.wikipedia.org/wiki/No_Box_Office", "no_box_office")
    }

    #[tokio::test]
    async fn stores_every_scraped_film() {
        let settings = settings();
        let mut conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();

        let summary = run(&transport(&settings), &mut conn, &settings).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                attempted: 3,
                succeeded: 3,
                failed: 0,
                rows_visited: 6,
                rows_skipped: 2,
                detail_failures: 1,
            }
        );

        let first = db::fetch_film(&conn, 1).unwrap().unwrap();
        assert_eq!(first.title, "Example Film");
        assert_eq!(first.directors, vec!["A. Director", "B. Director"]);
        assert_eq!(first.worldwide_gross, 700_000_000);
        assert_eq!(db::get_stats(&conn).unwrap().films, 3);
    }

    #[tokio::test]
    async fn insert_failures_do_not_stop_the_run() {
        let settings = settings();
        let mut sink = FlakySink {
            reject: vec!["Example Film II"],
            stored: Vec::new(),
        };

        let summary = run(&transport(&settings), &mut sink, &settings).await.unwrap();
        assert_eq!((summary.attempted, summary.succeeded, summary.failed), (3, 2, 1));

        let titles: Vec<&str> = sink.stored.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Example Film", "Quiet Picture"]);
    }

    #[tokio::test]
    async fn unreachable_listing_is_fatal() {
        let settings = settings();
        let mut sink = FlakySink {
            reject: Vec::new(),
            stored: Vec::new(),
        };

        let err = run(&FixtureTransport::new(), &mut sink, &settings).await.unwrap_err();
        assert!(err.to_string().contains("Failed to fetch main page"));
        assert!(sink.stored.is_empty());
    }

    #[tokio::test]
    async fn undecodable_listing_is_fatal() {
        let settings = settings();
        let transport = FixtureTransport::new().with_page(&settings.listing_url, vec![0xff, 0xfe]);
        let mut sink = FlakySink {
            reject: Vec::new(),
            stored: Vec::new(),
        };
        assert!(run(&transport, &mut sink, &settings).await.is_err());
    }

    #[tokio::test]
    async fn unusable_store_fails_before_any_request() {
        let blocker = std::env::temp_dir().join(format!("film_scraper_store_{}", std::process::id()));
        std::fs::write(&blocker, b"plain file").unwrap();
        let settings = Settings {
            db_path: blocker.join("films.sqlite"),
            ..settings()
        };
        let transport = transport(&settings);

        let result = run_into_store(&transport, &settings).await;
        std::fs::remove_file(&blocker).unwrap();

        assert!(result.is_err());
        assert!(transport.requested().is_empty());
    }
}
