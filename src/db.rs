use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::model::Film;
use crate::pipeline::RunSummary;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS films (
            id                INTEGER PRIMARY KEY,
            title             TEXT NOT NULL,
            release_year      INTEGER NOT NULL DEFAULT 0,
            box_office        INTEGER NOT NULL DEFAULT 0,
            worldwide_gross   INTEGER NOT NULL DEFAULT 0,
            country_of_origin TEXT NOT NULL DEFAULT '',
            running_time      INTEGER NOT NULL DEFAULT 0,
            url               TEXT NOT NULL,
            scraped_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_films_year ON films(release_year);

        CREATE TABLE IF NOT EXISTS film_directors (
            film_id   INTEGER NOT NULL REFERENCES films(id),
            position  INTEGER NOT NULL,
            name      TEXT NOT NULL,
            PRIMARY KEY (film_id, position)
        );
        CREATE INDEX IF NOT EXISTS idx_directors_name ON film_directors(name);

        CREATE TABLE IF NOT EXISTS runs (
            id              INTEGER PRIMARY KEY,
            started_at      TEXT NOT NULL,
            finished_at     TEXT NOT NULL,
            attempted       INTEGER NOT NULL,
            succeeded       INTEGER NOT NULL,
            failed          INTEGER NOT NULL,
            rows_visited    INTEGER NOT NULL,
            rows_skipped    INTEGER NOT NULL,
            detail_failures INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}

// ── Films ──

/// Store one film with its directors in order. Returns the new film id.
pub fn insert_film(conn: &Connection, film: &Film) -> Result<i64> {
    let box_office = i64::try_from(film.box_office)
        .with_context(|| format!("Box office of {:?} out of range", film.title))?;
    let worldwide_gross = i64::try_from(film.worldwide_gross)
        .with_context(|| format!("Worldwide gross of {:?} out of range", film.title))?;

    let tx = conn.unchecked_transaction()?;
    let film_id = {
        tx.execute(
            "INSERT INTO films
             (title, release_year, box_office, worldwide_gross, country_of_origin, running_time, url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                film.title,
                film.release_year,
                box_office,
                worldwide_gross,
                film.country_of_origin,
                film.running_time,
                film.url,
            ],
        )?;
        let film_id = tx.last_insert_rowid();

        let mut stmt =
            tx.prepare("INSERT INTO film_directors (film_id, position, name) VALUES (?1, ?2, ?3)")?;
        for (position, name) in film.directors.iter().enumerate() {
            stmt.execute(rusqlite::params![film_id, position as i64, name])?;
        }
        film_id
    };
    tx.commit()?;
    Ok(film_id)
}

#[cfg(test)]
pub fn fetch_film(conn: &Connection, id: i64) -> Result<Option<Film>> {
    let mut stmt = conn.prepare(
        "SELECT title, release_year, box_office, worldwide_gross, country_of_origin, running_time, url
         FROM films WHERE id = ?1",
    )?;
    let film = stmt
        .query_map([id], |row| {
            Ok(Film {
                title: row.get(0)?,
                release_year: row.get(1)?,
                directors: Vec::new(),
                box_office: row.get::<_, i64>(2)? as u64,
                worldwide_gross: row.get::<_, i64>(3)? as u64,
                country_of_origin: row.get(4)?,
                running_time: row.get(5)?,
                url: row.get(6)?,
            })
        })?
        .next()
        .transpose()?;

    let Some(mut film) = film else {
        return Ok(None);
    };
    film.directors = fetch_directors(conn, id)?;
    Ok(Some(film))
}

fn fetch_directors(conn: &Connection, film_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM film_directors WHERE film_id = ?1 ORDER BY position")?;
    let names = stmt
        .query_map([film_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

// ── Runs ──

pub fn record_run(
    conn: &Connection,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    summary: &RunSummary,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO runs
         (started_at, finished_at, attempted, succeeded, failed, rows_visited, rows_skipped, detail_failures)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            started_at.to_rfc3339(),
            finished_at.to_rfc3339(),
            summary.attempted as i64,
            summary.succeeded as i64,
            summary.failed as i64,
            summary.rows_visited as i64,
            summary.rows_skipped as i64,
            summary.detail_failures as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub struct RunRow {
    pub started_at: String,
    pub finished_at: String,
    pub attempted: i64,
    pub succeeded: i64,
    pub failed: i64,
}

pub fn last_run(conn: &Connection) -> Result<Option<RunRow>> {
    let mut stmt = conn.prepare(
        "SELECT started_at, finished_at, attempted, succeeded, failed
         FROM runs ORDER BY id DESC LIMIT 1",
    )?;
    let run = stmt
        .query_map([], |row| {
            Ok(RunRow {
                started_at: row.get(0)?,
                finished_at: row.get(1)?,
                attempted: row.get(2)?,
                succeeded: row.get(3)?,
                failed: row.get(4)?,
            })
        })?
        .next()
        .transpose()?;
    Ok(run)
}

// ── Aggregates ──

/// Per-year series shown by `stats`.
#[derive(Debug, Clone, Copy)]
pub enum YearMetric {
    Films,
    BoxOffice,
    WorldwideGross,
}

impl YearMetric {
    fn sql_expr(self) -> &'static str {
        match self {
            YearMetric::Films => "COUNT(*)",
            YearMetric::BoxOffice => "SUM(box_office)",
            YearMetric::WorldwideGross => "SUM(worldwide_gross)",
        }
    }
}

pub fn per_year(conn: &Connection, metric: YearMetric) -> Result<Vec<(i32, i64)>> {
    let sql = format!(
        "SELECT release_year, {} FROM films GROUP BY release_year ORDER BY release_year",
        metric.sql_expr()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn top_directors(conn: &Connection, limit: usize) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT name, COUNT(*) AS n FROM film_directors
         GROUP BY name ORDER BY n DESC, name LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn top_countries(conn: &Connection, limit: usize) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT country_of_origin, COUNT(*) AS n FROM films
         WHERE country_of_origin != ''
         GROUP BY country_of_origin ORDER BY n DESC, country_of_origin LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Overview ──

pub struct OverviewRow {
    pub title: String,
    pub release_year: i32,
    pub worldwide_gross: i64,
    pub box_office: i64,
    pub country: String,
    pub directors: String,
}

pub fn fetch_overview(conn: &Connection, year: Option<i32>, limit: usize) -> Result<Vec<OverviewRow>> {
    let sql = format!(
        "SELECT id, title, release_year, worldwide_gross, box_office, country_of_origin
         FROM films{}
         ORDER BY worldwide_gross DESC, id
         LIMIT ?1",
        if year.is_some() { " WHERE release_year = ?2" } else { "" }
    );

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(i64, OverviewRow)> {
        Ok((
            row.get(0)?,
            OverviewRow {
                title: row.get(1)?,
                release_year: row.get(2)?,
                worldwide_gross: row.get(3)?,
                box_office: row.get(4)?,
                country: row.get(5)?,
                directors: String::new(),
            },
        ))
    };
    let rows = match year {
        Some(y) => stmt.query_map(rusqlite::params![limit as i64, y], map_row)?,
        None => stmt.query_map(rusqlite::params![limit as i64], map_row)?,
    }
    .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, mut row)| -> Result<OverviewRow> {
            row.directors = fetch_directors(conn, id)?.join(", ");
            Ok(row)
        })
        .collect()
}

// ── Stats ──

pub struct Stats {
    pub films: usize,
    pub directors: usize,
    pub countries: usize,
    pub runs: usize,
    pub missing_box_office: usize,
    pub missing_country: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let films: usize = conn.query_row("SELECT COUNT(*) FROM films", [], |r| r.get(0))?;
    let directors: usize =
        conn.query_row("SELECT COUNT(DISTINCT name) FROM film_directors", [], |r| r.get(0))?;
    let countries: usize = conn.query_row(
        "SELECT COUNT(DISTINCT country_of_origin) FROM films WHERE country_of_origin != ''",
        [],
        |r| r.get(0),
    )?;
    let runs: usize = conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0))?;
    let missing_box_office: usize =
        conn.query_row("SELECT COUNT(*) FROM films WHERE box_office = 0", [], |r| r.get(0))?;
    let missing_country: usize = conn.query_row(
        "SELECT COUNT(*) FROM films WHERE country_of_origin = ''",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        films,
        directors,
        countries,
        runs,
        missing_box_office,
        missing_country,
    })
}
