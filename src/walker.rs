use std::time::Duration;

use scraper::Html;
use tracing::{debug, error, info, warn};

use crate::error::ScrapeError;
use crate::fetch::{self, Transport};
use crate::model::Film;
use crate::parser::infobox::{self, FilmDetails};
use crate::parser::listing::{self, ListingTable};
use crate::parser::text_of;

/// Films found by one pass over the listing, plus row tallies.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub films: Vec<Film>,
    pub rows_visited: usize,
    pub rows_skipped: usize,
    pub detail_failures: usize,
}

/// Visit listing rows in order, scrape each linked article and merge it with
/// its row. Rows without a usable link or whose article cannot be fetched are
/// left out. Sleeps `delay` after every article request.
pub async fn walk<T: Transport>(
    transport: &T,
    listing: &Html,
    site_origin: &str,
    delay: Duration,
) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();
    info!("Starting to parse film entries from main page");

    for (index, row) in ListingTable::locate(listing).data_rows() {
        outcome.rows_visited += 1;
        debug!(row = index, content = %text_of(row).trim(), "Raw row content");

        let listing_row = match listing::parse_row(index, row, site_origin) {
            Ok(r) => r,
            Err(skip) => {
                warn!(row = index, "{}", skip);
                outcome.rows_skipped += 1;
                continue;
            }
        };

        info!(row = index, url = %listing_row.url, "Scraping individual film page");
        match scrape_film_page(transport, &listing_row.url).await {
            Ok(details) => {
                let film = Film::merge(details, &listing_row);
                info!(
                    title = %film.title,
                    count = outcome.films.len() + 1,
                    "Successfully scraped film"
                );
                outcome.films.push(film);
            }
            Err(e) => {
                error!(row = index, url = %listing_row.url, error = %e, "Failed to scrape film page");
                outcome.detail_failures += 1;
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!(total_films = outcome.films.len(), "Completed scraping main page");
    outcome
}

/// Fetch one film article and extract its infobox.
pub async fn scrape_film_page<T: Transport>(transport: &T, url: &str) -> Result<FilmDetails, ScrapeError> {
    let doc = fetch::fetch_document(transport, url).await?;
    Ok(infobox::extract(url, &doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FixtureTransport;

    const ORIGIN: &str = "https://en.wikipedia.org";

    fn listing() -> Html {
        let html = std::fs::read_to_string("tests/fixtures/listing.html").unwrap();
        Html::parse_document(&html)
    }

    fn transport() -> FixtureTransport {
        FixtureTransport::new()
            .with_fixture("https://en.wikipedia.org/wiki/Example_Film", "example_film")
            .with_fixture("https://en.wikipedia.org/wiki/Example_Film_II", "sequel_film")
            .with_fixture("https://en.wikipedia.org/wiki/No_Box_Office", "no_box_office")
    }

    #[tokio::test]
    async fn example_film_end_to_end() {
        let transport = transport();
        let outcome = walk(&transport, &listing(), ORIGIN, Duration::ZERO).await;
        let film = &outcome.films[0];

        assert_eq!(film.title, "Example Film");
        assert_eq!(film.release_year, 2015);
        assert_eq!(film.directors, vec!["A. Director", "B. Director"]);
        assert_eq!(film.box_office, 650_000_000);
        assert_eq!(film.worldwide_gross, 700_000_000);
        assert_eq!(film.country_of_origin, "United States");
        assert_eq!(film.url, "https://en.wikipedia.org/wiki/Example_Film");
    }

    #[tokio::test]
    async fn skips_and_failures_are_tallied() {
        let transport = transport();
        let outcome = walk(&transport, &listing(), ORIGIN, Duration::ZERO).await;

        let titles: Vec<&str> = outcome.films.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Example Film", "Example Film II", "Quiet Picture"]);
        assert_eq!(outcome.rows_visited, 6);
        assert_eq!(outcome.rows_skipped, 2);
        assert_eq!(outcome.detail_failures, 1);
    }

    #[tokio::test]
    async fn articles_are_requested_in_row_order() {
        let transport = transport();
        walk(&transport, &listing(), ORIGIN, Duration::ZERO).await;
        assert_eq!(
            transport.requested(),
            vec![
                "https://en.wikipedia.org/wiki/Example_Film",
                "https://en.wikipedia.org/wiki/Example_Film_II",
                "https://en.wikipedia.org/wiki/Missing_Article",
                "https://en.wikipedia.org/wiki/No_Box_Office",
            ]
        );
    }

    #[tokio::test]
    async fn row_year_overrides_article_year() {
        let transport = transport();
        let outcome = walk(&transport, &listing(), ORIGIN, Duration::ZERO).await;
        let quiet = outcome.films.iter().find(|f| f.title == "Quiet Picture").unwrap();
        // Article says 1997, listing says 1998.
        assert_eq!(quiet.release_year, 1998);
        assert_eq!(quiet.box_office, 0);
        assert_eq!(quiet.worldwide_gross, 300_000_000);
        assert_eq!(quiet.directors, vec!["C. Director"]);
    }

    #[tokio::test]
    async fn fractional_box_office_and_multi_country() {
        let transport = transport();
        let outcome = walk(&transport, &listing(), ORIGIN, Duration::ZERO).await;
        let sequel = &outcome.films[1];
        assert_eq!(sequel.box_office, 2_799_000_000);
        assert_eq!(sequel.worldwide_gross, 2_799_439_100);
        assert_eq!(sequel.country_of_origin, "United States");
        assert_eq!(sequel.running_time, 181);
    }

    #[tokio::test]
    async fn empty_listing_makes_no_requests() {
        let transport = FixtureTransport::new();
        let doc = Html::parse_document("<div id=\"mw-content-text\"><div><p>no table</p></div></div>");
        let outcome = walk(&transport, &doc, ORIGIN, Duration::ZERO).await;
        assert!(outcome.films.is_empty());
        assert_eq!(outcome.rows_visited, 0);
        assert!(transport.requested().is_empty());
    }

    #[tokio::test]
    async fn delay_follows_every_article_request() {
        let transport = transport();
        let start = std::time::Instant::now();
        let outcome = walk(&transport, &listing(), ORIGIN, Duration::from_millis(100)).await;

        // Four article requests, one of which fails; skipped rows add no wait.
        assert_eq!(transport.requested().len(), 4);
        assert_eq!(outcome.detail_failures, 1);
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
