use serde::Serialize;

use crate::parser::infobox::FilmDetails;
use crate::parser::listing::ListingRow;
use crate::parser::normalize::extract_money;

/// A stored film. Unknown numbers are `0` and unknown text is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub title: String,
    pub release_year: i32,
    pub directors: Vec<String>,
    pub box_office: u64,
    pub worldwide_gross: u64,
    pub country_of_origin: String,
    pub running_time: u32,
    pub url: String,
}

impl Film {
    /// Record built from the article alone.
    pub fn from_details(details: FilmDetails, url: &str) -> Self {
        Film {
            title: details.title,
            release_year: details.release_year.unwrap_or(0),
            directors: details.directors,
            box_office: details.box_office.unwrap_or(0),
            worldwide_gross: 0,
            country_of_origin: details.country.unwrap_or_default(),
            running_time: details.running_time.unwrap_or(0),
            url: url.to_string(),
        }
    }

    /// Article fields overlaid with the listing row. The row's year (when it
    /// is a bare integer) and its worldwide gross always win.
    pub fn merge(details: FilmDetails, row: &ListingRow) -> Self {
        let mut film = Film::from_details(details, &row.url);
        if film.title.is_empty() {
            film.title = row.title.clone();
        }
        if let Ok(year) = row.year.parse::<i32>() {
            film.release_year = year;
        }
        film.worldwide_gross = extract_money(&row.worldwide_gross).unwrap_or(0);
        film
    }
}
