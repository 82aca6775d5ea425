use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use super::{nth_child, text_of};

static CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#mw-content-text").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Row 1 is the column header.
pub const FIRST_DATA_ROW: usize = 2;

/// Summary fields read from one listing row.
///
/// `rank` and `peak_rank` are kept verbatim for diagnostics; they are not
/// part of the stored film record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub index: usize,
    pub title: String,
    pub url: String,
    pub rank: String,
    pub peak_rank: String,
    pub worldwide_gross: String,
    pub year: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowSkip {
    #[error("no film link found in row")]
    MissingLink,
    #[error("empty link found in row")]
    EmptyLink,
}

/// The films table of the listing page: `#mw-content-text > div[1] > table[1] > tbody`.
#[derive(Debug, Clone, Copy)]
pub struct ListingTable<'a> {
    body: Option<ElementRef<'a>>,
}

impl<'a> ListingTable<'a> {
    pub fn locate(doc: &'a Html) -> Self {
        let body = doc
            .select(&CONTENT)
            .next()
            .and_then(|content| nth_child(content, "div", 1))
            .and_then(|div| nth_child(div, "table", 1))
            .and_then(|table| nth_child(table, "tbody", 1));
        Self { body }
    }

    /// Probe for `tr[index]` (1-based). A miss means the table is exhausted.
    pub fn row(&self, index: usize) -> Option<ElementRef<'a>> {
        self.body.and_then(|body| nth_child(body, "tr", index))
    }

    /// Data rows from [`FIRST_DATA_ROW`] until the first probe miss.
    pub fn data_rows(&self) -> RowCursor<'a> {
        RowCursor {
            table: *self,
            next_index: FIRST_DATA_ROW,
            exhausted: false,
        }
    }
}

/// Lazily walks a [`ListingTable`] by increasing row index. The row count is
/// never read up front; iteration stops on the first index with no row.
pub struct RowCursor<'a> {
    table: ListingTable<'a>,
    next_index: usize,
    exhausted: bool,
}

impl<'a> Iterator for RowCursor<'a> {
    type Item = (usize, ElementRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let index = self.next_index;
        match self.table.row(index) {
            Some(row) => {
                self.next_index += 1;
                Some((index, row))
            }
            None => {
                debug!(row = index, "No more rows found");
                self.exhausted = true;
                None
            }
        }
    }
}

impl std::iter::FusedIterator for RowCursor<'_> {}

/// Read the title link and summary cells of one row.
pub fn parse_row(index: usize, row: ElementRef<'_>, site_origin: &str) -> Result<ListingRow, RowSkip> {
    let link = nth_child(row, "th", 1)
        .and_then(|th| th.select(&LINK).next())
        .ok_or(RowSkip::MissingLink)?;

    let href = link.value().attr("href").unwrap_or_default().trim();
    if href.is_empty() {
        return Err(RowSkip::EmptyLink);
    }

    let parsed = ListingRow {
        index,
        title: text_of(link).trim().to_string(),
        url: absolute_url(site_origin, href),
        rank: cell_text(row, 1),
        peak_rank: cell_text(row, 2),
        worldwide_gross: cell_text(row, 3),
        year: cell_text(row, 4),
    };

    debug!(
        row = index,
        rank = %parsed.rank,
        peak_rank = %parsed.peak_rank,
        title = %parsed.title,
        worldwide_gross = %parsed.worldwide_gross,
        year = %parsed.year,
        "Extracted row data"
    );
    Ok(parsed)
}

fn cell_text(row: ElementRef<'_>, column: usize) -> String {
    nth_child(row, "td", column)
        .map(|td| text_of(td).trim().to_string())
        .unwrap_or_default()
}

fn absolute_url(site_origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", site_origin.trim_end_matches('/'), href)
    }
}
