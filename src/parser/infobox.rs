use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::normalize::{extract_money, extract_running_time, extract_year};
use super::{collapsed_text, next_sibling_named, text_of};

static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1#firstHeading").unwrap());
static LABEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Everything a film article contributes to a record. `None` means the
/// label was missing or its value did not normalize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilmDetails {
    pub title: String,
    pub release_year: Option<i32>,
    pub directors: Vec<String>,
    pub box_office: Option<u64>,
    pub country: Option<String>,
    pub running_time: Option<u32>,
}

enum LabelMatch {
    Contains,
    Exact,
}

/// One infobox row: which header labels anchor it and how its value cell is read.
struct InfoboxField {
    name: &'static str,
    labels: &'static [&'static str],
    matching: LabelMatch,
    read: fn(ElementRef<'_>, &mut FilmDetails),
}

impl InfoboxField {
    fn matches(&self, label: &str) -> bool {
        self.labels.iter().any(|l| match self.matching {
            LabelMatch::Contains => label.contains(l),
            LabelMatch::Exact => label == *l,
        })
    }
}

const INFOBOX_FIELDS: &[InfoboxField] = &[
    InfoboxField {
        name: "release_year",
        labels: &["Release date"],
        matching: LabelMatch::Contains,
        read: read_release_year,
    },
    InfoboxField {
        name: "directors",
        labels: &["Directed by"],
        matching: LabelMatch::Contains,
        read: read_directors,
    },
    InfoboxField {
        name: "box_office",
        labels: &["Box office"],
        matching: LabelMatch::Contains,
        read: read_box_office,
    },
    InfoboxField {
        name: "country",
        labels: &["Country", "Countries"],
        matching: LabelMatch::Exact,
        read: read_country,
    },
    InfoboxField {
        name: "running_time",
        labels: &["Running time"],
        matching: LabelMatch::Contains,
        read: read_running_time,
    },
];

/// Pull every known field out of a film article.
pub fn extract(url: &str, doc: &Html) -> FilmDetails {
    let mut details = FilmDetails {
        title: doc
            .select(&HEADING)
            .next()
            .map(|h| text_of(h).trim().to_string())
            .unwrap_or_default(),
        ..Default::default()
    };
    debug!(url, title = %details.title, "Extracted film title");

    for field in INFOBOX_FIELDS {
        match value_cell(doc, field) {
            Some(cell) => (field.read)(cell, &mut details),
            None => debug!(url, field = field.name, "Infobox label not found"),
        }
    }

    debug!(
        url,
        year = ?details.release_year,
        directors = ?details.directors,
        box_office = ?details.box_office,
        country = ?details.country,
        running_time = ?details.running_time,
        "Extracted infobox fields"
    );
    info!(url, title = %details.title, "Successfully scraped film details");
    details
}

/// The first `td` that follows a matching header cell, in document order.
/// Matching header cells without a sibling `td` are passed over.
fn value_cell<'a>(doc: &'a Html, field: &InfoboxField) -> Option<ElementRef<'a>> {
    doc.select(&LABEL)
        .filter(|th| field.matches(&collapsed_text(*th)))
        .find_map(|th| next_sibling_named(th, "td"))
}

fn read_release_year(cell: ElementRef<'_>, details: &mut FilmDetails) {
    let text = cell
        .select(&LIST_ITEM)
        .next()
        .map(text_of)
        .unwrap_or_else(|| text_of(cell));
    details.release_year = extract_year(&text);
}

fn read_directors(cell: ElementRef<'_>, details: &mut FilmDetails) {
    details.directors = cell
        .select(&LINK)
        .map(|a| text_of(a).trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
}

fn read_box_office(cell: ElementRef<'_>, details: &mut FilmDetails) {
    details.box_office = extract_money(&text_of(cell));
}

// Multi-country cells keep only the first line.
fn read_country(cell: ElementRef<'_>, details: &mut FilmDetails) {
    details.country = text_of(cell)
        .trim()
        .split('\n')
        .next()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
}

fn read_running_time(cell: ElementRef<'_>, details: &mut FilmDetails) {
    details.running_time = extract_running_time(&text_of(cell));
}
