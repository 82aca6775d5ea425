pub mod infobox;
pub mod listing;
pub mod normalize;

use scraper::{ElementRef, Html};

use crate::error::ScrapeError;

/// Decode a fetched body and build its DOM. html5ever itself never rejects
/// markup, so decoding is the only way parsing can fail.
pub fn parse_document(url: &str, body: &[u8]) -> Result<Html, ScrapeError> {
    let html = std::str::from_utf8(body).map_err(|source| ScrapeError::Decode {
        url: url.to_string(),
        source,
    })?;
    Ok(Html::parse_document(html))
}

/// Concatenated text of every descendant text node.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text with runs of whitespace (including non-breaking spaces) collapsed.
pub fn collapsed_text(element: ElementRef<'_>) -> String {
    text_of(element).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 1-based positional child lookup, the `./name[nth]` of an XPath step.
pub fn nth_child<'a>(element: ElementRef<'a>, name: &str, nth: usize) -> Option<ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == name)
        .nth(nth.checked_sub(1)?)
}

/// First following sibling element named `name`.
pub fn next_sibling_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == name)
}
