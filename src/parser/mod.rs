pub mod expand;
pub mod nav;
pub mod sections;
pub mod table;
pub mod title;

use scraper::ElementRef;

/// Visible text of an element with all whitespace runs collapsed, the way
/// every heuristic in this module wants to see it.
pub(crate) fn element_text(el: ElementRef) -> String {
    title::collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}
