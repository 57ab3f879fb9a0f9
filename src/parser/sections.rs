use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{element_text, nav, table, title};
use crate::config::ScrapeConfig;
use crate::dataset::NormalizedTable;

static CONTENT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class*="content"]"#).unwrap());
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").unwrap());
static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// One heading-delimited slice of the document. Lives only for the
/// duration of a single extraction pass.
#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub local_table: Option<NormalizedTable>,
    pub navigation_target: Option<String>,
}

/// Split a document into heading-delimited sections, recording per section
/// the first table and (when `follow_nav` is set) the first qualifying
/// navigation control found between the heading and the next one.
///
/// Headings with empty titles are skipped, as are blocklisted ones — the
/// latter before any table work happens. Nested subsections are not
/// consumed here; each heading owns its own span and is scanned on its own
/// turn.
pub fn scan_sections(
    doc: &Html,
    base_url: &str,
    cfg: &ScrapeConfig,
    follow_nav: bool,
) -> Vec<Section> {
    let root = doc
        .select(&CONTENT_SEL)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut sections = Vec::new();
    for heading in root.select(&HEADING_SEL) {
        let heading_title = title::display_title(&element_text(heading));
        if heading_title.is_empty() || cfg.is_blocklisted(&heading_title) {
            continue;
        }
        sections.push(scan_span(heading, heading_title, base_url, cfg, follow_nav));
    }
    sections
}

fn scan_span(
    heading: ElementRef,
    heading_title: String,
    base_url: &str,
    cfg: &ScrapeConfig,
    follow_nav: bool,
) -> Section {
    let mut local_table = None;
    let mut navigation_target = None;

    for node in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(node) else { continue };
        // The next heading of any recognized level ends this span; deeper
        // headings own their own spans.
        if heading_level(el).is_some() {
            break;
        }

        if local_table.is_none() {
            let found = if el.value().name() == "table" {
                Some(el)
            } else {
                el.select(&TABLE_SEL).next()
            };
            if let Some(t) = found {
                let (columns, rows) = table::normalize_table(t);
                local_table = Some(NormalizedTable {
                    title: heading_title.clone(),
                    columns,
                    rows,
                });
            }
        }

        if follow_nav && navigation_target.is_none() {
            let own_anchor = (el.value().name() == "a").then_some(el);
            for anchor in own_anchor.into_iter().chain(el.select(&ANCHOR_SEL)) {
                if nav::is_navigation_control(anchor, cfg) {
                    navigation_target =
                        nav::destination(anchor).and_then(|href| resolve(base_url, href));
                    if navigation_target.is_some() {
                        break;
                    }
                }
            }
        }

        if local_table.is_some() && (!follow_nav || navigation_target.is_some()) {
            break;
        }
    }

    Section {
        title: heading_title,
        local_table,
        navigation_target,
    }
}

fn heading_level(el: ElementRef) -> Option<u8> {
    match el.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        _ => None,
    }
}

/// Absolute form of a navigation destination, resolved against the page's
/// own address when relative.
fn resolve(base_url: &str, href: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    Url::parse(base_url)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}
