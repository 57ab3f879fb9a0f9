use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use super::{element_text, sections, table, title};
use crate::config::ScrapeConfig;
use crate::dataset::NormalizedTable;

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());

/// Fallback title base when a detail page has no level-1 heading.
const UNTITLED_BASE: &str = "Tabela";

/// Harvest the tables of a detail page and reconcile their titles against
/// the section that linked to it.
///
/// Heading-guided extraction runs first; navigation controls on the detail
/// page are ignored — expansion is exactly one hop deep. When the page has
/// no heading-owned tables at all, every table is taken in document order
/// and titled `"{base} {n}"` from the page's level-1 heading.
pub fn expand_detail(
    html: &str,
    parent_title: &str,
    detail_url: &str,
    cfg: &ScrapeConfig,
) -> Vec<NormalizedTable> {
    let doc = Html::parse_document(html);

    let mut tables: Vec<NormalizedTable> = sections::scan_sections(&doc, detail_url, cfg, false)
        .into_iter()
        .filter_map(|s| s.local_table)
        .collect();

    if tables.is_empty() {
        tables = all_tables_fallback(&doc);
        if !tables.is_empty() {
            debug!(
                "No heading-owned tables on {detail_url}; fell back to {} bare tables",
                tables.len()
            );
        }
    }

    for t in &mut tables {
        t.title = reconcile_title(parent_title, &t.title);
    }
    tables
}

fn all_tables_fallback(doc: &Html) -> Vec<NormalizedTable> {
    let base = doc
        .select(&H1_SEL)
        .next()
        .map(|h| title::display_title(&element_text(h)))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_BASE.to_string());

    doc.select(&TABLE_SEL)
        .enumerate()
        .map(|(i, t)| {
            let (columns, rows) = table::normalize_table(t);
            NormalizedTable {
                title: format!("{} {}", base, i + 1),
                columns,
                rows,
            }
        })
        .collect()
}

/// Prefix a table title with its parent section's title unless the parent
/// already appears in it. Applying this twice yields the same string.
pub fn reconcile_title(parent: &str, own: &str) -> String {
    if own.to_lowercase().contains(&parent.to_lowercase()) {
        own.to_string()
    } else {
        format!("{parent} — {own}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(html: &str, parent: &str) -> Vec<NormalizedTable> {
        let cfg = ScrapeConfig::default();
        expand_detail(html, parent, "https://example.org/detalhe/", &cfg)
    }

    #[test]
    fn heading_guided_tables_get_parent_prefix() {
        let tables = expand(
            "<div class='content'>\
             <h2>Acesso Direto</h2><table><tr><td>a</td></tr></table>\
             <h2>Pré-requisito</h2><table><tr><td>b</td></tr></table></div>",
            "Hospital Y",
        );
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].title, "Hospital Y — Acesso Direto");
        assert_eq!(tables[1].title, "Hospital Y — Pré-requisito");
    }

    #[test]
    fn own_title_containing_parent_is_left_alone() {
        let tables = expand(
            "<div class='content'>\
             <h2>Hospital Y — Acesso Direto</h2><table><tr><td>a</td></tr></table></div>",
            "Hospital Y",
        );
        assert_eq!(tables[0].title, "Hospital Y — Acesso Direto");
    }

    #[test]
    fn bare_tables_fall_back_to_h1_indexing() {
        // Tables precede every heading, so no section owns them.
        let tables = expand(
            "<body><table><tr><td>a</td></tr></table>\
             <table><tr><td>b</td></tr></table>\
             <h1>Concorrência HCPA</h1></body>",
            "HCPA",
        );
        assert_eq!(tables.len(), 2);
        // "Concorrência HCPA 1" already contains "HCPA": no prefix added.
        assert_eq!(tables[0].title, "Concorrência HCPA 1");
        assert_eq!(tables[1].title, "Concorrência HCPA 2");
    }

    #[test]
    fn fallback_without_h1_uses_generic_base() {
        let tables = expand(
            "<body><table><tr><td>a</td></tr></table></body>",
            "Hospital Z",
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].title, "Hospital Z — Tabela 1");
    }

    #[test]
    fn empty_document_expands_to_nothing() {
        assert!(expand("", "HCPA").is_empty());
        assert!(expand("<p>sem tabelas</p>", "HCPA").is_empty());
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let once = reconcile_title("Hospital Y", "Acesso Direto");
        let twice = reconcile_title("Hospital Y", &once);
        assert_eq!(once, twice);
        assert_eq!(once, "Hospital Y — Acesso Direto");
    }

    #[test]
    fn detail_navigation_controls_are_ignored() {
        // One hop only: the button on the detail page must not matter.
        let tables = expand(
            "<div class='content'><h2>Vagas</h2>\
             <table><tr><td>a</td></tr></table>\
             <a class='btn' href='/mais'>Veja mais</a></div>",
            "HCPA",
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].title, "HCPA — Vagas");
    }
}
