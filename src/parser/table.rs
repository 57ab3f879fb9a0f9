use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::element_text;

static THEAD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("thead").unwrap());
static TBODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());

/// Flatten one `<table>` element into a `(columns, rows)` pair.
///
/// Header detection, in order: an explicit `<thead>`, then an all-`<th>`
/// first row. Repeated header rows inside the body are noise and skipped,
/// as is any data row whose cells exactly repeat the columns. When no
/// header exists at all, columns are synthesized as `Col1..ColN` after all
/// rows are known, N being the longest row. Rows are never padded or
/// truncated; ragged rows come out ragged.
pub fn normalize_table(table: ElementRef) -> (Vec<String>, Vec<Vec<String>>) {
    let mut columns: Vec<String> = Vec::new();

    if let Some(thead) = table.select(&THEAD_SEL).next() {
        columns = thead.select(&CELL_SEL).map(element_text).collect();
    }

    let body = table.select(&TBODY_SEL).next().unwrap_or(table);
    let mut rows: Vec<Vec<String>> = Vec::new();

    for tr in body.select(&TR_SEL) {
        let cells: Vec<(bool, String)> = tr
            .select(&CELL_SEL)
            .map(|c| (c.value().name() == "th", element_text(c)))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let all_header = cells.iter().all(|(is_th, _)| *is_th);
        let texts: Vec<String> = cells.into_iter().map(|(_, t)| t).collect();

        if all_header {
            // First all-header row doubles as the column row when <thead>
            // was missing; later ones are repeated mid-table headers.
            if columns.is_empty() && rows.is_empty() {
                columns = texts;
            }
            continue;
        }

        if !columns.is_empty() && texts == columns {
            continue;
        }
        rows.push(texts);
    }

    if columns.is_empty() && !rows.is_empty() {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        columns = (1..=width).map(|i| format!("Col{i}")).collect();
    }

    (columns, rows)
}
