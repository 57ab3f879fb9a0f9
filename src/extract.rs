use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{FixedOffset, Utc};
use scraper::Html;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::config::ScrapeConfig;
use crate::dataset::{Dataset, NormalizedTable};
use crate::fetch::Fetch;
use crate::parser::sections::{self, Section};
use crate::parser::expand;

/// Fetch the source page and extract its dataset. Failure to obtain the
/// source page is the one fatal error of a run; everything downstream
/// degrades to absence.
pub async fn run(cfg: &ScrapeConfig, fetcher: Arc<dyn Fetch>) -> Result<Dataset> {
    info!("Fetching source page: {}", cfg.source_url);
    let body = fetcher
        .fetch(&cfg.source_url)
        .await?
        .ok_or_else(|| anyhow!("Source page unavailable: {}", cfg.source_url))?;
    extract_from_html(&body, cfg, fetcher).await
}

/// Extract a dataset from already-fetched source HTML.
///
/// Sections with a navigation control get their detail page fetched and
/// expanded; a non-empty expansion supersedes the section's own summary
/// table, while an empty one (fetch failure included) falls back to it.
/// Table order follows document order regardless of fetch completion order.
pub async fn extract_from_html(
    html: &str,
    cfg: &ScrapeConfig,
    fetcher: Arc<dyn Fetch>,
) -> Result<Dataset> {
    let scanned = {
        let doc = Html::parse_document(html);
        sections::scan_sections(&doc, &cfg.source_url, cfg, true)
    };
    info!("Sections found: {}", scanned.len());

    let detail_bodies = fetch_details(&scanned, cfg, fetcher).await;

    let mut tables: Vec<NormalizedTable> = Vec::new();
    for (section, detail) in scanned.into_iter().zip(detail_bodies) {
        let expanded = match (&detail, &section.navigation_target) {
            (Some(body), Some(url)) => expand::expand_detail(body, &section.title, url, cfg),
            _ => Vec::new(),
        };
        if !expanded.is_empty() {
            tables.extend(expanded);
        } else if let Some(local) = section.local_table {
            tables.push(local);
        }
        // A section with neither contributes nothing; narrative-only
        // sections are expected.
    }

    info!("Tables extracted: {}", tables.len());
    Ok(Dataset {
        source_url: cfg.source_url.clone(),
        generated_at: Utc::now().with_timezone(&brt()),
        tables,
    })
}

/// Fetch detail pages for all sections that have a navigation target,
/// bounded by the configured concurrency. Results land in a slot indexed
/// by section position, not in arrival order. A failed or cancelled fetch
/// leaves its slot `None`.
async fn fetch_details(
    scanned: &[Section],
    cfg: &ScrapeConfig,
    fetcher: Arc<dyn Fetch>,
) -> Vec<Option<String>> {
    let mut bodies: Vec<Option<String>> = vec![None; scanned.len()];

    let limit = cfg.detail_concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let (tx, mut rx) = mpsc::channel::<(usize, Option<String>)>(limit * 2);

    let mut pending = 0usize;
    for (idx, section) in scanned.iter().enumerate() {
        let Some(url) = section.navigation_target.clone() else {
            continue;
        };
        pending += 1;
        let fetcher = Arc::clone(&fetcher);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let section_title = section.title.clone();
        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let body = match fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Detail fetch for '{section_title}' failed: {e:#}");
                    None
                }
            };
            let _ = tx.send((idx, body)).await;
        });
    }
    drop(tx);

    if pending > 0 {
        info!("Expanding {pending} detail pages");
    }
    while let Some((idx, body)) = rx.recv().await {
        bodies[idx] = body;
    }
    bodies
}

// Brasília time; America/Sao_Paulo has had no DST since 2019, so a fixed
// UTC-3 offset is exact.
fn brt() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).unwrap()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fetch::{FetchFuture, OfflineFetcher};

    struct MapFetcher(HashMap<String, String>);

    impl Fetch for MapFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
            let body = self.0.get(url).cloned();
            Box::pin(async move { Ok(body) })
        }
    }

    fn cfg() -> ScrapeConfig {
        ScrapeConfig {
            source_url: "https://example.org/concorrencia/".into(),
            ..ScrapeConfig::default()
        }
    }

    const SOURCE: &str = "<div class='content'>\
        <h2>Hospital X</h2>\
        <table><tr><td>local</td></tr></table>\
        <h2>Hospital Y</h2>\
        <table><tr><td>resumo</td></tr></table>\
        <a class='btn' href='/hospital-y'>Confira a tabela completa</a>\
        </div>";

    const DETAIL: &str = "<div class='content'>\
        <h2>Acesso Direto</h2><table><tr><td>ad</td></tr></table>\
        <h2>Pré-requisito</h2><table><tr><td>pr</td></tr></table></div>";

    #[tokio::test]
    async fn expansion_supersedes_local_table() {
        let cfg = cfg();
        let fetcher = MapFetcher(HashMap::from([(
            "https://example.org/hospital-y".to_string(),
            DETAIL.to_string(),
        )]));
        let dataset = extract_from_html(SOURCE, &cfg, Arc::new(fetcher)).await.unwrap();

        let titles: Vec<&str> = dataset.tables.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Hospital X", "Hospital Y — Acesso Direto", "Hospital Y — Pré-requisito"]
        );
        // The summary row must be gone.
        assert!(dataset.tables.iter().all(|t| t.rows != vec![vec!["resumo"]]));
    }

    #[tokio::test]
    async fn failed_expansion_falls_back_to_local_table() {
        let cfg = cfg();
        let dataset = extract_from_html(SOURCE, &cfg, Arc::new(OfflineFetcher)).await.unwrap();

        let titles: Vec<&str> = dataset.tables.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Hospital X", "Hospital Y"]);
        assert_eq!(dataset.tables[1].rows, vec![vec!["resumo"]]);
    }

    #[tokio::test]
    async fn missing_source_page_is_fatal() {
        let cfg = cfg();
        let err = run(&cfg, Arc::new(OfflineFetcher)).await.unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }

    #[tokio::test]
    async fn sections_without_tables_contribute_nothing() {
        let cfg = cfg();
        let html = "<div class='content'><h2>Aviso</h2><p>prosa</p>\
                    <h2>HCPA</h2><table><tr><td>x</td></tr></table></div>";
        let dataset = extract_from_html(html, &cfg, Arc::new(OfflineFetcher)).await.unwrap();
        assert_eq!(dataset.tables.len(), 1);
        assert_eq!(dataset.tables[0].title, "HCPA");
    }

    #[tokio::test]
    async fn identical_input_gives_identical_fingerprint() {
        let cfg = cfg();
        let a = extract_from_html(SOURCE, &cfg, Arc::new(OfflineFetcher)).await.unwrap();
        let b = extract_from_html(SOURCE, &cfg, Arc::new(OfflineFetcher)).await.unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
