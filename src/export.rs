use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ScrapeConfig;
use crate::dataset::{group_by, Dataset, NormalizedTable};

pub const JSON_FILENAME: &str = "concorrencia_2026.json";

/// JSON payload written for the site. Field names match the published
/// consumer contract, hence the Portuguese keys.
#[derive(Debug, Serialize, Deserialize)]
pub struct Payload {
    pub fonte_url: String,
    pub updated_at_iso: String,
    pub updated_at_br: String,
    pub tabelas: Vec<NormalizedTable>,
}

impl Payload {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            fonte_url: dataset.source_url.clone(),
            updated_at_iso: dataset.generated_at.to_rfc3339(),
            updated_at_br: dataset.generated_at.format("%d/%m/%Y %H:%M").to_string(),
            tabelas: dataset.tables.clone(),
        }
    }
}

/// Tables of the previous run's payload, if a readable one exists.
/// Any read or parse problem counts as "no previous run".
pub fn load_previous_tables(output_dir: &Path) -> Option<Vec<NormalizedTable>> {
    let path = json_path(output_dir);
    let text = fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<Payload>(&text) {
        Ok(payload) => Some(payload.tabelas),
        Err(e) => {
            debug!("Previous payload at {} is unreadable: {e}", path.display());
            None
        }
    }
}

/// Write all artifacts for a dataset: the JSON payload, one CSV per table,
/// and one CSV per institution carrying all of its tables.
pub fn write_artifacts(dataset: &Dataset, cfg: &ScrapeConfig) -> Result<()> {
    let payload = Payload::from_dataset(dataset);
    write_json(&payload, &json_path(&cfg.output_dir))?;
    write_table_csvs(dataset, &cfg.output_dir.join("csv"))?;
    write_group_csvs(dataset, cfg, &cfg.output_dir.join("csv").join("instituicoes"))?;
    Ok(())
}

fn json_path(output_dir: &Path) -> PathBuf {
    output_dir.join("data").join(JSON_FILENAME)
}

fn write_json(payload: &Payload, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(payload).context("Serializing payload")?;
    fs::write(path, text).with_context(|| format!("Writing {}", path.display()))?;
    info!("Payload written: {}", path.display());
    Ok(())
}

fn write_table_csvs(dataset: &Dataset, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;
    for (i, table) in dataset.tables.iter().enumerate() {
        let name = format!("{:02}_{}.csv", i + 1, sanitize_filename(&table.title));
        let path = dir.join(name);
        fs::write(&path, table_to_csv(table))
            .with_context(|| format!("Writing {}", path.display()))?;
    }
    info!("{} table CSVs written under {}", dataset.tables.len(), dir.display());
    Ok(())
}

fn write_group_csvs(dataset: &Dataset, cfg: &ScrapeConfig, dir: &Path) -> Result<()> {
    let groups = group_by(dataset, cfg);
    fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;
    let mut used_stems = HashSet::new();
    for (key, tables) in &groups {
        let mut out = String::new();
        for table in tables {
            out.push_str(&csv_line(&[table.title.clone()]));
            out.push_str(&table_to_csv(table));
            out.push('\n');
        }
        let stem = unique_stem(sanitize_filename(key), &mut used_stems);
        let path = dir.join(format!("{stem}.csv"));
        fs::write(&path, out).with_context(|| format!("Writing {}", path.display()))?;
    }
    info!("{} institution CSVs written under {}", groups.len(), dir.display());
    Ok(())
}

/// Distinct group keys can sanitize and truncate to the same stem; a
/// numeric suffix keeps one file per institution.
fn unique_stem(base: String, used: &mut HashSet<String>) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn table_to_csv(table: &NormalizedTable) -> String {
    let mut out = String::new();
    if !table.columns.is_empty() {
        out.push_str(&csv_line(&table.columns));
    }
    for row in &table.rows {
        out.push_str(&csv_line(row));
    }
    out
}

/// One CSV record with RFC-4180 quoting. Ragged rows are emitted with
/// exactly the cells they have.
fn csv_line(cells: &[String]) -> String {
    let escaped: Vec<String> = cells
        .iter()
        .map(|cell| {
            if cell.contains(['"', ',', '\n', '\r']) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.clone()
            }
        })
        .collect();
    let mut line = escaped.join(",");
    line.push('\n');
    line
}

/// Filesystem-safe stem for a table title: keep word characters, spaces
/// and hyphens, replace the rest, cap the length.
fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim();
    let stem: String = trimmed.chars().take(40).collect();
    if stem.is_empty() {
        "tabela".to_string()
    } else {
        stem
    }
}
