use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::ScrapeConfig;
use crate::parser::title;

/// One extracted table. `columns` may be synthesized (`Col1..ColN`) and
/// rows are kept ragged exactly as the markup had them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTable {
    #[serde(rename = "titulo")]
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Result of one full extraction run. `generated_at` is informational only
/// and never participates in change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub source_url: String,
    pub generated_at: DateTime<FixedOffset>,
    pub tables: Vec<NormalizedTable>,
}

impl Dataset {
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.tables)
    }
}

/// Deterministic digest over the tables alone. Struct fields serialize in
/// declaration order, so the serialization is canonical; table order is
/// significant (it mirrors document order).
pub fn fingerprint(tables: &[NormalizedTable]) -> String {
    let canonical = serde_json::to_string(tables).unwrap_or_default();
    let mut sha = sha1_smol::Sha1::new();
    sha.update(canonical.as_bytes());
    sha.digest().to_string()
}

/// Compare a stored fingerprint against a fresh dataset. A missing prior
/// fingerprint always counts as changed.
pub fn has_changed(old: Option<&str>, new: &Dataset) -> bool {
    match old {
        Some(prev) => prev != new.fingerprint(),
        None => true,
    }
}

/// Partition tables by institution key, preserving dataset order inside
/// each group and first-appearance order across groups.
pub fn group_by<'a>(
    dataset: &'a Dataset,
    cfg: &ScrapeConfig,
) -> Vec<(String, Vec<&'a NormalizedTable>)> {
    let mut groups: Vec<(String, Vec<&NormalizedTable>)> = Vec::new();
    for table in &dataset.tables {
        let key = title::group_key(&table.title, &cfg.generic_prefixes);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(table),
            None => groups.push((key, vec![table])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table(title: &str, rows: &[&[&str]]) -> NormalizedTable {
        NormalizedTable {
            title: title.to_string(),
            columns: vec!["Programa".into(), "Vagas".into()],
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn dataset(tables: Vec<NormalizedTable>, hour: u32) -> Dataset {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        Dataset {
            source_url: "https://example.org/page".into(),
            generated_at: tz.with_ymd_and_hms(2026, 1, 10, hour, 0, 0).unwrap(),
            tables,
        }
    }

    #[test]
    fn fingerprint_ignores_generated_at() {
        let a = dataset(vec![table("HCPA", &[&["Clínica Médica", "10"]])], 8);
        let b = dataset(vec![table("HCPA", &[&["Clínica Médica", "10"]])], 17);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let t1 = table("HCPA", &[&["Clínica Médica", "10"]]);
        let t2 = table("USP", &[&["Cirurgia", "4"]]);
        let a = dataset(vec![t1.clone(), t2.clone()], 8);
        let b = dataset(vec![t2, t1], 8);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_tracks_cell_edits() {
        let a = dataset(vec![table("HCPA", &[&["Clínica Médica", "10"]])], 8);
        let b = dataset(vec![table("HCPA", &[&["Clínica Médica", "11"]])], 8);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn has_changed_without_prior_fingerprint() {
        let d = dataset(vec![], 8);
        assert!(has_changed(None, &d));
        let fp = d.fingerprint();
        assert!(!has_changed(Some(&fp), &d));
    }

    #[test]
    fn group_by_merges_titles_with_same_key() {
        let cfg = ScrapeConfig::default();
        let d = dataset(
            vec![
                table("Concorrência — HCPA 2026", &[&["a", "1"]]),
                table("USP", &[&["b", "2"]]),
                table("HCPA", &[&["c", "3"]]),
            ],
            8,
        );
        let groups = group_by(&d, &cfg);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "HCPA");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "USP");
    }
}
