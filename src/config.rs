use std::path::PathBuf;

/// Page the extraction runs against by default.
pub const SOURCE_URL: &str =
    "https://med.estrategia.com/portal/residencia-medica/concorrencia-residencia-medica/";

/// Headings containing any of these phrases are promotional self-reference,
/// not competition data. The whole section is skipped before any table work.
const BLOCKLIST: &[&str] = &["estratégia med"];

/// "Show more" verbs in the source language. A link whose text carries one
/// of these words is a candidate follow-to-detail control.
const NAV_VERBS: &[&str] = &["ver", "veja", "confira", "acesse", "consulte", "clique"];

/// Class-token substrings the portal's themes use for button-styled links.
const NAV_CLASS_TOKENS: &[&str] = &["btn", "button"];

/// Generic leading words that never identify an institution on their own.
const GENERIC_PREFIXES: &[&str] =
    &["concorrência", "concorrencia", "programas", "resultado", "resultados", "edital"];

const DETAIL_CONCURRENCY: usize = 6;

/// All knobs for one extraction run. No process-wide state; the CLI builds
/// one of these and threads it through.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub source_url: String,
    pub output_dir: PathBuf,
    pub blocklist: Vec<String>,
    pub nav_verbs: Vec<String>,
    pub nav_class_tokens: Vec<String>,
    pub generic_prefixes: Vec<String>,
    pub detail_concurrency: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            source_url: SOURCE_URL.to_string(),
            output_dir: PathBuf::from("output"),
            blocklist: BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            nav_verbs: NAV_VERBS.iter().map(|s| s.to_string()).collect(),
            nav_class_tokens: NAV_CLASS_TOKENS.iter().map(|s| s.to_string()).collect(),
            generic_prefixes: GENERIC_PREFIXES.iter().map(|s| s.to_string()).collect(),
            detail_concurrency: DETAIL_CONCURRENCY,
        }
    }
}

impl ScrapeConfig {
    /// True when a normalized heading carries a blocklisted phrase.
    pub fn is_blocklisted(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.blocklist.iter().any(|p| lower.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_is_case_insensitive() {
        let cfg = ScrapeConfig::default();
        assert!(cfg.is_blocklisted("Conheça o Estratégia MED"));
        assert!(!cfg.is_blocklisted("Hospital das Clínicas"));
    }
}
