use std::sync::LazyLock;

use regex::Regex;

// Em/en dashes split with or without spacing; a plain hyphen only when
// surrounded by whitespace (hyphenated names stay intact).
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[—–]\s*|\s+-\s+").unwrap());
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b20\d{2}(?:\s*/\s*20\d{2})?\b").unwrap());
static LEADING_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\p{L}\p{N}]+").unwrap());

/// Clean display form of a raw heading: collapsed whitespace, no trailing
/// periods or spaces.
pub fn display_title(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    collapsed.trim_end_matches([' ', '.']).to_string()
}

/// Canonical grouping key (institution name) for a table title.
///
/// Splits the title on dash separators, demotes generic leading segments
/// ("Concorrência — HCPA 2026" groups under HCPA, not Concorrência), and
/// strips edition years ("2026", "2025/2026").
pub fn group_key(raw_title: &str, generic_prefixes: &[String]) -> String {
    let title = display_title(raw_title);
    let segments: Vec<&str> = SEPARATOR_RE
        .split(&title)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let base = match segments.as_slice() {
        [] => title.as_str(),
        [only] => only,
        [first, .., last] => {
            if is_generic(first, generic_prefixes) {
                last
            } else {
                first
            }
        }
    };

    let no_years = YEAR_RE.replace_all(base, "");
    let collapsed = collapse_whitespace(&no_years);
    let key = LEADING_PUNCT_RE.replace(&collapsed, "");
    let key = key.trim();
    if key.is_empty() {
        title
    } else {
        key.to_string()
    }
}

fn is_generic(segment: &str, generic_prefixes: &[String]) -> bool {
    let lower = segment.to_lowercase();
    generic_prefixes.iter().any(|p| {
        lower == *p
            || (lower.starts_with(p.as_str())
                && lower[p.len()..].chars().next().is_some_and(|c| !c.is_alphanumeric()))
    })
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        crate::config::ScrapeConfig::default().generic_prefixes
    }

    #[test]
    fn display_title_collapses_and_trims() {
        assert_eq!(display_title("  Hospital   das\tClínicas . "), "Hospital das Clínicas");
        assert_eq!(display_title("HCPA 2026."), "HCPA 2026");
    }

    #[test]
    fn group_key_demotes_generic_prefix_and_strips_year() {
        let p = prefixes();
        assert_eq!(group_key("Concorrência — HCPA 2026", &p), group_key("HCPA", &p));
        assert_eq!(group_key("Concorrência — HCPA 2026", &p), "HCPA");
    }

    #[test]
    fn group_key_keeps_specific_first_segment() {
        let p = prefixes();
        assert_eq!(group_key("HCPA — Acesso Direto", &p), "HCPA");
        assert_eq!(group_key("Santa Casa de SP - Resultados", &p), "Santa Casa de SP");
    }

    #[test]
    fn group_key_strips_year_ranges() {
        let p = prefixes();
        assert_eq!(group_key("UNIFESP 2025/2026", &p), "UNIFESP");
        assert_eq!(group_key("Resultados — UNICAMP 2025 / 2026", &p), "UNICAMP");
    }

    #[test]
    fn group_key_falls_back_when_everything_strips() {
        let p = prefixes();
        assert_eq!(group_key("2026", &p), "2026");
    }

    #[test]
    fn hyphenated_names_are_not_split() {
        let p = prefixes();
        assert_eq!(group_key("Santa-Casa", &p), "Santa-Casa");
    }
}
