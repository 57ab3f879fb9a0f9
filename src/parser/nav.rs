use scraper::ElementRef;

use super::element_text;
use crate::config::ScrapeConfig;

/// Decide whether an anchor-like element is a follow-to-detail control
/// ("ver tabela completa" and friends).
///
/// Any one signal suffices: a "show more" verb in the link text, a
/// button-styled class token, or an explicit `role="button"`. A candidate
/// without a usable destination never qualifies, whatever its text looks
/// like.
pub fn is_navigation_control(el: ElementRef, cfg: &ScrapeConfig) -> bool {
    if destination(el).is_none() {
        return false;
    }
    has_verb(&element_text(el), &cfg.nav_verbs)
        || has_button_class(el, &cfg.nav_class_tokens)
        || has_button_role(el)
}

/// The raw destination of a candidate control, if it has a usable one.
/// Fragment-only and javascript: pseudo-links are not destinations.
pub fn destination(el: ElementRef) -> Option<&str> {
    let href = el.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:") {
        return None;
    }
    Some(href)
}

fn has_verb(text: &str, verbs: &[String]) -> bool {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .any(|w| verbs.iter().any(|v| w == *v))
}

fn has_button_class(el: ElementRef, tokens: &[String]) -> bool {
    el.value()
        .classes()
        .any(|class| tokens.iter().any(|t| class.to_lowercase().contains(t.as_str())))
}

fn has_button_role(el: ElementRef) -> bool {
    el.value()
        .attr("role")
        .is_some_and(|r| r.eq_ignore_ascii_case("button"))
}
