//! Canonical key form for categorical values.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize an optional value; `None` stays `None`.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value.map(normalize_str)
}

/// Reduce `value` to lowercase ASCII words joined by single underscores.
///
/// The value is trimmed and lowercased, decomposed (NFKD) with combining marks
/// dropped, and every run of characters outside `[a-z0-9]` becomes one `_`.
/// Leading and trailing separators are removed. The result is a fixed point:
/// normalizing it again returns it unchanged.
pub fn normalize_str(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut separator = false;
    for c in lowered.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if separator && !out.is_empty() {
                out.push('_');
            }
            separator = false;
            out.push(c);
        } else {
            separator = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_diacritics_and_spaces() {
        assert_eq!(normalize(Some("São Paulo")).as_deref(), Some("sao_paulo"));
        assert_eq!(normalize_str("Île-de-France"), "ile_de_france");
        assert_eq!(normalize_str("United States"), "united_states");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(normalize_str("  A---B__C "), "a_b_c");
        assert_eq!(normalize_str("__x__"), "x");
        assert_eq!(normalize_str("!!!"), "");
    }

    #[test]
    fn none_passes_through() {
        assert_eq!(normalize(None), None);
    }

    #[test]
    fn is_idempotent() {
        for raw in ["São Paulo", "  A---B__C ", "Brew Pub 2", "ÅLAND", "", "micro"] {
            let once = normalize_str(raw);
            assert_eq!(normalize_str(&once), once, "{raw:?}");
        }
    }

    #[test]
    fn compatibility_forms_fold() {
        assert_eq!(normalize_str("ﬁne ½"), "fine_1_2");
    }
}
