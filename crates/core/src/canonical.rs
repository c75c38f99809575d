//! Canonical root naming and token-boundary projection used by the
//! normalization pass to compare cluster roots safely across the
//! normalized/sanitized string spaces.

use std::collections::BTreeSet;

const MIN_ACRONYM_LEN: usize = 2;

/// Join tokens into one canonical root name: acronyms (all-caps runs of
/// length >= 2) are preserved, everything else is TitleCased.
pub fn canonicalize_root_name(tokens: &[String]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        if token.chars().count() >= MIN_ACRONYM_LEN && is_all_cased_upper(token) {
            out.push_str(token);
        } else {
            let mut chars = token.chars();
            let first = chars.next().expect("checked non-empty above");
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// True when every cased character in `s` is uppercase and at least one
/// cased character is present (digits don't count either way).
fn is_all_cased_upper(s: &str) -> bool {
    let mut has_cased = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            has_cased = true;
            if !c.is_uppercase() {
                return false;
            }
        }
    }
    has_cased
}

/// Project character offsets (boundaries) from the normalized string's
/// index space into the sanitized string's index space, so that token
/// boundaries discovered before sanitization can still be checked against
/// the sanitized folder name later.
///
/// Returns `(sanitized_boundaries, success)`. `success` is false only in the
/// degenerate case of an empty normalized string paired with a non-empty
/// sanitized one — in practice `sanitized` is always derived from
/// `normalized`, so this almost never triggers; callers keep the branch
/// anyway because NormalizationRoot's "unknown boundaries" escape hatch
/// depends on it.
pub fn project_token_boundaries(
    normalized: &str,
    sanitized: &str,
    normalized_boundaries: &BTreeSet<usize>,
) -> (BTreeSet<usize>, bool) {
    let norm_chars: Vec<char> = normalized.chars().collect();
    let san_chars: Vec<char> = sanitized.chars().collect();

    if norm_chars.is_empty() {
        return if san_chars.is_empty() {
            (BTreeSet::from([0]), true)
        } else {
            (BTreeSet::new(), false)
        };
    }

    let mut mapping: Vec<Option<usize>> = vec![None; norm_chars.len()];
    let mut s_idx = 0;
    for (n_idx, n_char) in norm_chars.iter().enumerate() {
        if s_idx < san_chars.len()
            && n_char.to_ascii_lowercase() == san_chars[s_idx].to_ascii_lowercase()
        {
            mapping[n_idx] = Some(s_idx);
            s_idx += 1;
        }
    }

    let mut sanitized_boundaries: BTreeSet<usize> = BTreeSet::new();
    sanitized_boundaries.insert(0);
    sanitized_boundaries.insert(san_chars.len());

    for &k in normalized_boundaries {
        if k == 0 || k == norm_chars.len() {
            continue;
        }
        let target = (k..norm_chars.len()).find_map(|j| mapping[j]);
        sanitized_boundaries.insert(target.unwrap_or(san_chars.len()));
    }

    (sanitized_boundaries, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn preserves_acronyms_and_titlecases_the_rest() {
        assert_eq!(
            canonicalize_root_name(&toks(&["XML", "parser"])),
            "XMLParser"
        );
        assert_eq!(canonicalize_root_name(&toks(&["STORY"])), "STORY");
        assert_eq!(canonicalize_root_name(&toks(&["story"])), "Story");
        assert_eq!(canonicalize_root_name(&toks(&["STORY", "EVENT"])), "STORYEVENT");
    }

    #[test]
    fn digit_acronym_preserved() {
        assert_eq!(canonicalize_root_name(&toks(&["2D"])), "2D");
    }

    #[test]
    fn single_letter_is_not_an_acronym() {
        assert_eq!(canonicalize_root_name(&toks(&["A", "story"])), "AStory");
    }

    #[test]
    fn empty_tokens_contribute_nothing() {
        assert_eq!(canonicalize_root_name(&toks(&["", "story"])), "Story");
    }

    #[test]
    fn boundary_projection_trivial_when_unsanitized() {
        let (bounds, ok) =
            project_token_boundaries("Story", "Story", &BTreeSet::from([0, 5]));
        assert!(ok);
        assert_eq!(bounds, BTreeSet::from([0, 5]));
    }

    #[test]
    fn boundary_projection_skips_removed_characters() {
        let (bounds, ok) =
            project_token_boundaries("A B", "AB", &BTreeSet::from([0, 1, 3]));
        assert!(ok);
        assert_eq!(bounds, BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn empty_normalized_with_empty_sanitized_succeeds() {
        let (bounds, ok) = project_token_boundaries("", "", &BTreeSet::new());
        assert!(ok);
        assert_eq!(bounds, BTreeSet::from([0]));
    }

    #[test]
    fn empty_normalized_with_nonempty_sanitized_fails() {
        let (_bounds, ok) = project_token_boundaries("", "x", &BTreeSet::new());
        assert!(!ok);
    }
}
