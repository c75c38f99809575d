//! Normalizes raw tokens into filename-safe, consistently-cased path
//! segments.

use std::collections::HashSet;

use crate::hashing::fnv1a_placeholder;

const RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

pub struct Sanitizer {
    acronyms: HashSet<String>,
    reserved: HashSet<&'static str>,
}

impl Sanitizer {
    pub fn new(acronyms: &[String]) -> Self {
        Sanitizer {
            acronyms: acronyms.iter().map(|s| s.to_uppercase()).collect(),
            reserved: RESERVED.iter().copied().collect(),
        }
    }

    /// Sanitize and case-normalize a single token.
    ///
    /// 1. Strip every character outside `[A-Za-z0-9-]`; an empty result
    ///    becomes a deterministic placeholder.
    /// 2. Case: a configured acronym is upper-cased; an already-all-caps
    ///    multi-char token is kept as-is (treated as an unconfigured
    ///    acronym); otherwise the first character is upper-cased and the
    ///    rest is left untouched.
    /// 3. Trailing dots and spaces are stripped (Windows path rules).
    /// 4. A result that collides with a reserved device name, or that
    ///    sanitizes away to nothing, becomes the same deterministic
    ///    placeholder as step 1.
    pub fn normalize(&self, token: &str) -> String {
        let clean = strip_illegal_chars(token);
        if clean.is_empty() {
            return fnv1a_placeholder(token);
        }

        let upper_clean = clean.to_uppercase();
        let mut final_form = if self.acronyms.contains(&upper_clean) {
            upper_clean.clone()
        } else if clean == upper_clean && clean.chars().count() > 1 {
            clean.clone()
        } else {
            capitalize_first(&clean)
        };

        final_form = final_form
            .trim_end_matches(|c| c == '.' || c == ' ')
            .to_string();

        if final_form.is_empty() || self.reserved.contains(final_form.to_uppercase().as_str()) {
            return fnv1a_placeholder(token);
        }

        final_form
    }
}

fn strip_illegal_chars(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
