//! Splits an identifier string into ordered semantic tokens.
//!
//! The precedence list below (acronym run, TitleCase word, digit-led
//! acronym, digit-led mixed run, standalone upper/digit run, lowercase run,
//! fallback skip) is applied left-to-right per dot-free part of the
//! identifier. It is hand-written rather than expressed as one lookaround
//! regex: the `regex` crate has no lookaround support, and a single regex
//! cannot reproduce every worked segmentation case (digit-led mixed runs
//! like `2dxFX` must stay one token), so the worked cases win.

/// Splits CamelCase, underscored, and generic identifiers into tokens.
pub struct Tokenizer;

impl Tokenizer {
    pub fn new() -> Self {
        Tokenizer
    }

    /// Split a full identifier string into a list of tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let stripped = strip_generic_arity(text);
        let mut tokens = Vec::new();
        for part in stripped.split(['+', '_']) {
            if part.is_empty() {
                continue;
            }
            tokens.extend(split_part(part));
        }
        tokens
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip every occurrence of a backtick followed by digits (the generic
/// arity marker, e.g. the `` `1 `` in `` Dictionary`2 ``).
fn strip_generic_arity(text: &str) -> String {
    let re = regex::Regex::new(r"`[0-9]+").expect("static pattern");
    re.replace_all(text, "").into_owned()
}

fn split_part(part: &str) -> Vec<String> {
    let chars: Vec<char> = part.chars().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < n {
        if let Some((token, consumed)) = try_acronym_run(&chars, i)
            .or_else(|| try_titlecase_word(&chars, i))
            .or_else(|| try_digit_led_acronym(&chars, i))
            .or_else(|| try_digit_led_mixed_run(&chars, i))
            .or_else(|| try_standalone_run(&chars, i))
            .or_else(|| try_lowercase_run(&chars, i))
        {
            tokens.push(token);
            i += consumed;
        } else {
            // Fallback: skip one character (it belongs to no token).
            i += 1;
        }
    }
    tokens
}

fn is_upper(c: char) -> bool {
    c.is_ascii_uppercase()
}

fn is_lower(c: char) -> bool {
    c.is_ascii_lowercase()
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn take(chars: &[char], start: usize, len: usize) -> String {
    chars[start..start + len].iter().collect()
}

/// Two or more consecutive uppercase letters, optionally followed by digits,
/// not followed by a lowercase letter (else the last uppercase letter
/// belongs to the following word).
fn try_acronym_run(chars: &[char], i: usize) -> Option<(String, usize)> {
    let n = chars.len();
    if !is_upper(chars[i]) {
        return None;
    }
    let mut u = 0;
    while i + u < n && is_upper(chars[i + u]) {
        u += 1;
    }
    if u < 2 {
        return None;
    }
    let mut d = 0;
    while i + u + d < n && is_digit(chars[i + u + d]) {
        d += 1;
    }
    let end = i + u + d;
    if end < n && is_lower(chars[end]) {
        if d == 0 && u - 1 >= 2 {
            Some((take(chars, i, u - 1), u - 1))
        } else {
            None
        }
    } else {
        Some((take(chars, i, u + d), u + d))
    }
}

/// One uppercase letter, one or more lowercase letters, optionally followed
/// by digits — unless those trailing digits are themselves followed by an
/// uppercase letter, in which case the digits belong to the next token.
fn try_titlecase_word(chars: &[char], i: usize) -> Option<(String, usize)> {
    let n = chars.len();
    if !is_upper(chars[i]) {
        return None;
    }
    let mut l = 0;
    while i + 1 + l < n && is_lower(chars[i + 1 + l]) {
        l += 1;
    }
    if l == 0 {
        return None;
    }
    let digit_start = i + 1 + l;
    let mut d = 0;
    while digit_start + d < n && is_digit(chars[digit_start + d]) {
        d += 1;
    }
    let after_digits = digit_start + d;
    let include_digits = d > 0 && !(after_digits < n && is_upper(chars[after_digits]));
    let consumed = if include_digits { 1 + l + d } else { 1 + l };
    Some((take(chars, i, consumed), consumed))
}

/// One or more digits followed by one or more uppercase letters not
/// followed by a lowercase letter (e.g. `2D`).
fn try_digit_led_acronym(chars: &[char], i: usize) -> Option<(String, usize)> {
    let n = chars.len();
    if !is_digit(chars[i]) {
        return None;
    }
    let mut dn = 0;
    while i + dn < n && is_digit(chars[i + dn]) {
        dn += 1;
    }
    let mut un = 0;
    while i + dn + un < n && is_upper(chars[i + dn + un]) {
        un += 1;
    }
    if un == 0 {
        return None;
    }
    let after = i + dn + un;
    if after < n && is_lower(chars[after]) {
        return None;
    }
    Some((take(chars, i, dn + un), dn + un))
}

/// Digits followed by letters, stopping before the next TitleCase boundary
/// (e.g. `2dxFX` remains one token).
fn try_digit_led_mixed_run(chars: &[char], i: usize) -> Option<(String, usize)> {
    let n = chars.len();
    if !is_digit(chars[i]) {
        return None;
    }
    let mut dn = 0;
    while i + dn < n && is_digit(chars[i + dn]) {
        dn += 1;
    }
    let mut j = i + dn;
    let mut letters = 0;
    while j < n {
        let c = chars[j];
        if is_digit(c) || !(is_upper(c) || is_lower(c)) {
            break;
        }
        if is_upper(c) && j + 1 < n && is_lower(chars[j + 1]) {
            break; // a new TitleCase word starts here
        }
        j += 1;
        letters += 1;
    }
    if letters == 0 {
        return None;
    }
    Some((take(chars, i, dn + letters), dn + letters))
}

/// A standalone run of uppercase letters and/or digits.
fn try_standalone_run(chars: &[char], i: usize) -> Option<(String, usize)> {
    let n = chars.len();
    if !(is_upper(chars[i]) || is_digit(chars[i])) {
        return None;
    }
    let mut k = 0;
    while i + k < n && (is_upper(chars[i + k]) || is_digit(chars[i + k])) {
        k += 1;
    }
    Some((take(chars, i, k), k))
}

/// A run of lowercase letters.
fn try_lowercase_run(chars: &[char], i: usize) -> Option<(String, usize)> {
    let n = chars.len();
    if !is_lower(chars[i]) {
        return None;
    }
    let mut k = 0;
    while i + k < n && is_lower(chars[i + k]) {
        k += 1;
    }
    Some((take(chars, i, k), k))
}
