//! Fixed-width field sanitisers.
//!
//! Every value written into a positional line goes through exactly one of
//! three renderers, matching the three field classes of the SIPROQUIM manual:
//!
//! | Renderer | Field class | Padding | Example |
//! |----------|-------------|---------|---------|
//! | [`text_field`] | names, dates | spaces, right | `"JOSÉ  ltda" → "JOSE LTDA "` |
//! | [`numeric_field`] | CNPJ/CPF, CTe number | zeros, left | `"413-0" → "04130"` |
//! | [`alnum_field`] | NF number | spaces, right | `"0004521/A" → "4521A    "` |
//!
//! ## Order matters
//!
//! Diacritics are stripped and whitespace collapsed *before* truncation.
//! Truncating first could cut a multi-byte accented character mid-sequence or
//! waste width on doubled spaces; after normalisation the value is plain
//! ASCII and truncation is a byte-safe `&s[..n]`.
//!
//! Flattening is not cosmetic: a stray `\n` inside a 70-character name field
//! would split one positional line into two garbage lines. [`flatten`]
//! guarantees no control characters survive into any field.

use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9A-Za-z_]").unwrap());

/// Collapse a raw extracted value to a single clean line: diacritics
/// transliterated to ASCII, upper-cased, every whitespace run (including
/// `\n`, `\r`, `\t`) reduced to one space, non-printable characters dropped,
/// ends trimmed.
pub fn flatten(raw: &str) -> String {
    let ascii = deunicode(raw).to_uppercase();
    let printable: String = ascii
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    RE_WHITESPACE.replace_all(&printable, " ").trim().to_string()
}

/// Render a text value into a `width`-character field: [`flatten`], truncate,
/// space-right-pad. `None`/empty renders as all spaces.
pub fn text_field(raw: Option<&str>, width: usize) -> String {
    let flat = raw.map(flatten).unwrap_or_default();
    pad_right(&flat, width)
}

/// Render a numeric value into a `width`-character field: keep digits only,
/// truncate from the left is never needed (identifiers are validated before
/// rendering), zero-left-pad. `None`/empty renders as all zeros.
pub fn numeric_field(raw: Option<&str>, width: usize) -> String {
    let d: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if d.len() >= width {
        d[d.len() - width..].to_string()
    } else {
        format!("{:0>width$}", d, width = width)
    }
}

/// Render an alphanumeric code (NF number) into a `width`-character field:
/// strip leading zeros, drop punctuation, upper-case, truncate,
/// space-right-pad.
pub fn alnum_field(raw: Option<&str>, width: usize) -> String {
    let raw = raw.unwrap_or_default();
    if raw.trim().is_empty() {
        return " ".repeat(width);
    }
    let stripped = raw.trim().trim_start_matches('0');
    let value = if stripped.is_empty() { "0" } else { stripped };
    let clean = RE_NON_WORD.replace_all(value, "").to_uppercase();
    pad_right(&clean, width)
}

fn pad_right(s: &str, width: usize) -> String {
    let truncated = if s.len() > width { &s[..width] } else { s };
    format!("{:<width$}", truncated, width = width)
}

// ── Tests ────────────────────────────────────────────────────────────────
