//! Turning raw student and course names into atoms.
//!
//! An atom only contains `[a-z0-9_]`, never starts or ends with an
//! underscore, is never empty and never starts with a digit. The same raw
//! name always yields the same atom, and normalizing an atom again is a
//! no-op.

use crate::data::Atom;
use unicode_normalization::UnicodeNormalization;

/// Prefix for student atoms that would otherwise start with a digit.
pub const STUDENT_PREFIX: &str = "s_";
/// Prefix for course atoms that would otherwise start with a digit.
pub const COURSE_PREFIX: &str = "c_";

const FALLBACK: &str = "x";

/// Expands German umlauts and sharp s into ASCII digraphs.
///
/// Has to run before diacritics are stripped, otherwise `ü` would lose its
/// mark and come out as a bare `u`.
pub fn transliterate_german(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            'Ä' => out.push_str("AE"),
            'Ö' => out.push_str("OE"),
            'Ü' => out.push_str("UE"),
            other => out.push(other),
        }
    }
    out
}

/// Normalizes `raw` into an atom string. `prefix_if_digit` is prepended
/// when the result would start with a digit.
pub fn normalize(raw: &str, prefix_if_digit: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let transliterated = transliterate_german(&lowered);

    // compatibility decomposition, then drop everything without an ASCII base
    let folded = transliterated.nfkd().filter(char::is_ascii);

    let mut text = String::with_capacity(transliterated.len());
    for ch in folded {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '_'
        };
        if ch == '_' && text.ends_with('_') {
            continue;
        }
        text.push(ch);
    }

    let trimmed = text.trim_matches('_');
    let mut atom = if trimmed.is_empty() {
        FALLBACK.to_string()
    } else {
        trimmed.to_string()
    };

    if atom.starts_with(|c: char| c.is_ascii_digit()) {
        atom.insert_str(0, prefix_if_digit);
    }
    atom
}

/// Normalizes `raw` into an [`Atom`].
pub fn normalize_atom(raw: &str, prefix_if_digit: &str) -> Atom {
    Atom::from_normalized(normalize(raw, prefix_if_digit))
}
