//! Plate text cleanup and authorization matching.
//!
//! Two different rules live here on purpose. `normalize` is applied to OCR
//! output and keeps only `[A-Z0-9]`. `strip_separators` is applied when
//! comparing against the authorized list and only removes hyphens and spaces,
//! so an entry such as `"ABC.1234"` never matches a scanned `"ABC1234"`.

/// Uppercase `text` and drop every character outside `[A-Z0-9]`.
pub fn normalize(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Like `normalize`, but an empty result is `None` so it can never be
/// compared against an empty authorized entry.
pub fn normalize_plate(text: &str) -> Option<String> {
    let plate = normalize(text);
    if plate.is_empty() {
        None
    } else {
        Some(plate)
    }
}

/// Comparison key for the authorized list: uppercase, without `-` and ` `.
pub fn strip_separators(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect::<String>()
        .to_uppercase()
}

/// Whether `plate` appears in `authorized` once both sides have their
/// separators stripped. Returns on the first hit.
pub fn is_authorized<S: AsRef<str>>(plate: &str, authorized: &[S]) -> bool {
    let plate = strip_separators(plate);
    authorized.iter().any(|entry| strip_separators(entry.as_ref()) == plate)
}
