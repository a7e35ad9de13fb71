//! Macro argument normalization.

/// Strip quoting and surrounding whitespace from a raw argument substring.
///
/// Removes any mix of space, `'`, and `"` from both ends in one pass. There
/// is no paired-quote validation: `"hello'` normalizes to `hello`. Internal
/// quote characters are untouched and no escaping is supported.
///
/// Normalization is idempotent.
pub fn normalize(raw: &str) -> &str {
    raw.trim_matches([' ', '\'', '"'])
}
