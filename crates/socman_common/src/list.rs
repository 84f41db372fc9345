//! Normalisation of comma-separated attribute values.

/// Splits a comma-separated value into trimmed entries.
///
/// `"a, b,c"` becomes `["a", "b", "c"]`. Empty entries are kept so callers
/// can reject them; an empty input yields a single empty entry.
pub fn to_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}
