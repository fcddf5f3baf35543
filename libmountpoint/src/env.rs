//! Decoding of `KEY=VALUE` process environment entries.
//!
//! Container environments routinely carry variables the hook does not care
//! about, so decoding is permissive: malformed entries are skipped, never
//! reported.

use std::collections::HashMap;

/// Split an entry into key and value when it contains exactly one `=`.
///
/// `"A=b"` yields `("A", "b")`; `"A"` and `"A=b=c"` yield `None`.
pub fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let (key, value) = entry.split_once('=')?;
    if value.contains('=') {
        return None;
    }
    Some((key, value))
}

/// Decode `entries` into a map.
///
/// Entries are visited in order and unconditionally assigned, so for a key
/// that appears more than once the last occurrence wins. Entries rejected by
/// [`split_entry`] are skipped.
pub fn parse<I, S>(entries: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut vars = HashMap::new();
    for entry in entries {
        if let Some((key, value)) = split_entry(entry.as_ref()) {
            vars.insert(key.to_owned(), value.to_owned());
        }
    }
    vars
}

/// Turn entries into `(key, value)` pairs for a child process environment.
///
/// Unlike [`parse`], the value may itself contain `=` (only the first one
/// separates), order is kept, and nothing is deduplicated. Entries without
/// any `=` cannot be expressed as a variable and are dropped.
pub fn command_env<S: AsRef<str>>(entries: &[S]) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|entry| entry.as_ref().split_once('='))
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
