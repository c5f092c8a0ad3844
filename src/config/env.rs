//! Environment variable parsing helpers.

/// Reads a trimmed, non-empty string.
pub fn parse_string(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads a boolean (`true`/`1`/`yes`, anything else is false).
pub fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    parse_string(lookup, key).map(|value| {
        let value = value.to_lowercase();
        value == "true" || value == "1" || value == "yes"
    })
}

/// Reads a value with `FromStr`, warning about and ignoring unparsable input.
pub fn parse_value<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = parse_string(lookup, key)?;
    raw.parse::<T>().map_or_else(
        |_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        },
        Some,
    )
}

/// Looks a key up in the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
