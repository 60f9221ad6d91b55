//! Block code wildcard matching.
//!
//! Patterns use `*` to match any (possibly empty) run of characters, e.g.
//! `rock-*` or `ore-*-copper-granite`. The text matched by the first `*` is the
//! pattern's *wildcard value*, used to carry a mother rock's variant into
//! dependent block codes.

/// Returns `true` if `code` matches `pattern`.
pub fn matches(pattern: &str, code: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return code.is_empty();
    };
    let Some(mut rest) = code.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        // No wildcard at all.
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

/// Returns the text captured by the first `*` of `pattern`, or `None` if the
/// pattern has no wildcard or does not match.
pub fn wildcard_value<'a>(pattern: &str, code: &'a str) -> Option<&'a str> {
    let (prefix, remainder) = pattern.split_once('*')?;
    let tail = code.strip_prefix(prefix)?;

    // Shortest capture that lets the remainder of the pattern match.
    tail.char_indices()
        .map(|(at, _)| at)
        .chain(std::iter::once(tail.len()))
        .find(|&end| matches(remainder, &tail[end..]))
        .map(|end| &tail[..end])
}

/// Returns `true` if `code` matches `pattern` and its wildcard value is one of
/// `allowed`.
pub fn matches_with_variants(pattern: &str, code: &str, allowed: &[String]) -> bool {
    matches(pattern, code)
        && wildcard_value(pattern, code).is_some_and(|value| allowed.iter().any(|a| a == value))
}
