//! Routing tokens carried in component and modal identifiers.
//!
//! A custom id is a `#`-joined token list: a handler prefix followed by an
//! action and, optionally, the entity the action applies to, e.g.
//! `embed#refresh#<server-id>`.

use thiserror::Error;

pub const DELIMITER: char = '#';

/// Upper bound the platform enforces on custom id length.
pub const MAX_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomIdError {
    #[error("custom id needs at least one token")]
    Empty,
    #[error("token {0:?} contains the reserved delimiter")]
    ReservedDelimiter(String),
    #[error("custom id is {0} characters long, the limit is {MAX_LEN}")]
    TooLong(usize),
}

pub fn join<I, S>(tokens: I) -> Result<String, CustomIdError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut id = String::new();
    let mut count = 0usize;
    for token in tokens {
        let token = token.as_ref();
        if token.contains(DELIMITER) {
            return Err(CustomIdError::ReservedDelimiter(token.to_string()));
        }
        if count > 0 {
            id.push(DELIMITER);
        }
        id.push_str(token);
        count += 1;
    }
    if count == 0 {
        return Err(CustomIdError::Empty);
    }
    let len = id.chars().count();
    if len > MAX_LEN {
        return Err(CustomIdError::TooLong(len));
    }
    Ok(id)
}

/// True when `id` is exactly `prefix` or continues it at a token boundary.
pub fn matches(id: &str, prefix: &str) -> bool {
    match id.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(DELIMITER),
        None => false,
    }
}

/// Splits off the last token, returning it together with everything before it.
pub fn peek(id: &str) -> (&str, &str) {
    match id.rsplit_once(DELIMITER) {
        Some((rest, last)) => (last, rest),
        None => (id, ""),
    }
}

/// The tokens following `prefix`, or `None` when `id` does not belong to it.
pub fn tail<'a>(id: &'a str, prefix: &str) -> Option<Vec<&'a str>> {
    if !matches(id, prefix) {
        return None;
    }
    let rest = &id[prefix.len()..];
    Some(
        rest.strip_prefix(DELIMITER)
            .map(|r| r.split(DELIMITER).collect())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
#[path = "tests/custom_id_tests.rs"]
mod tests;
