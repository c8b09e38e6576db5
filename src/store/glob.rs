//! Glob Pattern Module
//!
//! Translates Redis-style key globs into anchored regular expressions.

use regex::Regex;

use crate::error::{StoreError, StoreResult};

/// A compiled key pattern supporting `*` (any run) and `?` (one character).
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> StoreResult<Self> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|err| StoreError::InvalidValue(format!("pattern '{pattern}': {err}")))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// Builds the regex source for a glob.
///
/// Every character other than `*` and `?` is escaped, so `.`, `+`, `[` and
/// friends only ever match themselves.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?s)^");
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');
    source
}
