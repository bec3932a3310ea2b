//! Path predicate applied to records before they are dispatched.

use regex::Regex;

use crate::error::{RestoreError, RestoreResult};

/// Compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathFilter {
    regex: Regex,
}

impl PathFilter {
    /// Compile the operator-supplied pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::InvalidPattern`] when the pattern is not a valid
    /// regular expression.
    pub fn compile(pattern: &str) -> RestoreResult<Self> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|source| RestoreError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Unanchored search: the pattern may match anywhere in the path.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}
