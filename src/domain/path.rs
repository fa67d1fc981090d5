//! Positional addressing inside a field's option tree.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Sequence of indices descending from a field's root option list.
///
/// The empty path addresses the root list itself. The first index selects
/// an entry of `Field::options`, every following index selects a child of
/// the group reached so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionPath(Vec<usize>);

impl OptionPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns a new path addressing the `index`-th child of this one.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Splits the path into the parent container path and the final index.
    pub fn split_last(&self) -> Option<(OptionPath, usize)> {
        let (last, parent) = self.0.split_last()?;
        Some((OptionPath(parent.to_vec()), *last))
    }
}

impl From<Vec<usize>> for OptionPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for OptionPath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for OptionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        let parts: Vec<String> = self.0.iter().map(|idx| idx.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParseError(pub String);

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid option path `{}` (use `.` or e.g. `0.2.1`)", self.0)
    }
}

impl std::error::Error for PathParseError {}

impl FromStr for OptionPath {
    type Err = PathParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "." || trimmed == "root" {
            return Ok(Self::root());
        }
        trimmed
            .split('.')
            .map(|segment| segment.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| PathParseError(input.to_string()))
    }
}
