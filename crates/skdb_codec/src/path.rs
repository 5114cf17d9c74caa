//! Hierarchical variable paths.

use std::fmt;

/// Separator between segments in the textual form of a path.
pub const SEPARATOR: &str = "::";

/// The address of one variable: an ordered sequence of name segments.
///
/// `players::alice::score` is the path `["players", "alice", "score"]`.
/// Paths compare segment by segment. The empty path is the root of the
/// hierarchy and never names a variable itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariablePath(Vec<String>);

impl VariablePath {
    /// Creates a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The empty path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses the `a::b::c` textual form.
    ///
    /// An empty string is the root path. The separator is not escaped, so
    /// a path with a segment containing `::` does not round-trip through
    /// [`Display`](fmt::Display) and `parse`; use [`VariablePath::segments`]
    /// where the exact path matters.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::root();
        }
        Self::new(text.split(SEPARATOR))
    }

    /// The segments of this path, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Whether `self` is `other` or lies under it.
    #[must_use]
    pub fn starts_with(&self, other: &VariablePath) -> bool {
        self.0.starts_with(&other.0)
    }
}

/// Joins the segments with `::`. Lossy when a segment contains `::`.
impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(SEPARATOR))
    }
}

impl<S: Into<String>> FromIterator<S> for VariablePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a VariablePath {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
