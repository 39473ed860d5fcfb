//! Dotted document paths.
//!
//! This module provides [`DocPath`] and [`PathSegment`] for addressing values
//! inside a live document. Paths render with dots only (`users.0.email`), which
//! is also the key format of the validator registry.

use std::fmt::{self, Display};

/// A segment of a document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A keyed property (e.g. `user`, `email`)
    Field(String),
    /// A position inside an ordered collection
    Index(usize),
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::Field(name.into())
    }

    pub fn index(position: usize) -> Self {
        PathSegment::Index(position)
    }

    /// Parses one dotted component. All-digit components become indices.
    fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(idx) = raw.parse::<usize>() {
                return PathSegment::Index(idx);
            }
        }
        PathSegment::Field(raw.to_string())
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(idx) => write!(f, "{}", idx),
        }
    }
}

/// A path to a node or value inside a document.
///
/// # Example
///
/// ```rust
/// use livedoc::DocPath;
///
/// let path = DocPath::root()
///     .push_field("users")
///     .push_index(0)
///     .push_field("email");
///
/// assert_eq!(path.to_string(), "users.0.email");
/// assert_eq!(DocPath::parse("users.0.email"), path);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocPath {
    segments: Vec<PathSegment>,
}

impl DocPath {
    /// Creates an empty path representing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path. Empty components are dropped, so `a..b` and
    /// `.a.b` both normalize to `a.b`.
    pub fn parse(dotted: &str) -> Self {
        Self {
            segments: dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(PathSegment::parse)
                .collect(),
        }
    }

    /// A child path one keyed property deeper.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        self.with(PathSegment::Field(name.into()))
    }

    /// A child path one position deeper.
    pub fn push_index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut child = self.clone();
        child.segments.push(segment);
        child
    }

    /// Returns a new path with every component of a dotted key appended.
    ///
    /// ```rust
    /// use livedoc::DocPath;
    ///
    /// let base = DocPath::parse("a");
    /// assert_eq!(base.join("b.c").to_string(), "a.b.c");
    /// ```
    pub fn join(&self, dotted: &str) -> Self {
        let mut joined = self.clone();
        joined.segments.extend(DocPath::parse(dotted).segments);
        joined
    }

    /// The document root has no segments and renders as `""`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Depth of the path; the root has depth 0.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// The enclosing path. The root has none.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Returns true if `prefix` addresses this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &DocPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<&str> for DocPath {
    fn from(dotted: &str) -> Self {
        DocPath::parse(dotted)
    }
}

/// Splits a dotted key into its first component and the remainder.
///
/// Returns `None` for keys without a dot.
pub(crate) fn split_head(key: &str) -> Option<(&str, &str)> {
    let (head, rest) = key.split_once('.')?;
    if head.is_empty() || rest.is_empty() {
        None
    } else {
        Some((head, rest))
    }
}

/// Returns the final component of a dotted key, the part used for signature lookup.
pub(crate) fn final_segment(key: &str) -> &str {
    key.rsplit('.').find(|s| !s.is_empty()).unwrap_or(key)
}
