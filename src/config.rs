//! Document options.

/// Default nesting limit for child materialization.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Options applied to a whole document tree.
///
/// # Example
///
/// ```rust
/// use livedoc::DocumentOptions;
///
/// let options = DocumentOptions::default()
///     .with_extensible(true)
///     .with_max_depth(8);
///
/// assert!(options.extensible);
/// assert_eq!(options.max_depth, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Whether the root accepts undeclared keys. A signature's own
    /// `extensible` entry overrides this for its subtree.
    pub extensible: bool,
    /// Deepest path at which a child node may be materialized.
    pub max_depth: usize,
    /// Whether whole-object assignment fills absent fields that declare a `default`.
    pub apply_defaults: bool,
}

impl DocumentOptions {
    /// Sets the inherited extensibility of the root.
    pub fn with_extensible(mut self, extensible: bool) -> Self {
        self.extensible = extensible;
        self
    }

    /// Sets the materialization depth limit.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enables or disables default-value application.
    pub fn with_defaults(mut self, apply: bool) -> Self {
        self.apply_defaults = apply;
        self
    }
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            extensible: false,
            max_depth: DEFAULT_MAX_DEPTH,
            apply_defaults: true,
        }
    }
}
