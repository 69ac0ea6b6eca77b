//! Line table over the analyzed source text.

/// The analyzed source split into 1-indexed lines.
///
/// Used to attach a human-readable snippet to every finding. Lookups outside
/// the table return an empty string instead of failing, since synthetic or
/// end-of-file positions are common.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    lines: Vec<String>,
}

impl SourceIndex {
    /// Build the line table for `source`.
    pub fn new(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
        }
    }

    /// Trimmed text of line `n` (1-based), or `""` when out of range.
    pub fn line(&self, n: usize) -> &str {
        if n == 0 {
            return "";
        }
        self.lines.get(n - 1).map(|l| l.trim()).unwrap_or("")
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
