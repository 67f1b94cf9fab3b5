//! Source positions carried from syntax nodes into diagnostics.

use std::fmt;

/// Where a syntax node starts, and how many bytes it covers.
///
/// The front end assigns spans; the compiler only copies them onto the
/// nodes it creates and into errors. `Span::default()` marks positions that
/// have no source, such as synthesized nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// 1-based line.
    pub line: u32,
    /// 1-based byte column.
    pub col: u32,
    pub len: u32,
}

impl Span {
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_line_and_column() {
        assert_eq!(Span::new(3, 15, 5).to_string(), "3:15");
        assert_eq!(Span::default().to_string(), "0:0");
    }
}
