use rustpython_ast::TextSize;
use std::collections::HashSet;

/// Marker that excludes an import statement from the scan.
pub const IGNORE_PRAGMA: &str = "pragma: no decoupy";

/// Converts parser byte offsets to 1-indexed line numbers.
pub struct LineIndex {
    /// Byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a `TextSize` (byte offset) to a 1-indexed line number.
    pub fn line_index(&self, offset: TextSize) -> usize {
        let offset = offset.to_usize();
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }
}

/// Detects lines carrying `# pragma: no decoupy`.
///
/// Returns the 1-indexed line numbers whose import statements must be skipped.
pub fn get_ignored_lines(source: &str) -> HashSet<usize> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(IGNORE_PRAGMA))
        .map(|(i, _)| i + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pragma_detection() {
        let source = r#"
import os
from pkg import noisy  # pragma: no decoupy

def f():
    import other  # pragma: no decoupy
"#;
        let ignored = get_ignored_lines(source);

        assert!(ignored.contains(&3), "Should detect pragma on line 3");
        assert!(ignored.contains(&6), "Should detect pragma on line 6");
        assert_eq!(ignored.len(), 2, "Should find exactly 2 pragma lines");
    }

    #[test]
    fn test_no_pragmas() {
        let ignored = get_ignored_lines("import os\nimport sys\n");
        assert!(ignored.is_empty(), "Should find no pragma lines");
    }

    #[test]
    fn test_line_index_offsets() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_index(TextSize::from(0)), 1);
        assert_eq!(index.line_index(TextSize::from(2)), 2);
        assert_eq!(index.line_index(TextSize::from(3)), 2);
        assert_eq!(index.line_index(TextSize::from(5)), 3);
        assert_eq!(index.line_index(TextSize::from(6)), 4);
    }
}
