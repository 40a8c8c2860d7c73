use std::fmt;
use std::ops::{Index, IndexMut};

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    level: usize,
}

impl Line {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Add more text at the end of this line.
    pub fn append(&mut self, text: impl fmt::Display) -> &mut Self {
        self.text.push_str(&text.to_string());
        self
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Level {}): {}", self.level, self.text)
    }
}

// ---------------------------------------------------------------------------
// IndentedTextBuilder
// ---------------------------------------------------------------------------

/// Builds structured text where each line carries an indentation level.
#[derive(Debug, Clone)]
pub struct IndentedTextBuilder {
    lines: Vec<Line>,
    spaces_per_tab: usize,
}

impl Default for IndentedTextBuilder {
    fn default() -> Self {
        Self::new(2)
    }
}

impl IndentedTextBuilder {
    pub fn new(spaces_per_tab: usize) -> Self {
        Self {
            lines: Vec::new(),
            spaces_per_tab,
        }
    }

    pub fn spaces_per_tab(&self) -> usize {
        self.spaces_per_tab
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add(&mut self, text: impl fmt::Display, level: usize) -> &mut Self {
        self.lines.push(Line {
            text: text.to_string(),
            level,
        });
        self
    }

    /// The most recently added line.
    pub fn last_mut(&mut self) -> Option<&mut Line> {
        self.lines.last_mut()
    }

    /// Append another builder's lines, shifted `level` tabs to the right.
    pub fn extend_nested(&mut self, other: IndentedTextBuilder, level: usize) -> &mut Self {
        for line in other.lines {
            self.lines.push(Line {
                text: line.text,
                level: line.level + level,
            });
        }
        self
    }

    pub fn build(&self) -> String {
        let mut result = String::new();
        for line in &self.lines {
            let indentation = " ".repeat(line.level * self.spaces_per_tab);
            // Every chunk of a multi-line text keeps the line's indentation.
            for chunk in line.text.split('\n') {
                result.push_str(&indentation);
                result.push_str(chunk);
                result.push('\n');
            }
        }
        result.trim_matches('\n').to_string()
    }
}

impl Index<usize> for IndentedTextBuilder {
    type Output = Line;

    fn index(&self, index: usize) -> &Line {
        &self.lines[index]
    }
}

impl IndexMut<usize> for IndentedTextBuilder {
    fn index_mut(&mut self, index: usize) -> &mut Line {
        &mut self.lines[index]
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

pub fn as_minutes(millis: u64) -> f64 {
    millis as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_indented_lines() {
        let mut printer = IndentedTextBuilder::default();
        printer.add("Job: a", 0).add("Build: 1", 1).add("Status: SUCCESS", 2);
        assert_eq!(printer.build(), "Job: a\n  Build: 1\n    Status: SUCCESS");
        assert_eq!(printer.len(), 3);
        assert_eq!(printer[1].level(), 1);
    }

    #[test]
    fn append_extends_last_line() {
        let mut printer = IndentedTextBuilder::new(4);
        printer.add("Status: ", 1);
        if let Some(line) = printer.last_mut() {
            line.append("FAILURE");
        }
        assert_eq!(printer.build(), "    Status: FAILURE");
    }

    #[test]
    fn multi_line_text_is_indented_per_chunk() {
        let mut printer = IndentedTextBuilder::default();
        printer.add("first\nsecond", 1);
        assert_eq!(printer.build(), "  first\n  second");
    }

    #[test]
    fn nested_builder_is_shifted() {
        let mut inner = IndentedTextBuilder::default();
        inner.add("Test: t1", 0);
        let mut outer = IndentedTextBuilder::default();
        outer.add("Build: 1", 0).extend_nested(inner, 1);
        assert_eq!(outer.build(), "Build: 1\n  Test: t1");
    }

    #[test]
    fn empty_builder_builds_empty_string() {
        assert_eq!(IndentedTextBuilder::default().build(), "");
    }

    #[test]
    fn line_display_shows_level() {
        let mut printer = IndentedTextBuilder::default();
        printer.add("x", 3);
        assert_eq!(printer[0].to_string(), "(Level 3): x");
    }

    #[test]
    fn minutes_from_millis() {
        assert!((as_minutes(90_000) - 1.5).abs() < f64::EPSILON);
    }
}
