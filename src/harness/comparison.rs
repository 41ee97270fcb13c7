//! Line-sequence comparison of actual and expected output.
//!
//! # Normalization
//!
//! Both sides are split into lines on `\n`. Then:
//!
//! - one trailing `\r` is dropped from every line, so CRLF and LF files compare equal;
//! - a final line terminator is optional: `"a\n"` and `"a"` are the same single line;
//! - blank lines count, including a trailing one: `"a\n\n"` is two lines;
//! - every other byte, trailing spaces and tabs included, must match exactly.
//!
//! Content is compared as bytes. Invalid UTF-8 only matters when it is rendered
//! for a diagnostic, where it is replaced lossily.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::errors::CaseError;

/// Where two line sequences first diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// 1-based line number of the first difference.
    pub line: usize,
    pub expected_lines: usize,
    pub actual_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    Differ(Mismatch),
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        matches!(self, Comparison::Equal)
    }
}

/// Splits content into lines under the normalization policy above.
pub fn normalized_lines(content: &[u8]) -> Vec<&[u8]> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    body.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

/// Compares two contents as whole line sequences.
pub fn compare_bytes(actual: &[u8], expected: &[u8]) -> Comparison {
    let actual = normalized_lines(actual);
    let expected = normalized_lines(expected);

    let first_diff = actual
        .iter()
        .zip(expected.iter())
        .position(|(a, e)| a != e)
        .or_else(|| (actual.len() != expected.len()).then(|| actual.len().min(expected.len())));

    match first_diff {
        None => Comparison::Equal,
        Some(index) => Comparison::Differ(Mismatch {
            line: index + 1,
            expected_lines: expected.len(),
            actual_lines: actual.len(),
        }),
    }
}

/// Reads both artifacts in full and compares them.
pub fn compare_files(actual: &Path, expected: &Path) -> Result<Comparison, CaseError> {
    let expected_content = fs::read(expected).map_err(|e| CaseError::io(expected, e))?;
    let actual_content = fs::read(actual).map_err(|e| CaseError::io(actual, e))?;
    Ok(compare_bytes(&actual_content, &expected_content))
}

/// Lossy, normalized text form of a file for diff rendering.
pub fn display_text(path: &Path) -> Option<String> {
    let content = fs::read(path).ok()?;
    let lines: Vec<_> = normalized_lines(&content)
        .into_iter()
        .map(String::from_utf8_lossy)
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn differ_at(actual: &str, expected: &str) -> Option<usize> {
        match compare_bytes(actual.as_bytes(), expected.as_bytes()) {
            Comparison::Equal => None,
            Comparison::Differ(m) => Some(m.line),
        }
    }

    #[test]
    fn identical_output_passes() {
        assert_eq!(differ_at("x1= 27\nx2= 16\n", "x1= 27\nx2= 16\n"), None);
    }

    #[test]
    fn differing_line_fails() {
        assert_eq!(differ_at("x1= 27\nx2= 16\n", "x1= 27\nx2= 99\n"), Some(2));
    }

    #[test]
    fn extra_expected_line_fails() {
        let result = compare_bytes(b"x1= 27\nx2= 16\n", b"x1= 27\nx2= 16\nx3= 1\n");
        assert_eq!(
            result,
            Comparison::Differ(Mismatch {
                line: 3,
                expected_lines: 3,
                actual_lines: 2,
            })
        );
    }

    #[test]
    fn extra_actual_line_fails() {
        assert_eq!(differ_at("a\nb\n", "a\n"), Some(2));
    }

    #[test]
    fn crlf_equals_lf() {
        assert_eq!(differ_at("a\r\nb\r\n", "a\nb\n"), None);
    }

    #[test]
    fn final_newline_is_optional() {
        assert_eq!(differ_at("a\nb", "a\nb\n"), None);
    }

    #[test]
    fn trailing_blank_line_is_significant() {
        assert_eq!(differ_at("a\n\n", "a\n"), Some(2));
    }

    #[test]
    fn trailing_whitespace_is_significant() {
        assert_eq!(differ_at("a \n", "a\n"), Some(1));
        assert_eq!(differ_at("a\t\n", "a\n"), Some(1));
    }

    #[test]
    fn empty_sides() {
        assert_eq!(differ_at("", ""), None);
        assert_eq!(differ_at("", "a\n"), Some(1));
        assert_eq!(differ_at("\n", ""), Some(1));
    }

    #[test]
    fn single_character_edit_is_detected() {
        assert_eq!(differ_at("x1= 27\n", "x1= 28\n"), Some(1));
    }

    #[test]
    fn invalid_utf8_compares_bytewise() {
        let a = compare_bytes(b"\xff\xfe\n", b"\xff\xfe\n");
        let b = compare_bytes(b"\xff\xfe\n", b"\xff\xfd\n");
        assert!(a.is_equal());
        assert!(!b.is_equal());
    }

    #[test]
    fn missing_expected_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let actual = dir.path().join("out1.txt");
        fs::write(&actual, "x\n").unwrap();
        let err = compare_files(&actual, &dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, CaseError::Io { .. }));
    }
}
