//! Naming convention and artifact path resolution.
//!
//! Input fixtures are named `<input-marker><id>.<input-ext>`. Both output
//! artifacts share the name `<output-marker><id>.<expected-ext>`: the expected
//! one sits next to the input, the actual one lives in the output directory.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Filename markers and extensions that tie the three artifacts of a case together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pub input_marker: String,
    pub output_marker: String,
    pub input_extension: String,
    pub expected_extension: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            input_marker: "in".to_string(),
            output_marker: "out".to_string(),
            input_extension: "py".to_string(),
            expected_extension: "txt".to_string(),
        }
    }
}

impl NamingScheme {
    /// File name shared by the actual and expected artifacts of `id`.
    pub fn output_file_name(&self, id: &TestId) -> String {
        format!("{}{}.{}", self.output_marker, id, self.expected_extension)
    }
}

/// Identifier of a test case, taken from its input file name.
///
/// Decimal identifiers order numerically (`2` before `10`); anything else orders
/// lexicographically after them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u128> {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            self.0.parse().ok()
        } else {
            None
        }
    }
}

impl Ord for TestId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            // "1" and "01" are numerically equal but still distinct ids.
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TestId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a case's output goes and what it is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub actual: PathBuf,
    pub expected: PathBuf,
}

/// Derives the actual and expected artifact paths of a case. Pure; touches no files.
///
/// Only the file name of `input` is rewritten, so markers appearing in directory
/// names are left alone.
pub fn resolve(
    id: &TestId,
    input: &Path,
    output_dir: &Path,
    naming: &NamingScheme,
) -> ArtifactPaths {
    let file_name = naming.output_file_name(id);
    ArtifactPaths {
        actual: output_dir.join(&file_name),
        expected: input.with_file_name(&file_name),
    }
}
