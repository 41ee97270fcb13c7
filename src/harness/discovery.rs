use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::errors::{HarnessError, HarnessResult};
use crate::harness::paths::{NamingScheme, TestId};

/// An input fixture selected for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub id: TestId,
    pub input: PathBuf,
}

/// A file that carries the input marker but does not follow the naming rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFixture {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of scanning a fixture directory.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Sorted by [`TestId`].
    pub fixtures: Vec<Fixture>,
    pub rejected: Vec<RejectedFixture>,
}

/// How a single file name relates to the naming scheme.
#[derive(Debug, PartialEq, Eq)]
pub enum NameMatch {
    /// Not an input fixture at all; skipped without comment.
    Unrelated,
    Fixture(TestId),
    Malformed(String),
}

/// Parses input fixture names of the form `<marker><id>.<ext>`.
///
/// The identifier is everything between the marker and the first `.`; it must be
/// non-empty. The remainder after that `.` must equal the input extension.
#[derive(Debug, Clone)]
pub struct FixtureNameParser {
    marker: String,
    extension: String,
    pattern: Regex,
}

impl FixtureNameParser {
    pub fn new(naming: &NamingScheme) -> HarnessResult<Self> {
        let pattern = format!(
            r"^{}(?P<id>[^.]+)\.(?P<ext>.+)$",
            regex::escape(&naming.input_marker)
        );
        let pattern = Regex::new(&pattern).map_err(|e| {
            HarnessError::config(format!(
                "input marker '{}' cannot be matched: {e}",
                naming.input_marker
            ))
        })?;
        Ok(Self {
            marker: naming.input_marker.clone(),
            extension: naming.input_extension.clone(),
            pattern,
        })
    }

    pub fn classify(&self, file_name: &str) -> NameMatch {
        if !file_name.starts_with(&self.marker) {
            return NameMatch::Unrelated;
        }
        let Some(caps) = self.pattern.captures(file_name) else {
            return NameMatch::Malformed(format!(
                "expected '{}<id>.{}' with a non-empty identifier",
                self.marker, self.extension
            ));
        };
        let ext = &caps["ext"];
        if ext != self.extension {
            return NameMatch::Malformed(format!(
                "extension '{}' does not match input extension '{}'",
                ext, self.extension
            ));
        }
        NameMatch::Fixture(TestId::new(&caps["id"]))
    }
}

/// Lists the input fixtures directly inside `dir`.
///
/// Subdirectories are not searched. A missing or unreadable directory aborts
/// the run; individual unrelated files are skipped.
pub fn discover(dir: &Path, naming: &NamingScheme) -> HarnessResult<Discovery> {
    let discovery_error = |source: io::Error| HarnessError::Discovery {
        dir: dir.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(dir).map_err(discovery_error)?;
    if !metadata.is_dir() {
        return Err(discovery_error(io::Error::new(
            io::ErrorKind::Other,
            "not a directory",
        )));
    }

    let parser = FixtureNameParser::new(naming)?;
    let mut discovery = Discovery::default();

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1);
    for entry in walker {
        let entry = entry.map_err(|e| discovery_error(io::Error::from(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(file_name) = entry.file_name().to_str() else {
            tracing::debug!(path = %path.display(), "skipping non UTF-8 file name");
            continue;
        };
        match parser.classify(file_name) {
            NameMatch::Unrelated => {}
            NameMatch::Fixture(id) => discovery.fixtures.push(Fixture {
                id,
                input: path.to_path_buf(),
            }),
            NameMatch::Malformed(reason) => {
                tracing::warn!(path = %path.display(), %reason, "rejecting fixture");
                discovery.rejected.push(RejectedFixture {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        }
    }

    discovery.fixtures.sort_by(|a, b| a.id.cmp(&b.id));
    discovery.rejected.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(
        dir = %dir.display(),
        fixtures = discovery.fixtures.len(),
        rejected = discovery.rejected.len(),
        "discovery finished"
    );
    Ok(discovery)
}
