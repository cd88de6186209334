// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Project root discovery.
//!
//! The auto-instrumentation sweep decides whether a class "belongs to the
//! project" by comparing its defining file against the project root: the
//! nearest ancestor directory containing a recognized marker. The sweep
//! itself lives outside this crate; this is the heuristic it consumes.

use camino::{Utf8Path, Utf8PathBuf};

/// Project marker files/directories, in priority order.
const PROJECT_MARKERS: &[&str] = &["ivarcheck.toml", ".git"];

/// Discover the project root by walking up the directory tree.
///
/// Starts at `start_dir` and returns the first ancestor containing a
/// recognized project marker, or `start_dir` if no marker is found.
#[must_use]
pub fn discover_project_root(start_dir: &Utf8Path) -> Utf8PathBuf {
    let mut current = start_dir.to_path_buf();
    loop {
        for marker in PROJECT_MARKERS {
            if current.join(marker).as_std_path().exists() {
                return current;
            }
        }
        if !current.pop() {
            break;
        }
    }
    start_dir.to_path_buf()
}

/// Returns true when `path` sits under the project root discovered from
/// its own parent directory.
#[must_use]
pub fn belongs_to_project(path: &Utf8Path, project_root: &Utf8Path) -> bool {
    path.starts_with(project_root)
}
