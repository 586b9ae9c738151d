//! File discovery: resolving the concrete file set for a project.
//!
//! Two modes, chosen by whether the project has a `_toc.yml`:
//!
//! - **TOC-driven**: each flattened TOC entry is probed against the base
//!   directory as `{file}.org`, `{file}.md`, `{file}.ipynb`, then the literal
//!   `{file}` path; the first existing file wins and entries resolving to
//!   nothing are skipped. Order is TOC order.
//! - **Scan-driven**: a recursive walk of the base directory collecting files
//!   with the project's base extension, minus `exclude` glob matches, plus
//!   `include` glob matches. Order is the sorted walk order.
//!
//! A missing base directory is a hard error — there is nothing sensible to
//! publish and continuing would silently produce an empty site.

use crate::config::Project;
use crate::toc::FlatTocEntry;
use glob::Pattern;
use log::warn;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("base directory does not exist: {0}")]
    BaseDirectoryMissing(PathBuf),
    #[error("invalid glob pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// One file to publish: its on-disk path, its path relative to the base
/// directory, and the TOC entry it resolved from (TOC-driven mode only).
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub rel_path: PathBuf,
    pub toc_entry: Option<FlatTocEntry>,
}

/// Extensions probed for a TOC file key, in priority order.
const TOC_PROBE_EXTENSIONS: &[&str] = &["org", "md", "ipynb"];

/// Resolve the project's file set. `toc` selects TOC-driven mode.
pub fn discover_files(
    project: &Project,
    base_dir: &Path,
    toc: Option<&[FlatTocEntry]>,
) -> Result<Vec<DiscoveredFile>, DiscoverError> {
    match toc {
        Some(entries) => Ok(discover_from_toc(base_dir, entries)),
        None => discover_by_scan(project, base_dir),
    }
}

fn discover_from_toc(base_dir: &Path, entries: &[FlatTocEntry]) -> Vec<DiscoveredFile> {
    let mut files = Vec::new();
    for entry in entries {
        match probe_toc_file(base_dir, &entry.file) {
            Some(rel_path) => files.push(DiscoveredFile {
                path: base_dir.join(&rel_path),
                rel_path,
                toc_entry: Some(entry.clone()),
            }),
            None => warn!("toc entry '{}' resolved to no file, skipped", entry.file),
        }
    }
    files
}

/// Probe `{file}.org`, `.md`, `.ipynb`, then the literal path.
fn probe_toc_file(base_dir: &Path, file_key: &str) -> Option<PathBuf> {
    for ext in TOC_PROBE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{}", file_key, ext));
        if base_dir.join(&candidate).is_file() {
            return Some(candidate);
        }
    }
    let literal = PathBuf::from(file_key);
    base_dir.join(&literal).is_file().then_some(literal)
}

fn discover_by_scan(project: &Project, base_dir: &Path) -> Result<Vec<DiscoveredFile>, DiscoverError> {
    if !base_dir.is_dir() {
        return Err(DiscoverError::BaseDirectoryMissing(base_dir.to_path_buf()));
    }

    let exclude = project
        .exclude
        .as_deref()
        .map(|p| compile_pattern(p))
        .transpose()?;

    let max_depth = if project.recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    let walker = WalkDir::new(base_dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            // The walk root itself always passes; filtering applies to its
            // contents.
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                return false;
            }
            let rel = entry.path().strip_prefix(base_dir).unwrap_or(entry.path());
            !matches_exclude(exclude.as_ref(), rel, &name)
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            std::io::Error::other(format!("walk failed under {}: {}", base_dir.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches_ext = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy() == project.base_extension)
            .unwrap_or(false);
        if matches_ext {
            let rel_path = entry
                .path()
                .strip_prefix(base_dir)
                .unwrap_or(entry.path())
                .to_path_buf();
            if seen.insert(rel_path.clone()) {
                found.push(DiscoveredFile {
                    path: entry.path().to_path_buf(),
                    rel_path,
                    toc_entry: None,
                });
            }
        }
    }

    // Union in include-glob matches not already discovered.
    for pattern_text in &project.include {
        let pattern = compile_pattern(pattern_text)?;
        for entry in WalkDir::new(base_dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("walk failed under {}: {}", base_dir.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel_path = entry
                .path()
                .strip_prefix(base_dir)
                .unwrap_or(entry.path())
                .to_path_buf();
            if pattern.matches_path(&rel_path) && seen.insert(rel_path.clone()) {
                found.push(DiscoveredFile {
                    path: entry.path().to_path_buf(),
                    rel_path,
                    toc_entry: None,
                });
            }
        }
    }

    Ok(found)
}

fn compile_pattern(text: &str) -> Result<Pattern, DiscoverError> {
    Pattern::new(text).map_err(|source| DiscoverError::BadPattern {
        pattern: text.to_string(),
        source,
    })
}

/// Exclude matches against the relative path or the basename, so both
/// `drafts/*` and `*.draft.org` style patterns behave as expected.
fn matches_exclude(exclude: Option<&Pattern>, rel: &Path, name: &str) -> bool {
    let Some(pattern) = exclude else {
        return false;
    };
    pattern.matches_path(rel) || pattern.matches(name)
}
