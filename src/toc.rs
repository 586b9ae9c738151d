//! Table-of-contents model, parsing, and flattening.
//!
//! `_toc.yml` declares the document hierarchy in the Jupyter-Book shape: a
//! single `root` document, then either `parts` (captioned groups of
//! chapters) or a bare `chapters` list, with arbitrarily nested `sections`.
//! The TOC drives both file discovery order and page prev/next navigation.
//!
//! Flattening turns the tree into an ordered list of [`FlatTocEntry`]
//! records via a pre-order walk: root first (level 0), then each part's
//! chapters (level 1, tagged with the part caption), recursing into
//! sections one level deeper. A second pass links every entry to its
//! literal neighbors in the flattened array. The flat list is built fresh;
//! the parsed tree is never mutated.

use crate::yaml::{self, YamlValue};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] yaml::YamlError),
    #[error("_toc.yml has no root document")]
    MissingRoot,
}

/// One node of the TOC tree. Exactly one of `file`, `url`, or `glob` is
/// normally set; entries without a `file` do not resolve to pages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TocEntry {
    pub file: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub glob: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<TocEntry>,
}

/// A captioned group of chapters.
#[derive(Debug, Clone, Serialize)]
pub struct TocPart {
    pub caption: String,
    pub chapters: Vec<TocEntry>,
}

/// Parsed `_toc.yml`. Either `parts` or `chapters` is populated, not both.
#[derive(Debug, Clone, Serialize)]
pub struct TocConfig {
    pub root: String,
    pub parts: Vec<TocPart>,
    pub chapters: Vec<TocEntry>,
    /// Scalar defaults (e.g. `titlesonly`) carried through untouched.
    pub defaults: Vec<(String, String)>,
}

/// One reachable TOC file, linearized with navigation links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatTocEntry {
    /// File key as written in the TOC (no extension).
    pub file: String,
    pub title: Option<String>,
    /// Caption of the enclosing part, if any.
    pub part: Option<String>,
    /// Nesting depth: root 0, chapters 1, each `sections` level adds 1.
    pub level: usize,
    /// Position in the flattened order.
    pub index: usize,
    /// File key of the preceding entry; `None` on the first.
    pub prev: Option<String>,
    /// File key of the following entry; `None` on the last.
    pub next: Option<String>,
}

/// Load `_toc.yml` from a directory. Absent file is `Ok(None)`.
pub fn load_toc(dir: &Path) -> Result<Option<TocConfig>, TocError> {
    let path = dir.join("_toc.yml");
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = yaml::parse(&content)?;
    parse_toc(&value).map(Some)
}

/// Build a [`TocConfig`] from a parsed YAML tree.
pub fn parse_toc(value: &YamlValue) -> Result<TocConfig, TocError> {
    let root = value
        .get("root")
        .and_then(|v| v.as_str())
        .ok_or(TocError::MissingRoot)?
        .to_string();

    let parts = value
        .get("parts")
        .and_then(|v| v.as_sequence())
        .map(|items| {
            items
                .iter()
                .map(|item| TocPart {
                    caption: item
                        .get("caption")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    chapters: parse_entries(item.get("chapters")),
                })
                .collect()
        })
        .unwrap_or_default();

    let chapters = parse_entries(value.get("chapters"));

    let defaults = value
        .get("defaults")
        .and_then(|v| v.as_mapping())
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(TocConfig {
        root,
        parts,
        chapters,
        defaults,
    })
}

fn parse_entries(value: Option<&YamlValue>) -> Vec<TocEntry> {
    value
        .and_then(|v| v.as_sequence())
        .map(|items| items.iter().map(parse_entry).collect())
        .unwrap_or_default()
}

fn parse_entry(value: &YamlValue) -> TocEntry {
    // A bare scalar chapter line is shorthand for `file: <name>`.
    if let Some(s) = value.as_str() {
        return TocEntry {
            file: Some(s.to_string()),
            ..TocEntry::default()
        };
    }
    let field = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
    TocEntry {
        file: field("file"),
        title: field("title"),
        url: field("url"),
        glob: field("glob"),
        sections: parse_entries(value.get("sections")),
    }
}

/// Flatten a TOC tree into publish order with prev/next links.
pub fn flatten(toc: &TocConfig) -> Vec<FlatTocEntry> {
    let mut flat = Vec::new();
    flat.push(FlatTocEntry {
        file: toc.root.clone(),
        title: None,
        part: None,
        level: 0,
        index: 0,
        prev: None,
        next: None,
    });

    if !toc.parts.is_empty() {
        for part in &toc.parts {
            for chapter in &part.chapters {
                push_entry(chapter, Some(&part.caption), 1, &mut flat);
            }
        }
    } else {
        for chapter in &toc.chapters {
            push_entry(chapter, None, 1, &mut flat);
        }
    }

    // Second pass: literal-neighbor navigation links.
    for i in 0..flat.len() {
        flat[i].index = i;
        flat[i].prev = (i > 0).then(|| flat[i - 1].file.clone());
        flat[i].next = flat.get(i + 1).map(|e| e.file.clone());
    }
    flat
}

fn push_entry(entry: &TocEntry, part: Option<&str>, level: usize, flat: &mut Vec<FlatTocEntry>) {
    match &entry.file {
        Some(file) => flat.push(FlatTocEntry {
            file: file.clone(),
            title: entry.title.clone(),
            part: part.map(str::to_string),
            level,
            index: 0,
            prev: None,
            next: None,
        }),
        None => {
            // url/glob entries are navigation-only, not publishable files.
            debug!("toc entry without file skipped: {:?}", entry.title);
        }
    }
    for section in &entry.sections {
        push_entry(section, part, level + 1, flat);
    }
}
