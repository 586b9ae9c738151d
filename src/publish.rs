//! Per-file publishing: incremental gate, format dispatch, converters.
//!
//! Every source file flows through the same steps: compute the output path
//! (base-relative subpath under the publishing directory, source extension
//! rewritten to `.html`), consult the up-to-date gate, route to a converter
//! by [`SourceFormat`], write the result. Failures are contained per file —
//! a bad document produces a failed [`PublishFileResult`] and the run moves
//! on.
//!
//! ## Up-to-date gate
//!
//! A file is skipped when its output's mtime is strictly newer than the
//! source's. Skips are successes carrying no title/date (nothing was parsed).
//! `force` bypasses the gate; `dry_run` suppresses writes but still reads and
//! converts, so it exercises the full pipeline safely.
//!
//! ## Dispatch
//!
//! The publishing-function setting resolves to a closed [`SourceFormat`] at
//! a single match point: `copy` always copies, the explicit `md-html-*` /
//! `ipynb-html-*` settings force their converter, and `auto` /
//! `org-html-publish-to-html` infer from the extension (unknown extensions
//! copy verbatim).

use crate::config::{Project, PublishingFunction};
use crate::discover::DiscoveredFile;
use crate::toc::FlatTocEntry;
use crate::{markdown, notebook, org};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum `#+INCLUDE` nesting before expansion gives up.
pub const MAX_INCLUDE_DEPTH: usize = 10;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("org error: {0}")]
    Org(#[from] org::OrgError),
    #[error("notebook error: {0}")]
    Notebook(#[from] notebook::NotebookError),
}

/// Outcome of publishing a single file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishFileResult {
    pub source_path: String,
    pub output_path: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Run-wide publish switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    /// Bypass the up-to-date gate.
    pub force: bool,
    /// Read and convert, but never write.
    pub dry_run: bool,
}

/// Progress callback: `(current, total, filename)`, invoked before each
/// file's work begins.
pub type ProgressFn<'a> = &'a dyn Fn(usize, usize, &str);

/// Converter selected for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Org,
    Markdown,
    Notebook,
    Copy,
}

/// Resolve the converter for a file. The only dispatch point.
pub fn resolve_format(function: PublishingFunction, path: &Path) -> SourceFormat {
    match function {
        PublishingFunction::Copy => SourceFormat::Copy,
        PublishingFunction::MarkdownToHtml => SourceFormat::Markdown,
        PublishingFunction::NotebookToHtml => SourceFormat::Notebook,
        PublishingFunction::Auto | PublishingFunction::OrgToHtml => infer_format(path),
    }
}

fn infer_format(path: &Path) -> SourceFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("org") => SourceFormat::Org,
        Some("md") => SourceFormat::Markdown,
        Some("ipynb") => SourceFormat::Notebook,
        _ => SourceFormat::Copy,
    }
}

/// Output path for a source file: base-relative subpath under the publishing
/// directory, with `.org`/`.md`/`.ipynb` rewritten to `.html`.
pub fn compute_output_path(base_dir: &Path, publishing_dir: &Path, source: &Path) -> PathBuf {
    let rel = source.strip_prefix(base_dir).unwrap_or(source);
    publishing_dir.join(rewrite_extension(rel))
}

pub(crate) fn rewrite_extension(rel: &Path) -> PathBuf {
    match rel.extension().and_then(|e| e.to_str()) {
        Some("org" | "md" | "ipynb") => rel.with_extension("html"),
        _ => rel.to_path_buf(),
    }
}

/// Whether `output` is strictly newer than `source`. Any stat failure means
/// "not up to date".
pub fn is_up_to_date(source: &Path, output: &Path) -> bool {
    let newer = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (newer(source), newer(output)) {
        (Some(src), Some(out)) => out > src,
        _ => false,
    }
}

/// Everything a single file's publish step needs from its project.
pub struct FileContext<'a> {
    pub project: &'a Project,
    /// Resolved base directory on disk.
    pub base_dir: &'a Path,
    /// Resolved publishing directory on disk.
    pub output_dir: &'a Path,
    pub options: PublishOptions,
}

/// Publish one discovered file. Never fails: conversion errors land in the
/// result's `error` field.
pub fn publish_file(ctx: &FileContext, file: &DiscoveredFile) -> PublishFileResult {
    let output_path = ctx.output_dir.join(rewrite_extension(&file.rel_path));
    let mut result = PublishFileResult {
        source_path: file.path.to_string_lossy().into_owned(),
        output_path: output_path.to_string_lossy().into_owned(),
        success: true,
        error: None,
        title: None,
        date: None,
    };
    match publish_file_inner(ctx, file, &output_path) {
        Ok(published) => {
            result.title = published.title;
            result.date = published.date;
        }
        Err(e) => {
            result.success = false;
            result.error = Some(e.to_string());
        }
    }
    result
}

/// Metadata from a completed (non-skipped) publish step.
#[derive(Debug, Default)]
struct Published {
    title: Option<String>,
    date: Option<String>,
}

fn publish_file_inner(
    ctx: &FileContext,
    file: &DiscoveredFile,
    output_path: &Path,
) -> Result<Published, PublishError> {
    if !ctx.options.force && is_up_to_date(&file.path, output_path) {
        debug!("up to date, skipping {}", file.path.display());
        return Ok(Published::default());
    }
    match resolve_format(ctx.project.publishing_function, &file.path) {
        SourceFormat::Org => publish_org(ctx, file, output_path),
        SourceFormat::Markdown => publish_markdown(ctx, file, output_path),
        SourceFormat::Notebook => publish_notebook(ctx, file, output_path),
        SourceFormat::Copy => publish_copy(ctx, file, output_path),
    }
}

fn publish_org(
    ctx: &FileContext,
    file: &DiscoveredFile,
    output_path: &Path,
) -> Result<Published, PublishError> {
    let raw = fs::read_to_string(&file.path)?;
    let include_base = file.path.parent().unwrap_or(ctx.base_dir);
    let expanded = if org::has_includes(&raw) {
        org::process_includes(&raw, include_base, MAX_INCLUDE_DEPTH)?
    } else {
        raw
    };
    let doc = org::parse_document(&expanded);

    let title = doc
        .title()
        .map(str::to_string)
        .or_else(|| file.toc_entry.as_ref().and_then(|e| e.title.clone()))
        .or_else(|| file_stem(&file.rel_path));
    let date = doc.date().map(normalize_date);

    let preamble = resolve_amble(ctx.base_dir, ctx.project.html_preamble.as_deref())?;
    let mut postamble =
        resolve_amble(ctx.base_dir, ctx.project.html_postamble.as_deref())?.unwrap_or_default();
    if let Some(entry) = &file.toc_entry {
        postamble.push_str(&prev_next_nav(entry, &file.rel_path));
    }

    let html = org::export_to_html(
        &doc,
        &org::ExportOptions {
            body_only: false,
            with_toc: ctx.project.with_toc,
            section_numbers: ctx.project.section_numbers,
            title: title.clone(),
            preamble,
            postamble: (!postamble.is_empty()).then_some(postamble),
            css_files: ctx.project.css_files.clone(),
            js_files: ctx.project.js_files.clone(),
        },
    );
    write_output(output_path, html.as_bytes(), ctx.options.dry_run)?;
    Ok(Published { title, date })
}

fn publish_markdown(
    ctx: &FileContext,
    file: &DiscoveredFile,
    output_path: &Path,
) -> Result<Published, PublishError> {
    let text = fs::read_to_string(&file.path)?;
    let title = markdown::first_heading(&text)
        .or_else(|| file.toc_entry.as_ref().and_then(|e| e.title.clone()))
        .or_else(|| file_stem(&file.rel_path))
        .unwrap_or_default();
    let html = markdown::convert_standalone(
        &title,
        &text,
        &ctx.project.css_files,
        &ctx.project.js_files,
    );
    write_output(output_path, html.as_bytes(), ctx.options.dry_run)?;
    Ok(Published {
        title: Some(title),
        date: None,
    })
}

fn publish_notebook(
    ctx: &FileContext,
    file: &DiscoveredFile,
    output_path: &Path,
) -> Result<Published, PublishError> {
    let text = fs::read_to_string(&file.path)?;
    let nb = notebook::parse_notebook(&text)?;
    let title = nb
        .title()
        .or_else(|| file.toc_entry.as_ref().and_then(|e| e.title.clone()))
        .or_else(|| file_stem(&file.rel_path))
        .unwrap_or_default();
    let html = notebook::render_standalone(
        &nb,
        &title,
        &ctx.project.css_files,
        &ctx.project.js_files,
    );
    write_output(output_path, html.as_bytes(), ctx.options.dry_run)?;
    Ok(Published {
        title: Some(title),
        date: None,
    })
}

fn publish_copy(
    ctx: &FileContext,
    file: &DiscoveredFile,
    output_path: &Path,
) -> Result<Published, PublishError> {
    if !ctx.options.dry_run {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&file.path, output_path)?;
    }
    Ok(Published::default())
}

/// Write converted output, creating parent directories. A no-op under
/// `dry_run`.
pub fn write_output(path: &Path, content: &[u8], dry_run: bool) -> Result<(), PublishError> {
    if dry_run {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// A preamble/postamble setting is either a path (relative to the base
/// directory) to load, or literal HTML. A path on disk wins.
fn resolve_amble(base_dir: &Path, value: Option<&str>) -> Result<Option<String>, PublishError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let candidate = base_dir.join(value);
    if candidate.is_file() {
        Ok(Some(fs::read_to_string(candidate)?))
    } else {
        Ok(Some(value.to_string()))
    }
}

/// Prev/next navigation appended to the postamble when the file's TOC
/// position is known. Hrefs climb out of the file's subdirectory so file
/// keys resolve from anywhere in the tree.
fn prev_next_nav(entry: &FlatTocEntry, rel_path: &Path) -> String {
    if entry.prev.is_none() && entry.next.is_none() {
        return String::new();
    }
    let up = "../".repeat(rel_path.components().count().saturating_sub(1));
    let mut nav = String::from("<nav class=\"page-nav\">");
    if let Some(prev) = &entry.prev {
        nav.push_str(&format!(
            "<a class=\"nav-prev\" href=\"{}{}.html\">&larr; {}</a>",
            up,
            prev,
            org::escape_html(prev)
        ));
    }
    if let Some(next) = &entry.next {
        nav.push_str(&format!(
            "<a class=\"nav-next\" href=\"{}{}.html\">{} &rarr;</a>",
            up,
            next,
            org::escape_html(next)
        ));
    }
    nav.push_str("</nav>");
    nav
}

fn file_stem(rel_path: &Path) -> Option<String> {
    rel_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}

/// Normalize a `#+DATE` value to ISO `YYYY-MM-DD` when possible. Org
/// timestamps like `<2026-01-15 Thu>` reduce to their date part; anything
/// unparseable passes through as written.
pub fn normalize_date(raw: &str) -> String {
    let cleaned = raw.trim().trim_matches(['<', '>', '[', ']']);
    let first = cleaned.split_whitespace().next().unwrap_or(cleaned);
    match NaiveDate::parse_from_str(first, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => raw.trim().to_string(),
    }
}
