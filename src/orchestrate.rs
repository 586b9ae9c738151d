//! Multi-project orchestration.
//!
//! Resolves the publish order across named projects (component projects
//! expand depth-first to their members and are never published themselves),
//! runs each project through the plain or themed pipeline, regenerates
//! sitemaps, and finishes with GitHub-Pages-specific output.
//!
//! Everything runs strictly sequentially: files within a project, projects
//! within the run. The progress callback fires before each file's work
//! begins. `dry_run` reads and converts but never writes, so it is a safe
//! simulation of a full run.

use crate::config::{Config, Project, ProjectEntry, ThemeSettings};
use crate::discover::{self, DiscoveredFile};
use crate::publish::{
    self, FileContext, MAX_INCLUDE_DEPTH, PublishError, PublishFileResult, PublishOptions,
    ProgressFn, SourceFormat,
};
use crate::sitemap::{self, SitemapEntry};
use crate::theme::{self, PageContext, PageInfo, ProjectContext, Theme, ThemeRegistry};
use crate::toc::{self, FlatTocEntry};
use crate::{config, markdown, notebook, org};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestrateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("toc error: {0}")]
    Toc(#[from] toc::TocError),
    #[error("discovery error: {0}")]
    Discover(#[from] discover::DiscoverError),
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
    #[error("unknown project '{0}'")]
    UnknownProject(String),
    #[error("theme '{0}' requires a _toc.yml in the base directory")]
    ThemeRequiresToc(String),
}

/// Aggregated outcome of one project's publish run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishProjectResult {
    pub project_name: String,
    pub files: Vec<PublishFileResult>,
    pub total_files: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Run-wide switches for a workspace publish.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    pub force: bool,
    pub dry_run: bool,
    /// Publish only this project (or component). Without it, the configured
    /// default project is used, falling back to every project.
    pub project: Option<String>,
}

// =============================================================================
// Publish order
// =============================================================================

/// Depth-first publish order over the given root entries. Components expand
/// to their members before themselves and never enter the order; the
/// name-keyed visited set makes reference cycles terminate (the cyclic edge
/// is dropped).
pub fn resolve_publish_order(config: &Config, roots: &[String]) -> Vec<String> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    for name in roots {
        visit(config, name, &mut order, &mut visited, &mut stack);
    }
    order
}

fn visit(
    config: &Config,
    name: &str,
    order: &mut Vec<String>,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
) {
    if stack.iter().any(|n| n == name) {
        warn!("component cycle involving '{}' dropped from publish order", name);
        return;
    }
    if !visited.insert(name.to_string()) {
        return;
    }
    match config.projects.get(name) {
        Some(ProjectEntry::Component(component)) => {
            stack.push(name.to_string());
            for member in &component.components {
                visit(config, member, order, visited, stack);
            }
            stack.pop();
        }
        Some(ProjectEntry::Project(_)) => order.push(name.to_string()),
        None => debug!("publish order skips unknown project '{}'", name),
    }
}

// =============================================================================
// Workspace publishing
// =============================================================================

/// Publish a workspace: resolve the project order, run each project, then
/// write GitHub Pages artifacts if configured.
pub fn publish_workspace(
    config: &Config,
    workspace_root: &Path,
    registry: &ThemeRegistry,
    options: &WorkspaceOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<PublishProjectResult>, OrchestrateError> {
    let roots: Vec<String> = match &options.project {
        Some(name) => {
            if !config.projects.contains_key(name) {
                return Err(OrchestrateError::UnknownProject(name.clone()));
            }
            vec![name.clone()]
        }
        None => match &config.default_project {
            Some(default) if config.projects.contains_key(default) => vec![default.clone()],
            _ => config.projects.keys().cloned().collect(),
        },
    };

    let order = resolve_publish_order(config, &roots);
    let mut results = Vec::with_capacity(order.len());
    for name in &order {
        let project = config
            .project(name)
            .ok_or_else(|| OrchestrateError::UnknownProject(name.clone()))?;
        results.push(publish_project(
            config,
            &project,
            workspace_root,
            registry,
            options,
            progress,
        )?);
    }

    if config.github_pages && !options.dry_run {
        write_github_pages_artifacts(config, workspace_root, &order)?;
    }

    Ok(results)
}

/// Publish one project, dispatching to the plain or themed pipeline.
pub fn publish_project(
    config: &Config,
    project: &Project,
    workspace_root: &Path,
    registry: &ThemeRegistry,
    options: &WorkspaceOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<PublishProjectResult, OrchestrateError> {
    let start = Instant::now();
    let base_dir = workspace_root.join(&project.base_directory);
    let output_dir = workspace_root.join(&project.publishing_directory);

    let toc_config = toc::load_toc(&base_dir)?;
    let flat = toc_config.as_ref().map(toc::flatten);
    let files = discover::discover_files(project, &base_dir, flat.as_deref())?;

    let publish_options = PublishOptions {
        force: options.force,
        dry_run: options.dry_run,
    };

    let themed = config
        .theme
        .as_ref()
        .is_some_and(|t| t.name != "default");

    let results = if themed {
        let settings = config.theme.clone().unwrap_or_default();
        let flat = flat
            .as_deref()
            .ok_or_else(|| OrchestrateError::ThemeRequiresToc(settings.name.clone()))?;
        let theme = registry.get(&settings.name);
        themed_run(
            project,
            theme,
            &settings,
            &base_dir,
            &output_dir,
            &files,
            flat,
            publish_options,
            progress,
        )?
    } else {
        plain_run(
            project,
            &base_dir,
            &output_dir,
            &files,
            flat.as_deref(),
            publish_options,
            progress,
        )?
    };

    let success_count = results.iter().filter(|r| r.success).count();
    Ok(PublishProjectResult {
        project_name: project.name.clone(),
        total_files: results.len(),
        success_count,
        error_count: results.len() - success_count,
        duration_ms: start.elapsed().as_millis() as u64,
        files: results,
    })
}

fn plain_run(
    project: &Project,
    base_dir: &Path,
    output_dir: &Path,
    files: &[DiscoveredFile],
    flat: Option<&[FlatTocEntry]>,
    options: PublishOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<PublishFileResult>, OrchestrateError> {
    let ctx = FileContext {
        project,
        base_dir,
        output_dir,
        options,
    };
    let total = files.len();
    let mut results = Vec::with_capacity(total);
    for (i, file) in files.iter().enumerate() {
        if let Some(callback) = progress {
            callback(i + 1, total, &file.rel_path.to_string_lossy());
        }
        results.push(publish::publish_file(&ctx, file));
    }

    if project.auto_sitemap {
        if let Some(result) = publish_sitemap(project, base_dir, output_dir, files, flat, &results, options)? {
            results.push(result);
        }
    }

    Ok(results)
}

/// Generate the sitemap source into the base directory, then republish it
/// with `force` so the gate never skips it. Under `dry_run` nothing is
/// written, so there is nothing to republish.
fn publish_sitemap(
    project: &Project,
    base_dir: &Path,
    output_dir: &Path,
    files: &[DiscoveredFile],
    flat: Option<&[FlatTocEntry]>,
    results: &[PublishFileResult],
    options: PublishOptions,
) -> Result<Option<PublishFileResult>, OrchestrateError> {
    let document = match flat {
        Some(flat) => {
            let titles = published_titles(files, results);
            sitemap::toc_sitemap_document(&project.sitemap_title, flat, &titles)
        }
        None => {
            let entries = sitemap_entries(files, results);
            sitemap::auto_sitemap_document(
                &project.sitemap_title,
                &entries,
                project.sitemap_style,
                project.sitemap_sort_files,
            )
        }
    };

    if options.dry_run {
        debug!("dry run: sitemap {} not written", project.sitemap_filename);
        return Ok(None);
    }

    let sitemap_path = base_dir.join(&project.sitemap_filename);
    fs::write(&sitemap_path, document)?;

    let ctx = FileContext {
        project,
        base_dir,
        output_dir,
        options: PublishOptions {
            force: true,
            dry_run: options.dry_run,
        },
    };
    let file = DiscoveredFile {
        path: sitemap_path,
        rel_path: PathBuf::from(&project.sitemap_filename),
        toc_entry: None,
    };
    Ok(Some(publish::publish_file(&ctx, &file)))
}

/// Titles discovered while publishing, keyed by TOC file key.
fn published_titles(
    files: &[DiscoveredFile],
    results: &[PublishFileResult],
) -> HashMap<String, String> {
    files
        .iter()
        .zip(results)
        .filter_map(|(file, result)| {
            let entry = file.toc_entry.as_ref()?;
            let title = result.title.clone()?;
            Some((entry.file.clone(), title))
        })
        .collect()
}

/// Successfully published files as auto-sitemap entries.
fn sitemap_entries(files: &[DiscoveredFile], results: &[PublishFileResult]) -> Vec<SitemapEntry> {
    files
        .iter()
        .zip(results)
        .filter(|(_, result)| result.success)
        .map(|(file, result)| SitemapEntry {
            relative_path: file.rel_path.to_string_lossy().replace('\\', "/"),
            title: result.title.clone(),
            date: result.date.clone(),
        })
        .collect()
}

// =============================================================================
// Themed pipeline
// =============================================================================

#[allow(clippy::too_many_arguments)]
fn themed_run(
    project: &Project,
    theme: &dyn Theme,
    settings: &ThemeSettings,
    base_dir: &Path,
    output_dir: &Path,
    files: &[DiscoveredFile],
    flat: &[FlatTocEntry],
    options: PublishOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<PublishFileResult>, OrchestrateError> {
    if !options.dry_run {
        theme.copy_assets(output_dir)?;
    }

    let collect_text = settings.search && theme.supports_search();
    let total = files.len();
    let mut results = Vec::with_capacity(total);
    let mut pages: Vec<PageInfo> = Vec::new();

    for (i, file) in files.iter().enumerate() {
        if let Some(callback) = progress {
            callback(i + 1, total, &file.rel_path.to_string_lossy());
        }
        results.push(themed_file(
            project,
            theme,
            settings,
            base_dir,
            output_dir,
            file,
            flat,
            options,
            collect_text,
            &mut pages,
        ));
    }

    if collect_text && !options.dry_run {
        theme.generate_search_index(&pages, output_dir)?;
    }

    Ok(results)
}

/// Publish one file through the theme. Same per-file failure boundary as
/// the plain pipeline. When the search index needs page text, up-to-date
/// files are still converted (but not rewritten) so the index stays whole.
#[allow(clippy::too_many_arguments)]
fn themed_file(
    project: &Project,
    theme: &dyn Theme,
    settings: &ThemeSettings,
    base_dir: &Path,
    output_dir: &Path,
    file: &DiscoveredFile,
    flat: &[FlatTocEntry],
    options: PublishOptions,
    collect_text: bool,
    pages: &mut Vec<PageInfo>,
) -> PublishFileResult {
    let output_rel = publish::rewrite_extension(&file.rel_path);
    let output_path = output_dir.join(&output_rel);
    let mut result = PublishFileResult {
        source_path: file.path.to_string_lossy().into_owned(),
        output_path: output_path.to_string_lossy().into_owned(),
        success: true,
        error: None,
        title: None,
        date: None,
    };

    let skip = !options.force && publish::is_up_to_date(&file.path, &output_path);
    let format = publish::resolve_format(project.publishing_function, &file.path);

    if format == SourceFormat::Copy {
        if !skip
            && let Err(e) = copy_verbatim(file, &output_path, options.dry_run)
        {
            result.success = false;
            result.error = Some(e.to_string());
        }
        return result;
    }
    if skip && !collect_text {
        return result;
    }

    match render_themed(
        project, theme, settings, base_dir, file, flat, format, &output_rel,
    ) {
        Ok((html, title, date, text)) => {
            if !skip {
                if let Err(e) = publish::write_output(&output_path, html.as_bytes(), options.dry_run)
                {
                    result.success = false;
                    result.error = Some(e.to_string());
                    return result;
                }
                result.title = title.clone();
                result.date = date;
            }
            if collect_text {
                pages.push(PageInfo {
                    url: output_rel.to_string_lossy().replace('\\', "/"),
                    title: title.unwrap_or_default(),
                    text,
                });
            }
        }
        Err(e) => {
            result.success = false;
            result.error = Some(e.to_string());
        }
    }
    result
}

fn copy_verbatim(
    file: &DiscoveredFile,
    output_path: &Path,
    dry_run: bool,
) -> Result<(), PublishError> {
    if dry_run {
        return Ok(());
    }
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&file.path, output_path)?;
    Ok(())
}

type RenderedPage = (String, Option<String>, Option<String>, String);

/// Convert a source to a body-only fragment and hand it to the theme.
/// Returns `(page html, title, date, stripped text)`.
#[allow(clippy::too_many_arguments)]
fn render_themed(
    project: &Project,
    theme: &dyn Theme,
    settings: &ThemeSettings,
    base_dir: &Path,
    file: &DiscoveredFile,
    flat: &[FlatTocEntry],
    format: SourceFormat,
    output_rel: &Path,
) -> Result<RenderedPage, PublishError> {
    let raw = fs::read_to_string(&file.path)?;
    let (body, title, date) = match format {
        SourceFormat::Org => {
            let include_base = file.path.parent().unwrap_or(base_dir);
            let expanded = if org::has_includes(&raw) {
                org::process_includes(&raw, include_base, MAX_INCLUDE_DEPTH)?
            } else {
                raw
            };
            let doc = org::parse_document(&expanded);
            let title = doc.title().map(str::to_string);
            let date = doc.date().map(publish::normalize_date);
            let body = org::export_to_html(
                &doc,
                &org::ExportOptions {
                    body_only: true,
                    section_numbers: project.section_numbers,
                    ..org::ExportOptions::default()
                },
            );
            (body, title, date)
        }
        SourceFormat::Markdown => {
            let title = markdown::first_heading(&raw);
            (markdown::convert_fragment(&raw), title, None)
        }
        SourceFormat::Notebook => {
            let nb = notebook::parse_notebook(&raw)?;
            let title = nb.title();
            (notebook::render_fragment(&nb), title, None)
        }
        SourceFormat::Copy => unreachable!("copy handled before rendering"),
    };

    let title = title
        .or_else(|| file.toc_entry.as_ref().and_then(|e| e.title.clone()))
        .or_else(|| {
            file.rel_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    let headings = theme::extract_headings(&body, settings.toc_depth);
    let page = PageContext {
        title: &title,
        toc_entry: file.toc_entry.as_ref(),
        headings: &headings,
        output_rel,
    };
    let project_ctx = ProjectContext {
        name: &project.name,
        title: site_title(project),
        toc: flat,
        css_files: &project.css_files,
        js_files: &project.js_files,
        toc_depth: settings.toc_depth,
    };
    let html = theme.render_page(&body, &page, &project_ctx);
    let text = theme::strip_html(&body);
    Ok((html, Some(title), date, text))
}

/// Site title shown by themes: the sitemap title when customized, else the
/// project name.
fn site_title(project: &Project) -> &str {
    if project.sitemap_title == "Sitemap" {
        &project.name
    } else {
        &project.sitemap_title
    }
}

// =============================================================================
// GitHub Pages output
// =============================================================================

/// Write `.nojekyll` (and `CNAME` when a custom domain is set) into the
/// first ordered project's publishing directory.
fn write_github_pages_artifacts(
    config: &Config,
    workspace_root: &Path,
    order: &[String],
) -> Result<(), OrchestrateError> {
    let Some(first) = order.first().and_then(|name| config.project(name)) else {
        return Ok(());
    };
    let output_dir = workspace_root.join(&first.publishing_directory);
    fs::create_dir_all(&output_dir)?;
    fs::write(output_dir.join(".nojekyll"), "")?;
    if let Some(domain) = &config.custom_domain {
        fs::write(output_dir.join("CNAME"), format!("{}\n", domain))?;
    }
    Ok(())
}
