//! Theme rendering protocol and the built-in default theme.
//!
//! A theme turns a format-agnostic HTML body into a complete page, given
//! read-only page and project context. Themes also contribute static assets
//! and, optionally, a search index built from the stripped text of every
//! rendered page.
//!
//! Themes live in a [`ThemeRegistry`] the caller constructs and passes in —
//! there is no global registry. Lookup misses fall back to the default
//! theme, so a typo'd theme name still publishes a usable site.
//!
//! ## Rendering contract
//!
//! Themed publishing exports each document as a *body-only* fragment, then
//! hands the theme: the fragment, the page's flattened-TOC position, and the
//! headings extracted from the fragment (up to `toc_depth`, for an in-page
//! sidebar TOC). Navigation is derived from the flattened TOC, which is why
//! themed publishing requires a `_toc.yml`.

use crate::toc::FlatTocEntry;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

/// One heading of a rendered page body.
#[derive(Debug, Clone, PartialEq)]
pub struct PageHeading {
    /// HTML heading level (`<h2>` is 2).
    pub level: usize,
    pub id: String,
    pub text: String,
}

/// Read-only view of the page being rendered.
pub struct PageContext<'a> {
    pub title: &'a str,
    pub toc_entry: Option<&'a FlatTocEntry>,
    pub headings: &'a [PageHeading],
    /// Output path relative to the publishing directory.
    pub output_rel: &'a Path,
}

/// Read-only view of the enclosing project.
pub struct ProjectContext<'a> {
    pub name: &'a str,
    pub title: &'a str,
    pub toc: &'a [FlatTocEntry],
    pub css_files: &'a [String],
    pub js_files: &'a [String],
    pub toc_depth: usize,
}

/// Rendered page record handed to search-index generation.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    /// Tag-stripped text of the rendered body.
    pub text: String,
}

/// Full-page renderer plus asset and search-index contributor.
pub trait Theme {
    fn name(&self) -> &str;

    /// Wrap a body fragment into a complete themed page.
    fn render_page(&self, body: &str, page: &PageContext, project: &ProjectContext) -> String;

    /// Write the theme's static assets into the output directory.
    fn copy_assets(&self, _output_dir: &Path) -> io::Result<()> {
        Ok(())
    }

    /// Whether [`Theme::generate_search_index`] does anything.
    fn supports_search(&self) -> bool {
        false
    }

    /// Build a search index from every rendered page.
    fn generate_search_index(&self, _pages: &[PageInfo], _output_dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Name→theme map constructed by the caller. Lookup misses return the
/// default theme.
pub struct ThemeRegistry {
    themes: HashMap<String, Box<dyn Theme>>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            themes: HashMap::new(),
        };
        registry.register(Box::new(DefaultTheme));
        registry
    }

    pub fn register(&mut self, theme: Box<dyn Theme>) {
        self.themes.insert(theme.name().to_string(), theme);
    }

    /// Look up a theme by name, falling back to the default theme.
    pub fn get(&self, name: &str) -> &dyn Theme {
        self.themes
            .get(name)
            .or_else(|| self.themes.get(DefaultTheme.name()))
            .expect("default theme is always registered")
            .as_ref()
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Default theme
// =============================================================================

const THEME_CSS: &str = include_str!("../static/theme.css");
const THEME_CSS_FILENAME: &str = "theme.css";
const SEARCH_INDEX_FILENAME: &str = "search-index.json";

/// Built-in theme: sidebar navigation from the flattened TOC, content
/// column, right-hand in-page TOC, prev/next footer.
pub struct DefaultTheme;

impl Theme for DefaultTheme {
    fn name(&self) -> &str {
        "default"
    }

    fn render_page(&self, body: &str, page: &PageContext, project: &ProjectContext) -> String {
        let prefix = relative_prefix(page.output_rel);
        let nav = site_nav(project, page, &prefix);
        let page_toc = page_toc(page.headings, project.toc_depth);
        let footer = footer_nav(page.toc_entry, &prefix);

        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (page.title) " - " (project.title) }
                    link rel="stylesheet" href={ (prefix) (THEME_CSS_FILENAME) };
                    @for css in project.css_files {
                        link rel="stylesheet" href=(css);
                    }
                }
                body {
                    (nav)
                    main.page-content {
                        (PreEscaped(body))
                        (footer)
                    }
                    (page_toc)
                    @for js in project.js_files {
                        script src=(js) {}
                    }
                }
            }
        }
        .into_string()
    }

    fn copy_assets(&self, output_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(output_dir)?;
        fs::write(output_dir.join(THEME_CSS_FILENAME), THEME_CSS)
    }

    fn supports_search(&self) -> bool {
        true
    }

    fn generate_search_index(&self, pages: &[PageInfo], output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(pages)
            .map_err(|e| io::Error::other(e.to_string()))?;
        fs::create_dir_all(output_dir)?;
        fs::write(output_dir.join(SEARCH_INDEX_FILENAME), json)
    }
}

/// One sidebar row: an optional part caption opening a group, the entry,
/// and its computed class list.
struct NavRow<'a> {
    caption: Option<&'a str>,
    entry: &'a FlatTocEntry,
    class: String,
}

fn nav_rows<'a>(toc: &'a [FlatTocEntry], current: Option<&str>) -> Vec<NavRow<'a>> {
    let mut rows = Vec::with_capacity(toc.len());
    let mut last_part: Option<&str> = None;
    for entry in toc {
        let caption = if entry.part.as_deref() != last_part {
            last_part = entry.part.as_deref();
            last_part
        } else {
            None
        };
        let mut class = format!("nav-level-{}", entry.level);
        if current == Some(entry.file.as_str()) {
            class.push_str(" current");
        }
        rows.push(NavRow {
            caption,
            entry,
            class,
        });
    }
    rows
}

/// Sidebar navigation built from the flattened TOC, with part captions as
/// group labels and the current page marked.
fn site_nav(project: &ProjectContext, page: &PageContext, prefix: &str) -> Markup {
    let current = page.toc_entry.map(|e| e.file.as_str());
    let rows = nav_rows(project.toc, current);
    html! {
        nav.site-nav {
            a.site-title href={ (prefix) "index.html" } { (project.title) }
            ul {
                @for row in &rows {
                    @if let Some(caption) = row.caption {
                        li.nav-part { (caption) }
                    }
                    li class=(row.class) {
                        a href={ (prefix) (row.entry.file) ".html" } { (nav_label(row.entry)) }
                    }
                }
            }
        }
    }
}

fn nav_label(entry: &FlatTocEntry) -> &str {
    entry.title.as_deref().unwrap_or(&entry.file)
}

/// Right-hand in-page TOC from the extracted headings, cut off at
/// `toc_depth` HTML levels.
fn page_toc(headings: &[PageHeading], toc_depth: usize) -> Markup {
    let visible: Vec<&PageHeading> = headings.iter().filter(|h| h.level <= toc_depth + 1).collect();
    html! {
        @if !visible.is_empty() {
            nav.page-toc {
                div.page-toc-title { "On this page" }
                ul {
                    @for heading in &visible {
                        li class={ "toc-level-" (heading.level.saturating_sub(1)) } {
                            a href={ "#" (heading.id) } { (heading.text) }
                        }
                    }
                }
            }
        }
    }
}

fn footer_nav(entry: Option<&FlatTocEntry>, prefix: &str) -> Markup {
    html! {
        @if let Some(entry) = entry {
            @if entry.prev.is_some() || entry.next.is_some() {
                nav.page-footer-nav {
                    @if let Some(prev) = &entry.prev {
                        a.nav-prev href={ (prefix) (prev) ".html" } { "← " (prev) }
                    } @else {
                        span {}
                    }
                    @if let Some(next) = &entry.next {
                        a.nav-next href={ (prefix) (next) ".html" } { (next) " →" }
                    }
                }
            }
        }
    }
}

/// `../` prefix climbing from an output file's directory back to the site
/// root, so TOC file keys resolve from any depth.
pub fn relative_prefix(output_rel: &Path) -> String {
    "../".repeat(output_rel.components().count().saturating_sub(1))
}

// =============================================================================
// Heading extraction and text stripping
// =============================================================================

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<h([1-6])(?:[^>]*?id="([^"]*)")?[^>]*>(.*?)</h[1-6]>"#).unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap()
});

/// Extract headings from a rendered HTML body, up to `max_depth` levels
/// below `<h1>` (`max_depth = 2` keeps `<h2>` and `<h3>`).
pub fn extract_headings(body: &str, max_depth: usize) -> Vec<PageHeading> {
    HEADING_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let level: usize = caps[1].parse().ok()?;
            if level > max_depth + 1 {
                return None;
            }
            let text = strip_html(&caps[3]);
            let id = caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| crate::config::slugify(&text));
            Some(PageHeading { level, id, text })
        })
        .collect()
}

/// Strip a rendered body to plain text: script/style blocks dropped, tags
/// removed, entities unescaped, whitespace collapsed.
pub fn strip_html(body: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(body, " ");
    let without_tags = TAG_RE.replace_all(&without_blocks, " ");
    let unescaped = without_tags
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}
