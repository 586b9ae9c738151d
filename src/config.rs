//! Workspace configuration: model, loading, and validation.
//!
//! A workspace is described either by a Jupyter-Book-compatible `_config.yml`
//! or by a native `.org-publish.json`. Both normalize into the same [`Config`]:
//! a named map of publishing projects plus workspace-wide settings (GitHub
//! Pages, custom domain, theme).
//!
//! ## Projects and component projects
//!
//! A [`Project`] is one source→output publishing unit. A component project is
//! a named alias for a set of other projects; it expands to its members at
//! publish time and is never published itself:
//!
//! ```json
//! {
//!   "projects": {
//!     "docs":  { "baseDirectory": "./docs", "publishingDirectory": "./_build/docs" },
//!     "notes": { "baseDirectory": "./notes", "publishingDirectory": "./_build/notes" },
//!     "all":   { "components": ["docs", "notes"] }
//!   }
//! }
//! ```
//!
//! ## Partial configuration
//!
//! Every project field has a default; config files only specify overrides.
//! Unknown keys in `.org-publish.json` are rejected to catch typos early.
//! `_config.yml` is the opposite: Jupyter Book configs carry many keys this
//! engine does not consume, so unmapped keys are ignored.
//!
//! ## Validation
//!
//! [`validate_config`] is a separate, non-throwing pass producing
//! [`ValidationFinding`] records (missing directories, identical base/publish
//! directories, dangling component references). Callers decide whether
//! findings are fatal.

use crate::yaml;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] yaml::YamlError),
}

/// How a source file is routed to a converter. `Auto` and `OrgToHtml` infer
/// the converter from the extension; the explicit variants force one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishingFunction {
    #[default]
    Auto,
    OrgToHtml,
    MarkdownToHtml,
    NotebookToHtml,
    Copy,
}

impl PublishingFunction {
    /// Parse a publishing-function setting string. `md-html-*` and
    /// `ipynb-html-*` prefixes force that converter; unknown strings
    /// normalize to `Auto` so dispatch falls back to extension inference.
    pub fn from_setting(s: &str) -> Self {
        match s {
            "copy" => Self::Copy,
            "auto" => Self::Auto,
            "org-html-publish-to-html" => Self::OrgToHtml,
            _ if s.starts_with("md-html") => Self::MarkdownToHtml,
            _ if s.starts_with("ipynb-html") => Self::NotebookToHtml,
            _ => Self::Auto,
        }
    }

    pub fn as_setting(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::OrgToHtml => "org-html-publish-to-html",
            Self::MarkdownToHtml => "md-html-publish-to-html",
            Self::NotebookToHtml => "ipynb-html-publish-to-html",
            Self::Copy => "copy",
        }
    }
}

impl Serialize for PublishingFunction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_setting())
    }
}

impl<'de> Deserialize<'de> for PublishingFunction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_setting(&s))
    }
}

/// Shape of the auto-generated sitemap page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SitemapStyle {
    #[default]
    List,
    Tree,
}

/// Sort order for auto-generated sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SitemapSort {
    #[default]
    #[serde(rename = "alphabetically")]
    Alphabetically,
    #[serde(rename = "chronologically")]
    Chronologically,
    #[serde(rename = "anti-chronologically")]
    AntiChronologically,
}

/// One named source→output publishing unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Project {
    /// Project name; filled from the map key when omitted in config files.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub base_directory: String,
    pub publishing_directory: String,
    /// Extension collected by scan-driven discovery.
    pub base_extension: String,
    pub recursive: bool,
    /// Glob rejecting paths during scan-driven discovery, matched against
    /// the relative path and the basename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    /// Globs unioned into the scan result regardless of `base_extension`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    pub publishing_function: PublishingFunction,
    pub auto_sitemap: bool,
    pub sitemap_filename: String,
    pub sitemap_title: String,
    pub sitemap_style: SitemapStyle,
    pub sitemap_sort_files: SitemapSort,
    /// Literal HTML, or a path (relative to the base directory) to load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_preamble: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_postamble: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub css_files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub js_files: Vec<String>,
    pub use_default_theme: bool,
    pub with_toc: bool,
    pub section_numbers: bool,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_directory: "./".to_string(),
            publishing_directory: "./_build/html".to_string(),
            base_extension: "org".to_string(),
            recursive: true,
            exclude: None,
            include: Vec::new(),
            publishing_function: PublishingFunction::Auto,
            auto_sitemap: false,
            sitemap_filename: "sitemap.org".to_string(),
            sitemap_title: "Sitemap".to_string(),
            sitemap_style: SitemapStyle::List,
            sitemap_sort_files: SitemapSort::Alphabetically,
            html_preamble: None,
            html_postamble: None,
            css_files: Vec::new(),
            js_files: Vec::new(),
            use_default_theme: true,
            with_toc: true,
            section_numbers: false,
        }
    }
}

/// A named alias expanding to other projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentProject {
    pub components: Vec<String>,
}

/// Either a real project or a component alias. Component entries are the
/// narrower shape, so they are tried first when deserializing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectEntry {
    Component(ComponentProject),
    Project(Box<Project>),
}

impl ProjectEntry {
    pub fn as_project(&self) -> Option<&Project> {
        match self {
            ProjectEntry::Project(p) => Some(p),
            ProjectEntry::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentProject> {
        match self {
            ProjectEntry::Component(c) => Some(c),
            ProjectEntry::Project(_) => None,
        }
    }
}

impl From<Project> for ProjectEntry {
    fn from(project: Project) -> Self {
        ProjectEntry::Project(Box::new(project))
    }
}

/// Theme selection and page-TOC settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeSettings {
    pub name: String,
    pub toc_depth: usize,
    pub search: bool,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            toc_depth: 3,
            search: true,
        }
    }
}

/// Workspace configuration: the ordered project map plus global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub projects: IndexMap<String, ProjectEntry>,
    pub github_pages: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeSettings>,
}

impl Config {
    /// Project entry by name, with the name filled in from the map key.
    pub fn project(&self, name: &str) -> Option<Project> {
        let mut project = self.projects.get(name)?.as_project()?.clone();
        if project.name.is_empty() {
            project.name = name.to_string();
        }
        Some(project)
    }
}

/// Build a project with sensible defaults. Under the GitHub Pages preset the
/// publishing directory defaults to `./docs` and the sitemap becomes the site
/// front page (`index.org`, titled `Home`); an explicit `publishing_directory`
/// argument always wins over the preset.
pub fn create_project_config(
    name: &str,
    base_directory: &str,
    publishing_directory: Option<&str>,
    github_pages: bool,
    auto_sitemap: bool,
) -> Project {
    let mut project = Project {
        name: name.to_string(),
        base_directory: base_directory.to_string(),
        auto_sitemap,
        ..Project::default()
    };
    if github_pages {
        project.publishing_directory = "./docs".to_string();
        project.sitemap_filename = "index.org".to_string();
        project.sitemap_title = "Home".to_string();
    }
    if let Some(dir) = publishing_directory {
        project.publishing_directory = dir.to_string();
    }
    project
}

// =============================================================================
// Validation
// =============================================================================

/// One validation problem. Findings are advisory; the caller decides whether
/// they abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFinding {
    pub field: String,
    pub message: String,
}

fn finding(field: impl Into<String>, message: impl Into<String>) -> ValidationFinding {
    ValidationFinding {
        field: field.into(),
        message: message.into(),
    }
}

/// Check a single project for structural problems.
pub fn validate_project(project: &Project) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    if project.base_directory.is_empty() {
        findings.push(finding("baseDirectory", "base directory is required"));
    }
    if project.publishing_directory.is_empty() {
        findings.push(finding(
            "publishingDirectory",
            "publishing directory is required",
        ));
    }
    if !project.base_directory.is_empty() && project.base_directory == project.publishing_directory
    {
        findings.push(finding(
            "publishingDirectory",
            "publishing directory must differ from base directory",
        ));
    }
    findings
}

/// Check a workspace config: per-project findings (field names prefixed with
/// the project name), at least one real project, and resolvable component
/// references.
pub fn validate_config(config: &Config) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();

    let real_projects = config
        .projects
        .values()
        .filter(|e| e.as_project().is_some())
        .count();
    if real_projects == 0 {
        findings.push(finding(
            "projects",
            "workspace needs at least one project that is not a component alias",
        ));
    }

    for (name, entry) in &config.projects {
        match entry {
            ProjectEntry::Project(project) => {
                for f in validate_project(project) {
                    findings.push(finding(format!("projects.{}.{}", name, f.field), f.message));
                }
            }
            ProjectEntry::Component(component) => {
                for reference in &component.components {
                    if !config.projects.contains_key(reference) {
                        findings.push(finding(
                            format!("projects.{}.components", name),
                            format!("unknown project '{}'", reference),
                        ));
                    }
                }
            }
        }
    }

    if let Some(default) = &config.default_project
        && !config.projects.contains_key(default)
    {
        findings.push(finding(
            "defaultProject",
            format!("unknown project '{}'", default),
        ));
    }

    findings
}

// =============================================================================
// Loading and saving
// =============================================================================

const YAML_CONFIG: &str = "_config.yml";
const JSON_CONFIG: &str = ".org-publish.json";

/// Load the workspace config, probing `_config.yml` then `.org-publish.json`.
///
/// Returns `Ok(None)` when neither exists; callers should tell the user to
/// initialize one. Any I/O error other than "not found" propagates.
pub fn load_workspace_config(root: &Path) -> Result<Option<Config>, ConfigError> {
    match fs::read_to_string(root.join(YAML_CONFIG)) {
        Ok(content) => return config_from_jupyter_yaml(&content).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    match fs::read_to_string(root.join(JSON_CONFIG)) {
        Ok(content) => {
            let config: Config = serde_json::from_str(&content)?;
            Ok(Some(config))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write the config as `.org-publish.json` (2-space indented JSON).
pub fn save_config(config: &Config, root: &Path) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(root.join(JSON_CONFIG), json + "\n")?;
    Ok(())
}

/// A starter config for `init`: one project publishing the workspace root.
pub fn starter_config() -> Config {
    let mut projects = IndexMap::new();
    projects.insert(
        "site".to_string(),
        create_project_config("site", "./", None, false, true).into(),
    );
    Config {
        projects,
        default_project: Some("site".to_string()),
        ..Config::default()
    }
}

/// Map a Jupyter-Book `_config.yml` onto the config model. The workspace
/// becomes a single project named from the slugified `title` (fallback
/// `site`), publishing `./` to `./_build/html` unless overridden.
pub fn config_from_jupyter_yaml(content: &str) -> Result<Config, ConfigError> {
    let doc = yaml::parse(content)?;

    let title = doc.get("title").and_then(|v| v.as_str());
    let name = title.map(slugify).filter(|s| !s.is_empty());
    let mut project = Project {
        name: name.unwrap_or_else(|| "site".to_string()),
        ..Project::default()
    };
    if let Some(title) = title {
        project.sitemap_title = title.to_string();
    }

    let str_key = |path: &str| doc.get_path(path).and_then(|v| v.as_str());
    let bool_key = |path: &str| doc.get_path(path).and_then(|v| v.as_bool());

    if let Some(v) = str_key("source_directory") {
        project.base_directory = v.to_string();
    }
    if let Some(v) = str_key("publish_directory") {
        project.publishing_directory = v.to_string();
    }
    if let Some(v) = str_key("publish.base_directory") {
        project.base_directory = v.to_string();
    }
    if let Some(v) = str_key("publish.publishing_directory") {
        project.publishing_directory = v.to_string();
    }
    if let Some(v) = bool_key("publish.recursive") {
        project.recursive = v;
    }
    if let Some(v) = str_key("publish.exclude") {
        project.exclude = Some(v.to_string());
    }
    if let Some(v) = bool_key("publish.auto_sitemap") {
        project.auto_sitemap = v;
    }
    if let Some(v) = str_key("publish.sitemap_filename") {
        project.sitemap_filename = v.to_string();
    }
    if let Some(v) = bool_key("html.use_default_theme") {
        project.use_default_theme = v;
    }
    if let Some(html) = doc.get("html") {
        if let Some(css) = html.get("css_files") {
            project.css_files = css.string_list();
        }
        if let Some(js) = html.get("js_files") {
            project.js_files = js.string_list();
        }
    }

    let github_pages = doc
        .get("github_pages")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if github_pages && str_key("publish.sitemap_filename").is_none() {
        project.sitemap_filename = "index.org".to_string();
    }

    let mut theme = None;
    if doc.get("theme").is_some() || doc.get_path("html.toc_depth").is_some() {
        let mut settings = ThemeSettings::default();
        if let Some(v) = str_key("theme.name") {
            settings.name = v.to_string();
        }
        if let Some(v) = doc.get_path("theme.toc_depth").and_then(|v| v.as_usize()) {
            settings.toc_depth = v;
        }
        if let Some(v) = doc.get_path("html.toc_depth").and_then(|v| v.as_usize()) {
            settings.toc_depth = v;
        }
        if let Some(v) = bool_key("theme.search") {
            settings.search = v;
        }
        theme = Some(settings);
    }

    let project_name = project.name.clone();
    let mut projects = IndexMap::new();
    projects.insert(project_name.clone(), project.into());

    Ok(Config {
        projects,
        github_pages,
        custom_domain: doc
            .get("custom_domain")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        default_project: Some(project_name),
        theme,
    })
}

/// Lowercase, alphanumerics kept, runs of anything else collapsed to `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Defaults and presets
    // =========================================================================

    #[test]
    fn project_defaults() {
        let p = Project::default();
        assert_eq!(p.base_directory, "./");
        assert_eq!(p.publishing_directory, "./_build/html");
        assert_eq!(p.base_extension, "org");
        assert!(p.recursive);
        assert_eq!(p.sitemap_filename, "sitemap.org");
        assert_eq!(p.sitemap_title, "Sitemap");
        assert_eq!(p.publishing_function, PublishingFunction::Auto);
        assert!(p.use_default_theme);
        assert!(p.with_toc);
        assert!(!p.section_numbers);
    }

    #[test]
    fn github_preset_sets_front_page_sitemap() {
        let p = create_project_config("site", "./org", None, true, true);
        assert_eq!(p.publishing_directory, "./docs");
        assert_eq!(p.sitemap_filename, "index.org");
        assert_eq!(p.sitemap_title, "Home");
        assert!(p.auto_sitemap);
    }

    #[test]
    fn explicit_publishing_directory_wins_over_preset() {
        let p = create_project_config("site", "./org", Some("./docs"), true, true);
        assert_eq!(p.publishing_directory, "./docs");
        assert_eq!(p.sitemap_filename, "index.org");
        assert_eq!(p.sitemap_title, "Home");

        let p = create_project_config("site", "./org", Some("./public"), true, false);
        assert_eq!(p.publishing_directory, "./public");
    }

    // =========================================================================
    // Publishing function parsing
    // =========================================================================

    #[test]
    fn publishing_function_known_strings() {
        assert_eq!(
            PublishingFunction::from_setting("copy"),
            PublishingFunction::Copy
        );
        assert_eq!(
            PublishingFunction::from_setting("auto"),
            PublishingFunction::Auto
        );
        assert_eq!(
            PublishingFunction::from_setting("org-html-publish-to-html"),
            PublishingFunction::OrgToHtml
        );
    }

    #[test]
    fn publishing_function_prefix_forcing() {
        assert_eq!(
            PublishingFunction::from_setting("md-html-publish-to-html"),
            PublishingFunction::MarkdownToHtml
        );
        assert_eq!(
            PublishingFunction::from_setting("ipynb-html-export"),
            PublishingFunction::NotebookToHtml
        );
    }

    #[test]
    fn publishing_function_unknown_normalizes_to_auto() {
        assert_eq!(
            PublishingFunction::from_setting("org-latex-publish-to-pdf"),
            PublishingFunction::Auto
        );
    }

    // =========================================================================
    // JSON round trip
    // =========================================================================

    #[test]
    fn json_round_trip_preserves_project() {
        let mut config = Config::default();
        let mut project = create_project_config("docs", "./docs", None, false, true);
        project.exclude = Some("drafts/*".to_string());
        project.css_files = vec!["site.css".to_string()];
        config.projects.insert("docs".to_string(), project.into());

        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        let restored = parsed.project("docs").unwrap();
        assert_eq!(restored.base_directory, "./docs");
        assert_eq!(restored.exclude.as_deref(), Some("drafts/*"));
        assert_eq!(restored.css_files, vec!["site.css"]);
        assert!(restored.auto_sitemap);
    }

    #[test]
    fn component_entry_parses_untagged() {
        let json = r#"{
  "projects": {
    "a": { "baseDirectory": "./a", "publishingDirectory": "./out/a" },
    "all": { "components": ["a"] }
  }
}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.projects["a"].as_project().is_some());
        let component = config.projects["all"].as_component().unwrap();
        assert_eq!(component.components, vec!["a"]);
    }

    #[test]
    fn unknown_project_key_rejected() {
        let json = r#"{ "projects": { "a": { "baseDirectry": "./a" } } }"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn project_fills_name_from_map_key() {
        let json =
            r#"{ "projects": { "docs": { "baseDirectory": "./d", "publishingDirectory": "./o" } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.project("docs").unwrap().name, "docs");
    }

    #[test]
    fn sitemap_sort_serde_names() {
        let json = r#"{ "projects": { "a": { "sitemapSortFiles": "anti-chronologically" } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.project("a").unwrap().sitemap_sort_files,
            SitemapSort::AntiChronologically
        );
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_project_identical_directories() {
        let mut p = Project::default();
        p.base_directory = "./site".to_string();
        p.publishing_directory = "./site".to_string();
        let findings = validate_project(&p);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "publishingDirectory");
    }

    #[test]
    fn validate_project_ok() {
        assert!(validate_project(&Project::default()).is_empty());
    }

    #[test]
    fn validate_config_requires_real_project() {
        let mut config = Config::default();
        config.projects.insert(
            "all".to_string(),
            ProjectEntry::Component(ComponentProject {
                components: vec!["missing".to_string()],
            }),
        );
        let findings = validate_config(&config);
        assert!(findings.iter().any(|f| f.field == "projects"));
        assert!(findings.iter().any(|f| f.field == "projects.all.components"));
    }

    #[test]
    fn validate_config_dangling_default_project() {
        let mut config = Config::default();
        config
            .projects
            .insert("a".to_string(), Project::default().into());
        config.default_project = Some("nope".to_string());
        let findings = validate_config(&config);
        assert!(findings.iter().any(|f| f.field == "defaultProject"));
    }

    #[test]
    fn validate_config_prefixes_project_findings() {
        let mut project = Project::default();
        project.publishing_directory = project.base_directory.clone();
        let mut config = Config::default();
        config.projects.insert("bad".to_string(), project.into());
        let findings = validate_config(&config);
        assert!(
            findings
                .iter()
                .any(|f| f.field == "projects.bad.publishingDirectory")
        );
    }

    // =========================================================================
    // Workspace loading
    // =========================================================================

    #[test]
    fn load_returns_none_when_no_config() {
        let tmp = TempDir::new().unwrap();
        assert!(load_workspace_config(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn load_prefers_yaml_over_json() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("_config.yml"), "title: From Yaml\n").unwrap();
        fs::write(
            tmp.path().join(".org-publish.json"),
            r#"{ "projects": { "json-project": {} } }"#,
        )
        .unwrap();

        let config = load_workspace_config(tmp.path()).unwrap().unwrap();
        assert!(config.projects.contains_key("from-yaml"));
        assert!(!config.projects.contains_key("json-project"));
    }

    #[test]
    fn load_falls_back_to_json() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(".org-publish.json"),
            r#"{ "projects": { "docs": { "baseDirectory": "./d", "publishingDirectory": "./o" } }, "githubPages": true }"#,
        )
        .unwrap();

        let config = load_workspace_config(tmp.path()).unwrap().unwrap();
        assert!(config.github_pages);
        assert_eq!(config.project("docs").unwrap().base_directory, "./d");
    }

    #[test]
    fn load_invalid_json_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".org-publish.json"), "{ not json").unwrap();
        assert!(matches!(
            load_workspace_config(tmp.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn save_config_writes_two_space_json() {
        let tmp = TempDir::new().unwrap();
        save_config(&starter_config(), tmp.path()).unwrap();

        let written = fs::read_to_string(tmp.path().join(".org-publish.json")).unwrap();
        assert!(written.starts_with("{\n  \"projects\""));
        let parsed: Config = serde_json::from_str(&written).unwrap();
        assert!(parsed.projects.contains_key("site"));
    }

    // =========================================================================
    // Jupyter-Book YAML mapping
    // =========================================================================

    #[test]
    fn jupyter_yaml_maps_core_keys() {
        let yml = "\
title: My Handbook
author: Jane
publish:
  base_directory: ./book
  publishing_directory: ./_site
  recursive: false
  exclude: drafts/*
  auto_sitemap: true
  sitemap_filename: map.org
html:
  use_default_theme: false
  toc_depth: 2
  css_files:
    - style.css
github_pages: true
custom_domain: docs.example.com
";
        let config = config_from_jupyter_yaml(yml).unwrap();
        assert!(config.github_pages);
        assert_eq!(config.custom_domain.as_deref(), Some("docs.example.com"));

        let project = config.project("my-handbook").unwrap();
        assert_eq!(project.base_directory, "./book");
        assert_eq!(project.publishing_directory, "./_site");
        assert!(!project.recursive);
        assert_eq!(project.exclude.as_deref(), Some("drafts/*"));
        assert!(project.auto_sitemap);
        // Explicit sitemap filename wins over the github_pages front page.
        assert_eq!(project.sitemap_filename, "map.org");
        assert!(!project.use_default_theme);
        assert_eq!(project.css_files, vec!["style.css"]);
        assert_eq!(project.sitemap_title, "My Handbook");

        let theme = config.theme.unwrap();
        assert_eq!(theme.toc_depth, 2);
    }

    #[test]
    fn jupyter_yaml_defaults_directories() {
        let config = config_from_jupyter_yaml("title: Minimal\n").unwrap();
        let project = config.project("minimal").unwrap();
        assert_eq!(project.base_directory, "./");
        assert_eq!(project.publishing_directory, "./_build/html");
        assert_eq!(config.default_project.as_deref(), Some("minimal"));
    }

    #[test]
    fn jupyter_yaml_github_pages_front_page() {
        let config = config_from_jupyter_yaml("title: T\ngithub_pages: true\n").unwrap();
        let project = config.project("t").unwrap();
        assert_eq!(project.sitemap_filename, "index.org");
    }

    #[test]
    fn jupyter_yaml_theme_settings() {
        let yml = "title: T\ntheme:\n  name: slate\n  toc_depth: 4\n  search: false\n";
        let config = config_from_jupyter_yaml(yml).unwrap();
        let theme = config.theme.unwrap();
        assert_eq!(theme.name, "slate");
        assert_eq!(theme.toc_depth, 4);
        assert!(!theme.search);
    }

    #[test]
    fn jupyter_yaml_untitled_project_named_site() {
        let config = config_from_jupyter_yaml("github_pages: false\n").unwrap();
        assert!(config.projects.contains_key("site"));
    }

    #[test]
    fn jupyter_yaml_ignores_unmapped_keys() {
        let yml = "title: T\nexecute:\n  execute_notebooks: off\nsphinx:\n  config: {}\n";
        let config = config_from_jupyter_yaml(yml);
        assert!(config.is_ok());
    }

    // =========================================================================
    // Slugify
    // =========================================================================

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("My Handbook"), "my-handbook");
        assert_eq!(slugify("  A  B  "), "a-b");
        assert_eq!(slugify("Rust 2026!"), "rust-2026");
        assert_eq!(slugify(""), "");
    }
}
