//! Notebook parsing and HTML rendering.
//!
//! Notebooks are JSON documents of markdown and code cells. Markdown cells
//! run through the same converter as standalone markdown files; code cells
//! render as `<pre><code class="language-X">` so the standalone shell's
//! highlighter picks them up. Cell output blobs are not rendered.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::markdown;
use crate::org::escape_html;

#[derive(Error, Debug)]
pub enum NotebookError {
    #[error("notebook JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parsed notebook document.
#[derive(Debug, Deserialize)]
pub struct NotebookDoc {
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
pub struct Cell {
    pub cell_type: String,
    #[serde(default)]
    pub source: CellSource,
}

/// Notebook cell source: either one string or a list of line strings.
#[derive(Debug, Deserialize, Default)]
#[serde(untagged)]
pub enum CellSource {
    #[default]
    Empty,
    Joined(String),
    Lines(Vec<String>),
}

impl CellSource {
    pub fn text(&self) -> String {
        match self {
            CellSource::Empty => String::new(),
            CellSource::Joined(s) => s.clone(),
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

impl NotebookDoc {
    /// Title: `metadata.title`, else the first markdown `#` heading.
    pub fn title(&self) -> Option<String> {
        if let Some(title) = self.metadata.get("title").and_then(Value::as_str) {
            return Some(title.to_string());
        }
        self.cells
            .iter()
            .filter(|c| c.cell_type == "markdown")
            .find_map(|c| markdown::first_heading(&c.source.text()))
    }

    /// Code language from kernelspec or language_info, defaulting to python.
    pub fn language(&self) -> String {
        let lookup = |path: [&str; 2]| {
            self.metadata
                .get(path[0])
                .and_then(|v| v.get(path[1]))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        lookup(["kernelspec", "language"])
            .or_else(|| lookup(["language_info", "name"]))
            .unwrap_or_else(|| "python".to_string())
    }
}

/// Parse notebook JSON.
pub fn parse_notebook(text: &str) -> Result<NotebookDoc, NotebookError> {
    Ok(serde_json::from_str(text)?)
}

/// Render a notebook body fragment: markdown cells converted, code cells
/// fenced, raw cells skipped.
pub fn render_fragment(notebook: &NotebookDoc) -> String {
    let language = notebook.language();
    let mut body = String::new();
    for cell in &notebook.cells {
        let source = cell.source.text();
        if source.trim().is_empty() {
            continue;
        }
        match cell.cell_type.as_str() {
            "markdown" => body.push_str(&markdown::convert_fragment(&source)),
            "code" => body.push_str(&format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                language,
                escape_html(source.trim_end())
            )),
            _ => {}
        }
    }
    body
}

/// Render a notebook as a complete standalone page.
pub fn render_standalone(
    notebook: &NotebookDoc,
    title: &str,
    css_files: &[String],
    js_files: &[String],
) -> String {
    let body = render_fragment(notebook);
    markdown::wrap_standalone(title, &body, css_files, js_files)
}
