//! Org document handling: keyword parsing, include expansion, HTML export.
//!
//! This is the converter behind the org branch of publish dispatch. It is a
//! deliberately small, line-oriented implementation covering the constructs
//! the publishing engine needs — keywords, headings, lists, quote and source
//! blocks, fixed-width blocks, inline emphasis, and `[[target][label]]`
//! links — not a full org-mode grammar.
//!
//! `export_to_html` produces either a complete standalone page (with
//! preamble/postamble and css/js references) or a body-only fragment for
//! themes to wrap.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("include not found: {0}")]
    IncludeNotFound(String),
    #[error("includes nested deeper than {0} levels")]
    IncludeDepthExceeded(usize),
}

/// Parsed org document: file-level keywords plus the content lines.
#[derive(Debug, Clone)]
pub struct OrgDocument {
    /// `#+KEY: value` keywords, keys uppercased (`TITLE`, `DATE`, ...).
    pub keywords: HashMap<String, String>,
    lines: Vec<String>,
}

impl OrgDocument {
    pub fn title(&self) -> Option<&str> {
        self.keywords.get("TITLE").map(String::as_str)
    }

    pub fn date(&self) -> Option<&str> {
        self.keywords.get("DATE").map(String::as_str)
    }
}

/// Export settings for one document.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Emit only the content fragment, for themes to wrap.
    pub body_only: bool,
    /// Prepend a document table of contents built from the headings.
    pub with_toc: bool,
    /// Prefix headings with hierarchical section numbers.
    pub section_numbers: bool,
    /// Title override; falls back to the `TITLE` keyword, then the empty string.
    pub title: Option<String>,
    /// Raw HTML inserted before/after the content (standalone export only).
    pub preamble: Option<String>,
    pub postamble: Option<String>,
    pub css_files: Vec<String>,
    pub js_files: Vec<String>,
}

/// One document heading, as seen by TOCs and themes.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    /// Org outline level: `*` is 1.
    pub level: usize,
    pub id: String,
    pub text: String,
}

/// Parse org text into keywords and content lines.
pub fn parse_document(text: &str) -> OrgDocument {
    let mut keywords = HashMap::new();
    let mut lines = Vec::new();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("#+")
            && let Some(colon) = rest.find(':')
        {
            let key = rest[..colon].trim();
            // Block markers (#+BEGIN_SRC etc.) are content, not keywords.
            if !key.is_empty() && !key.to_uppercase().starts_with("BEGIN") && !key.to_uppercase().starts_with("END") {
                keywords.insert(
                    key.to_uppercase(),
                    rest[colon + 1..].trim().to_string(),
                );
                continue;
            }
        }
        lines.push(line.to_string());
    }
    OrgDocument { keywords, lines }
}

// =============================================================================
// Include expansion
// =============================================================================

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*#\+INCLUDE:\s*"([^"]+)".*$"#).unwrap());

/// Whether the text contains any `#+INCLUDE:` directive.
pub fn has_includes(text: &str) -> bool {
    INCLUDE_RE.is_match(text)
}

/// Expand `#+INCLUDE: "path"` directives relative to `base_path`, recursing
/// into included files up to `max_depth` levels.
pub fn process_includes(text: &str, base_path: &Path, max_depth: usize) -> Result<String, OrgError> {
    expand_includes(text, base_path, max_depth, 0)
}

fn expand_includes(
    text: &str,
    base_path: &Path,
    max_depth: usize,
    depth: usize,
) -> Result<String, OrgError> {
    if !has_includes(text) {
        return Ok(text.to_string());
    }
    if depth >= max_depth {
        return Err(OrgError::IncludeDepthExceeded(max_depth));
    }
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if let Some(caps) = INCLUDE_RE.captures(line) {
            let rel = &caps[1];
            let path = base_path.join(rel);
            let included = fs::read_to_string(&path)
                .map_err(|_| OrgError::IncludeNotFound(path.display().to_string()))?;
            let nested_base = path.parent().unwrap_or(base_path);
            out.push_str(&expand_includes(&included, nested_base, max_depth, depth + 1)?);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

// =============================================================================
// HTML export
// =============================================================================

/// Headings of a document, in order, with the ids the exporter assigns.
pub fn document_headings(doc: &OrgDocument) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_block = false;
    for line in &doc.lines {
        let trimmed = line.trim();
        if strip_prefix_ci(trimmed, "#+begin_").is_some() {
            in_block = true;
        } else if strip_prefix_ci(trimmed, "#+end_").is_some() {
            in_block = false;
        } else if !in_block
            && let Some((level, text)) = heading_parts(line)
        {
            headings.push(Heading {
                level,
                id: crate::config::slugify(&text),
                text,
            });
        }
    }
    headings
}

fn heading_parts(line: &str) -> Option<(usize, String)> {
    let stars = line.chars().take_while(|&c| c == '*').count();
    if stars == 0 || !line[stars..].starts_with(' ') {
        return None;
    }
    Some((stars, line[stars..].trim().to_string()))
}

/// Export a parsed document to HTML.
pub fn export_to_html(doc: &OrgDocument, options: &ExportOptions) -> String {
    let mut body = String::new();
    let mut numbering: Vec<usize> = Vec::new();

    if options.with_toc {
        let headings = document_headings(doc);
        if !headings.is_empty() {
            body.push_str("<nav class=\"table-of-contents\">\n<ul>\n");
            for h in &headings {
                body.push_str(&format!(
                    "<li class=\"toc-level-{}\"><a href=\"#{}\">{}</a></li>\n",
                    h.level,
                    h.id,
                    escape_html(&h.text)
                ));
            }
            body.push_str("</ul>\n</nav>\n");
        }
    }

    let mut paragraph: Vec<String> = Vec::new();
    let mut list_items: Vec<String> = Vec::new();
    let mut block: Option<(String, Vec<String>)> = None;
    let mut fixed: Vec<String> = Vec::new();

    for line in &doc.lines {
        let trimmed = line.trim_end();

        if block.is_some() {
            if strip_prefix_ci(trimmed.trim(), "#+end_").is_some() {
                if let Some((kind, mut content)) = block.take() {
                    flush_block(&mut body, &kind, &mut content);
                }
            } else if let Some((_, content)) = &mut block {
                content.push(trimmed.to_string());
            }
            continue;
        }

        if let Some(rest) = begin_block(trimmed) {
            flush_paragraph(&mut body, &mut paragraph);
            flush_list(&mut body, &mut list_items);
            flush_fixed(&mut body, &mut fixed);
            block = Some(rest);
            continue;
        }

        if let Some((level, text)) = heading_parts(trimmed) {
            flush_paragraph(&mut body, &mut paragraph);
            flush_list(&mut body, &mut list_items);
            flush_fixed(&mut body, &mut fixed);
            let id = crate::config::slugify(&text);
            let label = if options.section_numbers {
                format!("{} {}", next_section_number(&mut numbering, level), text)
            } else {
                text
            };
            // Org outline level 1 renders as h2; h1 is the document title.
            let tag = (level + 1).min(6);
            body.push_str(&format!(
                "<h{} id=\"{}\">{}</h{}>\n",
                tag,
                id,
                render_inline(&label),
                tag
            ));
            continue;
        }

        if let Some(item) = trimmed.trim_start().strip_prefix("- ") {
            flush_paragraph(&mut body, &mut paragraph);
            flush_fixed(&mut body, &mut fixed);
            list_items.push(item.to_string());
            continue;
        }

        if let Some(text) = trimmed.strip_prefix(": ") {
            flush_paragraph(&mut body, &mut paragraph);
            flush_list(&mut body, &mut list_items);
            fixed.push(text.to_string());
            continue;
        }

        if trimmed.trim() == "-----" {
            flush_paragraph(&mut body, &mut paragraph);
            flush_list(&mut body, &mut list_items);
            flush_fixed(&mut body, &mut fixed);
            body.push_str("<hr>\n");
            continue;
        }

        if trimmed.trim().is_empty() {
            flush_paragraph(&mut body, &mut paragraph);
            flush_list(&mut body, &mut list_items);
            flush_fixed(&mut body, &mut fixed);
            continue;
        }

        // Leftover #+ lines (e.g. #+OPTIONS inside content) are dropped.
        if trimmed.trim_start().starts_with("#+") {
            continue;
        }

        paragraph.push(trimmed.trim().to_string());
    }

    if let Some((kind, mut content)) = block.take() {
        // Unterminated block: render what we have.
        flush_block(&mut body, &kind, &mut content);
    }
    flush_paragraph(&mut body, &mut paragraph);
    flush_list(&mut body, &mut list_items);
    flush_fixed(&mut body, &mut fixed);

    if options.body_only {
        return body;
    }

    let title = options
        .title
        .clone()
        .or_else(|| doc.title().map(str::to_string))
        .unwrap_or_default();
    wrap_standalone(&title, &body, options)
}

/// Case-insensitive ASCII prefix strip; `None` when the prefix is absent.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn begin_block(line: &str) -> Option<(String, Vec<String>)> {
    let trimmed = line.trim();
    if let Some(rest) = strip_prefix_ci(trimmed, "#+begin_src") {
        let lang = rest
            .trim()
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        return Some((format!("src:{}", lang), Vec::new()));
    }
    if strip_prefix_ci(trimmed, "#+begin_quote").is_some() {
        return Some(("quote".to_string(), Vec::new()));
    }
    if strip_prefix_ci(trimmed, "#+begin_example").is_some() {
        return Some(("example".to_string(), Vec::new()));
    }
    None
}

fn flush_block(body: &mut String, kind: &str, content: &mut Vec<String>) {
    let text = content.join("\n");
    if let Some(lang) = kind.strip_prefix("src:") {
        if lang.is_empty() {
            body.push_str(&format!("<pre><code>{}</code></pre>\n", escape_html(&text)));
        } else {
            body.push_str(&format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                lang,
                escape_html(&text)
            ));
        }
    } else if kind == "quote" {
        body.push_str(&format!(
            "<blockquote>\n<p>{}</p>\n</blockquote>\n",
            render_inline(text.trim())
        ));
    } else {
        body.push_str(&format!("<pre>{}</pre>\n", escape_html(&text)));
    }
    content.clear();
}

fn flush_paragraph(body: &mut String, paragraph: &mut Vec<String>) {
    if !paragraph.is_empty() {
        body.push_str(&format!("<p>{}</p>\n", render_inline(&paragraph.join(" "))));
        paragraph.clear();
    }
}

fn flush_list(body: &mut String, items: &mut Vec<String>) {
    if !items.is_empty() {
        body.push_str("<ul>\n");
        for item in items.iter() {
            body.push_str(&format!("<li>{}</li>\n", render_inline(item)));
        }
        body.push_str("</ul>\n");
        items.clear();
    }
}

fn flush_fixed(body: &mut String, lines: &mut Vec<String>) {
    if !lines.is_empty() {
        body.push_str(&format!("<pre>{}</pre>\n", escape_html(&lines.join("\n"))));
        lines.clear();
    }
}

fn next_section_number(numbering: &mut Vec<usize>, level: usize) -> String {
    numbering.truncate(level);
    while numbering.len() < level {
        numbering.push(0);
    }
    numbering[level - 1] += 1;
    numbering
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

// =============================================================================
// Inline markup
// =============================================================================

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]\[]+)\](?:\[([^\]\[]+)\])?\]").unwrap());
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s>])/([^/\n]+)/").unwrap());
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[~=]([^~=\n]+)[~=]").unwrap());

/// Render inline org markup inside already plain text: links, bold, italic,
/// inline code/verbatim. Input is escaped first, so replacements emit tags
/// into safe text.
fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);

    let linked = LINK_RE.replace_all(&escaped, |caps: &regex::Captures| {
        let target = caps.get(1).map_or("", |m| m.as_str());
        let label = caps.get(2).map_or(target, |m| m.as_str());
        format!("<a href=\"{}\">{}</a>", link_target(target), label)
    });

    let bold = BOLD_RE.replace_all(&linked, "<strong>$1</strong>");
    let italic = ITALIC_RE.replace_all(&bold, "$1<em>$2</em>");
    CODE_RE.replace_all(&italic, "<code>$1</code>").into_owned()
}

/// Rewrite an org link target for the published site: `file:` links lose the
/// prefix and get source extensions rewritten to `.html`.
fn link_target(target: &str) -> String {
    let stripped = target.strip_prefix("file:").unwrap_or(target);
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    for ext in [".org", ".md", ".ipynb"] {
        if let Some(stem) = stripped.strip_suffix(ext) {
            return format!("{}.html", stem);
        }
    }
    stripped.to_string()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap_standalone(title: &str, body: &str, options: &ExportOptions) -> String {
    let mut head = String::new();
    for css in &options.css_files {
        head.push_str(&format!(
            "<link rel=\"stylesheet\" href=\"{}\">\n",
            css
        ));
    }
    for js in &options.js_files {
        head.push_str(&format!("<script src=\"{}\" defer></script>\n", js));
    }
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n{head}</head>\n<body>\n{preamble}\
         <main class=\"content\">\n{body}</main>\n{postamble}</body>\n</html>\n",
        title = escape_html(title),
        head = head,
        preamble = options
            .preamble
            .as_deref()
            .map(|p| format!("{}\n", p))
            .unwrap_or_default(),
        body = body,
        postamble = options
            .postamble
            .as_deref()
            .map(|p| format!("{}\n", p))
            .unwrap_or_default(),
    )
}
