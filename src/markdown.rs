//! Markdown to HTML conversion.
//!
//! Stands behind the markdown branch of publish dispatch. Conversion itself
//! is pulldown-cmark; this module adds the publishing-specific behavior:
//! relative `.md` link targets are rewritten to `.html` so cross-document
//! links keep working on the published site, and standalone pages get a
//! minimal document shell with a CDN-hosted highlight.js for fenced code
//! blocks.

use maud::{DOCTYPE, PreEscaped, html};
use pulldown_cmark::{Event, Options, Parser, Tag, html as md_html};

const HIGHLIGHT_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/default.min.css";
const HIGHLIGHT_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js";

/// Convert markdown to an HTML fragment, rewriting relative `.md` links.
pub fn convert_fragment(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: rewrite_link(&dest_url).into(),
            title,
            id,
        }),
        other => other,
    });
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

/// Convert markdown to a complete standalone page.
pub fn convert_standalone(
    title: &str,
    markdown: &str,
    css_files: &[String],
    js_files: &[String],
) -> String {
    let body = convert_fragment(markdown);
    wrap_standalone(title, &body, css_files, js_files)
}

/// Wrap an HTML fragment in the minimal document shell used for markdown
/// and notebook pages.
pub fn wrap_standalone(
    title: &str,
    body_html: &str,
    css_files: &[String],
    js_files: &[String],
) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href=(HIGHLIGHT_CSS);
                @for css in css_files {
                    link rel="stylesheet" href=(css);
                }
            }
            body {
                main.content {
                    (PreEscaped(body_html))
                }
                script src=(HIGHLIGHT_JS) {}
                script { (PreEscaped("hljs.highlightAll();")) }
                @for js in js_files {
                    script src=(js) {}
                }
            }
        }
    }
    .into_string()
}

/// Rewrite a link target for the published site: relative `.md` targets
/// become `.html`, fragments preserved. Absolute URLs pass through.
fn rewrite_link(dest: &str) -> String {
    if dest.starts_with("http://")
        || dest.starts_with("https://")
        || dest.starts_with("mailto:")
        || dest.starts_with('#')
    {
        return dest.to_string();
    }
    let (path, fragment) = match dest.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (dest, None),
    };
    let rewritten = match path.strip_suffix(".md") {
        Some(stem) => format!("{}.html", stem),
        None => path.to_string(),
    };
    match fragment {
        Some(f) => format!("{}#{}", rewritten, f),
        None => rewritten,
    }
}

/// First `# ` heading of a markdown document, for title fallback.
pub fn first_heading(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find(|line| line.starts_with("# "))
        .map(|line| line.trim_start_matches("# ").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_converted() {
        let html = convert_fragment("# Top\n\n###### Deep\n");
        assert!(html.contains("<h1>Top</h1>"));
        assert!(html.contains("<h6>Deep</h6>"));
    }

    #[test]
    fn emphasis_converted() {
        let html = convert_fragment("**bold** and *italic* and `code`\n");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.contains("<code>code</code>"));
    }

    #[test]
    fn fenced_code_block_escaped_with_language() {
        let html = convert_fragment("```rust\nlet x = 1 < 2;\n```\n");
        assert!(html.contains("language-rust"));
        assert!(html.contains("1 &lt; 2"));
    }

    #[test]
    fn relative_md_links_rewritten() {
        let html = convert_fragment("[next](chapter2.md)\n");
        assert!(html.contains("href=\"chapter2.html\""));
    }

    #[test]
    fn md_link_fragment_preserved() {
        let html = convert_fragment("[sec](guide.md#setup)\n");
        assert!(html.contains("href=\"guide.html#setup\""));
    }

    #[test]
    fn absolute_links_untouched() {
        let html = convert_fragment("[site](https://example.com/page.md)\n");
        assert!(html.contains("href=\"https://example.com/page.md\""));
    }

    #[test]
    fn non_md_relative_links_untouched() {
        let html = convert_fragment("[img](photo.png)\n");
        assert!(html.contains("href=\"photo.png\""));
    }

    #[test]
    fn images_converted() {
        let html = convert_fragment("![alt text](pic.jpg)\n");
        assert!(html.contains("<img src=\"pic.jpg\" alt=\"alt text\""));
    }

    #[test]
    fn list_items_grouped() {
        let html = convert_fragment("- one\n- two\n");
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<li>two</li>"));
    }

    #[test]
    fn paragraphs_wrapped() {
        let html = convert_fragment("First block.\n\nSecond block.\n");
        assert!(html.contains("<p>First block.</p>"));
        assert!(html.contains("<p>Second block.</p>"));
    }

    #[test]
    fn standalone_references_highlighter() {
        let html = convert_standalone("Page", "# Page\n", &[], &[]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Page</title>"));
        assert!(html.contains("highlight.min.js"));
        assert!(html.contains("hljs.highlightAll()"));
    }

    #[test]
    fn standalone_includes_custom_assets() {
        let html = convert_standalone(
            "Page",
            "text",
            &["site.css".to_string()],
            &["site.js".to_string()],
        );
        assert!(html.contains("href=\"site.css\""));
        assert!(html.contains("src=\"site.js\""));
    }

    #[test]
    fn first_heading_found() {
        assert_eq!(
            first_heading("intro\n\n# The Title\n\nmore").as_deref(),
            Some("The Title")
        );
        assert_eq!(first_heading("no heading"), None);
    }

    #[test]
    fn title_escaped_in_standalone() {
        let html = convert_standalone("<script>", "x", &[], &[]);
        assert!(!html.contains("<title><script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
