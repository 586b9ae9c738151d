//! Sitemap / index page generation.
//!
//! Both flavors produce an org document that is written into the project's
//! base directory under `sitemap_filename` and then republished with `force`
//! so it is never skipped by the up-to-date gate:
//!
//! - **TOC-structured** ([`toc_sitemap_document`]): one heading per part
//!   caption, nested bullets of `[[file:...][title]]` links mirroring the
//!   chapter/section tree. Titles come from publish results, falling back to
//!   the TOC entry's own title, then the file key.
//! - **Auto-generated** ([`auto_sitemap_document`]): successfully published
//!   files sorted alphabetically or by date, as a flat bullet list or a tree
//!   with one heading per containing directory. Dated entries carry a
//!   trailing `(YYYY-MM-DD)`.

use crate::config::{SitemapSort, SitemapStyle};
use crate::toc::FlatTocEntry;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::path::Path;

/// One publishable file as the auto sitemap sees it.
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    /// Path relative to the base directory, with its source extension.
    pub relative_path: String,
    pub title: Option<String>,
    /// ISO date when known.
    pub date: Option<String>,
}

impl SitemapEntry {
    fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.relative_path)
    }

    fn sort_date(&self) -> NaiveDate {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
    }
}

/// Build the TOC-structured sitemap document. `titles` maps TOC file keys to
/// titles discovered while publishing.
pub fn toc_sitemap_document(
    title: &str,
    flat: &[FlatTocEntry],
    titles: &HashMap<String, String>,
) -> String {
    let mut doc = String::new();
    writeln!(doc, "#+TITLE: {}", title).unwrap();
    doc.push('\n');

    let mut current_part: Option<&str> = None;
    for entry in flat {
        if entry.part.as_deref() != current_part {
            current_part = entry.part.as_deref();
            if let Some(caption) = current_part {
                writeln!(doc, "\n* {}", caption).unwrap();
            }
        }
        let label = titles
            .get(&entry.file)
            .map(String::as_str)
            .or(entry.title.as_deref())
            .unwrap_or(&entry.file);
        let indent = "  ".repeat(entry.level.saturating_sub(1));
        writeln!(
            doc,
            "{}- [[file:{}.html][{}]]",
            indent, entry.file, label
        )
        .unwrap();
    }
    doc
}

/// Build the auto-generated sitemap document from publish results.
pub fn auto_sitemap_document(
    title: &str,
    entries: &[SitemapEntry],
    style: SitemapStyle,
    sort: SitemapSort,
) -> String {
    let mut sorted: Vec<&SitemapEntry> = entries.iter().collect();
    match sort {
        SitemapSort::Alphabetically => sorted.sort_by_key(|e| e.display_title().to_string()),
        SitemapSort::Chronologically => sorted.sort_by_key(|e| e.sort_date()),
        SitemapSort::AntiChronologically => {
            sorted.sort_by_key(|e| std::cmp::Reverse(e.sort_date()))
        }
    }

    let mut doc = String::new();
    writeln!(doc, "#+TITLE: {}", title).unwrap();
    doc.push('\n');

    match style {
        SitemapStyle::List => {
            for entry in &sorted {
                writeln!(doc, "{}", entry_line(entry)).unwrap();
            }
        }
        SitemapStyle::Tree => {
            let mut groups: BTreeMap<String, Vec<&SitemapEntry>> = BTreeMap::new();
            for entry in &sorted {
                groups
                    .entry(containing_directory(&entry.relative_path))
                    .or_default()
                    .push(entry);
            }
            for (directory, members) in &groups {
                writeln!(doc, "\n* {}", directory).unwrap();
                for entry in members {
                    writeln!(doc, "{}", entry_line(entry)).unwrap();
                }
            }
        }
    }
    doc
}

fn entry_line(entry: &SitemapEntry) -> String {
    let target = html_path(&entry.relative_path);
    match &entry.date {
        Some(date) => format!(
            "- [[file:{}][{}]] ({})",
            target,
            entry.display_title(),
            date
        ),
        None => format!("- [[file:{}][{}]]", target, entry.display_title()),
    }
}

fn html_path(relative: &str) -> String {
    crate::publish::rewrite_extension(Path::new(relative))
        .to_string_lossy()
        .replace('\\', "/")
}

fn containing_directory(relative: &str) -> String {
    match Path::new(relative).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().replace('\\', "/")
        }
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, title: &str, date: Option<&str>) -> SitemapEntry {
        SitemapEntry {
            relative_path: path.to_string(),
            title: Some(title.to_string()),
            date: date.map(str::to_string),
        }
    }

    fn flat(file: &str, title: Option<&str>, part: Option<&str>, level: usize) -> FlatTocEntry {
        FlatTocEntry {
            file: file.to_string(),
            title: title.map(str::to_string),
            part: part.map(str::to_string),
            level,
            index: 0,
            prev: None,
            next: None,
        }
    }

    // =========================================================================
    // Auto sitemap: sorting
    // =========================================================================

    #[test]
    fn chronological_sort_ascending() {
        let entries = vec![
            entry("b.org", "B", Some("2026-01-10")),
            entry("c.org", "C", Some("2026-01-15")),
            entry("a.org", "A", Some("2026-01-01")),
        ];
        let doc = auto_sitemap_document(
            "Map",
            &entries,
            SitemapStyle::List,
            SitemapSort::Chronologically,
        );
        let a = doc.find("[A]").unwrap();
        let b = doc.find("[B]").unwrap();
        let c = doc.find("[C]").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn anti_chronological_sort_descending() {
        let entries = vec![
            entry("a.org", "A", Some("2026-01-01")),
            entry("b.org", "B", Some("2026-01-10")),
            entry("c.org", "C", Some("2026-01-15")),
        ];
        let doc = auto_sitemap_document(
            "Map",
            &entries,
            SitemapStyle::List,
            SitemapSort::AntiChronologically,
        );
        let a = doc.find("[A]").unwrap();
        let b = doc.find("[B]").unwrap();
        let c = doc.find("[C]").unwrap();
        assert!(c < b && b < a);
    }

    #[test]
    fn alphabetical_sort_by_title() {
        let entries = vec![
            entry("z.org", "Zebra", None),
            entry("a.org", "Aardvark", None),
            entry("m.org", "Mole", None),
        ];
        let doc = auto_sitemap_document(
            "Map",
            &entries,
            SitemapStyle::List,
            SitemapSort::Alphabetically,
        );
        let a = doc.find("Aardvark").unwrap();
        let m = doc.find("Mole").unwrap();
        let z = doc.find("Zebra").unwrap();
        assert!(a < m && m < z);
    }

    #[test]
    fn missing_dates_sort_as_epoch() {
        let entries = vec![
            entry("dated.org", "Dated", Some("2026-01-01")),
            entry("undated.org", "Undated", None),
        ];
        let doc = auto_sitemap_document(
            "Map",
            &entries,
            SitemapStyle::List,
            SitemapSort::Chronologically,
        );
        assert!(doc.find("Undated").unwrap() < doc.find("Dated").unwrap());
    }

    // =========================================================================
    // Auto sitemap: rendering
    // =========================================================================

    #[test]
    fn entries_rewritten_to_html_with_date_suffix() {
        let entries = vec![entry("posts/one.md", "One", Some("2026-02-01"))];
        let doc =
            auto_sitemap_document("Map", &entries, SitemapStyle::List, SitemapSort::default());
        assert!(doc.contains("- [[file:posts/one.html][One]] (2026-02-01)"));
    }

    #[test]
    fn undated_entries_have_no_suffix() {
        let entries = vec![entry("page.org", "Page", None)];
        let doc =
            auto_sitemap_document("Map", &entries, SitemapStyle::List, SitemapSort::default());
        assert!(doc.contains("- [[file:page.html][Page]]\n"));
        assert!(!doc.contains("()"));
    }

    #[test]
    fn untitled_entries_fall_back_to_path() {
        let entries = vec![SitemapEntry {
            relative_path: "raw.org".to_string(),
            title: None,
            date: None,
        }];
        let doc =
            auto_sitemap_document("Map", &entries, SitemapStyle::List, SitemapSort::default());
        assert!(doc.contains("[[file:raw.html][raw.org]]"));
    }

    #[test]
    fn document_carries_title_keyword() {
        let doc = auto_sitemap_document("Archive", &[], SitemapStyle::List, SitemapSort::default());
        assert!(doc.starts_with("#+TITLE: Archive\n"));
    }

    #[test]
    fn tree_style_groups_by_directory() {
        let entries = vec![
            entry("index.org", "Home", None),
            entry("guide/a.org", "Guide A", None),
            entry("guide/b.org", "Guide B", None),
        ];
        let doc =
            auto_sitemap_document("Map", &entries, SitemapStyle::Tree, SitemapSort::default());
        assert!(doc.contains("* /\n"));
        assert!(doc.contains("* guide\n"));
        let guide_heading = doc.find("* guide").unwrap();
        assert!(doc.find("Guide A").unwrap() > guide_heading);
        assert!(doc.find("Guide B").unwrap() > guide_heading);
    }

    // =========================================================================
    // TOC-structured sitemap
    // =========================================================================

    #[test]
    fn toc_document_headings_per_part() {
        let flat_entries = vec![
            flat("index", None, None, 0),
            flat("intro", Some("Introduction"), Some("Basics"), 1),
            flat("internals", None, Some("Advanced"), 1),
        ];
        let doc = toc_sitemap_document("Contents", &flat_entries, &HashMap::new());
        assert!(doc.contains("* Basics"));
        assert!(doc.contains("* Advanced"));
        assert!(doc.contains("- [[file:index.html][index]]"));
        assert!(doc.contains("- [[file:intro.html][Introduction]]"));
        assert!(doc.contains("- [[file:internals.html][internals]]"));
    }

    #[test]
    fn toc_document_title_resolution_order() {
        let flat_entries = vec![flat("guide", Some("Toc Title"), None, 1)];
        let mut titles = HashMap::new();
        titles.insert("guide".to_string(), "Published Title".to_string());

        let doc = toc_sitemap_document("Contents", &flat_entries, &titles);
        assert!(doc.contains("[[file:guide.html][Published Title]]"));

        let doc = toc_sitemap_document("Contents", &flat_entries, &HashMap::new());
        assert!(doc.contains("[[file:guide.html][Toc Title]]"));
    }

    #[test]
    fn toc_document_nests_sections() {
        let flat_entries = vec![
            flat("ch", None, None, 1),
            flat("ch-a", None, None, 2),
            flat("ch-a-1", None, None, 3),
        ];
        let doc = toc_sitemap_document("Contents", &flat_entries, &HashMap::new());
        assert!(doc.contains("\n- [[file:ch.html]"));
        assert!(doc.contains("\n  - [[file:ch-a.html]"));
        assert!(doc.contains("\n    - [[file:ch-a-1.html]"));
    }
}
