//! Minimal indentation-sensitive YAML reader.
//!
//! Parses the subset of YAML that `_config.yml` and `_toc.yml` actually use:
//! mappings, nested mappings, and sequences of scalars or mappings. This is a
//! dedicated line scanner with an explicit indent stack — it does not aim for
//! round-trip fidelity with arbitrary YAML, and anchors, multi-line scalars,
//! and flow collections are out of scope.
//!
//! ## Supported shapes
//!
//! ```text
//! title: My Book
//! html:
//!   toc_depth: 2
//!   css_files:
//!     - custom.css
//! parts:
//!   - caption: Getting Started
//!     chapters:
//!       - file: intro
//!       - file: setup
//! ```
//!
//! A `- key: value` sequence item absorbs subsequent keys indented deeper
//! than the dash into the same item, so array-of-mapping entries spanning
//! several lines land on the most recently pushed item.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum YamlError {
    #[error("tab character in indentation at line {0}")]
    TabIndent(usize),
    #[error("malformed line {0}: {1}")]
    Malformed(usize, String),
}

/// Parsed YAML value. Scalars stay strings; callers coerce via the
/// `as_*` accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum YamlValue {
    Scalar(String),
    Sequence(Vec<YamlValue>),
    Mapping(Vec<(String, YamlValue)>),
}

impl YamlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            YamlValue::Scalar(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_str()? {
            "true" | "yes" | "on" => Some(true),
            "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_str()?.parse().ok()
    }

    pub fn as_sequence(&self) -> Option<&[YamlValue]> {
        match self {
            YamlValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, YamlValue)]> {
        match self {
            YamlValue::Mapping(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a key in a mapping. Returns `None` for non-mappings.
    pub fn get(&self, key: &str) -> Option<&YamlValue> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Dotted-path lookup, e.g. `get_path("html.toc_depth")`.
    pub fn get_path(&self, path: &str) -> Option<&YamlValue> {
        path.split('.').try_fold(self, |node, key| node.get(key))
    }

    /// Scalars of a sequence-valued key, skipping non-scalar items.
    pub fn string_list(&self) -> Vec<String> {
        self.as_sequence()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One significant source line: indent width, content, 1-based line number.
struct Line {
    indent: usize,
    text: String,
    number: usize,
}

/// Parse a YAML document into a value tree. The top level must be a mapping
/// or a sequence; an empty document parses to an empty mapping.
pub fn parse(input: &str) -> Result<YamlValue, YamlError> {
    let lines = scan_lines(input)?;
    if lines.is_empty() {
        return Ok(YamlValue::Mapping(Vec::new()));
    }
    let indent = lines[0].indent;
    let (value, consumed) = parse_block(&lines, 0, indent)?;
    if consumed < lines.len() {
        let stray = &lines[consumed];
        return Err(YamlError::Malformed(stray.number, stray.text.clone()));
    }
    Ok(value)
}

fn scan_lines(input: &str) -> Result<Vec<Line>, YamlError> {
    let mut out = Vec::new();
    for (idx, raw) in input.lines().enumerate() {
        let number = idx + 1;
        let trimmed_end = raw.trim_end();
        let content = trimmed_end.trim_start();
        if content.is_empty() || content.starts_with('#') || content == "---" {
            continue;
        }
        let indent_part = &trimmed_end[..trimmed_end.len() - content.len()];
        if indent_part.contains('\t') {
            return Err(YamlError::TabIndent(number));
        }
        out.push(Line {
            indent: indent_part.len(),
            text: content.to_string(),
            number,
        });
    }
    Ok(out)
}

/// Parse the block starting at `start` whose lines sit at exactly `indent`.
/// Returns the value and the index one past the last consumed line.
fn parse_block(lines: &[Line], start: usize, indent: usize) -> Result<(YamlValue, usize), YamlError> {
    if lines[start].text.starts_with('-') {
        parse_sequence(lines, start, indent)
    } else {
        parse_mapping(lines, start, indent)
    }
}

fn parse_sequence(
    lines: &[Line],
    start: usize,
    indent: usize,
) -> Result<(YamlValue, usize), YamlError> {
    let mut items = Vec::new();
    let mut i = start;
    while i < lines.len() && lines[i].indent == indent && lines[i].text.starts_with('-') {
        let line = &lines[i];
        let rest = line.text[1..].trim_start();
        // Indent of content within this item, for continuation keys.
        let item_indent = indent + (line.text.len() - rest.len());
        if rest.is_empty() {
            // Bare dash: the item is the following deeper block.
            i += 1;
            if i < lines.len() && lines[i].indent > indent {
                let (value, next) = parse_block(lines, i, lines[i].indent)?;
                items.push(value);
                i = next;
            } else {
                items.push(YamlValue::Scalar(String::new()));
            }
        } else if let Some((key, value)) = split_key_value(rest) {
            // Inline `- key: value` mapping item. Trailing keys indented past
            // the dash attach to this same item.
            let mut pairs = Vec::new();
            let mut next = i + 1;
            if value.is_empty() && next < lines.len() && lines[next].indent > item_indent {
                let (nested, after) = parse_block(lines, next, lines[next].indent)?;
                pairs.push((key, nested));
                next = after;
            } else {
                pairs.push((key, YamlValue::Scalar(value)));
            }
            while next < lines.len()
                && lines[next].indent > indent
                && !lines[next].text.starts_with('-')
            {
                let (more, after) = parse_mapping_entry(lines, next)?;
                pairs.push(more);
                next = after;
            }
            items.push(YamlValue::Mapping(pairs));
            i = next;
        } else {
            items.push(YamlValue::Scalar(unquote(rest)));
            i += 1;
        }
    }
    Ok((YamlValue::Sequence(items), i))
}

fn parse_mapping(
    lines: &[Line],
    start: usize,
    indent: usize,
) -> Result<(YamlValue, usize), YamlError> {
    let mut pairs = Vec::new();
    let mut i = start;
    while i < lines.len() && lines[i].indent == indent && !lines[i].text.starts_with('-') {
        let (pair, next) = parse_mapping_entry(lines, i)?;
        pairs.push(pair);
        i = next;
    }
    Ok((YamlValue::Mapping(pairs), i))
}

/// Parse one `key: ...` entry (plus any nested block) starting at `i`.
fn parse_mapping_entry(
    lines: &[Line],
    i: usize,
) -> Result<((String, YamlValue), usize), YamlError> {
    let line = &lines[i];
    let Some((key, value)) = split_key_value(&line.text) else {
        return Err(YamlError::Malformed(line.number, line.text.clone()));
    };
    if !value.is_empty() {
        return Ok(((key, YamlValue::Scalar(value)), i + 1));
    }
    // `key:` with no inline value: a nested block follows, either indented
    // deeper or (sequence style) a dash at the same indent.
    let next = i + 1;
    if next < lines.len() {
        let follower = &lines[next];
        if follower.indent > line.indent
            || (follower.indent == line.indent && follower.text.starts_with('-'))
        {
            let (nested, after) = parse_block(lines, next, follower.indent)?;
            return Ok(((key, nested), after));
        }
    }
    Ok(((key, YamlValue::Scalar(String::new())), next))
}

/// Split `key: value` at the first unquoted colon. Returns the unquoted
/// value, which is empty for `key:` lines.
fn split_key_value(text: &str) -> Option<(String, String)> {
    let colon = find_key_colon(text)?;
    let key = unquote(text[..colon].trim());
    let value = text[colon + 1..].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, unquote(strip_comment(value))))
}

/// Position of the colon terminating the key, skipping over quoted keys.
fn find_key_colon(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes[0] == b'"' || bytes[0] == b'\'' {
        let quote = bytes[0];
        let close = text[1..].find(quote as char)? + 1;
        return text[close..].find(':').map(|p| close + p);
    }
    // A colon only ends the key when followed by whitespace or end of line,
    // so values like `url: https://x` keep their scheme colon.
    let mut search = 0;
    while let Some(pos) = text[search..].find(':') {
        let at = search + pos;
        match bytes.get(at + 1) {
            None => return Some(at),
            Some(b' ') => return Some(at),
            _ => search = at + 1,
        }
    }
    None
}

fn strip_comment(value: &str) -> &str {
    if value.starts_with('"') || value.starts_with('\'') {
        return value;
    }
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    if v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')))
    {
        v[1..v.len() - 1].to_string()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_empty_mapping() {
        let v = parse("").unwrap();
        assert_eq!(v, YamlValue::Mapping(Vec::new()));
    }

    #[test]
    fn flat_mapping() {
        let v = parse("title: My Book\nauthor: Jane\n").unwrap();
        assert_eq!(v.get("title").unwrap().as_str(), Some("My Book"));
        assert_eq!(v.get("author").unwrap().as_str(), Some("Jane"));
    }

    #[test]
    fn nested_mapping() {
        let v = parse("html:\n  toc_depth: 2\n  use_default_theme: false\n").unwrap();
        assert_eq!(v.get_path("html.toc_depth").unwrap().as_usize(), Some(2));
        assert_eq!(
            v.get_path("html.use_default_theme").unwrap().as_bool(),
            Some(false)
        );
    }

    #[test]
    fn sequence_of_scalars() {
        let v = parse("css_files:\n  - a.css\n  - b.css\n").unwrap();
        assert_eq!(
            v.get("css_files").unwrap().string_list(),
            vec!["a.css", "b.css"]
        );
    }

    #[test]
    fn sequence_at_key_indent() {
        // Common style: dashes at the same indent as the key.
        let v = parse("chapters:\n- file: one\n- file: two\n").unwrap();
        let chapters = v.get("chapters").unwrap().as_sequence().unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].get("file").unwrap().as_str(), Some("one"));
    }

    #[test]
    fn sequence_item_continuation_keys_attach_to_last_item() {
        let input = "\
parts:
  - caption: Basics
    chapters:
      - file: intro
      - file: setup
  - caption: Advanced
    chapters:
      - file: internals
";
        let v = parse(input).unwrap();
        let parts = v.get("parts").unwrap().as_sequence().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].get("caption").unwrap().as_str(), Some("Basics"));
        let chapters = parts[0].get("chapters").unwrap().as_sequence().unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(parts[1].get("caption").unwrap().as_str(), Some("Advanced"));
        let chapters = parts[1].get("chapters").unwrap().as_sequence().unwrap();
        assert_eq!(chapters[0].get("file").unwrap().as_str(), Some("internals"));
    }

    #[test]
    fn nested_sections_within_chapter_item() {
        let input = "\
chapters:
  - file: guide
    sections:
      - file: guide-a
      - file: guide-b
";
        let v = parse(input).unwrap();
        let chapters = v.get("chapters").unwrap().as_sequence().unwrap();
        let sections = chapters[0].get("sections").unwrap().as_sequence().unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].get("file").unwrap().as_str(), Some("guide-b"));
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let v = parse("# header comment\n\ntitle: Site # trailing\n").unwrap();
        assert_eq!(v.get("title").unwrap().as_str(), Some("Site"));
    }

    #[test]
    fn quoted_scalars_unquoted() {
        let v = parse("title: \"Quoted: with colon\"\nother: 'single'\n").unwrap();
        assert_eq!(v.get("title").unwrap().as_str(), Some("Quoted: with colon"));
        assert_eq!(v.get("other").unwrap().as_str(), Some("single"));
    }

    #[test]
    fn url_value_keeps_scheme_colon() {
        let v = parse("url: https://example.com/page\n").unwrap();
        assert_eq!(
            v.get("url").unwrap().as_str(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn document_marker_skipped() {
        let v = parse("---\ntitle: X\n").unwrap();
        assert_eq!(v.get("title").unwrap().as_str(), Some("X"));
    }

    #[test]
    fn tab_indent_is_error() {
        let err = parse("html:\n\ttoc_depth: 2\n").unwrap_err();
        assert!(matches!(err, YamlError::TabIndent(2)));
    }

    #[test]
    fn empty_key_value_is_empty_scalar() {
        let v = parse("exclude:\ntitle: X\n").unwrap();
        assert_eq!(v.get("exclude").unwrap().as_str(), None);
        assert_eq!(v.get("title").unwrap().as_str(), Some("X"));
    }

    #[test]
    fn top_level_sequence() {
        let v = parse("- one\n- two\n").unwrap();
        let items = v.as_sequence().unwrap();
        assert_eq!(items[0].as_str(), Some("one"));
        assert_eq!(items[1].as_str(), Some("two"));
    }

    #[test]
    fn bare_dash_with_nested_mapping() {
        let input = "\
parts:
  -
    caption: Loose
    chapters:
      - file: only
";
        let v = parse(input).unwrap();
        let parts = v.get("parts").unwrap().as_sequence().unwrap();
        assert_eq!(parts[0].get("caption").unwrap().as_str(), Some("Loose"));
    }

    #[test]
    fn boolean_coercions() {
        let v = parse("a: true\nb: no\nc: maybe\n").unwrap();
        assert_eq!(v.get("a").unwrap().as_bool(), Some(true));
        assert_eq!(v.get("b").unwrap().as_bool(), Some(false));
        assert_eq!(v.get("c").unwrap().as_bool(), None);
    }
}
