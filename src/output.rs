//! CLI output formatting for publish runs and validation.
//!
//! Each surface has a `format_*` function returning lines (pure, testable)
//! and a `print_*` wrapper that writes them to stdout. The display is
//! information-first: every file leads with its positional index and source
//! path, with the output target and any error as context.
//!
//! ```text
//! site
//! 001 index.org → index.html
//!     Title: Home
//! 002 drafts/wip.org FAILED
//!     Error: include not found: drafts/missing.org
//! Published 1 of 2 files in 42 ms
//! ```

use crate::config::ValidationFinding;
use crate::orchestrate::PublishProjectResult;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Shorten a result path for display: the file name plus one parent level.
fn short_path(path: &str) -> String {
    let path = Path::new(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match path.parent().and_then(|p| p.file_name()) {
        Some(parent) => format!("{}/{}", parent.to_string_lossy(), name),
        None => name,
    }
}

/// Format the outcome of a workspace publish run.
pub fn format_publish_output(results: &[PublishProjectResult]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, project) in results.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(project.project_name.clone());

        for (pos, file) in project.files.iter().enumerate() {
            if file.success {
                lines.push(format!(
                    "{} {} → {}",
                    format_index(pos + 1),
                    short_path(&file.source_path),
                    short_path(&file.output_path),
                ));
                if let Some(title) = &file.title {
                    lines.push(format!("    Title: {}", title));
                }
                if let Some(date) = &file.date {
                    lines.push(format!("    Date: {}", date));
                }
            } else {
                lines.push(format!(
                    "{} {} FAILED",
                    format_index(pos + 1),
                    short_path(&file.source_path),
                ));
                if let Some(error) = &file.error {
                    lines.push(format!("    Error: {}", error));
                }
            }
        }

        lines.push(format!(
            "Published {} of {} files in {} ms",
            project.success_count, project.total_files, project.duration_ms
        ));
    }
    lines
}

/// Format validation findings, one `field: message` line each.
pub fn format_validation_output(findings: &[ValidationFinding]) -> Vec<String> {
    if findings.is_empty() {
        return vec!["Configuration is valid".to_string()];
    }
    let mut lines = vec![format!(
        "{} validation finding{}:",
        findings.len(),
        if findings.len() == 1 { "" } else { "s" }
    )];
    for finding in findings {
        lines.push(format!("    {}: {}", finding.field, finding.message));
    }
    lines
}

pub fn print_publish_output(results: &[PublishProjectResult]) {
    for line in format_publish_output(results) {
        println!("{}", line);
    }
}

pub fn print_validation_output(findings: &[ValidationFinding]) {
    for line in format_validation_output(findings) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::PublishFileResult;

    fn file_result(source: &str, output: &str, success: bool) -> PublishFileResult {
        PublishFileResult {
            source_path: source.to_string(),
            output_path: output.to_string(),
            success,
            error: (!success).then(|| "boom".to_string()),
            title: success.then(|| "A Title".to_string()),
            date: None,
        }
    }

    fn project_result(files: Vec<PublishFileResult>) -> PublishProjectResult {
        let success_count = files.iter().filter(|f| f.success).count();
        PublishProjectResult {
            project_name: "site".to_string(),
            total_files: files.len(),
            success_count,
            error_count: files.len() - success_count,
            duration_ms: 42,
            files,
        }
    }

    #[test]
    fn success_line_shows_arrow_and_title() {
        let result = project_result(vec![file_result("src/a.org", "out/a.html", true)]);
        let lines = format_publish_output(&[result]);
        assert!(lines.contains(&"001 src/a.org → out/a.html".to_string()));
        assert!(lines.contains(&"    Title: A Title".to_string()));
    }

    #[test]
    fn failure_line_shows_error() {
        let result = project_result(vec![file_result("src/bad.org", "out/bad.html", false)]);
        let lines = format_publish_output(&[result]);
        assert!(lines.contains(&"001 src/bad.org FAILED".to_string()));
        assert!(lines.contains(&"    Error: boom".to_string()));
    }

    #[test]
    fn summary_line_counts() {
        let result = project_result(vec![
            file_result("src/a.org", "out/a.html", true),
            file_result("src/b.org", "out/b.html", false),
        ]);
        let lines = format_publish_output(&[result]);
        assert_eq!(lines.last().unwrap(), "Published 1 of 2 files in 42 ms");
    }

    #[test]
    fn projects_separated_by_blank_line() {
        let a = project_result(vec![]);
        let mut b = project_result(vec![]);
        b.project_name = "other".to_string();
        let lines = format_publish_output(&[a, b]);
        let blank = lines.iter().position(|l| l.is_empty()).unwrap();
        assert_eq!(lines[blank + 1], "other");
    }

    #[test]
    fn valid_config_message() {
        let lines = format_validation_output(&[]);
        assert_eq!(lines, vec!["Configuration is valid"]);
    }

    #[test]
    fn findings_listed_with_fields() {
        let findings = vec![ValidationFinding {
            field: "projects.site.publishingDirectory".to_string(),
            message: "publishing directory must differ from base directory".to_string(),
        }];
        let lines = format_validation_output(&findings);
        assert_eq!(lines[0], "1 validation finding:");
        assert!(lines[1].contains("projects.site.publishingDirectory"));
    }
}
