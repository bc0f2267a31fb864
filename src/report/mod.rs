use crate::apply::{ApplyResult, ApplySummary};
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Print the session's apply results to the terminal, or write them as
/// markdown when a path is given.
#[instrument(skip(results), fields(results = results.len()))]
pub fn output(results: &[ApplyResult], output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing session report to terminal");
            print_terminal_report(results);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing session report to file");
            std::fs::write(path, render_markdown(results))?;
            Ok(())
        }
    }
}

/// Format and print the report with colors:
///
/// ═══ Branch protection updates ═══
///   ✓ acme/api (main)
///   ✗ acme/web (main): Validation Failed
///
/// Total: 2 | Succeeded: 1 | Failed: 1
fn print_terminal_report(results: &[ApplyResult]) {
    println!();
    println!("═══ Branch protection updates ═══");
    if results.is_empty() {
        println!("  No protection changes were applied this session.");
        println!();
        return;
    }

    for result in results {
        let line = format!("{} ({})", result.full_name(), result.branch);
        match &result.error {
            None if result.success => println!("  {} {}", "✓".green().bold(), line),
            error => println!(
                "  {} {}: {}",
                "✗".red().bold(),
                line,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    let summary = ApplySummary::from_results(results);
    println!();
    println!(
        "Total: {} | Succeeded: {} | Failed: {}",
        summary.total,
        summary.succeeded.to_string().green(),
        colorize_failed(summary.failed)
    );
    println!();
}

fn render_markdown(results: &[ApplyResult]) -> String {
    let mut md = String::from("# Branch protection updates\n\n");
    if results.is_empty() {
        md.push_str("No protection changes were applied this session.\n");
        return md;
    }

    let summary = ApplySummary::from_results(results);
    md.push_str(&format!(
        "**Total:** {} | **Succeeded:** {} | **Failed:** {}\n\n",
        summary.total, summary.succeeded, summary.failed
    ));
    md.push_str("| Repository | Branch | Result |\n|---|---|---|\n");
    for result in results {
        let outcome = if result.success {
            "applied".to_string()
        } else {
            format!("failed: {}", result.error.as_deref().unwrap_or("unknown error"))
        };
        md.push_str(&format!(
            "| `{}` | `{}` | {} |\n",
            result.full_name(),
            result.branch,
            outcome
        ));
    }
    md
}

fn colorize_failed(failed: usize) -> colored::ColoredString {
    if failed == 0 {
        failed.to_string().green()
    } else {
        failed.to_string().red().bold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(repo: &str, error: Option<&str>) -> ApplyResult {
        ApplyResult {
            owner: "acme".to_string(),
            repo: repo.to_string(),
            branch: "main".to_string(),
            success: error.is_none(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_markdown_lists_every_target() {
        let results = vec![
            result("api", None),
            result("web", Some("GitHub API returned 422: Validation Failed")),
        ];
        let md = render_markdown(&results);
        assert!(md.contains("**Total:** 2 | **Succeeded:** 1 | **Failed:** 1"));
        assert!(md.contains("| `acme/api` | `main` | applied |"));
        assert!(md.contains("failed: GitHub API returned 422: Validation Failed"));
    }

    #[test]
    fn test_markdown_for_empty_session() {
        let md = render_markdown(&[]);
        assert!(md.contains("No protection changes"));
        assert!(!md.contains("| Repository"));
    }

    #[test]
    fn test_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.md");
        output(&[result("api", None)], Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Branch protection updates"));
        assert!(content.contains("acme/api"));
    }

    #[test]
    fn test_output_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("session.md");
        assert!(matches!(
            output(&[], Some(&path)),
            Err(ReportError::FileWrite(_))
        ));
    }

    #[test]
    fn test_output_to_terminal() {
        // Should not panic
        output(&[result("api", None), result("web", Some("boom"))], None).unwrap();
        output(&[], None).unwrap();
    }
}
