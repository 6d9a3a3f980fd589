//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output. Colors follow
//! `owo_colors::set_override`, so `--no-color` turns them off everywhere.

use owo_colors::{OwoColorize, Stream};
use variantkit_core::validation::ValidationIssue;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".if_supports_color(Stream::Stdout, |t| t.green()), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".if_supports_color(Stream::Stderr, |t| t.red()), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".if_supports_color(Stream::Stderr, |t| t.yellow()), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".if_supports_color(Stream::Stdout, |t| t.blue()), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.if_supports_color(Stream::Stdout, |t| t.bold()));
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print an error for each issue
    pub fn issues_as_errors(issues: &[ValidationIssue]) {
        for issue in issues {
            Self::error(&format_issue(issue));
        }
    }

    /// Print a warning for each issue
    pub fn issues_as_warnings(issues: &[ValidationIssue]) {
        for issue in issues {
            Self::warning(&format_issue(issue));
        }
    }
}

/// `field: message [CODE]`, plus expected/actual when known
pub fn format_issue(issue: &ValidationIssue) -> String {
    let mut line = format!("{}: {} [{}]", issue.field, issue.message, issue.code);
    match (&issue.expected, &issue.actual) {
        (Some(expected), Some(actual)) => {
            line.push_str(&format!(" (expected {}, got {})", expected, actual));
        }
        (Some(expected), None) => line.push_str(&format!(" (expected {})", expected)),
        _ => {}
    }
    line
}

/// Print aligned `label  value` rows
pub fn print_fields(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        let label = format!("{:width$}", label, width = width);
        println!("  {}  {}", label.if_supports_color(Stream::Stdout, |t| t.dimmed()), value);
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
