//! CLI output formatting for the `build` and `check` commands.
//!
//! Output is page-centric: each page is listed by position with its source
//! and output path on the header line, and the layout decision as an
//! indented context line. Layout files and loader diagnostics follow as
//! secondary sections.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Layouts
//! 001 default-layout
//!     Source: layouts/default-layout.twig
//! 002 static-layout
//!     Source: layouts/static-layout.twig
//!
//! Pages
//! 001 index.twig → index.html
//!     Layout: default layout default-layout (wrapped)
//! ```
//!
//! ## Build
//!
//! ```text
//! Pages
//! 001 index.twig → index.html
//!     Layout: default layout default-layout (wrapped)
//! 002 about.twig → about.html
//!     Layout: static layout static-layout
//!
//! Templates
//!     partials/nav.twig
//!         Source: /site/src/partials/nav.twig
//!     theme/base.twig (package)
//!         Source: /site/node_modules/theme/base.twig
//!
//! Removed layouts
//!     layouts/default-layout.twig
//!
//! Rendered 2 pages, removed 1 layout
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::{BuildReport, CheckReport, PageReport};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn page_lines(pages: &[PageReport]) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (i, page) in pages.iter().enumerate() {
        lines.push(format!(
            "{} {} \u{2192} {}",
            format_index(i + 1),
            page.source,
            page.output
        ));
        lines.push(format!("{}Layout: {}", indent(1), page.choice));
    }
    lines
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec!["Layouts".to_string()];
    for (i, (name, path)) in report.layouts.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), name));
        lines.push(format!("{}Source: {}", indent(1), path));
    }
    lines.push(String::new());
    lines.extend(page_lines(&report.pages));
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = page_lines(&report.pages);

    if !report.resolved_templates.is_empty() {
        lines.push(String::new());
        lines.push("Templates".to_string());
        for (path, name) in &report.resolved_templates {
            let label = if report.packages.contains_key(name) {
                format!("{} (package)", name)
            } else {
                name.clone()
            };
            lines.push(format!("{}{}", indent(1), label));
            lines.push(format!("{}Source: {}", indent(2), path.display()));
        }
    }

    if !report.removed_layouts.is_empty() {
        lines.push(String::new());
        lines.push("Removed layouts".to_string());
        for path in &report.removed_layouts {
            lines.push(format!("{}{}", indent(1), path));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Rendered {}, removed {}",
        plural(report.pages.len(), "page"),
        plural(report.removed_layouts.len(), "layout")
    ));
    lines
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
