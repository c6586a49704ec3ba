//! Terminal reports.

use colored::Colorize;
use texkit_core::ProcessingReport;
use texkit_diff::{line_changes, Change, SequenceMatcher, Tag};
use texkit_doi::{doi_url, DoiCheck, DoiStatus, ValidationReport};

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    pub const fn show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Default log filter for this level
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "info",
            Self::Verbose => "debug",
        }
    }
}

fn rule(width: usize) -> String {
    "=".repeat(width)
}

pub fn print_assembly_summary(report: &ProcessingReport, verbosity: Verbosity) {
    println!("Processed {} files", report.files_processed);
    println!("Found {} citations", report.citations_found);
    println!("Found {} labels", report.labels_found);
    println!("Found {} references", report.references_found);

    println!("\n{}", rule(60));
    println!("{}", "LABEL AND REFERENCE SUMMARY".bold());
    println!("{}", rule(60));

    if !report.labels_by_type.is_empty() {
        println!("\nLabels found:");
        for (label_type, names) in &report.labels_by_type {
            println!("  {label_type}: {}", names.len());
            if verbosity.is_verbose() {
                for name in names {
                    println!("    - {name}");
                }
            }
        }
    }

    println!("\nReference validation:");
    if report.undefined_references.is_empty() {
        println!(
            "  All {} references are defined {}",
            report.references_found,
            "✓".green()
        );
    } else {
        println!(
            "  {} {} undefined reference(s):",
            "WARNING:".yellow().bold(),
            report.undefined_references.len()
        );
        for reference in &report.undefined_references {
            println!("    - {reference}");
        }
    }

    if report.unused_labels.is_empty() {
        println!("  All {} labels are referenced {}", report.labels_found, "✓".green());
    } else {
        println!(
            "  {} {} unused label(s):",
            "WARNING:".yellow().bold(),
            report.unused_labels.len()
        );
        for label in &report.unused_labels {
            println!("    - {} ({})", label.name, label.label_type);
        }
    }

    if !report.duplicate_labels.is_empty() {
        println!(
            "  {} {} duplicate label(s):",
            "WARNING:".yellow().bold(),
            report.duplicate_labels.len()
        );
        for duplicate in &report.duplicate_labels {
            println!("    - {} ({} definitions)", duplicate.name, duplicate.occurrences.len());
        }
    }

    if !report.missing_captions.is_empty() {
        println!(
            "  {} {} float label(s) without caption:",
            "WARNING:".yellow().bold(),
            report.missing_captions.len()
        );
        for info in &report.missing_captions {
            println!("    - {} ({})", info.label, info.caption_type);
        }
    }

    if !report.diagnostics.is_empty() {
        println!("\nWarnings:");
        for diagnostic in &report.diagnostics {
            println!("  - {diagnostic}");
        }
    }
    println!("{}\n", rule(60));
}

pub fn print_doi_result(position: usize, total: usize, check: &DoiCheck, verbosity: Verbosity) {
    println!("  [{position}/{total}] {} {}", check.status.symbol(), check.key);
    let show_url = verbosity.is_verbose()
        || matches!(check.status, DoiStatus::NonExists | DoiStatus::InternalError);
    if show_url {
        println!("      → {}", doi_url(&check.doi));
    }
}

fn print_key_section(title: &str, symbol: &str, keys: &[&str], report: &ValidationReport) {
    if keys.is_empty() {
        return;
    }
    println!("\n{}", rule(70));
    println!("{}", title.bold());
    println!("{}", rule(70));
    for key in keys {
        println!("  {symbol} {key}");
        if let Some(check) = report.results.iter().find(|r| r.key == *key) {
            println!("      → {}", doi_url(&check.doi));
        }
    }
}

pub fn print_doi_summary(report: &ValidationReport) {
    print_key_section(
        "NON-EXISTENT DOIs:",
        DoiStatus::NonExists.symbol(),
        &report.non_existent_keys(),
        report,
    );
    print_key_section(
        "DOIs WITH ERRORS (connection issues):",
        DoiStatus::InternalError.symbol(),
        &report.error_keys(),
        report,
    );

    let counts = report.counts();
    let count = |status: DoiStatus| counts.get(&status).copied().unwrap_or(0);

    println!("\n{}", rule(70));
    println!("{}", "DOI VALIDATION SUMMARY".bold());
    println!("{}", rule(70));
    println!("Total references in bibliography: {}", report.total_entries);
    println!("References with DOI:             {}", report.entries_with_doi);
    println!("Valid (Exists):                  {}", count(DoiStatus::Exists));
    println!("Valid (Validated - 401/403):     {}", count(DoiStatus::Validated));
    println!("Valid (Confirmed - 200):         {}", count(DoiStatus::Confirmed));
    println!("Valid (Cached):                  {}", count(DoiStatus::Cached));
    println!(
        "Non-existent DOIs:               {}",
        count(DoiStatus::NonExists).to_string().red()
    );
    println!(
        "Errors:                          {}",
        count(DoiStatus::InternalError).to_string().red()
    );
    if !report.skipped.is_empty() {
        println!("Skipped (limit reached):         {}", report.skipped.len());
    }
    println!("{}", rule(70));

    if report.all_valid() {
        println!("\n{} All DOIs validated successfully!", "✅".green());
        println!("{}", rule(70));
    }
}

/// Changed lines only: `-` removed, `+` added, `~` edited in place.
pub fn print_diff_preview(old: &str, new: &str) {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let matcher = SequenceMatcher::new(&old_lines, &new_lines);

    for op in matcher.opcodes() {
        match op.tag {
            Tag::Equal => {}
            Tag::Delete => {
                for line in &old_lines[op.a] {
                    println!("{}", format!("- {line}").red());
                }
            }
            Tag::Insert => {
                for line in &new_lines[op.b] {
                    println!("{}", format!("+ {line}").green());
                }
            }
            Tag::Replace => {
                let old_block = &old_lines[op.a];
                let new_block = &new_lines[op.b];
                for k in 0..old_block.len().max(new_block.len()) {
                    let old_line = old_block.get(k).copied().unwrap_or("");
                    let new_line = new_block.get(k).copied().unwrap_or("");
                    let rendered: String = line_changes(old_line, new_line)
                        .into_iter()
                        .map(|change| match change {
                            Change::Equal(text) => text.normal().to_string(),
                            Change::Removed(text) => text.red().strikethrough().to_string(),
                            Change::Added(text) => text.green().to_string(),
                        })
                        .collect();
                    println!("{} {rendered}", "~".yellow());
                }
            }
        }
    }
}
