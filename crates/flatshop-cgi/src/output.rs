//! Output formatting for the maintenance commands
//!
//! Provides consistent output formatting across commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! The `cgi` command never uses this; its stdout is the HTTP response.

use crate::commands::check::CheckReport;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print the result of a store check
    pub fn print_check_report(&self, report: &CheckReport) {
        match self.format {
            OutputFormat::Human => {
                println!("Store:      {}", report.db_dir);
                println!("Ids:        {}", report.id_strategy);
                println!();
                println!("Categories: {}", report.categories);
                println!("Items:      {}", report.items);
                println!("Images:     {}", report.images);

                if !report.staged_leftovers.is_empty() {
                    println!();
                    println!(
                        "── Leftover staged files ({}) ──",
                        report.staged_leftovers.len()
                    );
                    for path in &report.staged_leftovers {
                        println!("  {}", path);
                    }
                    println!("These are remains of interrupted creations and can be deleted.");
                }
            }
            OutputFormat::Json => match serde_json::to_string_pretty(report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to serialize report: {}", e),
            },
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_quiet_mode() {
        assert!(Output::new(OutputFormat::Quiet).is_quiet());
        assert!(!Output::new(OutputFormat::Json).is_quiet());
    }
}
