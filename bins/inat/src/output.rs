//! Terminal output helpers

use anyhow::Result;
use inat_api_client::models::{Observation, Taxon};
use owo_colors::OwoColorize;
use serde::Serialize;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// Pretty-printed JSON on stdout
    Json,
}

impl OutputFormat {
    /// JSON requested
    pub fn is_json(self) -> bool {
        self == Self::Json
    }
}

/// Print `value` as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// One-line taxon summary
pub fn taxon_line(taxon: &Taxon) -> String {
    format!(
        "{:>9}  {:<12} {}  {}",
        taxon.id,
        taxon.rank,
        taxon.display_name(),
        format_count(usize::try_from(taxon.observations_count).unwrap_or(usize::MAX), "observation", "observations")
            .dimmed()
    )
}

/// One-line observation summary
pub fn observation_line(observation: &Observation) -> String {
    let place = observation.place_guess.as_deref().unwrap_or("unknown place");
    let date = observation.observed_on.as_deref().unwrap_or("undated");
    format!(
        "{:>11}  {:<9} {}  {}",
        observation.id,
        observation.quality_grade.as_str(),
        observation.display_name(),
        format!("{date}, {place}").dimmed()
    )
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    #[allow(clippy::cast_precision_loss)]
    let scaled = |unit: u64| bytes as f64 / unit as f64;

    if bytes >= GB {
        format!("{:.2} GB", scaled(GB))
    } else if bytes >= MB {
        format!("{:.2} MB", scaled(MB))
    } else if bytes >= KB {
        format!("{:.2} KB", scaled(KB))
    } else {
        format!("{bytes} B")
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "image", "images"), "1 image");
        assert_eq!(format_count(0, "image", "images"), "0 images");
    }

    #[test]
    fn test_taxon_line_uses_common_name() {
        let taxon = Taxon {
            id: 9083,
            name: "Pica pica".into(),
            rank: "species".into(),
            preferred_common_name: Some("Eurasian Magpie".into()),
            observations_count: 1,
            ..Taxon::default()
        };
        let line = taxon_line(&taxon);
        assert!(line.contains("Eurasian Magpie (Pica pica)"));
        assert!(line.contains("9083"));
    }
}
