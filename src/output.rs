//! CLI output formatting.
//!
//! Every command leads with the key it worked on, with artifacts shown as
//! indented context lines. Paths are relative to the storage root.
//!
//! # Output Format
//!
//! ## Shrink
//!
//! ```text
//! beach.jpg → 1000x1333 (3.2x smaller)
//!     Original: 2024-05-01/originals/beach.jpg
//!     Shrunk: 2024-05-01/shrunk/beach.webp
//! ```
//!
//! ## Upscale
//!
//! ```text
//! beach.jpg → 3000x4000 (RealESRGAN_x4plus)
//!     Original: 2024-05-01/originals/beach.jpg (3000x4000)
//!     Shrunk: 2024-05-01/shrunk/beach.webp (1000x1333)
//!     Upscaled: 2024-05-02/upscaled/upscaled_beach.jpg (3000x4000)
//! ```
//!
//! ## List
//!
//! ```text
//! Catalog (2 images)
//! 001 beach.jpg
//!     originals: 2024-05-01/originals/beach.jpg 3000x4000, 1.4 MB
//!     shrunk: 2024-05-01/shrunk/beach.webp 1000x1333, 88.0 KB
//! 002 cat.png
//!     ...
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::catalog::Catalog;
use crate::pipeline::{Locations, ShrinkReport, UpscaleReport};
use crate::storage::Located;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

/// Path below `root`, or the full path when it is elsewhere.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn artifact_line(label: &str, located: Option<&Located>) -> String {
    match located {
        Some(l) => format!("{}{}: {}", indent(1), label, l.relative_path()),
        None => format!("{}{}: none", indent(1), label),
    }
}

fn key_of(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Shrink
// ============================================================================

pub fn format_shrink_report(report: &ShrinkReport, root: &Path) -> Vec<String> {
    vec![
        format!(
            "{} → {}x{} ({})",
            key_of(&report.original_path),
            report.width,
            report.height,
            report.savings
        ),
        format!(
            "{}Original: {}",
            indent(1),
            display_path(&report.original_path, root)
        ),
        format!(
            "{}Shrunk: {}",
            indent(1),
            display_path(&report.shrunk_path, root)
        ),
    ]
}

pub fn print_shrink_report(report: &ShrinkReport, root: &Path) {
    for line in format_shrink_report(report, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Upscale
// ============================================================================

/// Strip the mount prefix from an artifact URL.
fn url_path(url: &str) -> &str {
    url.split_once('/').map(|(_, rest)| rest).unwrap_or(url)
}

pub fn format_upscale_report(key: &str, report: &UpscaleReport) -> Vec<String> {
    let shrunk = match &report.shrunk_url {
        Some(url) => format!("{} ({})", url_path(url), report.shrunk_res),
        None => "none".to_string(),
    };
    vec![
        format!("{} → {} ({})", key, report.up_res, report.upscaler),
        format!(
            "{}Original: {} ({})",
            indent(1),
            url_path(&report.original_url),
            report.orig_res
        ),
        format!("{}Shrunk: {}", indent(1), shrunk),
        format!(
            "{}Upscaled: {} ({})",
            indent(1),
            url_path(&report.upscaled_url),
            report.up_res
        ),
    ]
}

pub fn print_upscale_report(key: &str, report: &UpscaleReport) {
    for line in format_upscale_report(key, report) {
        println!("{}", line);
    }
}

// ============================================================================
// Locate
// ============================================================================

pub fn format_locations(locations: &Locations) -> Vec<String> {
    vec![
        locations.key.clone(),
        artifact_line("Original", locations.original.as_ref()),
        artifact_line("Shrunk", locations.shrunk.as_ref()),
        artifact_line("Upscaled", locations.upscaled.as_ref()),
    ]
}

pub fn print_locations(locations: &Locations) {
    for line in format_locations(locations) {
        println!("{}", line);
    }
}

// ============================================================================
// List
// ============================================================================

pub fn format_catalog(catalog: &Catalog) -> Vec<String> {
    if catalog.is_empty() {
        return vec!["Catalog is empty".to_string()];
    }
    let mut lines = vec![format!("Catalog ({} images)", catalog.len())];
    for (pos, (key, entries)) in catalog.entries.iter().enumerate() {
        lines.push(format!("{} {}", format_index(pos + 1), key));
        for entry in entries {
            lines.push(format!(
                "{}{}: {}/{}/{} {}x{}, {}",
                indent(1),
                entry.kind,
                entry.date,
                entry.kind,
                entry.file,
                entry.width,
                entry.height,
                format_bytes(entry.bytes)
            ));
        }
    }
    lines
}

pub fn print_catalog(catalog: &Catalog) {
    for line in format_catalog(catalog) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::storage::Subfolder;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(120), "120");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.5 MB");
    }

    #[test]
    fn display_path_outside_root_is_untouched() {
        assert_eq!(
            display_path(Path::new("/elsewhere/a.jpg"), Path::new("/storage")),
            "/elsewhere/a.jpg"
        );
    }

    // =========================================================================
    // Command output
    // =========================================================================

    #[test]
    fn shrink_report_lines() {
        let report = ShrinkReport {
            relative_url: "view_storage/2024-05-01/shrunk/beach.webp".into(),
            original_url: "view_storage/2024-05-01/originals/beach.jpg".into(),
            width: 1000,
            height: 1333,
            savings: "3.2x smaller".into(),
            original_path: PathBuf::from("/s/2024-05-01/originals/beach.jpg"),
            shrunk_path: PathBuf::from("/s/2024-05-01/shrunk/beach.webp"),
        };
        assert_eq!(
            format_shrink_report(&report, Path::new("/s")),
            vec![
                "beach.jpg → 1000x1333 (3.2x smaller)",
                "    Original: 2024-05-01/originals/beach.jpg",
                "    Shrunk: 2024-05-01/shrunk/beach.webp",
            ]
        );
    }

    #[test]
    fn upscale_report_without_shrunk() {
        let report = UpscaleReport {
            original_url: "view_storage/2024-05-01/originals/a.png".into(),
            shrunk_url: None,
            upscaled_url: "view_storage/2024-05-02/upscaled/upscaled_a.png".into(),
            orig_res: "30x40".into(),
            shrunk_res: "N/A".into(),
            up_res: "30x40".into(),
            upscaler: "cubic".into(),
            upscaled_path: PathBuf::from("/s/2024-05-02/upscaled/upscaled_a.png"),
        };
        let lines = format_upscale_report("a.png", &report);
        assert_eq!(lines[0], "a.png → 30x40 (cubic)");
        assert_eq!(lines[1], "    Original: 2024-05-01/originals/a.png (30x40)");
        assert_eq!(lines[2], "    Shrunk: none");
        assert_eq!(
            lines[3],
            "    Upscaled: 2024-05-02/upscaled/upscaled_a.png (30x40)"
        );
    }

    #[test]
    fn locations_mark_missing_artifacts() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let locations = Locations {
            key: "a.jpg".into(),
            original: Some(Located {
                date,
                subfolder: Subfolder::Originals,
                filename: "a.jpg".into(),
                path: PathBuf::from("/s/2024-05-01/originals/a.jpg"),
            }),
            shrunk: None,
            upscaled: None,
        };
        assert_eq!(
            format_locations(&locations),
            vec![
                "a.jpg",
                "    Original: 2024-05-01/originals/a.jpg",
                "    Shrunk: none",
                "    Upscaled: none",
            ]
        );
    }

    #[test]
    fn catalog_listing() {
        let mut catalog = Catalog::empty();
        catalog.record(
            "a.jpg",
            CatalogEntry {
                kind: Subfolder::Shrunk,
                date: "2024-05-01".into(),
                file: "a.webp".into(),
                width: 100,
                height: 75,
                bytes: 2048,
            },
        );
        assert_eq!(
            format_catalog(&catalog),
            vec![
                "Catalog (1 images)",
                "001 a.jpg",
                "    shrunk: 2024-05-01/shrunk/a.webp 100x75, 2.0 KB",
            ]
        );
    }

    #[test]
    fn empty_catalog_listing() {
        assert_eq!(format_catalog(&Catalog::empty()), vec!["Catalog is empty"]);
    }
}
