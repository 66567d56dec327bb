//! Centralized naming for stored artifacts.
//!
//! An image is addressed by the filename it was uploaded with (its *key*).
//! Every derivative name is computed from that key, so an original, its
//! shrunk copy and its upscaled copy can always be found again from the key
//! alone:
//!
//! | Artifact | Name | Example (`beach.jpg`) |
//! |---|---|---|
//! | original | key | `beach.jpg` |
//! | shrunk | stem + lossy extension | `beach.webp` |
//! | upscaled | `upscaled_` + key | `upscaled_beach.jpg` |
//!
//! Date buckets are named `YYYY-MM-DD`.

use chrono::NaiveDate;
use std::path::Path;

/// Prefix of every upscaled derivative.
pub const UPSCALED_PREFIX: &str = "upscaled_";

/// `strftime` pattern of a date bucket directory.
pub const BUCKET_FORMAT: &str = "%Y-%m-%d";

/// Whether `name` can be used as a key.
///
/// Keys become path components under the storage root, so anything that
/// could escape a bucket directory is refused.
pub fn is_valid_key(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Filename without its final extension. `archive.tar.gz` → `archive.tar`.
pub fn stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Name of the shrunk derivative of `filename`.
pub fn shrunk_filename(filename: &str, extension: &str) -> String {
    format!("{}.{}", stem(filename), extension)
}

/// Name of the upscaled derivative of `filename`.
pub fn upscaled_filename(filename: &str) -> String {
    format!("{UPSCALED_PREFIX}{filename}")
}

/// Directory name of the bucket for `date`.
pub fn bucket_name(date: NaiveDate) -> String {
    date.format(BUCKET_FORMAT).to_string()
}

/// Parse a bucket directory name. Anything that is not `YYYY-MM-DD` is not a
/// bucket.
pub fn parse_bucket_name(name: &str) -> Option<NaiveDate> {
    // chrono accepts unpadded fields; buckets are always zero-padded
    if name.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(name, BUCKET_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_filenames_are_valid_keys() {
        assert!(is_valid_key("beach.jpg"));
        assert!(is_valid_key("IMG 0042 (1).JPG"));
        assert!(is_valid_key(".hidden"));
    }

    #[test]
    fn traversal_and_separators_are_rejected() {
        for bad in ["", ".", "..", "../etc/passwd", "a/b.jpg", "a\\b.jpg", "nul\0.jpg"] {
            assert!(!is_valid_key(bad), "{bad:?}");
        }
    }

    #[test]
    fn stem_strips_last_extension_only() {
        assert_eq!(stem("beach.jpg"), "beach");
        assert_eq!(stem("archive.tar.gz"), "archive.tar");
        assert_eq!(stem("README"), "README");
    }

    #[test]
    fn shrunk_name_swaps_extension() {
        assert_eq!(shrunk_filename("beach.jpg", "webp"), "beach.webp");
        assert_eq!(shrunk_filename("scan.tiff", "jpg"), "scan.jpg");
        assert_eq!(shrunk_filename("noext", "webp"), "noext.webp");
    }

    #[test]
    fn upscaled_name_keeps_extension() {
        assert_eq!(upscaled_filename("beach.jpg"), "upscaled_beach.jpg");
    }

    #[test]
    fn bucket_names_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(bucket_name(date), "2024-03-09");
        assert_eq!(parse_bucket_name("2024-03-09"), Some(date));
    }

    #[test]
    fn non_bucket_names_are_ignored() {
        assert_eq!(parse_bucket_name("originals"), None);
        assert_eq!(parse_bucket_name("2024-3-9"), None);
        assert_eq!(parse_bucket_name("2024-02-30"), None);
        assert_eq!(parse_bucket_name(".catalog.json"), None);
    }
}
