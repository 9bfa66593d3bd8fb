//! URL modeling and destination naming.
//!
//! A destination comes from, in order: the name the caller asked for, the
//! server's Content-Disposition filename, the last segment of the final URL,
//! and finally [`DEFAULT_FILENAME`]. Server-supplied names are sanitized;
//! caller-supplied names are trusted.

mod content_disposition;
mod path;
mod sanitize;

use std::path::{Path, PathBuf};

pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename_for_linux;

/// Used when neither the server nor the URL yield a usable name.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Derives a safe file name from server data only.
///
/// - `derive_filename("https://example.com/archive.zip", None)` → `"archive.zip"`
/// - `derive_filename("https://example.com/", Some("attachment; filename=\"report.pdf\""))` → `"report.pdf"`
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(parse_content_disposition_filename)
        .map(|name| sanitize_filename_for_linux(&name))
        .filter(|name| !name.is_empty())
        .or_else(|| {
            filename_from_url_path(url)
                .map(|name| sanitize_filename_for_linux(&name))
                .filter(|name| !name.is_empty())
        });

    candidate.unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Resolves the absolute destination of one download.
///
/// A relative `explicit` name is joined onto `download_dir`; an absolute one
/// is kept as-is.
pub fn resolve_destination(
    download_dir: &Path,
    explicit: Option<&Path>,
    url: &str,
    content_disposition: Option<&str>,
) -> PathBuf {
    match explicit.filter(|p| p.file_name().is_some()) {
        Some(name) if name.is_absolute() => name.to_path_buf(),
        Some(name) => download_dir.join(name),
        None => download_dir.join(derive_filename(url, content_disposition)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_from_url_path() {
        assert_eq!(derive_filename("https://example.com/archive.zip", None), "archive.zip");
        assert_eq!(
            derive_filename("https://cdn.example.com/path/to/debian-12.iso", None),
            "debian-12.iso"
        );
    }

    #[test]
    fn decoded_spaces_are_kept() {
        assert_eq!(derive_filename("https://example.com/my%20file.txt", None), "my file.txt");
        assert_eq!(
            derive_filename("https://example.com/x", Some("attachment; filename=\"Q3 report.pdf\"")),
            "Q3 report.pdf"
        );
    }

    #[test]
    fn disposition_overrides_url() {
        assert_eq!(
            derive_filename(
                "https://example.com/archive.zip",
                Some("attachment; filename=\"real-name.tar.gz\"")
            ),
            "real-name.tar.gz"
        );
    }

    #[test]
    fn unusable_disposition_falls_back_to_url() {
        assert_eq!(
            derive_filename("https://example.com/data.csv", Some("attachment; filename=\"..\"")),
            "data.csv"
        );
    }

    #[test]
    fn default_when_nothing_usable() {
        assert_eq!(derive_filename("https://example.com/", None), DEFAULT_FILENAME);
        assert_eq!(derive_filename("https://example.com/..", None), DEFAULT_FILENAME);
    }

    #[test]
    fn explicit_name_has_priority() {
        let dir = Path::new("/srv/downloads");
        assert_eq!(
            resolve_destination(
                dir,
                Some(Path::new("mine.bin")),
                "https://example.com/theirs.bin",
                Some("attachment; filename=server.bin")
            ),
            PathBuf::from("/srv/downloads/mine.bin")
        );
        assert_eq!(
            resolve_destination(dir, Some(Path::new("/tmp/abs.bin")), "https://example.com/x", None),
            PathBuf::from("/tmp/abs.bin")
        );
        assert_eq!(
            resolve_destination(dir, None, "https://example.com/x.iso", None),
            PathBuf::from("/srv/downloads/x.iso")
        );
    }
}
