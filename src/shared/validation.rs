use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for declared MIME types (`type/subtype`, optional parameters)
    /// - Valid: "application/pdf", "image/svg+xml", "text/plain; charset=utf-8"
    /// - Invalid: "pdf", "application/", "/pdf", "text plain"
    pub static ref CONTENT_TYPE_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*(\s*;.*)?$")
            .unwrap();

    /// Regex for filenames: no path separators and no control characters
    /// - Valid: "doc.pdf", "Rapport final (v2).docx", "archive.tar.gz"
    /// - Invalid: "../etc/passwd", "a/b.txt", "a\\b.txt"
    pub static ref FILENAME_REGEX: Regex = Regex::new(r"^[^/\\\x00-\x1F\x7F]+$").unwrap();
}

/// Lowercased extension of a filename, if it has one
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}
