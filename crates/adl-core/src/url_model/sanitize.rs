//! Linux-safe file name sanitization for server-supplied names.

/// Longest file name Linux accepts, in bytes.
const NAME_MAX: usize = 255;

/// Sanitizes a candidate file name.
///
/// Path separators, NUL and control characters become `_` (runs collapsed);
/// spaces inside the name are kept. Leading/trailing dots, whitespace and
/// underscores are stripped so the result can never name a parent directory
/// or a hidden file. Output is capped at `NAME_MAX` bytes on a char boundary.
pub fn sanitize_filename_for_linux(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = matches!(c, '/' | '\\' | '\0') || c.is_control();
        if unsafe_char {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c: char| c == '.' || c == '_' || c.is_whitespace());
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
