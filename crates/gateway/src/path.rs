/// File served when a request names no file.
pub const DEFAULT_FILE: &str = "index.html";

/// Normalize a client-supplied relative path.
///
/// Percent-decodes the input, strips NUL bytes, treats backslashes as
/// separators and drops empty and `.` segments. Returns `None` if any segment
/// is `..`, wherever it appears. An input that normalizes to nothing yields
/// [`DEFAULT_FILE`].
///
/// `+` is kept literally; only `%XX` escapes are decoded.
pub fn sanitize_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    let cleaned: String = String::from_utf8_lossy(&decoded)
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| if c == '\\' { '/' } else { c })
        .collect();

    let mut segments = Vec::new();
    for segment in cleaned.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            segment => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return Some(DEFAULT_FILE.to_string());
    }
    Some(segments.join("/"))
}
