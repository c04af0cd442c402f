//! Filesystem-safe names for folders and saved files

/// Longest title, in characters, used for folder and page file names
pub const MAX_TITLE_CHARS: usize = 40;

/// Folder name for a title: sanitized and cut to [`MAX_TITLE_CHARS`]
pub fn folder_name(title: &str) -> String {
    truncated(&sanitize(title, "untitled"), MAX_TITLE_CHARS)
}

/// `<sanitized title>.html`, with the title cut to [`MAX_TITLE_CHARS`]
pub fn page_file_name(title: &str) -> String {
    format!("{}.html", truncated(&sanitize(title, "untitled"), MAX_TITLE_CHARS))
}

/// Asset file name taken from a URL path segment
///
/// Percent escapes are decoded before sanitizing. Returns None when nothing
/// usable is left.
pub fn asset_file_name(segment: &str) -> Option<String> {
    let decoded = percent_decode(segment);
    let name = sanitize(&decoded, "");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn sanitize(input: &str, fallback: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    if compacted.is_empty() {
        return fallback.to_string();
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn truncated(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

fn percent_decode(segment: &str) -> String {
    let decoded = urlencoding::decode_binary(segment.as_bytes());
    String::from_utf8_lossy(&decoded).into_owned()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
