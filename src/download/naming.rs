//! Destination naming rules for downloaded files

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extensions that are trusted as-is and never repaired from the content type
const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "png", "bmp", "pdf"];

/// Extension to use when a content type maps to several
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("text/html", "html"),
    ("text/plain", "txt"),
    ("application/xhtml+xml", "xhtml"),
    ("audio/mpeg", "mp3"),
    ("video/mp4", "mp4"),
];

/// Inserts a fresh random token before the extension: `a.jpg` -> `a.<uuid>.jpg`
pub fn unique_path(path: &Path) -> PathBuf {
    let token = Uuid::new_v4();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, token, ext.to_string_lossy()),
        None => format!("{}.{}", stem, token),
    };
    path.with_file_name(name)
}

/// Returns true if the path carries an image or PDF extension
pub fn is_media_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            MEDIA_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m))
        })
        .unwrap_or(false)
}

/// Picks the file extension for a `Content-Type` header value
///
/// Parameters such as `; charset=utf-8` are ignored. Returns None for
/// unknown or malformed types.
pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let essence = content_essence(content_type)?;
    let known = mime_guess::get_mime_extensions_str(&essence)?;

    PREFERRED_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| ext.to_string())
        .or_else(|| known.first().map(|ext| ext.to_string()))
}

/// Computes where a finished download should live given its content type
///
/// Returns None when the current name is already right: image and PDF
/// names are trusted, and so is any extension the content type allows.
/// Otherwise the file keeps its directory and stem (including a collision
/// token, if one was applied) and gets the content type's extension. When
/// the stem is unusable the base name becomes `<primary type>.<uuid>`.
pub fn repaired_path(path: &Path, content_type: &str) -> Option<PathBuf> {
    if is_media_path(path) {
        return None;
    }

    let essence = content_essence(content_type)?;
    let allowed = mime_guess::get_mime_extensions_str(&essence)?;
    let current = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    if let Some(current) = current.as_deref() {
        if allowed.iter().any(|ext| ext.eq_ignore_ascii_case(current)) {
            return None;
        }
    }

    let extension = extension_for_content_type(&essence)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with('.'));

    let name = match stem {
        Some(stem) => format!("{}.{}", stem, extension),
        None => {
            let primary = essence.split('/').next().unwrap_or("file");
            format!("{}.{}.{}", primary, Uuid::new_v4(), extension)
        }
    };

    Some(path.with_file_name(name))
}

fn content_essence(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    if essence.contains('/') {
        Some(essence)
    } else {
        None
    }
}
