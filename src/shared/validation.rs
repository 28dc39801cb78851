use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Characters that are not safe inside a storage locator segment.
    /// Anything outside `[A-Za-z0-9_-]` is collapsed into a single hyphen.
    pub static ref UNSAFE_SEGMENT_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_-]+").unwrap();
}

/// Maximum length of the human-readable part of a locator
const MAX_STEM_LENGTH: usize = 64;

/// Turn an uploaded file name into a locator-safe stem.
///
/// The extension is dropped, unsafe characters are collapsed and the result is
/// truncated. Returns "file" when nothing usable remains.
pub fn sanitize_file_stem(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    let cleaned = UNSAFE_SEGMENT_CHARS.replace_all(stem.trim(), "-");
    let cleaned: String = cleaned
        .trim_matches('-')
        .chars()
        .take(MAX_STEM_LENGTH)
        .collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Normalise a storage folder hint to safe `/`-separated segments
pub fn sanitize_folder(folder: &str) -> String {
    let segments: Vec<String> = folder
        .split('/')
        .map(|segment| {
            UNSAFE_SEGMENT_CHARS
                .replace_all(segment.trim(), "-")
                .trim_matches('-')
                .to_lowercase()
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        "uploads".to_string()
    } else {
        segments.join("/")
    }
}
