use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Folds a display name into the key used by the name index.
///
/// Lower-cases, decomposes (NFD), maps `đ` to `d` (it has no canonical
/// decomposition), then drops combining marks and whitespace. Index builds
/// and scan lookups both go through here, so the two always agree.
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .nfd()
        .map(|c| if c == 'đ' { 'd' } else { c })
        .filter(|c| !is_combining_mark(*c) && !c.is_whitespace())
        .collect()
}
