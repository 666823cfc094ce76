use std::sync::LazyLock;

use regex::Regex;

/// Pattern families in priority order: canonical `@`, then `[at]`, then `(at)`.
/// Each tolerates whitespace around the separator and needs a dotted domain
/// ending in a label of at least two letters.
static FAMILIES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        family(r"@"),
        family(r"\[at\]"),
        family(r"\(at\)"),
    ]
});

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[at\]|\(at\)").expect("separator pattern is valid"));

fn family(separator: &str) -> Regex {
    let pattern = format!(r"(?i)[A-Za-z0-9_.\-]+\s*{separator}\s*[A-Za-z0-9_.\-]+\.[A-Za-z]{{2,}}");
    Regex::new(&pattern).expect("email family pattern is valid")
}

/// Asset extensions that look like a top-level label after an `@`
/// (`logo@2x.png`) but never end a real address.
const STATIC_RESOURCE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tiff", "ico", "css", "js", "pdf", "doc",
    "docx", "xls", "xlsx", "ppt", "pptx", "zip", "rar", "tar", "gz", "mp3", "mp4", "avi", "mov",
    "wmv", "flv", "wav", "ogg", "webm",
];

pub fn is_static_resource(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    STATIC_RESOURCE_EXTENSIONS
        .iter()
        .any(|ext| lower.strip_suffix(ext).is_some_and(|rest| rest.ends_with('.')))
}

/// Replace `(at)` / `[at]` with `@` and drop every whitespace character.
pub fn normalize_email(raw: &str) -> String {
    SEPARATOR
        .replace_all(raw, "@")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailExtractor {
    reject_static_resources: bool,
}

impl Default for EmailExtractor {
    fn default() -> Self {
        Self {
            reject_static_resources: true,
        }
    }
}

impl EmailExtractor {
    pub fn new(reject_static_resources: bool) -> Self {
        Self {
            reject_static_resources,
        }
    }

    /// First match of the highest-priority family that matches anywhere in
    /// `text`, normalized. Empty string when nothing matches.
    pub fn extract(&self, text: &str) -> String {
        for family in FAMILIES.iter() {
            let hit = family
                .find_iter(text)
                .map(|m| normalize_email(m.as_str()))
                .find(|candidate| !(self.reject_static_resources && is_static_resource(candidate)));
            if let Some(email) = hit {
                return email;
            }
        }
        String::new()
    }
}

/// Shorthand for the default extractor.
pub fn extract_email(text: &str) -> String {
    EmailExtractor::default().extract(text)
}
