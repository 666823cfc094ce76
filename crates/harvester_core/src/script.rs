//! Site-specific pre-pass for detail pages of one listing site.
//!
//! That site hides the contact address in an inline script as
//! `let eee = '<encoded>'`, where a marker string stands in for `@` and a
//! second one for `.com`. This is a literal substitution for that markup only,
//! not a general de-obfuscation step. Anything it misses falls through to the
//! standard [`EmailExtractor`](crate::EmailExtractor).

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"let\s+eee\s*=\s*['"]([^'"]+)['"]"#).expect("script pattern is valid")
});

static MAILTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"mailto:([a-zA-Z0-9_.+\-]+@[a-zA-Z0-9\-]+\.[a-zA-Z0-9\-.]+)")
        .expect("mailto pattern is valid")
});

/// Marker strings substituted back into the encoded address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptObfuscation {
    pub at_marker: String,
    pub dot_com_marker: String,
}

impl Default for ScriptObfuscation {
    fn default() -> Self {
        Self {
            at_marker: "#109#103#.cn".to_string(),
            dot_com_marker: "#103#example123cn".to_string(),
        }
    }
}

impl ScriptObfuscation {
    /// Decode the `let eee = '…'` assignment, if present. Each marker is
    /// replaced once; the result is only accepted if it contains an `@`.
    pub fn decode(&self, html: &str) -> Option<String> {
        let encoded = SCRIPT_ASSIGNMENT.captures(html)?.get(1)?.as_str();
        let email = encoded
            .replacen(&self.at_marker, "@", 1)
            .replacen(&self.dot_com_marker, ".com", 1);
        email.contains('@').then_some(email)
    }

    /// Script assignment first, then the first `mailto:` link.
    pub fn prepass(&self, html: &str) -> Option<String> {
        self.decode(html).or_else(|| mailto_address(html))
    }
}

pub fn mailto_address(html: &str) -> Option<String> {
    MAILTO
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_marker_assignment() {
        let html = r#"<script>let eee = 'sales#109#103#.cnsolar#103#example123cn';</script>"#;
        assert_eq!(
            ScriptObfuscation::default().decode(html).as_deref(),
            Some("sales@solar.com")
        );
    }

    #[test]
    fn assignment_without_marker_is_ignored() {
        let html = r#"<script>let eee = "nothing-here";</script>"#;
        assert_eq!(ScriptObfuscation::default().decode(html), None);
    }

    #[test]
    fn falls_back_to_mailto() {
        let html = r#"<a href="mailto:hello@panel.co.uk">write</a>"#;
        assert_eq!(
            ScriptObfuscation::default().prepass(html).as_deref(),
            Some("hello@panel.co.uk")
        );
    }
}
