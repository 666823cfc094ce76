use crate::{EmailExtractor, ScriptObfuscation};

/// Result of running an [`ExtractionPlan`] on one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// Resolved address, empty when nothing usable was found.
    pub email: String,
    /// Set when the found address was on the placeholder denylist.
    pub discarded: Option<String>,
}

/// Per-page email resolution: optional script pre-pass over the raw markup,
/// the standard extractor over the visible text, then the placeholder
/// denylist.
#[derive(Debug, Clone, Default)]
pub struct ExtractionPlan {
    pub extractor: EmailExtractor,
    pub script: Option<ScriptObfuscation>,
    pub placeholder_denylist: Vec<String>,
}

impl ExtractionPlan {
    pub fn run(&self, html: &str, text: &str) -> Extraction {
        let found = self
            .script
            .as_ref()
            .and_then(|script| script.prepass(html))
            .unwrap_or_else(|| self.extractor.extract(text));

        if self.is_placeholder(&found) {
            return Extraction {
                email: String::new(),
                discarded: Some(found),
            };
        }
        Extraction {
            email: found,
            discarded: None,
        }
    }

    /// Placeholder addresses are sites' stand-ins returned under rate limiting.
    pub fn is_placeholder(&self, email: &str) -> bool {
        !email.is_empty()
            && self
                .placeholder_denylist
                .iter()
                .any(|denied| denied.trim().eq_ignore_ascii_case(email.trim()))
    }
}
