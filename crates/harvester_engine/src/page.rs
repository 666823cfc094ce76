use scraper::{Html, Selector};

/// Default selector for the company website link on listing detail pages.
pub const DEFAULT_SECONDARY_LINK_SELECTOR: &str = r#"a[itemprop="url"]"#;

/// Parsed HTML page, queried for its visible text and one attribute.
pub struct PageDocument {
    doc: Html,
}

impl PageDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    /// All text nodes of the document, concatenated in document order.
    pub fn text(&self) -> String {
        self.doc.root_element().text().collect()
    }

    /// `href` of the first element matching `selector`, trimmed, if non-empty.
    pub fn first_href(&self, selector: &Selector) -> Option<String> {
        self.doc
            .select(selector)
            .find_map(|element| element.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
    }
}

pub fn parse_selector(raw: &str) -> Result<Selector, String> {
    Selector::parse(raw).map_err(|err| format!("invalid selector {raw:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_includes_nested_nodes() {
        let page = PageDocument::parse("<html><body><p>Mail: <b>info</b>@x.de</p></body></html>");
        assert!(page.text().contains("Mail: info@x.de"));
    }

    #[test]
    fn first_href_uses_selector() {
        let page = PageDocument::parse(
            r#"<a href="/home">home</a><a itemprop="url" href=" https://solar.example/ ">site</a>"#,
        );
        let selector = parse_selector(DEFAULT_SECONDARY_LINK_SELECTOR).unwrap();
        assert_eq!(page.first_href(&selector).as_deref(), Some("https://solar.example/"));
    }

    #[test]
    fn invalid_selector_is_reported() {
        assert!(parse_selector("a[").is_err());
    }
}
