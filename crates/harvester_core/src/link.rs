use url::Url;

/// Resolve a link cell into an absolute URL.
///
/// Absolute links are used as they are; relative ones are joined onto `base`
/// when one is configured. Returns the parse error text otherwise.
pub fn resolve_link(raw: &str, base: Option<&Url>) -> Result<Url, String> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(trimmed).map_err(|err| err.to_string()),
            None => Err(format!("relative link without base url: {trimmed}")),
        },
        Err(err) => Err(err.to_string()),
    }
}
