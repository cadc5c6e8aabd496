//! Links from notebooks back to the rendered book pages.

use std::path::Path;
use url::Url;

/// Base that scheme-relative and bare-path base URLs are resolved against.
const PLACEHOLDER_BASE: &str = "http://localhost/";

/// Returns the path component of `baseurl`, without a trailing `/`.
///
/// `https://example.org/course/` gives `/course`; a bare path resolves from
/// the site root. Query strings and fragments are dropped.
///
/// # Errors
///
/// Returns an error if `baseurl` is not a valid absolute or relative URL.
pub fn url_path(baseurl: &str) -> Result<String, url::ParseError> {
    let url = match Url::parse(baseurl) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(PLACEHOLDER_BASE)?.join(baseurl)?
        }
        Err(e) => return Err(e),
    };
    Ok(url.path().trim_end_matches('/').to_string())
}

/// Percent-encodes `path`, keeping ASCII letters, digits, `_.-~` and `/`.
pub fn quote_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// URL of the rendered page for the source file at `rel_path`.
///
/// `rel_path` is relative to the book root and uses `/` separators.
pub fn page_url(base_path: &str, rel_path: &str) -> String {
    let html = Path::new(rel_path).with_extension("html");
    let html = html.to_string_lossy().replace('\\', "/");
    format!("{}/{}", base_path, quote_path(&html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("https://example.org/course/").unwrap(), "/course");
        assert_eq!(url_path("https://example.org").unwrap(), "");
        assert_eq!(url_path("//cdn.example.org/a/b?x=1#top").unwrap(), "/a/b");
        assert_eq!(url_path("/site/").unwrap(), "/site");
        assert_eq!(url_path("site/").unwrap(), "/site");
        assert_eq!(url_path("").unwrap(), "");
    }

    #[test]
    fn test_url_path_rejects_invalid_host() {
        assert!(url_path("https://exa mple.org/").is_err());
    }

    #[test]
    fn test_quote_path() {
        assert_eq!(quote_path("ch 1/intro.html"), "ch%201/intro.html");
        assert_eq!(quote_path("a~b_c-d.html"), "a~b_c-d.html");
        assert_eq!(quote_path("café.html"), "caf%C3%A9.html");
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url("/course", "chapter one/loops.md"),
            "/course/chapter%20one/loops.html"
        );
        assert_eq!(page_url("", "intro.md"), "/intro.html");
    }
}
