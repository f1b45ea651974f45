use std::sync::OnceLock;

use regex::Regex;

static URL_RE: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_RE.get_or_init(|| {
        // scheme://host[:port], then everything after the first slash up to
        // whitespace. Path, query and fragment characters like +;~,:@ are
        // all legal there, so no character class tries to enumerate them.
        Regex::new(r"https?://[-\w.]+(?::\d+)?(?:/\S*)?").expect("invalid URL regex")
    })
}

/// Extracts candidate URLs from message text, in first-seen order.
///
/// Duplicates within the same message are preserved; dedup happens at the
/// publication store, keyed by URL. No matches is not an error.
pub fn extract_urls(text: &str) -> Vec<String> {
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_http_and_https() {
        let urls = extract_urls("see http://a.example/x and https://b.example/y?q=1");
        assert_eq!(urls, vec!["http://a.example/x", "https://b.example/y?q=1"]);
    }

    #[test]
    fn preserves_duplicates_and_order() {
        let urls = extract_urls("check this out http://a.example/x and http://a.example/x");
        assert_eq!(urls, vec!["http://a.example/x", "http://a.example/x"]);
    }

    #[test]
    fn no_urls_yields_empty_vec() {
        assert!(extract_urls("just words, no links").is_empty());
        assert!(extract_urls("").is_empty());
    }

    #[test]
    fn stops_at_whitespace() {
        let urls = extract_urls("https://a.example/path next-token");
        assert_eq!(urls, vec!["https://a.example/path"]);
    }

    #[test]
    fn handles_port_and_fragment() {
        let urls = extract_urls("dev server http://localhost:8080/docs#intro up");
        assert_eq!(urls, vec!["http://localhost:8080/docs#intro"]);
    }

    #[test]
    fn query_keeps_plus_and_semicolon() {
        let urls = extract_urls("result https://a.example/p?q=a+b;lang=en done");
        assert_eq!(urls, vec!["https://a.example/p?q=a+b;lang=en"]);
    }

    #[test]
    fn path_keeps_tilde_comma_colon_and_at() {
        let urls = extract_urls("paper https://a.example/~user/refs:1,2@rev end");
        assert_eq!(urls, vec!["https://a.example/~user/refs:1,2@rev"]);
    }

    #[test]
    fn ignores_other_schemes() {
        assert!(extract_urls("ftp://a.example/file mailto:x@y.z").is_empty());
    }
}
