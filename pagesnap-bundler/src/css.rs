//! Stylesheet processing: recursive `@import` flattening and rewriting of
//! relative `url(...)` references to absolute form.

use crate::fetch;
use crate::resolver;
use futures::future::BoxFuture;
use futures::FutureExt;
use regex::{Captures, Regex};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// How many import levels are fetched before the chain is silently cut.
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 3;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(([^)]+)\)|["']([^"']+)["'])\s*;?"#)
        .expect("invalid @import regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url\(([^)]+)\)").expect("invalid url() regex"));

fn trim_reference(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Rewrite every `url(...)` reference in `css` to its absolute form against
/// `base_url`. References the resolver leaves alone (`data:` URIs, `var()`
/// expressions, fragments, already-absolute URLs) keep their original token
/// byte for byte.
pub fn rewrite_asset_urls(css: &str, base_url: &str) -> String {
    URL_RE
        .replace_all(css, |caps: &Captures| {
            let reference = trim_reference(&caps[1]);
            let resolved = resolver::resolve(reference, base_url);
            if resolved == reference {
                caps[0].to_string()
            } else {
                format!("url('{}')", resolved)
            }
        })
        .into_owned()
}

/// Absolutize `@import` targets in place without inlining them. Targets
/// that are already absolute keep their original statement.
pub fn rewrite_import_targets(css: &str, base_url: &str) -> String {
    IMPORT_RE
        .replace_all(css, |caps: &Captures| {
            let target = trim_reference(
                caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str()),
            );
            let resolved = resolver::resolve(target, base_url);
            if resolved == target {
                caps[0].to_string()
            } else {
                format!("@import '{}';", resolved)
            }
        })
        .into_owned()
}

/// One-pass rewrite used for inline blocks and for non-recursive mode:
/// asset references and `@import` targets become absolute, nothing is
/// fetched or inlined.
pub fn rewrite_stylesheet(css: &str, base_url: &str) -> String {
    rewrite_import_targets(&rewrite_asset_urls(css, base_url), base_url)
}

/// Recursively fetches stylesheets and splices `@import` targets inline so
/// the final text is self-contained.
///
/// Termination is guaranteed twice over: the shared visited set breaks
/// cycles (a URL already on its ancestor path contributes nothing), and the
/// depth cap bounds adversarial import chains. Both cases resolve to an
/// empty contribution, never an error.
pub struct CssFlattener<'a> {
    client: &'a Client,
    max_depth: usize,
    timeout: Duration,
}

impl<'a> CssFlattener<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            max_depth: DEFAULT_MAX_IMPORT_DEPTH,
            timeout: fetch::ASSET_TIMEOUT,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch `css_url`, inline its imports depth-first, and rewrite the
    /// residual `url(...)` references against `css_url`.
    pub fn flatten<'s>(
        &'s self,
        css_url: &'s str,
        depth: usize,
        visited: &'s mut HashSet<String>,
    ) -> BoxFuture<'s, String> {
        async move {
            if depth >= self.max_depth {
                debug!("Import depth cap reached at {}", css_url);
                return String::new();
            }
            if !visited.insert(css_url.to_string()) {
                debug!("Skipping already-visited stylesheet {}", css_url);
                return String::new();
            }

            let Some(css) = fetch::fetch_text(self.client, css_url, self.timeout).await
            else {
                return String::new();
            };

            let mut inlined = String::with_capacity(css.len());
            let mut cursor = 0;
            for caps in IMPORT_RE.captures_iter(&css) {
                let statement = caps.get(0).expect("regex match has a full capture");
                let target = trim_reference(
                    caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str()),
                );
                inlined.push_str(&css[cursor..statement.start()]);
                let import_url = resolver::resolve(target, css_url);
                inlined.push_str(&self.flatten(&import_url, depth + 1, visited).await);
                cursor = statement.end();
            }
            inlined.push_str(&css[cursor..]);

            rewrite_asset_urls(&inlined, css_url)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn css_response(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/css")
            .set_body_string(body)
    }

    #[test]
    fn test_rewrite_relative_url() {
        let css = ".a { background: url(img/bg.png); }";
        let out = rewrite_asset_urls(css, "https://x.com/css/main.css");
        assert_eq!(out, ".a { background: url('https://x.com/css/img/bg.png'); }");
    }

    #[test]
    fn test_rewrite_quoted_and_root_relative_urls() {
        let css = r#".a { src: url("/fonts/a.woff2"); cursor: url('../c.svg'); }"#;
        let out = rewrite_asset_urls(css, "https://x.com/css/main.css");
        assert!(out.contains("url('https://x.com/fonts/a.woff2')"));
        assert!(out.contains("url('https://x.com/c.svg')"));
    }

    #[test]
    fn test_rewrite_leaves_data_uris_alone() {
        let css = ".a { background: url(data:image/gif;base64,R0lGOD); }";
        assert_eq!(rewrite_asset_urls(css, "https://x.com/a.css"), css);
    }

    #[test]
    fn test_rewrite_leaves_var_and_fragment_references_alone() {
        // The var() token contains a nested paren; a naive rewrite would
        // split it and corrupt the declaration.
        let css = ".a { background: url(var(--bg-image)); clip-path: url(#clip); }";
        assert_eq!(rewrite_asset_urls(css, "https://x.com/a.css"), css);
    }

    #[test]
    fn test_rewrite_import_targets() {
        let css = "@import 'reset.css';\n@import \"https://cdn.x.com/a.css\";\nbody { margin: 0 }";
        let out = rewrite_import_targets(css, "https://x.com/css/main.css");
        assert!(out.contains("@import 'https://x.com/css/reset.css';"));
        // Absolute target keeps its original statement.
        assert!(out.contains("@import \"https://cdn.x.com/a.css\";"));
    }

    #[tokio::test]
    async fn test_flatten_inlines_imported_rules() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/css/main.css"))
            .respond_with(css_response("@import 'reset.css';\n.main { color: red; }"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/css/reset.css"))
            .respond_with(css_response("* { margin: 0; }"))
            .mount(&mock_server)
            .await;

        let client = fetch::build_client(Duration::from_secs(2));
        let flattener = CssFlattener::new(&client);
        let mut visited = HashSet::new();
        let url = format!("{}/css/main.css", mock_server.uri());
        let out = flattener.flatten(&url, 0, &mut visited).await;

        assert!(out.contains("* { margin: 0; }"));
        assert!(out.contains(".main { color: red; }"));
        assert!(!out.contains("@import"));
        // Imported rules precede the importing stylesheet's own rules.
        assert!(out.find("margin").unwrap() < out.find(".main").unwrap());
    }

    #[tokio::test]
    async fn test_flatten_depth_cap_truncates_fourth_level() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/a.css"))
            .respond_with(css_response("@import 'b.css';\n.a { color: red; }"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.css"))
            .respond_with(css_response("@import 'c.css';\n.b { color: green; }"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c.css"))
            .respond_with(css_response("@import 'd.css';\n.c { color: blue; }"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/d.css"))
            .respond_with(css_response(".d { color: black; }"))
            .mount(&mock_server)
            .await;

        let client = fetch::build_client(Duration::from_secs(2));
        let flattener = CssFlattener::new(&client);
        let mut visited = HashSet::new();
        let url = format!("{}/a.css", mock_server.uri());
        let out = flattener.flatten(&url, 0, &mut visited).await;

        assert!(out.contains(".a"));
        assert!(out.contains(".b"));
        assert!(out.contains(".c"));
        assert!(!out.contains(".d"));
        assert!(!out.contains("@import"));
    }

    #[tokio::test]
    async fn test_flatten_terminates_on_import_cycle() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/a.css"))
            .respond_with(css_response("@import 'b.css';\n.a { color: red; }"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.css"))
            .respond_with(css_response("@import 'a.css';\n.b { color: green; }"))
            .mount(&mock_server)
            .await;

        let client = fetch::build_client(Duration::from_secs(2));
        let flattener = CssFlattener::new(&client);
        let mut visited = HashSet::new();
        let url = format!("{}/a.css", mock_server.uri());
        let out = flattener.flatten(&url, 0, &mut visited).await;

        assert_eq!(out.matches(".a {").count(), 1);
        assert_eq!(out.matches(".b {").count(), 1);
        assert!(!out.contains("@import"));
    }

    #[tokio::test]
    async fn test_flatten_import_url_form_and_rewrites() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/css/main.css"))
            .respond_with(css_response(
                "@import url(\"theme/dark.css\");\n.main { background: url(../img/bg.png); }",
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/css/theme/dark.css"))
            .respond_with(css_response(".dark { background: url(stars.png); }"))
            .mount(&mock_server)
            .await;

        let client = fetch::build_client(Duration::from_secs(2));
        let flattener = CssFlattener::new(&client);
        let mut visited = HashSet::new();
        let url = format!("{}/css/main.css", mock_server.uri());
        let out = flattener.flatten(&url, 0, &mut visited).await;

        // Imported content is rewritten against the imported file's URL.
        let base = mock_server.uri();
        assert!(out.contains(&format!("url('{}/css/theme/stars.png')", base)));
        assert!(out.contains(&format!("url('{}/img/bg.png')", base)));
    }

    #[tokio::test]
    async fn test_flatten_unreachable_stylesheet_is_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.css"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = fetch::build_client(Duration::from_secs(2));
        let flattener = CssFlattener::new(&client);
        let mut visited = HashSet::new();
        let url = format!("{}/missing.css", mock_server.uri());
        assert_eq!(flattener.flatten(&url, 0, &mut visited).await, "");
    }
}
