//! Single-pass document scan: everything the snapshot needs from the
//! markup is pulled out here, so the parsed tree never has to live across
//! an await point.

use crate::result::{AssetKind, AssetReference, OrderedMap};
use scraper::{Html, Selector};

/// The raw material extracted from one parsed document. Asset references
/// are unresolved (exactly as written in the markup); the orchestration
/// layer resolves and fetches them.
#[derive(Debug, Clone, Default)]
pub struct DocumentScan {
    /// The tree serialized back to markup.
    pub html: String,
    /// Stylesheet links, script sources, images, and preloaded fonts, each
    /// in document order within its kind.
    pub assets: Vec<AssetReference>,
    pub inline_styles: Vec<String>,
    pub inline_scripts: Vec<String>,
    pub title: String,
    pub description: String,
    pub html_attributes: OrderedMap,
    pub body_attributes: OrderedMap,
}

impl DocumentScan {
    /// References of one kind, in discovery order.
    pub fn refs_of(&self, kind: AssetKind) -> impl Iterator<Item = &str> {
        self.assets
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.url.as_str())
    }
}

pub fn scan_document(markup: &str) -> DocumentScan {
    let document = Html::parse_document(markup);

    let stylesheet_selector = Selector::parse(r#"link[rel~="stylesheet"]"#).unwrap();
    let script_selector = Selector::parse("script").unwrap();
    let style_selector = Selector::parse("style").unwrap();
    let image_selector = Selector::parse("img[src]").unwrap();
    let font_selector = Selector::parse(r#"link[rel~="preload"][as="font"]"#).unwrap();
    let title_selector = Selector::parse("title").unwrap();
    let description_selector = Selector::parse(r#"meta[name="description"]"#).unwrap();
    let body_selector = Selector::parse("body").unwrap();

    let mut assets = Vec::new();
    let mut inline_scripts = Vec::new();

    for link in document.select(&stylesheet_selector) {
        if let Some(href) = link.value().attr("href")
            && !href.is_empty()
        {
            assets.push(AssetReference {
                url: href.to_string(),
                kind: AssetKind::Stylesheet,
            });
        }
    }

    for script in document.select(&script_selector) {
        match script.value().attr("src") {
            Some(src) if !src.is_empty() => assets.push(AssetReference {
                url: src.to_string(),
                kind: AssetKind::Script,
            }),
            _ => {
                let text: String = script.text().collect();
                if !text.trim().is_empty() {
                    inline_scripts.push(text);
                }
            }
        }
    }

    for image in document.select(&image_selector) {
        if let Some(src) = image.value().attr("src")
            && !src.is_empty()
        {
            assets.push(AssetReference {
                url: src.to_string(),
                kind: AssetKind::Image,
            });
        }
    }

    for font in document.select(&font_selector) {
        if let Some(href) = font.value().attr("href")
            && !href.is_empty()
        {
            assets.push(AssetReference {
                url: href.to_string(),
                kind: AssetKind::Font,
            });
        }
    }

    let inline_styles: Vec<String> = document
        .select(&style_selector)
        .filter_map(|style| {
            let text: String = style.text().collect();
            (!text.trim().is_empty()).then_some(text)
        })
        .collect();

    let title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>())
        .unwrap_or_default();

    let description = document
        .select(&description_selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .unwrap_or_default()
        .to_string();

    let mut html_attributes = OrderedMap::new();
    for (name, value) in document.root_element().value().attrs() {
        html_attributes.insert(name, value);
    }

    let mut body_attributes = OrderedMap::new();
    if let Some(body) = document.select(&body_selector).next() {
        for (name, value) in body.value().attrs() {
            body_attributes.insert(name, value);
        }
    }

    DocumentScan {
        html: document.root_element().html(),
        assets,
        inline_scripts,
        inline_styles,
        title,
        description,
        html_attributes,
        body_attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
    <title>Demo Page</title>
    <meta name="description" content="A demo">
    <link rel="stylesheet" href="/css/main.css">
    <link rel="stylesheet" href="theme.css">
    <link rel="preload" as="font" href="/fonts/inter.woff2">
    <link rel="icon" href="/favicon.ico">
    <style>.inline { color: red; }</style>
</head>
<body class="home">
    <img src="logo.png" alt="">
    <script src="/js/app.js"></script>
    <script>console.log("hi");</script>
    <script></script>
</body>
</html>"#;

    #[test]
    fn test_scan_collects_stylesheet_links_in_order() {
        let scan = scan_document(SAMPLE);
        let refs: Vec<&str> = scan.refs_of(AssetKind::Stylesheet).collect();
        assert_eq!(refs, vec!["/css/main.css", "theme.css"]);
    }

    #[test]
    fn test_scan_splits_external_and_inline_scripts() {
        let scan = scan_document(SAMPLE);
        let refs: Vec<&str> = scan.refs_of(AssetKind::Script).collect();
        assert_eq!(refs, vec!["/js/app.js"]);
        assert_eq!(scan.inline_scripts, vec![r#"console.log("hi");"#]);
    }

    #[test]
    fn test_scan_collects_images_and_fonts_but_not_icons() {
        let scan = scan_document(SAMPLE);
        let images: Vec<&str> = scan.refs_of(AssetKind::Image).collect();
        let fonts: Vec<&str> = scan.refs_of(AssetKind::Font).collect();
        assert_eq!(images, vec!["logo.png"]);
        assert_eq!(fonts, vec!["/fonts/inter.woff2"]);
    }

    #[test]
    fn test_scan_inline_styles() {
        let scan = scan_document(SAMPLE);
        assert_eq!(scan.inline_styles, vec![".inline { color: red; }"]);
    }

    #[test]
    fn test_scan_metadata() {
        let scan = scan_document(SAMPLE);
        assert_eq!(scan.title, "Demo Page");
        assert_eq!(scan.description, "A demo");
        assert_eq!(scan.html_attributes.get("lang"), Some("en"));
        assert_eq!(scan.html_attributes.get("data-theme"), Some("dark"));
        assert_eq!(scan.body_attributes.get("class"), Some("home"));
    }

    #[test]
    fn test_scan_serializes_tree() {
        let scan = scan_document(SAMPLE);
        assert!(scan.html.starts_with("<html"));
        assert!(scan.html.contains("Demo Page"));
    }

    #[test]
    fn test_scan_missing_everything() {
        let scan = scan_document("<p>bare</p>");
        assert!(scan.assets.is_empty());
        assert!(scan.inline_styles.is_empty());
        assert!(scan.inline_scripts.is_empty());
        assert_eq!(scan.title, "");
        assert_eq!(scan.description, "");
        assert!(scan.body_attributes.is_empty());
    }
}
