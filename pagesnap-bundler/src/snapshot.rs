//! Orchestration of one snapshot: fetch the page, walk its assets in
//! document order, and assemble the bundle.

use crate::css::{self, CssFlattener};
use crate::dom::{self, DocumentScan};
use crate::error::{Result, SnapshotError};
use crate::fetch;
use crate::resolver;
use crate::result::{
    AssetKind, AssetReference, PageMetadata, PageSnapshot, ScriptRecord, StylesheetRecord,
};
use crate::variables::{self, VariableScope};
use chrono::Utc;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// How external stylesheets are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// One fetch per stylesheet; references are absolutized in place and
    /// `@import` statements are kept (with absolute targets).
    Flat,
    /// `@import` targets are recursively fetched and inlined.
    Recursive,
}

impl ImportMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" => Some(ImportMode::Flat),
            "recursive" => Some(ImportMode::Recursive),
            _ => None,
        }
    }
}

/// Builds self-contained page snapshots.
///
/// All network traffic is sequential: one request in flight at a time, in
/// document order. The per-capture visited set guarantees no asset is
/// fetched twice and no import chain revisits an ancestor.
pub struct Snapshotter {
    client: Client,
    import_mode: ImportMode,
    variable_scope: VariableScope,
    max_import_depth: usize,
    page_timeout: Duration,
    asset_timeout: Duration,
}

impl Snapshotter {
    pub fn new() -> Self {
        Self {
            client: fetch::build_client(Duration::from_secs(5)),
            import_mode: ImportMode::Recursive,
            variable_scope: VariableScope::RootOnly,
            max_import_depth: css::DEFAULT_MAX_IMPORT_DEPTH,
            page_timeout: fetch::PAGE_TIMEOUT,
            asset_timeout: fetch::ASSET_TIMEOUT,
        }
    }

    pub fn with_import_mode(mut self, mode: ImportMode) -> Self {
        self.import_mode = mode;
        self
    }

    pub fn with_variable_scope(mut self, scope: VariableScope) -> Self {
        self.variable_scope = scope;
        self
    }

    pub fn with_max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = depth;
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    pub fn with_asset_timeout(mut self, timeout: Duration) -> Self {
        self.asset_timeout = timeout;
        self
    }

    /// Capture a snapshot of `page_url`.
    ///
    /// Only a root document failure is terminal. Every secondary asset that
    /// cannot be fetched is dropped from its list and the capture carries
    /// on.
    pub async fn capture(&self, page_url: &str) -> Result<PageSnapshot> {
        let parsed = Url::parse(page_url)
            .map_err(|e| SnapshotError::InvalidUrl(format!("{}: {}", page_url, e)))?;
        info!(
            "Capturing snapshot of {} ({})",
            page_url,
            parsed.host_str().unwrap_or("unknown")
        );

        let Some(markup) = fetch::fetch_page(&self.client, page_url, self.page_timeout).await
        else {
            warn!("Root document fetch failed for {}", page_url);
            return Err(SnapshotError::PageFetch {
                url: page_url.to_string(),
            });
        };

        let scan = dom::scan_document(&markup);
        debug!(
            "Scanned document: {} asset references, {} inline styles, {} inline scripts",
            scan.assets.len(),
            scan.inline_styles.len(),
            scan.inline_scripts.len()
        );

        let mut visited: HashSet<String> = HashSet::new();

        let stylesheets = self
            .collect_stylesheets(&scan, page_url, &mut visited)
            .await;
        let scripts = self.collect_scripts(&scan, page_url, &mut visited).await;

        let inline_styles: Vec<String> = scan
            .inline_styles
            .iter()
            .map(|block| css::rewrite_stylesheet(block, page_url))
            .collect();

        let variables = variables::extract_variables(
            stylesheets
                .iter()
                .map(|record| record.content.as_str())
                .chain(inline_styles.iter().map(String::as_str)),
            self.variable_scope,
        );

        let assets = collect_asset_references(&scan, page_url);

        let metadata = PageMetadata {
            title: scan.title,
            description: scan.description,
            html_attributes: scan.html_attributes,
            body_attributes: scan.body_attributes,
            fetched_at: Utc::now().to_rfc3339(),
        };

        info!(
            "Snapshot of {} complete: {} stylesheets, {} scripts, {} variables",
            page_url,
            stylesheets.len(),
            scripts.len(),
            variables.len()
        );

        Ok(PageSnapshot {
            html: scan.html,
            stylesheets,
            scripts,
            inline_styles,
            inline_scripts: scan.inline_scripts,
            assets,
            variables,
            metadata,
        })
    }

    async fn collect_stylesheets(
        &self,
        scan: &DocumentScan,
        page_url: &str,
        visited: &mut HashSet<String>,
    ) -> Vec<StylesheetRecord> {
        let mut records = Vec::new();

        for href in scan.refs_of(AssetKind::Stylesheet) {
            let asset_url = resolver::resolve(href, page_url);
            if visited.contains(&asset_url) {
                continue;
            }

            let content = match self.import_mode {
                ImportMode::Recursive => {
                    let flattener = CssFlattener::new(&self.client)
                        .with_max_depth(self.max_import_depth)
                        .with_timeout(self.asset_timeout);
                    flattener.flatten(&asset_url, 0, visited).await
                }
                ImportMode::Flat => {
                    visited.insert(asset_url.clone());
                    match fetch::fetch_text(&self.client, &asset_url, self.asset_timeout).await
                    {
                        Some(text) => css::rewrite_stylesheet(&text, &asset_url),
                        None => String::new(),
                    }
                }
            };

            if content.is_empty() {
                debug!("No content for stylesheet {}", asset_url);
                continue;
            }
            records.push(StylesheetRecord {
                url: asset_url,
                content,
            });
        }

        records
    }

    async fn collect_scripts(
        &self,
        scan: &DocumentScan,
        page_url: &str,
        visited: &mut HashSet<String>,
    ) -> Vec<ScriptRecord> {
        let mut records = Vec::new();

        for src in scan.refs_of(AssetKind::Script) {
            let asset_url = resolver::resolve(src, page_url);
            if !visited.insert(asset_url.clone()) {
                continue;
            }

            match fetch::fetch_text(&self.client, &asset_url, self.asset_timeout).await {
                Some(content) => records.push(ScriptRecord {
                    url: asset_url,
                    content,
                }),
                None => debug!("Skipping unreachable script {}", asset_url),
            }
        }

        records
    }
}

impl Default for Snapshotter {
    fn default() -> Self {
        Self::new()
    }
}

/// Images and preloaded fonts are inventoried with absolute URLs but not
/// downloaded.
fn collect_asset_references(scan: &DocumentScan, page_url: &str) -> Vec<AssetReference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for kind in [AssetKind::Image, AssetKind::Font] {
        for raw in scan.refs_of(kind) {
            let url = resolver::resolve(raw, page_url);
            if seen.insert(url.clone()) {
                references.push(AssetReference { url, kind });
            }
        }
    }

    references
}
