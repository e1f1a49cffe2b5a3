//! Link extraction
//!
//! Collects every outbound reference a loaded document points at: anchors,
//! form actions, scripts, frames, images, `<link>` elements, and meta-refresh
//! targets. Values come back raw, exactly as written in the markup, so they
//! may be relative, empty, or use a scheme the crawler will not follow. The
//! document's `baseURI` comes back with them; it reflects redirects and any
//! `<base href>`, and is what relative values must be resolved against.

use crate::browser::PageHandle;
use crate::error::{ExtractionError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Elements whose attributes are collected, in document order
pub const REFERENCE_SELECTOR: &str = concat!(
    "a[href], form[action], script[src], iframe[src], img[src], link[href], ",
    "meta[http-equiv][content]"
);

const EXTRACT_SCRIPT: &str = r#"
    (() => {
        const refs = [];
        document.querySelectorAll(SELECTOR).forEach((el) => {
            const tag = el.tagName.toLowerCase();
            if (tag === 'meta') {
                if ((el.getAttribute('http-equiv') || '').toLowerCase() !== 'refresh') return;
                refs.push({ kind: 'refresh', value: el.getAttribute('content') || '' });
                return;
            }
            const attr = tag === 'form' ? 'action'
                : (tag === 'a' || tag === 'link') ? 'href'
                : 'src';
            refs.push({ kind: tag, value: el.getAttribute(attr) || '' });
        });
        return { base: document.baseURI || '', references: refs };
    })()
"#;

/// Which element a reference came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// `<a href>`
    #[serde(rename = "a")]
    Anchor,
    /// `<form action>`
    Form,
    /// `<script src>`
    Script,
    /// `<iframe src>`
    #[serde(rename = "iframe")]
    Frame,
    /// `<img src>`
    #[serde(rename = "img")]
    Image,
    /// `<link href>`
    Link,
    /// `<meta http-equiv="refresh" content>`
    Refresh,
}

/// One raw reference found in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReference {
    /// Source element
    pub kind: ReferenceKind,
    /// Attribute value; for meta refresh, the whole `content` attribute
    pub value: String,
}

impl ExtractedReference {
    /// The URL this reference points at, if it names one
    pub fn target(&self) -> Option<String> {
        match self.kind {
            ReferenceKind::Refresh => parse_meta_refresh(&self.value),
            _ => Some(self.value.clone()),
        }
    }
}

/// Pull the target out of a meta-refresh `content` value such as
/// `5; url='/next'`. The `url=` key is matched case-insensitively.
pub fn parse_meta_refresh(content: &str) -> Option<String> {
    let lower = content.to_ascii_lowercase();
    let start = lower.find("url=")? + "url=".len();
    let target = content[start..]
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim();
    Some(target.to_string())
}

/// Everything one document query returns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageReferences {
    /// `document.baseURI`
    pub base: String,
    /// References in document order
    pub references: Vec<ExtractedReference>,
}

impl PageReferences {
    /// Reduce to target strings, dropping meta tags without a target
    pub fn into_links(self) -> PageLinks {
        PageLinks {
            targets: self
                .references
                .iter()
                .filter_map(ExtractedReference::target)
                .collect(),
            base: self.base,
        }
    }
}

/// Raw link targets of a document and the base URL they are relative to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLinks {
    pub base: String,
    pub targets: Vec<String>,
}

/// Link extraction functionality
pub struct LinkExtractor;

impl LinkExtractor {
    /// Extract every reference in document order
    #[instrument(skip(page))]
    pub async fn extract_references(page: &PageHandle) -> Result<PageReferences> {
        let script = EXTRACT_SCRIPT.replace(
            "SELECTOR",
            &serde_json::to_string(REFERENCE_SELECTOR)?,
        );

        let found: PageReferences = page
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ExtractionError::JsExecutionFailed(e.to_string()))?
            .into_value()
            .map_err(|e| ExtractionError::ExtractionFailed(e.to_string()))?;

        debug!(
            "Extracted {} references (base: {})",
            found.references.len(),
            found.base
        );
        Ok(found)
    }

    /// Extract raw target strings together with the document base
    #[instrument(skip(page))]
    pub async fn extract_targets(page: &PageHandle) -> Result<PageLinks> {
        Ok(Self::extract_references(page).await?.into_links())
    }
}
