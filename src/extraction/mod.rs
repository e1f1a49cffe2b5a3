//! Link extraction module
//!
//! This module queries a loaded document for the references the crawler
//! may follow next.

pub mod links;

pub use links::{
    parse_meta_refresh, ExtractedReference, LinkExtractor, PageLinks, PageReferences, ReferenceKind,
};
