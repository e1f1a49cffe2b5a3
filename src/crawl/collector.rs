//! Response collector
//!
//! The collector is the meeting point between the browser's network-event
//! task and the crawler. Both the visited set and the scratch mapping of
//! not-yet-drained responses live behind a single mutex, so an event can
//! never be half-written when the crawler drains, and nothing observed before
//! the drain is lost. Only [`ResponseCollector::drain`] empties the scratch
//! mapping.

use crate::crawl::log::HeaderMap;
use crate::crawl::scope::ScopePolicy;
use crate::crawl::url::{host_of, strip_fragment};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// A network response seen by the browser, minus its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    /// Driver handle used to fetch the body later
    pub request_id: String,
    /// HTTP method of the originating request
    pub method: String,
    /// Response URL
    pub url: String,
    /// Request headers
    pub request_headers: HeaderMap,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub response_headers: HeaderMap,
}

#[derive(Debug, Default)]
struct CollectorState {
    visited: HashSet<String>,
    // first-observation order; a key can only enter once per run
    pending: Vec<(String, ObservedResponse)>,
}

/// Shared handle to the visited set and scratch mapping
#[derive(Debug, Clone)]
pub struct ResponseCollector {
    state: Arc<Mutex<CollectorState>>,
    base_host: Arc<str>,
    scope: ScopePolicy,
}

impl ResponseCollector {
    /// Create a collector scoped to `base_host`
    pub fn new(base_host: impl Into<String>, scope: ScopePolicy) -> Self {
        let base_host: String = base_host.into();
        Self {
            state: Arc::new(Mutex::new(CollectorState::default())),
            base_host: Arc::from(base_host.to_ascii_lowercase()),
            scope,
        }
    }

    /// Whether `host` is in scope for this crawl
    pub fn in_scope(&self, host: &str) -> bool {
        self.scope.in_scope(&self.base_host, host)
    }

    /// Handle one response event.
    ///
    /// Returns `true` when the response was stored for the next drain.
    pub fn observe(&self, response: ObservedResponse) -> bool {
        let Some(host) = host_of(&response.url) else {
            trace!("Dropping response with no host: {}", response.url);
            return false;
        };
        if !self.in_scope(&host) {
            trace!("Dropping out-of-scope response: {}", response.url);
            return false;
        }

        let key = strip_fragment(&response.url);
        let mut state = self.state.lock();
        if !state.visited.insert(key.clone()) {
            return false;
        }

        debug!(
            "Captured response from: {}, status: {}",
            response.url, response.status
        );
        state.pending.push((key, response));
        true
    }

    /// Add `url` to the visited set. Returns `false` if it was already there.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.state.lock().visited.insert(url.to_string())
    }

    /// Whether `url` is in the visited set
    pub fn is_visited(&self, url: &str) -> bool {
        self.state.lock().visited.contains(url)
    }

    /// Size of the visited set
    pub fn visited_count(&self) -> usize {
        self.state.lock().visited.len()
    }

    /// Number of responses waiting for the next drain
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Take every pending response and clear the scratch mapping in one step
    pub fn drain(&self) -> Vec<(String, ObservedResponse)> {
        std::mem::take(&mut self.state.lock().pending)
    }
}
