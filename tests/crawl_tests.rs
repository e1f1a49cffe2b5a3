//! Crawler traversal tests
//!
//! These tests drive the crawler with a scripted in-memory site. Every
//! `goto` replays the page's network responses into the session collector,
//! the way the CDP event task does during a real navigation.

use pagetrace::browser::PageDriver;
use pagetrace::crawl::{
    CrawlConfig, CrawlSession, CrawlSummary, Crawler, HeaderMap, LogAggregator, LogRecord,
    ObservedResponse, OutputFormat, ResponseCollector, ScopePolicy,
};
use pagetrace::error::{NavigationError, Result};
use pagetrace::extraction::PageLinks;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default, Clone)]
struct Page {
    /// Responses fired while the page loads: (url, body)
    responses: Vec<(String, String)>,
    links: Vec<String>,
    /// Document base; the page's own URL when unset
    base: Option<String>,
    fail_goto: bool,
    fail_load: bool,
    fail_links: bool,
}

impl Page {
    fn new() -> Self {
        Self::default()
    }

    fn response(mut self, url: &str, body: &str) -> Self {
        self.responses.push((url.to_string(), body.to_string()));
        self
    }

    fn link(mut self, href: &str) -> Self {
        self.links.push(href.to_string());
        self
    }

    fn base(mut self, url: &str) -> Self {
        self.base = Some(url.to_string());
        self
    }
}

#[derive(Default)]
struct Trace {
    navigations: Vec<String>,
    drains: usize,
    /// (drain number, response URL) per body fetch
    fetches: Vec<(usize, String)>,
}

struct ScriptedSite {
    pages: HashMap<String, Page>,
    collector: ResponseCollector,
    current: Option<String>,
    broken_bodies: Vec<String>,
    /// Body fetch of the key fires a response for the value
    late: HashMap<String, (String, String)>,
    trace: Rc<RefCell<Trace>>,
}

impl ScriptedSite {
    fn new(collector: ResponseCollector, trace: Rc<RefCell<Trace>>) -> Self {
        Self {
            pages: HashMap::new(),
            collector,
            current: None,
            broken_bodies: Vec::new(),
            late: HashMap::new(),
            trace,
        }
    }

    fn page(mut self, url: &str, page: Page) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    fn broken_body(mut self, url: &str) -> Self {
        self.broken_bodies.push(url.to_string());
        self
    }

    fn late_response(mut self, trigger: &str, url: &str, body: &str) -> Self {
        self.late
            .insert(trigger.to_string(), (url.to_string(), body.to_string()));
        self
    }

    fn current_page(&self) -> Page {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .unwrap_or_default()
    }
}

fn observed(url: &str) -> ObservedResponse {
    ObservedResponse {
        request_id: url.to_string(),
        method: "GET".to_string(),
        url: url.to_string(),
        request_headers: HeaderMap::from([("Accept".to_string(), "*/*".to_string())]),
        status: 200,
        response_headers: HeaderMap::new(),
    }
}

impl PageDriver for ScriptedSite {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.trace.borrow_mut().navigations.push(url.to_string());
        let page = self.pages.get(url).cloned().unwrap_or_default();
        if page.fail_goto {
            return Err(NavigationError::Timeout(1).into());
        }
        self.current = Some(url.to_string());
        for (response_url, _) in &page.responses {
            self.collector.observe(observed(response_url));
        }
        Ok(())
    }

    async fn wait_for_load(&mut self) -> Result<()> {
        if self.current_page().fail_load {
            return Err(NavigationError::LoadFailed("load never fired".to_string()).into());
        }
        Ok(())
    }

    async fn settle(&mut self) {
        self.trace.borrow_mut().drains += 1;
    }

    async fn fetch_body(&mut self, response: &ObservedResponse) -> Result<Vec<u8>> {
        {
            let mut trace = self.trace.borrow_mut();
            let drain = trace.drains;
            trace.fetches.push((drain, response.url.clone()));
        }
        if let Some((late_url, _)) = self.late.get(&response.url) {
            self.collector.observe(observed(late_url));
        }
        if self.broken_bodies.contains(&response.url) {
            return Err(pagetrace::Error::generic("body evicted"));
        }
        let body = self
            .pages
            .values()
            .flat_map(|p| p.responses.iter())
            .chain(self.late.values())
            .find(|(url, _)| url == &response.url)
            .map(|(_, body)| body.clone())
            .unwrap_or_default();
        Ok(body.into_bytes())
    }

    async fn extract_links(&mut self) -> Result<PageLinks> {
        let page = self.current_page();
        if page.fail_links {
            return Err(pagetrace::Error::generic("execution context destroyed"));
        }
        let base = page
            .base
            .or_else(|| self.current.clone())
            .unwrap_or_default();
        Ok(PageLinks {
            base,
            targets: page.links,
        })
    }
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Outcome {
    navigations: Vec<String>,
    fetches: Vec<(usize, String)>,
    records: Vec<LogRecord>,
    summary: CrawlSummary,
}

fn config(target: &str, depth: usize) -> CrawlConfig {
    CrawlConfig::builder(target).max_depth(depth).build()
}

async fn crawl(config: CrawlConfig, build: impl FnOnce(ScriptedSite) -> ScriptedSite) -> Outcome {
    let buf = SharedBuf::default();
    let log = LogAggregator::new(Box::new(buf.clone()), OutputFormat::Json);
    let session = CrawlSession::with_log(config, log).unwrap();

    let trace = Rc::new(RefCell::new(Trace::default()));
    let site = build(ScriptedSite::new(
        session.collector().clone(),
        Rc::clone(&trace),
    ));
    let summary = Crawler::new(site, session).run().await.unwrap();

    let bytes = buf.0.lock().unwrap().clone();
    let records: Vec<LogRecord> = serde_json::from_slice(&bytes).unwrap();
    let navigations = trace.borrow().navigations.clone();
    let fetches = trace.borrow().fetches.clone();
    Outcome {
        navigations,
        fetches,
        records,
        summary,
    }
}

fn record_urls(outcome: &Outcome) -> Vec<&str> {
    outcome.records.iter().map(|r| r.url.as_str()).collect()
}

#[tokio::test]
async fn test_depth_zero_visits_only_start() {
    let outcome = crawl(config("https://example.com/", 0), |site| {
        site.page("https://example.com/", Page::new().link("/a").link("/b"))
    })
    .await;

    assert_eq!(outcome.navigations, vec!["https://example.com/"]);
    assert_eq!(outcome.summary.stats.pages_attempted, 1);
}

#[tokio::test]
async fn test_two_page_cycle() {
    let outcome = crawl(config("https://example.com/a", 3), |site| {
        site.page(
            "https://example.com/a",
            Page::new()
                .response("https://example.com/a.css", "body{}")
                .link("/b"),
        )
        .page(
            "https://example.com/b",
            Page::new()
                .response("https://example.com/b.js", "run()")
                .link("/a")
                .link("https://example.com/a#top"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/a", "https://example.com/b"]
    );
    assert_eq!(
        record_urls(&outcome),
        vec!["https://example.com/a.css", "https://example.com/b.js"]
    );
    assert_eq!(outcome.summary.records_written, 2);
    assert_eq!(outcome.summary.stats.pages_loaded, 2);
}

#[tokio::test]
async fn test_record_shape() {
    let outcome = crawl(config("https://example.com/", 0), |site| {
        site.page(
            "https://example.com/",
            Page::new().response("https://example.com/app.js#v2", "console.log(1)"),
        )
    })
    .await;

    let record = &outcome.records[0];
    assert_eq!(record.url, "https://example.com/app.js");
    assert_eq!(record.requests.len(), 1);
    assert_eq!(record.requests[0].method, "GET");
    assert_eq!(record.requests[0].url, "https://example.com/app.js#v2");
    assert_eq!(
        record.requests[0].headers.get("Accept").map(String::as_str),
        Some("*/*")
    );
    assert_eq!(record.responses[0].status_code, 200);
    assert_eq!(record.responses[0].body, "console.log(1)");
    assert_eq!(record.content, "console.log(1)");
}

#[tokio::test]
async fn test_drain_is_per_frame_without_duplicates() {
    let outcome = crawl(config("https://example.com/", 1), |site| {
        site.page(
            "https://example.com/",
            Page::new()
                .response("https://example.com/shared.css", "a{}")
                .response("https://example.com/home.js", "home()")
                .response("https://cdn.unrelated.test/lib.js", "lib()")
                .link("/next"),
        )
        .page(
            "https://example.com/next",
            Page::new()
                .response("https://example.com/shared.css", "a{}")
                .response("https://example.com/next.js", "next()"),
        )
    })
    .await;

    assert_eq!(
        record_urls(&outcome),
        vec![
            "https://example.com/shared.css",
            "https://example.com/home.js",
            "https://example.com/next.js",
        ]
    );
}

#[tokio::test]
async fn test_captured_response_counts_as_visited() {
    let outcome = crawl(config("https://example.com/", 2), |site| {
        site.page(
            "https://example.com/",
            Page::new()
                .response("https://example.com/prefetched", "<html></html>")
                .link("/prefetched")
                .link("/fresh"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/", "https://example.com/fresh"]
    );
}

#[tokio::test]
async fn test_depth_first_order() {
    let outcome = crawl(config("https://example.com/", 3), |site| {
        site.page("https://example.com/", Page::new().link("/a").link("/b"))
            .page("https://example.com/a", Page::new().link("/a/1"))
            .page("https://example.com/a/1", Page::new().link("/b"))
    })
    .await;

    // /b is reached through /a/1 before the root's own /b link comes up
    assert_eq!(
        outcome.navigations,
        vec![
            "https://example.com/",
            "https://example.com/a",
            "https://example.com/a/1",
            "https://example.com/b",
        ]
    );
}

#[tokio::test]
async fn test_depth_bound_is_respected() {
    let outcome = crawl(config("https://example.com/0", 2), |site| {
        site.page("https://example.com/0", Page::new().link("/1"))
            .page("https://example.com/1", Page::new().link("/2"))
            .page("https://example.com/2", Page::new().link("/3"))
            .page("https://example.com/3", Page::new().link("/4"))
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec![
            "https://example.com/0",
            "https://example.com/1",
            "https://example.com/2",
        ]
    );
}

#[tokio::test]
async fn test_no_url_is_navigated_twice() {
    let outcome = crawl(config("https://example.com/", 5), |site| {
        site.page(
            "https://example.com/",
            Page::new().link("/x").link("/y").link("/x#again").link("/"),
        )
        .page("https://example.com/x", Page::new().link("/y").link("/"))
        .page("https://example.com/y", Page::new().link("/x"))
    })
    .await;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for url in &outcome.navigations {
        *counts.entry(url.as_str()).or_default() += 1;
    }
    assert!(counts.values().all(|&n| n == 1), "{:?}", outcome.navigations);
    assert_eq!(outcome.navigations.len(), 3);
}

#[tokio::test]
async fn test_out_of_scope_links_are_not_followed() {
    let outcome = crawl(config("https://example.com/", 3), |site| {
        site.page(
            "https://example.com/",
            Page::new()
                .link("https://unrelated.test/")
                .link("mailto:team@example.com")
                .link("javascript:void(0)")
                .link("https://docs.example.com/"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/", "https://docs.example.com/"]
    );
}

#[tokio::test]
async fn test_strict_scope_skips_lookalike_hosts() {
    let config = CrawlConfig::builder("https://example.com/")
        .scope(ScopePolicy::Subdomain)
        .build();
    let outcome = crawl(config, |site| {
        site.page(
            "https://example.com/",
            Page::new()
                .link("https://evil-example.com/")
                .link("https://www.example.com/"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/", "https://www.example.com/"]
    );
}

#[tokio::test]
async fn test_malformed_links_do_not_stop_extraction() {
    let outcome = crawl(config("https://example.com/", 1), |site| {
        site.page(
            "https://example.com/",
            Page::new().link("").link("ht!tp://").link("/after"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/", "https://example.com/after"]
    );
}

#[tokio::test]
async fn test_navigation_failure_is_local() {
    let outcome = crawl(config("https://example.com/", 2), |site| {
        let mut broken = Page::new().link("/never");
        broken.fail_goto = true;
        let mut stuck = Page::new().link("/never");
        stuck.fail_load = true;
        site.page(
            "https://example.com/",
            Page::new().link("/broken").link("/stuck").link("/ok"),
        )
        .page("https://example.com/broken", broken)
        .page("https://example.com/stuck", stuck)
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec![
            "https://example.com/",
            "https://example.com/broken",
            "https://example.com/stuck",
            "https://example.com/ok",
        ]
    );
    assert_eq!(outcome.summary.stats.navigation_failures, 2);
}

#[tokio::test]
async fn test_extraction_failure_keeps_drained_records() {
    let outcome = crawl(config("https://example.com/", 2), |site| {
        let mut page = Page::new()
            .response("https://example.com/app.js", "x")
            .link("/child");
        page.fail_links = true;
        site.page("https://example.com/", page)
    })
    .await;

    assert_eq!(outcome.navigations, vec!["https://example.com/"]);
    assert_eq!(record_urls(&outcome), vec!["https://example.com/app.js"]);
    assert_eq!(outcome.summary.stats.extraction_failures, 1);
}

#[tokio::test]
async fn test_body_failure_skips_only_that_record() {
    let outcome = crawl(config("https://example.com/", 0), |site| {
        site.page(
            "https://example.com/",
            Page::new()
                .response("https://example.com/a.js", "a")
                .response("https://example.com/b.js", "b")
                .response("https://example.com/c.js", "c"),
        )
        .broken_body("https://example.com/b.js")
    })
    .await;

    assert_eq!(
        record_urls(&outcome),
        vec!["https://example.com/a.js", "https://example.com/c.js"]
    );
    assert_eq!(outcome.summary.stats.bodies_skipped, 1);
}

#[tokio::test]
async fn test_page_budget_stops_navigation() {
    let config = CrawlConfig::builder("https://example.com/")
        .max_depth(5)
        .max_pages(2)
        .build();

    let outcome = crawl(config, |site| {
        site.page(
            "https://example.com/",
            Page::new().link("/a").link("/b").link("/c"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/", "https://example.com/a"]
    );
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let build = |site: ScriptedSite| {
        site.page(
            "https://example.com/",
            Page::new()
                .response("https://example.com/app.js", "x")
                .link("/a"),
        )
    };

    let first = crawl(config("https://example.com/", 1), build).await;
    let second = crawl(config("https://example.com/", 1), build).await;

    assert_eq!(first.navigations, second.navigations);
    assert_eq!(first.records, second.records);
}

#[tokio::test]
async fn test_relative_links_follow_redirected_base() {
    // the browser lands on /docs/ after asking for /docs
    let outcome = crawl(config("https://example.com/docs", 1), |site| {
        site.page(
            "https://example.com/docs",
            Page::new()
                .base("https://example.com/docs/")
                .link("intro.html")
                .link("../about"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec![
            "https://example.com/docs",
            "https://example.com/docs/intro.html",
            "https://example.com/about",
        ]
    );
}

#[tokio::test]
async fn test_base_element_redirects_relative_links() {
    let outcome = crawl(config("https://example.com/", 1), |site| {
        site.page(
            "https://example.com/",
            Page::new()
                .base("https://static.example.com/v2/")
                .link("app.html"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/", "https://static.example.com/v2/app.html"]
    );
}

#[tokio::test]
async fn test_unusable_document_base_falls_back_to_frame_url() {
    let outcome = crawl(config("https://example.com/dir/page", 1), |site| {
        site.page(
            "https://example.com/dir/page",
            Page::new().base("about:blank").link("next"),
        )
    })
    .await;

    assert_eq!(
        outcome.navigations,
        vec!["https://example.com/dir/page", "https://example.com/dir/next"]
    );
}

#[tokio::test]
async fn test_response_observed_mid_drain_lands_in_next_drain() {
    let outcome = crawl(config("https://example.com/", 1), |site| {
        site.page(
            "https://example.com/",
            Page::new()
                .response("https://example.com/app.js", "app()")
                .link("/child"),
        )
        .page(
            "https://example.com/child",
            Page::new().response("https://example.com/child.css", "p{}"),
        )
        .late_response(
            "https://example.com/app.js",
            "https://example.com/late.js",
            "late()",
        )
    })
    .await;

    assert_eq!(
        outcome.fetches,
        vec![
            (1, "https://example.com/app.js".to_string()),
            (2, "https://example.com/late.js".to_string()),
            (2, "https://example.com/child.css".to_string()),
        ]
    );
    assert_eq!(
        record_urls(&outcome),
        vec![
            "https://example.com/app.js",
            "https://example.com/late.js",
            "https://example.com/child.css",
        ]
    );
    let late = outcome
        .records
        .iter()
        .find(|r| r.url == "https://example.com/late.js")
        .unwrap();
    assert_eq!(late.content, "late()");
}
