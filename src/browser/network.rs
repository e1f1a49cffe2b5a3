//! Network event capture
//!
//! Subscribes to the page's `Network.requestWillBeSent` and
//! `Network.responseReceived` events and publishes every response into a
//! [`ResponseCollector`]. Request method and headers only arrive with the
//! request event, so requests are remembered by CDP request id until their
//! response shows up or `Network.loadingFailed` reports them dead.

use crate::browser::PageHandle;
use crate::crawl::collector::{ObservedResponse, ResponseCollector};
use crate::crawl::log::HeaderMap;
use crate::error::{BrowserError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventRequestWillBeSent, EventResponseReceived,
    GetResponseBodyParams, Headers, RequestId,
};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone)]
struct PendingRequest {
    method: String,
    headers: HeaderMap,
}

/// Requests sent but not yet answered, by CDP request id
#[derive(Debug, Default)]
struct InFlight {
    requests: HashMap<String, PendingRequest>,
}

impl InFlight {
    /// Remember a request. A redirect reuses the id and replaces the entry.
    fn sent(&mut self, request_id: String, method: String, headers: HeaderMap) {
        self.requests
            .insert(request_id, PendingRequest { method, headers });
    }

    /// Forget a request and return its method and headers
    fn answered(&mut self, request_id: &str) -> Option<(String, HeaderMap)> {
        self.requests
            .remove(request_id)
            .map(|pending| (pending.method, pending.headers))
    }

    /// Forget a request that will never get a response
    fn failed(&mut self, request_id: &str) {
        self.requests.remove(request_id);
    }

    fn len(&self) -> usize {
        self.requests.len()
    }
}

/// Running network subscription for one page
pub struct NetworkCapture {
    pump: JoinHandle<()>,
}

impl NetworkCapture {
    /// Enable the Network domain on `page` and start feeding `collector`
    #[instrument(skip(page, collector))]
    pub async fn attach(page: &PageHandle, collector: ResponseCollector) -> Result<Self> {
        page.page
            .execute(EnableParams::default())
            .await
            .map_err(|e| BrowserError::SubscribeFailed(e.to_string()))?;

        let mut requests = page
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| BrowserError::SubscribeFailed(e.to_string()))?;
        let mut responses = page
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| BrowserError::SubscribeFailed(e.to_string()))?;
        let mut failures = page
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| BrowserError::SubscribeFailed(e.to_string()))?;

        let pump = tokio::spawn(async move {
            let mut in_flight = InFlight::default();
            loop {
                tokio::select! {
                    // requests first: a response must find its request
                    biased;
                    Some(event) = requests.next() => {
                        in_flight.sent(
                            event.request_id.inner().clone(),
                            event.request.method.clone(),
                            header_map(&event.request.headers),
                        );
                    }
                    Some(event) = responses.next() => {
                        let request_id = event.request_id.inner().clone();
                        let response = &event.response;
                        let (method, request_headers) = match in_flight.answered(&request_id) {
                            Some(sent) => sent,
                            None => (
                                "GET".to_string(),
                                response
                                    .request_headers
                                    .as_ref()
                                    .map(header_map)
                                    .unwrap_or_default(),
                            ),
                        };
                        trace!("Response event: {} {}", response.status, response.url);
                        collector.observe(ObservedResponse {
                            request_id,
                            method,
                            url: response.url.clone(),
                            request_headers,
                            status: u16::try_from(response.status).unwrap_or_default(),
                            response_headers: header_map(&response.headers),
                        });
                    }
                    Some(event) = failures.next() => {
                        trace!("Request {} failed: {}", event.request_id.inner(), event.error_text);
                        in_flight.failed(event.request_id.inner());
                    }
                    else => break,
                }
            }
            debug!("Network event streams closed ({} requests unanswered)", in_flight.len());
        });

        Ok(Self { pump })
    }

    /// Fetch the body of a captured response
    #[instrument(skip(page))]
    pub async fn fetch_body(page: &PageHandle, request_id: &str) -> Result<Vec<u8>> {
        let returned = page
            .page
            .execute(GetResponseBodyParams::new(RequestId::new(request_id.to_string())))
            .await
            .map_err(|e| BrowserError::BodyUnavailable {
                request_id: request_id.to_string(),
                message: e.to_string(),
            })?
            .result;

        decode_body(&returned.body, returned.base64_encoded).map_err(|message| {
            BrowserError::BodyUnavailable {
                request_id: request_id.to_string(),
                message,
            }
            .into()
        })
    }
}

impl Drop for NetworkCapture {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Flatten a CDP header object into string pairs.
///
/// Non-string values are rendered as JSON text.
fn header_map(headers: &Headers) -> HeaderMap {
    headers
        .inner()
        .as_object()
        .map(|object| {
            object
                .iter()
                .map(|(name, value)| {
                    let value = match value.as_str() {
                        Some(s) => s.to_string(),
                        None => value.to_string(),
                    };
                    (name.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Decode a `Network.getResponseBody` payload
pub(crate) fn decode_body(
    body: &str,
    base64_encoded: bool,
) -> std::result::Result<Vec<u8>, String> {
    if base64_encoded {
        BASE64.decode(body).map_err(|e| e.to_string())
    } else {
        Ok(body.as_bytes().to_vec())
    }
}
