//! Render service orchestrating the capture pipeline
//!
//! `RenderService` composes the session pool, content loader, element
//! resolver, overlay injector, and segmented capture engine into the
//! operations exposed at the boundary, with every operation wrapped by the
//! fallback orchestrator.

use crate::capture::{capture_segments, CaptureSettings};
use crate::fallback::{FallbackOrchestrator, FallbackOutcome, RemoteTier};
use crate::loader::load_page;
use crate::metrics::RenderMetrics;
use crate::overlay::inject_countdown;
use crate::request::{CaptureResult, ContentSource, RenderEndpoint, RenderRequest, SelectorSet};
use crate::resolver::resolve;
use crate::session_pool::SessionPool;
use crate::templates::{cleanup_script, section_script, wrap_content, SECTION_BOX_SELECTOR};
use crate::{Config, RenderError};
use chromiumoxide::page::Page;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Candidate selectors for wiki-style wrapped content: the MediaWiki parser
/// output first, then the generic document body.
fn legacy_selectors(mw: bool) -> SelectorSet {
    if mw {
        "body > .mw-parser-output > *:not(script):not(style):not(link):not(meta)".into()
    } else {
        "body > *:not(script):not(style):not(link):not(meta)".into()
    }
}

/// Whether a navigation response status counts as a successful page load.
fn navigation_succeeded(status: i64) -> bool {
    (200..300).contains(&status)
}

/// The web render service.
///
/// The pool is `None` when the local browser failed to start; with a remote
/// peer configured the service then serves every request from the remote
/// tier, and without one every operation fails with `BrowserUnavailable`.
pub struct RenderService {
    pool: Option<Arc<SessionPool>>,
    orchestrator: FallbackOrchestrator,
    metrics: Arc<RenderMetrics>,
    http: reqwest::Client,
    config: Config,
}

impl RenderService {
    pub fn new(config: Config, pool: Option<Arc<SessionPool>>) -> Result<Self, RenderError> {
        let remote = match config.remote_base() {
            Some(base) => Some(RemoteTier::new(&base, config.remote_timeout)?),
            None => None,
        };
        let orchestrator = FallbackOrchestrator::new(remote, config.remote_only);

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| RenderError::PageError(e.to_string()))?;

        Ok(Self {
            pool,
            orchestrator,
            metrics: Arc::new(RenderMetrics::new()),
            http,
            config,
        })
    }

    pub fn metrics(&self) -> Arc<RenderMetrics> {
        self.metrics.clone()
    }

    /// Inline wiki markup wrapped into a displayable document, captured at
    /// the parser-output (or generic body) container.
    pub async fn legacy_screenshot(
        &self,
        request: RenderRequest,
    ) -> Result<CaptureResult, RenderError> {
        let wrapped = RenderRequest {
            content: request.content.as_deref().map(wrap_content),
            ..request.clone()
        };
        let source = wrapped.source()?;
        let selectors = legacy_selectors(request.mw);
        self.run(RenderEndpoint::LegacyScreenshot, &request, wrapped, source, selectors, None)
            .await
    }

    /// Capture the full body of an inline document or URL.
    pub async fn page_screenshot(
        &self,
        request: RenderRequest,
    ) -> Result<CaptureResult, RenderError> {
        let source = request.source()?;
        let prepared = request.clone();
        self.run(RenderEndpoint::PageScreenshot, &request, prepared, source, "body".into(), None)
            .await
    }

    /// Capture a caller-selected element, hiding page chrome first.
    pub async fn element_screenshot(
        &self,
        request: RenderRequest,
    ) -> Result<CaptureResult, RenderError> {
        let source = request.source()?;
        let selectors = request
            .element
            .clone()
            .ok_or(RenderError::MissingParameter("element"))?;
        let prepared = request.clone();
        self.run(
            RenderEndpoint::ElementScreenshot,
            &request,
            prepared,
            source,
            selectors,
            Some(cleanup_script()),
        )
        .await
    }

    /// Capture one document section: the section candidates are tagged with
    /// a marker class in-page, then the marker is captured.
    pub async fn section_screenshot(
        &self,
        request: RenderRequest,
    ) -> Result<CaptureResult, RenderError> {
        let source = request.source()?;
        let candidates = request
            .section
            .clone()
            .ok_or(RenderError::MissingParameter("section"))?;
        let script = section_script(candidates.candidates())?;
        let prepared = request.clone();
        self.run(
            RenderEndpoint::SectionScreenshot,
            &request,
            prepared,
            source,
            SECTION_BOX_SELECTOR.into(),
            Some(script),
        )
        .await
    }

    /// Fetch a page's rendered HTML source (or the text of its `<pre>` for
    /// raw responses rendered in the browser's plain-text viewer).
    pub async fn source(&self, request: RenderRequest) -> Result<String, RenderError> {
        request.required_url()?;
        let request_id = Uuid::new_v4();
        info!("[{}] source called for {:?}", request_id, request.url);

        let outcome = self
            .orchestrator
            .dispatch(
                RenderEndpoint::Source,
                &request,
                self.pool.is_some(),
                || async {
                    let pool = self.pool.as_ref().ok_or(RenderError::BrowserUnavailable)?;
                    let page = pool.new_page(&request.signature(), request.stealth).await?;
                    let result = self.read_source(&page, &request).await;
                    self.release_page(page).await;
                    result
                },
            )
            .await?;

        if outcome.is_remote() {
            info!("[{}] source served by remote peer", request_id);
        }
        Ok(outcome.into_inner())
    }

    /// Navigate and return the rendered source. A non-success navigation
    /// status (error pages still render something) retries the URL as a
    /// direct HTTP fetch and returns that body instead.
    async fn read_source(
        &self,
        page: &Page,
        request: &RenderRequest,
    ) -> Result<String, RenderError> {
        let url = request.required_url()?;
        page.goto(url).await.map_err(RenderError::page)?;

        let response = match tokio::time::timeout(
            self.config.navigation_timeout,
            page.wait_for_navigation_response(),
        )
        .await
        {
            Ok(result) => result.map_err(RenderError::page)?,
            Err(_) => return Err(RenderError::LoadTimeout(self.config.navigation_timeout)),
        };

        let status = response
            .as_ref()
            .and_then(|request| request.response.as_ref())
            .map(|response| response.status);
        if let Some(status) = status {
            if !navigation_succeeded(status) {
                info!(
                    "Navigation to {} returned status {}, fetching directly",
                    url, status
                );
                return self.fetch_direct(url).await;
            }
        }

        if request.raw_text {
            let pre = resolve(page, &"pre".into()).await?;
            let text = pre.element.inner_text().await.map_err(RenderError::page)?;
            return text.ok_or_else(|| RenderError::ElementNotFound("pre".to_string()));
        }

        page.content().await.map_err(RenderError::page)
    }

    /// Plain GET of `url`, bypassing the browser. Used when the rendered
    /// navigation came back with an error status.
    pub(crate) async fn fetch_direct(&self, url: &str) -> Result<String, RenderError> {
        let response = self
            .http
            .get(url)
            .timeout(self.config.navigation_timeout)
            .send()
            .await
            .map_err(RenderError::page)?;

        let status = response.status();
        if !status.is_success() {
            error!("Direct fetch of {} failed with status {}", url, status);
            return Err(RenderError::PageError(format!(
                "direct fetch returned status {status}"
            )));
        }

        response.text().await.map_err(RenderError::page)
    }

    /// Shared body of the capture operations: logs, meters, and routes the
    /// local pipeline through the fallback state machine. `original` is what
    /// gets re-POSTed to the remote peer; `prepared` is the locally-executed
    /// variant (legacy wraps its content into the display plate first).
    async fn run(
        &self,
        endpoint: RenderEndpoint,
        original: &RenderRequest,
        prepared: RenderRequest,
        source: ContentSource,
        selectors: SelectorSet,
        prepare_script: Option<String>,
    ) -> Result<CaptureResult, RenderError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            "[{}] {} called: {}x{} locale={} format={:?}",
            request_id,
            endpoint.name(),
            original.width,
            original.height,
            original.locale,
            original.output_type
        );

        let outcome = self
            .orchestrator
            .dispatch(endpoint, original, self.pool.is_some(), || async {
                let pool = self.pool.as_ref().ok_or(RenderError::BrowserUnavailable)?;
                let page = pool.new_page(&prepared.signature(), prepared.stealth).await?;
                let result = self
                    .capture_on_page(&page, source, &prepared, &selectors, prepare_script)
                    .await;
                self.release_page(page).await;
                result
            })
            .await;

        match &outcome {
            Ok(FallbackOutcome::Local(result)) => {
                self.metrics.record_local(started.elapsed());
                info!(
                    "[{}] {} captured {} segment(s) locally in {:?}",
                    request_id,
                    endpoint.name(),
                    result.segments.len(),
                    started.elapsed()
                );
            }
            Ok(FallbackOutcome::Remote(result)) => {
                self.metrics.record_remote(started.elapsed());
                info!(
                    "[{}] {} served {} segment(s) by remote peer in {:?}",
                    request_id,
                    endpoint.name(),
                    result.segments.len(),
                    started.elapsed()
                );
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!("[{}] {} failed: {}", request_id, endpoint.name(), e);
            }
        }

        if let Some(pool) = &self.pool {
            self.metrics.set_live_contexts(pool.context_count());
        }

        outcome.map(FallbackOutcome::into_inner)
    }

    /// The local pipeline on one page: load, prepare, resolve, annotate,
    /// capture. A failure anywhere discards the page along with any partial
    /// segments.
    async fn capture_on_page(
        &self,
        page: &Page,
        source: ContentSource,
        request: &RenderRequest,
        selectors: &SelectorSet,
        prepare_script: Option<String>,
    ) -> Result<CaptureResult, RenderError> {
        let start_time_ms = chrono::Utc::now().timestamp_millis();

        load_page(
            page,
            &source,
            request.css.as_deref(),
            self.config.navigation_timeout,
        )
        .await?;

        if let Some(script) = prepare_script {
            page.evaluate(script).await.map_err(RenderError::page)?;
        }

        let target = resolve(page, selectors).await?;

        if request.counttime {
            inject_countdown(page, &target.selector, start_time_ms).await;
        }

        capture_segments(page, &target, &self.capture_settings(request)).await
    }

    async fn release_page(&self, page: Page) {
        if self.config.debug {
            warn!("Debug mode: leaving page open for inspection");
            return;
        }
        // A page that already went away is a normal outcome here.
        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }
    }

    fn capture_settings(&self, request: &RenderRequest) -> CaptureSettings {
        CaptureSettings {
            max_segment_height: self.config.max_segment_height,
            device_scale_factor: self.config.device_scale_factor,
            format: request.output_type,
            quality: request.output_quality,
            settle_delay: self.config.settle_delay,
        }
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_status_classification() {
        assert!(navigation_succeeded(200));
        assert!(navigation_succeeded(204));
        assert!(!navigation_succeeded(404));
        assert!(!navigation_succeeded(500));
    }
}
