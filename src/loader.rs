//! Content loading and stylesheet injection
//!
//! Populates a fresh page from either inline markup or a URL, bounds the
//! navigation wait, and applies the baseline stylesheet before any
//! caller-supplied rules so the caller can override it.

use crate::request::ContentSource;
use crate::templates::BASELINE_CSS;
use crate::RenderError;
use chromiumoxide::page::Page;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Inline documents produce no navigation event to wait on; the wrapping
/// plate pulls external fonts, so settling means waiting for the font set
/// to finish loading. Resolves once `document.fonts.ready` does.
const FONTS_READY_SCRIPT: &str = "document.fonts.ready.then(() => true)";

/// Load `source` into `page` and wait for it to settle, then inject the
/// baseline stylesheet followed by `extra_css`.
pub async fn load_page(
    page: &Page,
    source: &ContentSource,
    extra_css: Option<&str>,
    navigation_timeout: Duration,
) -> Result<(), RenderError> {
    match source {
        ContentSource::Inline(html) => {
            debug!("Loading {} bytes of inline content", html.len());
            page.set_content(html.as_str())
                .await
                .map_err(RenderError::page)?;
            match timeout(navigation_timeout, page.evaluate(FONTS_READY_SCRIPT)).await {
                Ok(result) => {
                    result.map_err(RenderError::page)?;
                }
                Err(_) => return Err(RenderError::LoadTimeout(navigation_timeout)),
            }
        }
        ContentSource::Url(url) => {
            debug!("Navigating to {}", url);
            page.goto(url.as_str()).await.map_err(RenderError::page)?;
            match timeout(navigation_timeout, page.wait_for_navigation()).await {
                Ok(result) => {
                    result.map_err(RenderError::page)?;
                }
                Err(_) => return Err(RenderError::LoadTimeout(navigation_timeout)),
            }
        }
    }

    inject_stylesheet(page, BASELINE_CSS).await?;
    if let Some(css) = extra_css {
        inject_stylesheet(page, css).await?;
    }

    Ok(())
}

/// Append a `<style>` tag carrying `css` to the document head.
pub async fn inject_stylesheet(page: &Page, css: &str) -> Result<(), RenderError> {
    let css = serde_json::to_string(css)?;
    let script = format!(
        r#"((css) => {{
    const style = document.createElement('style');
    style.appendChild(document.createTextNode(css));
    (document.head || document.documentElement).appendChild(style);
}})({css})"#
    );
    page.evaluate(script).await.map_err(RenderError::page)?;
    Ok(())
}
