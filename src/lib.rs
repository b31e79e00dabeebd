//! # pagesnap
//!
//! A headless-browser web render service for chat bots. Renders inline wiki
//! markup or live URLs inside a pooled Chrome process and returns the result
//! as ordered base64 image segments, splitting over-tall content into
//! scroll-synchronized slices that stay within encoder limits.
//!
//! ## Architecture
//!
//! - **Session pool**: one shared browser process, browsing contexts keyed
//!   by (width, height, locale) and created at most once per signature.
//! - **Capture pipeline**: load → prepare → resolve target → countdown
//!   overlay → segmented screenshot, per request on a fresh page.
//! - **Fallback tier**: a local failure re-issues the original request to a
//!   configured remote rendering peer's equivalent endpoint, at most once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesnap::{Config, RenderRequest, RenderService, SessionPool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let pool = Arc::new(SessionPool::launch(config.clone()).await?);
//!     let service = RenderService::new(config, Some(pool))?;
//!
//!     let request = RenderRequest {
//!         url: Some("https://example.com".to_string()),
//!         ..Default::default()
//!     };
//!     let result = service.page_screenshot(request).await?;
//!     println!("Captured {} segment(s)", result.segments.len());
//!
//!     Ok(())
//! }
//! ```

/// Configuration and Chrome launch settings
pub mod config;

/// Error types and fallback classification
pub mod error;

/// Request/response data model shared with the remote peer
pub mod request;

/// Browser process and browsing-context pool
pub mod session_pool;

/// Content loading and stylesheet injection
pub mod loader;

/// Ordered-candidate element resolution
pub mod resolver;

/// Segmented screenshot capture
pub mod capture;

/// Countdown overlay injection
pub mod overlay;

/// Local/remote fallback orchestration
pub mod fallback;

/// Render service composing the pipeline
pub mod service;

/// Wrapping templates, baseline CSS, and in-page scripts
pub mod templates;

/// HTTP boundary
pub mod server;

/// Counters and timings
pub mod metrics;

#[cfg(test)]
mod tests;

pub use capture::*;
pub use config::*;
pub use error::*;
pub use fallback::*;
pub use metrics::*;
pub use request::*;
pub use service::*;
pub use session_pool::*;
