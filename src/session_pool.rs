//! Session pool owning the shared browser process
//!
//! One long-lived Chrome process serves every request. Isolation comes from
//! browsing contexts keyed by a (width, height, locale) signature: contexts
//! are created lazily, at most once per signature, and live until shutdown.
//! Pages are request-scoped and never reused.

use crate::{create_browser_config, Config, RenderError};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::Page;
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info};

/// Identity key for a pooled browsing context. Requests sharing a signature
/// share cookie/storage isolation but always get distinct pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewportSignature {
    pub width: u32,
    pub height: u32,
    pub locale: String,
}

impl std::fmt::Display for ViewportSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.locale)
    }
}

/// Init script reducing the automation fingerprint of every page: masks the
/// webdriver flag, fills in plugin/language stubs, and restores the
/// `window.chrome` object headless Chrome omits.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['zh-CN', 'en'] });
window.chrome = window.chrome || { runtime: {} };
const originalQuery = window.navigator.permissions.query;
window.navigator.permissions.query = (parameters) =>
    parameters.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : originalQuery(parameters);
"#;

/// Pool of browsing contexts inside one shared browser process.
///
/// Launched once at startup; handing out pages is cheap. `new_page` is the
/// only entry point requests need.
pub struct SessionPool {
    browser: Arc<Mutex<Browser>>,
    handler: tokio::task::JoinHandle<Result<(), chromiumoxide::error::CdpError>>,
    contexts: DashMap<ViewportSignature, Arc<OnceCell<BrowserContextId>>>,
    config: Config,
}

impl SessionPool {
    /// Launch the browser process and start the CDP event loop.
    pub async fn launch(config: Config) -> Result<Self, RenderError> {
        info!("Launching browser...");
        let browser_config =
            create_browser_config(&config).map_err(RenderError::BrowserLaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::BrowserLaunchFailed(e.to_string()))?;

        // The handler implements Stream and must be polled for the lifetime
        // of the browser process.
        let handler_task = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("CDP handler error: {}", e);
                        return Err(e);
                    }
                    None => {
                        info!("CDP handler stream ended");
                        break;
                    }
                }
            }
            Ok(())
        });

        info!("Successfully launched browser.");
        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler: handler_task,
            contexts: DashMap::new(),
            config,
        })
    }

    /// Return the browsing context for `signature`, creating it if absent.
    ///
    /// Creation is single-flight per signature: concurrent first requests
    /// for the same signature resolve to the one context the winning caller
    /// created.
    pub async fn acquire_context(
        &self,
        signature: &ViewportSignature,
    ) -> Result<BrowserContextId, RenderError> {
        let cell = self
            .contexts
            .entry(signature.clone())
            .or_default()
            .clone();

        let context_id = cell
            .get_or_try_init(|| async {
                info!("Creating browsing context for {}", signature);
                let browser = self.browser.lock().await;
                browser
                    .create_browser_context(CreateBrowserContextParams::default())
                    .await
                    .map_err(RenderError::page)
            })
            .await?;

        Ok(context_id.clone())
    }

    /// Create a fresh page inside the context for `signature`.
    ///
    /// The page belongs exclusively to the calling request and must be
    /// closed when the request finishes (unless debug mode keeps it open).
    pub async fn new_page(
        &self,
        signature: &ViewportSignature,
        stealth: bool,
    ) -> Result<Page, RenderError> {
        let context_id = self.acquire_context(signature).await?;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(RenderError::PageError)?;

        let page = {
            let browser = self.browser.lock().await;
            browser.new_page(params).await.map_err(RenderError::page)?
        };

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(signature.width as i64)
            .height(signature.height as i64)
            .device_scale_factor(self.config.device_scale_factor)
            .mobile(false)
            .build()
            .map_err(RenderError::PageError)?;
        page.execute(metrics).await.map_err(RenderError::page)?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(self.config.user_agent())
            .build()
            .map_err(RenderError::PageError)?;
        page.execute(user_agent).await.map_err(RenderError::page)?;

        let mut locale = SetLocaleOverrideParams::default();
        locale.locale = Some(signature.locale.replace('_', "-"));
        page.execute(locale).await.map_err(RenderError::page)?;

        if stealth {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
                STEALTH_SCRIPT,
            ))
            .await
            .map_err(RenderError::page)?;
        }

        debug!("New page created in context {}", signature);
        Ok(page)
    }

    /// Number of live browsing contexts, for diagnostics.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Close the browser process and stop the CDP event loop.
    pub async fn shutdown(&self) {
        info!("Shutting down session pool...");
        let _ = self.browser.lock().await.close().await;
        self.handler.abort();
        info!("Session pool shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_identity() {
        let a = ViewportSignature {
            width: 720,
            height: 1280,
            locale: "zh_cn".into(),
        };
        let b = ViewportSignature {
            width: 720,
            height: 1280,
            locale: "zh_cn".into(),
        };
        let c = ViewportSignature {
            width: 720,
            height: 1280,
            locale: "en_us".into(),
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "720x1280@zh_cn");
    }
}
