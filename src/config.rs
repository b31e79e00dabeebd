//! Configuration management with serde serialization/deserialization
//!
//! Provides the service configuration plus Chrome launch argument and
//! `BrowserConfig` construction for the shared browser process.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default viewport width for pooled browsing contexts, in CSS pixels.
pub const BASE_WIDTH: u32 = 720;

/// Default viewport height for pooled browsing contexts, in CSS pixels.
pub const BASE_HEIGHT: u32 = 1280;

/// Default locale for pooled browsing contexts.
pub const BASE_LOCALE: &str = "zh_cn";

/// User agent presented by every browsing context.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/93.0.4577.63 Safari/537.36";

/// Main configuration structure for the render service
///
/// Controls the browser process, capture behaviour, and the optional remote
/// rendering peer used as a fallback tier.
///
/// # Examples
///
/// ```rust
/// use pagesnap::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Remote-only deployment (no local browser attempts)
/// let config = Config {
///     remote_url: Some("https://render.example.com".to_string()),
///     remote_only: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Address the HTTP boundary binds to (default: 127.0.0.1)
    pub host: String,

    /// Port the HTTP boundary binds to (default: 15551)
    pub port: u16,

    /// Maximum height of a single screenshot segment in device pixels
    /// (default: 4096)
    ///
    /// Content taller than this is captured as multiple scroll-synchronized
    /// segments. Bounded by encoder and renderer memory limits.
    pub max_segment_height: u32,

    /// Device pixel ratio applied to pooled contexts (default: 1.0)
    pub device_scale_factor: f64,

    /// Upper bound on page navigation and content settling (default: 30s)
    ///
    /// Exceeding it surfaces `LoadTimeout`, which triggers the remote
    /// fallback tier when one is configured.
    pub navigation_timeout: Duration,

    /// Fixed pause after each scroll step during segmented capture
    /// (default: 3s)
    ///
    /// Lets scroll-triggered reflow and lazy content finish before the clip
    /// is taken.
    pub settle_delay: Duration,

    /// Base URL of the remote rendering peer (default: none)
    ///
    /// When set, local capture failures are re-issued to this peer's
    /// equivalent endpoint.
    pub remote_url: Option<String>,

    /// Skip local capture entirely and dispatch straight to the remote peer
    /// (default: false)
    pub remote_only: bool,

    /// Round-trip bound on a remote fallback call (default: 30s)
    pub remote_timeout: Duration,

    /// Leave pages open after capture for operator inspection
    /// (default: false)
    ///
    /// Development-only mode: open pages accumulate for the lifetime of the
    /// process. Never enable in a long-running deployment.
    pub debug: bool,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Custom User-Agent string (default: the bundled Chrome UA)
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 15551,
            max_segment_height: 4096,
            device_scale_factor: 1.0,
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            remote_url: None,
            remote_only: false,
            remote_timeout: Duration::from_secs(30),
            debug: false,
            chrome_path: None,
            user_agent: None,
        }
    }
}

impl Config {
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(USER_AGENT)
    }

    /// Normalized remote peer base URL, trailing slash guaranteed.
    pub fn remote_base(&self) -> Option<String> {
        self.remote_url.as_ref().map(|u| {
            if u.ends_with('/') {
                u.clone()
            } else {
                format!("{u}/")
            }
        })
    }
}

/// Generate Chrome command-line arguments for the shared browser process
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let unique_id = format!("{}-{}", std::process::id(), uuid::Uuid::new_v4());

    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--hide-scrollbars".to_string(),
        "--mute-audio".to_string(),
        format!("--window-size={BASE_WIDTH},{BASE_HEIGHT}"),
        format!("--user-data-dir=/tmp/pagesnap-{unique_id}"),
        format!("--user-agent={}", config.user_agent()),
    ];

    if !config.debug {
        args.push("--headless=new".to_string());
    }

    args
}

pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, String> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(BASE_WIDTH, BASE_HEIGHT)
        .args(get_chrome_args(config));

    if config.debug {
        builder = builder.with_head();
    }

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build()
}
