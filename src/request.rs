//! Request and result data model shared by the local pipeline, the HTTP
//! boundary, and the remote fallback tier.
//!
//! The wire shape matches the remote peer's endpoints: optional fields are
//! omitted when unset so a serialized request round-trips between peers.

use crate::error::RenderError;
use crate::session_pool::ViewportSignature;
use serde::{Deserialize, Serialize};

use crate::config::{BASE_HEIGHT, BASE_LOCALE, BASE_WIDTH};

/// Supported output encodings for capture segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Jpeg
    }
}

/// Ordered candidate selectors: try each in order, use the first that
/// resolves to an existing element. A bare string is a one-element set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SelectorSet {
    One(String),
    Ordered(Vec<String>),
}

impl SelectorSet {
    pub fn candidates(&self) -> &[String] {
        match self {
            SelectorSet::One(s) => std::slice::from_ref(s),
            SelectorSet::Ordered(v) => v,
        }
    }
}

impl From<&str> for SelectorSet {
    fn from(s: &str) -> Self {
        SelectorSet::One(s.to_string())
    }
}

impl From<Vec<String>> for SelectorSet {
    fn from(v: Vec<String>) -> Self {
        SelectorSet::Ordered(v)
    }
}

/// The validated content source of a request: exactly one of inline markup
/// or a URL to navigate to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Inline(String),
    Url(String),
}

fn default_width() -> u32 {
    BASE_WIDTH
}

fn default_height() -> u32 {
    BASE_HEIGHT
}

fn default_locale() -> String {
    BASE_LOCALE.to_string()
}

fn default_quality() -> u8 {
    90
}

fn default_true() -> bool {
    true
}

/// One capture request, as received on the HTTP boundary and as POSTed to
/// the remote peer on fallback.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderRequest {
    /// Viewport width in CSS pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Viewport height in CSS pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Locale applied to the browsing context
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Inline HTML content; mutually exclusive with `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// URL to navigate to; mutually exclusive with `content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Extra stylesheet applied after the baseline rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,

    /// Target region selector(s); operation-specific defaults apply when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<SelectorSet>,

    /// Section candidate selector(s) for section captures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SelectorSet>,

    /// For source fetches: return the text of the page's `<pre>` instead of
    /// its HTML source
    #[serde(default)]
    pub raw_text: bool,

    /// Segment encoding (default: jpeg)
    #[serde(default)]
    pub output_type: OutputFormat,

    /// Encoder quality 0-100; only meaningful for jpeg
    #[serde(default = "default_quality")]
    pub output_quality: u8,

    /// Show the "generated in Ns" countdown badge
    #[serde(default = "default_true")]
    pub counttime: bool,

    /// Style the wrapped document for MediaWiki parser output
    #[serde(default)]
    pub mw: bool,

    /// Apply stealth hardening to the page (default: true)
    #[serde(default = "default_true")]
    pub stealth: bool,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            width: BASE_WIDTH,
            height: BASE_HEIGHT,
            locale: BASE_LOCALE.to_string(),
            content: None,
            url: None,
            css: None,
            element: None,
            section: None,
            raw_text: false,
            output_type: OutputFormat::default(),
            output_quality: 90,
            counttime: true,
            mw: false,
            stealth: true,
        }
    }
}

impl RenderRequest {
    /// Identity key of the pooled browsing context this request renders in.
    pub fn signature(&self) -> ViewportSignature {
        ViewportSignature {
            width: self.width,
            height: self.height,
            locale: self.locale.clone(),
        }
    }

    /// Validate the content source: exactly one of `content`/`url`.
    pub fn source(&self) -> Result<ContentSource, RenderError> {
        match (&self.content, &self.url) {
            (Some(_), Some(_)) => Err(RenderError::InvalidRequest(
                "both content and url supplied",
            )),
            (Some(content), None) => Ok(ContentSource::Inline(content.clone())),
            (None, Some(url)) => Ok(ContentSource::Url(url.clone())),
            (None, None) => Err(RenderError::MissingParameter("content or url")),
        }
    }

    /// The URL, for operations that accept no inline content.
    pub fn required_url(&self) -> Result<&str, RenderError> {
        self.url
            .as_deref()
            .ok_or(RenderError::MissingParameter("url"))
    }
}

/// Ordered base64-encoded image segments, top to bottom. Consumers display
/// them in sequence to reconstruct the captured region.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CaptureResult {
    pub segments: Vec<String>,
}

impl CaptureResult {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

/// The operations exposed by this service and, symmetrically, by the remote
/// fallback peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEndpoint {
    LegacyScreenshot,
    PageScreenshot,
    ElementScreenshot,
    SectionScreenshot,
    Source,
}

impl RenderEndpoint {
    /// Path of the equivalent endpoint on a rendering peer.
    pub fn path(&self) -> &'static str {
        match self {
            RenderEndpoint::LegacyScreenshot => "legacy_screenshot/",
            RenderEndpoint::PageScreenshot => "page/",
            RenderEndpoint::ElementScreenshot => "element_screenshot/",
            RenderEndpoint::SectionScreenshot => "section_screenshot/",
            RenderEndpoint::Source => "source/",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RenderEndpoint::LegacyScreenshot => "legacy_screenshot",
            RenderEndpoint::PageScreenshot => "page_screenshot",
            RenderEndpoint::ElementScreenshot => "element_screenshot",
            RenderEndpoint::SectionScreenshot => "section_screenshot",
            RenderEndpoint::Source => "source",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_set_accepts_string_and_list() {
        let one: SelectorSet = serde_json::from_str(r#""body""#).unwrap();
        assert_eq!(one.candidates(), &["body".to_string()]);

        let ordered: SelectorSet =
            serde_json::from_str(r#"[".specific", ".generic"]"#).unwrap();
        assert_eq!(
            ordered.candidates(),
            &[".specific".to_string(), ".generic".to_string()]
        );
    }

    #[test]
    fn source_requires_exactly_one() {
        let mut request = RenderRequest {
            content: Some("<p>hi</p>".into()),
            ..Default::default()
        };
        assert_eq!(
            request.source().unwrap(),
            ContentSource::Inline("<p>hi</p>".into())
        );

        request.url = Some("https://example.com".into());
        assert!(matches!(
            request.source(),
            Err(RenderError::InvalidRequest(_))
        ));

        request.content = None;
        assert_eq!(
            request.source().unwrap(),
            ContentSource::Url("https://example.com".into())
        );

        request.url = None;
        assert!(matches!(
            request.source(),
            Err(RenderError::MissingParameter(_))
        ));
    }

    #[test]
    fn unset_fields_are_omitted_on_the_wire() {
        let request = RenderRequest {
            content: Some("<p>hi</p>".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("content"));
        assert!(!obj.contains_key("url"));
        assert!(!obj.contains_key("css"));
        assert!(!obj.contains_key("element"));
    }

    #[test]
    fn capture_result_is_a_bare_array() {
        let result = CaptureResult::new(vec!["aGk=".into(), "eW8=".into()]);
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"["aGk=","eW8="]"#
        );

        let parsed: CaptureResult = serde_json::from_str(r#"["aGk="]"#).unwrap();
        assert_eq!(parsed.segments.len(), 1);
    }

    #[test]
    fn endpoint_paths_match_the_peer_contract() {
        assert_eq!(RenderEndpoint::ElementScreenshot.path(), "element_screenshot/");
        assert_eq!(RenderEndpoint::PageScreenshot.path(), "page/");
        assert_eq!(RenderEndpoint::Source.path(), "source/");
    }
}
