//! Element resolution over ordered selector candidates
//!
//! Models "try the specific layout first, degrade to the generic one": each
//! candidate is queried in order and the first that exists wins. The matched
//! selector string is kept so later steps (countdown overlay, content-box
//! measurement) can target the exact same node.

use crate::request::SelectorSet;
use crate::RenderError;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use tracing::debug;

/// An element handle together with the selector string that matched it.
pub struct ResolvedElement {
    pub element: Element,
    pub selector: String,
}

/// Whether a query failure means "no such element" rather than a broken
/// page or transport. Only the former moves on to the next candidate.
fn candidate_missed(err: &CdpError) -> bool {
    matches!(err, CdpError::NotFound)
}

/// Resolve the first existing element among `selectors`.
///
/// Fails with `ElementNotFound` when no candidate matches; that outcome is
/// client-visible and never retried locally. Any other query failure (closed
/// page, transport error) propagates as an internal error instead of being
/// reported as a miss.
pub async fn resolve(page: &Page, selectors: &SelectorSet) -> Result<ResolvedElement, RenderError> {
    for selector in selectors.candidates() {
        match page.find_element(selector.as_str()).await {
            Ok(element) => {
                debug!("Selector matched: {}", selector);
                return Ok(ResolvedElement {
                    element,
                    selector: selector.clone(),
                });
            }
            Err(e) if candidate_missed(&e) => {
                debug!("Selector missed: {}", selector);
            }
            Err(e) => return Err(RenderError::page(e)),
        }
    }

    Err(RenderError::ElementNotFound(
        selectors.candidates().join(", "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_nodes_count_as_a_miss() {
        assert!(candidate_missed(&CdpError::NotFound));

        let transport_err =
            CdpError::from(serde_json::from_str::<serde_json::Value>("not json").unwrap_err());
        assert!(!candidate_missed(&transport_err));
    }
}
