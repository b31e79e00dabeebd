//! Countdown overlay injection
//!
//! Inserts a low-opacity "generated in Ns" badge as the first child of the
//! capture target and keeps it ticking with a self-rescheduling one-second
//! timer inside the page. Purely presentational: any failure here is logged
//! and swallowed so it can never abort a capture.

use chromiumoxide::page::Page;
use tracing::debug;

/// Label shown in the countdown badge.
pub const BADGE_NAME: &str = "pagesnap";

/// Best-effort: inject the countdown badge into the element matched by
/// `selector`, counting seconds elapsed since `start_time_ms` (unix millis).
pub async fn inject_countdown(page: &Page, selector: &str, start_time_ms: i64) {
    let script = match countdown_script(selector, start_time_ms) {
        Ok(script) => script,
        Err(e) => {
            debug!("Countdown script build failed: {}", e);
            return;
        }
    };

    if let Err(e) = page.evaluate(script).await {
        debug!("Countdown overlay injection failed: {}", e);
    }
}

fn countdown_script(selector: &str, start_time_ms: i64) -> Result<String, serde_json::Error> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"(({{ selector, startTime, name }}) => {{
    const badge = document.createElement('span');
    badge.className = 'bot-countbox';
    badge.style = 'position: absolute;opacity: 0.2;';
    const target = document.querySelector(selector);
    target.insertBefore(badge, target.firstChild);
    countTime();
    function countTime() {{
        const now = new Date();
        const elapsed = parseInt((now.getTime() - startTime) / 1000);
        document.querySelector('.bot-countbox').innerHTML = `Generated by ${{name}} in ${{elapsed}}s`;
        setTimeout(countTime, 1000);
    }}
}})({{ selector: {selector}, startTime: {start_time_ms}, name: '{BADGE_NAME}' }})"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_targets_the_matched_selector() {
        let script = countdown_script("body > .mw-parser-output", 1700000000000).unwrap();
        assert!(script.contains("body > .mw-parser-output"));
        assert!(script.contains("1700000000000"));
        assert!(script.contains("bot-countbox"));
        assert!(script.contains(BADGE_NAME));
    }

    #[test]
    fn selector_is_json_escaped() {
        let script = countdown_script("a[title=\"x\"]", 0).unwrap();
        assert!(script.contains(r#"a[title=\"x\"]"#));
    }
}
