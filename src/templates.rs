//! Templating collaborators: the wrapping document for inline markup, the
//! baseline stylesheets, the chrome-hiding selector list, and the in-page
//! cleanup scripts. The capture core treats all of this as opaque HTML/JS.

/// Page-furniture selectors hidden before any screenshot is taken: ads,
/// floating navigation, modals, app-install prompts from the wiki farms the
/// bot most often renders.
pub const CHROME_SELECTORS: &[&str] = &[
    ".notifications-placeholder",
    ".top-ads-container",
    ".fandom-sticky-header",
    "div#WikiaBar",
    "aside.page__right-rail",
    ".n-modal-container",
    "div#moe-float-toc-container",
    "div#moe-draw-float-button",
    "div#moe-global-header",
    ".mys-wrapper",
    "div#moe-open-in-app",
    "div#age-gate",
    ".va-variant-prompt",
    ".va-variant-prompt-mobile",
];

/// Baseline stylesheet applied to every loaded page before any caller CSS,
/// so caller rules can override it. Unmasks spoiler text and flattens
/// tabbers so hidden content renders.
pub const BASELINE_CSS: &str = r#"
span.heimu a.external, span.heimu a.external:visited, span.heimu a.extiw, span.heimu a.extiw:visited {
  color: #252525;
}
.heimu, .heimu a, a .heimu, .heimu a.new {
  background-color: #cccccc;
  text-shadow: none;
}
.tabber-container-infobox ul.tabbernav {
  display: none;
}
.tabber-container-infobox .tabber .tabbertab {
  display: unset !important;
}
"#;

/// Wrap raw markup into a displayable document with CJK-aware font rules and
/// infobox normalization for narrow viewports.
pub fn wrap_content(contents: &str) -> String {
    format!(
        r#"<link rel="preconnect" href="https://fonts.googleapis.com">
<link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
<link href="https://fonts.googleapis.com/css2?family=Noto+Sans+HK&family=Noto+Sans+JP&family=Noto+Sans+KR&family=Noto+Sans+SC&family=Noto+Sans+TC&display=swap" rel="stylesheet">
<style>html body {{
    margin-top: 0px !important;
    font-family: 'Noto Sans SC', sans-serif;
}}

:lang(ko) {{
    font-family: 'Noto Sans KR', 'Noto Sans JP', 'Noto Sans HK', 'Noto Sans TC', 'Noto Sans SC', sans-serif;
}}

:lang(ja) {{
    font-family: 'Noto Sans JP', 'Noto Sans HK', 'Noto Sans TC', 'Noto Sans SC', 'Noto Sans KR', sans-serif;
}}

:lang(zh-TW), :lang(zh-HK) {{
    font-family: 'Noto Sans HK', 'Noto Sans TC', 'Noto Sans JP', 'Noto Sans SC', 'Noto Sans KR', sans-serif;
}}

:lang(zh-Hans), :lang(zh-CN), :lang(zh) {{
    font-family: 'Noto Sans SC', 'Noto Sans HK', 'Noto Sans TC', 'Noto Sans JP', 'Noto Sans KR', sans-serif;
}}

div.infobox div.notaninfobox {{
    width: 100%!important;
    float: none!important;
    margin: 0 0 0 0!important;
}}

table.infobox, table.infoboxSpecial, table.moe-infobox {{
    width: 100%!important;
    float: unset!important;
    margin: 0 0 0 0!important;
}}</style>
<meta charset="UTF-8">
<body>
{contents}
</body>
"#
    )
}

/// In-page cleanup run before element resolution: force-load lazy images,
/// freeze animations, hide every configured chrome selector, and strip
/// event listeners by replacing each node with a deep clone so nothing
/// reacts to the capture-time scrolling.
pub fn cleanup_script() -> String {
    let selectors = serde_json::to_string(CHROME_SELECTORS)
        .unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"((toDisable) => {{
    document.querySelectorAll("img").forEach((image) => {{
        image.removeAttribute("loading");
    }});
    document.querySelectorAll(".animated").forEach((animated) => {{
        const frames = animated.querySelectorAll("img");
        frames.forEach((frame) => {{
            frame.width = frame.getAttribute("width") / (frames.length / 2);
            frame.height = frame.getAttribute("height") / (frames.length / 2);
        }});
        animated.className = "nolongeranimated";
    }});
    for (const selector of toDisable) {{
        const el = document.querySelector(selector);
        if (el !== null) {{
            el.style = "display: none";
        }}
    }}
    document.querySelectorAll("*").forEach((element) => {{
        element.parentNode.replaceChild(element.cloneNode(true), element);
    }});
    window.scroll(0, 0);
}})({selectors})"#
    )
}

/// Tag the first matching section candidate with a marker class so the
/// capture target becomes a single stable selector.
pub fn section_script(candidates: &[String]) -> Result<String, serde_json::Error> {
    let candidates = serde_json::to_string(candidates)?;
    Ok(format!(
        r#"((candidates) => {{
    for (const selector of candidates) {{
        const section = document.querySelector(selector);
        if (section !== null) {{
            section.classList.add("bot-sectionbox");
            return;
        }}
    }}
}})({candidates})"#
    ))
}

/// Marker selector produced by [`section_script`].
pub const SECTION_BOX_SELECTOR: &str = ".bot-sectionbox";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_content_embeds_the_markup() {
        let html = wrap_content("<p>hello</p>");
        assert!(html.contains("<p>hello</p>"));
        assert!(html.contains("<body>"));
        assert!(html.contains("Noto Sans SC"));
    }

    #[test]
    fn cleanup_script_carries_every_chrome_selector() {
        let script = cleanup_script();
        for selector in CHROME_SELECTORS {
            assert!(script.contains(selector), "missing {selector}");
        }
    }

    #[test]
    fn cleanup_script_strips_event_listeners() {
        let script = cleanup_script();
        assert!(script.contains("cloneNode(true)"));
        assert!(script.contains("replaceChild"));
    }

    #[test]
    fn section_script_escapes_candidates() {
        let script = section_script(&["#sec-1".to_string(), "h2 \"q\"".to_string()]).unwrap();
        assert!(script.contains("#sec-1"));
        assert!(script.contains("\\\"q\\\""));
        assert!(script.contains("bot-sectionbox"));
    }
}
