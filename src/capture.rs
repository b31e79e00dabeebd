//! Segmented capture engine
//!
//! A single screenshot call is bounded by a maximum pixel height, so content
//! taller than the budget is captured as multiple vertically-adjacent clips.
//! Before any clip is taken all further network loading is disabled, so
//! scrolling cannot trigger late-loading content that shifts layout.
//!
//! Slice arithmetic is planned up front by [`plan_segments`]: the cursor
//! advances by the CSS-pixel budget `floor(max_segment_height / dpr)` and
//! each slice is clamped to the element's bottom edge, which guarantees the
//! segments cover `[top, top + height)` exactly, in order, with no overlap.

use crate::request::{CaptureResult, OutputFormat};
use crate::resolver::ResolvedElement;
use crate::RenderError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, SetBlockedUrLsParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, Viewport as ClipViewport,
};
use chromiumoxide::page::Page;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// The target element's content box in document coordinates, CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ContentBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One planned vertical slice of the content box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    pub y: f64,
    pub height: f64,
}

/// Capture parameters resolved from the request and service config.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub max_segment_height: u32,
    pub device_scale_factor: f64,
    pub format: OutputFormat,
    pub quality: u8,
    pub settle_delay: Duration,
}

/// Plan the vertical slices covering `content`.
///
/// An element no taller than `max_segment_height` takes the single-shot
/// path. Otherwise the cursor steps by the effective CSS-pixel budget
/// (screenshot APIs operate in device pixels) and the final slice is clamped
/// to the bottom edge.
pub fn plan_segments(content: &ContentBox, max_segment_height: u32, dpr: f64) -> Vec<Slice> {
    let max_height = f64::from(max_segment_height);
    if content.height <= max_height {
        return vec![Slice {
            y: content.y,
            height: content.height,
        }];
    }

    // A scale factor larger than the budget would floor the step to 0 and
    // stall the cursor.
    let step = (max_height / dpr).floor().max(1.0);
    let bottom = content.y + content.height;
    let mut slices = Vec::new();
    let mut cursor = content.y;
    while cursor < bottom {
        slices.push(Slice {
            y: cursor,
            height: (bottom - cursor).min(step),
        });
        cursor += step;
    }
    slices
}

/// Build the CDP screenshot parameters for one clip. Quality is only
/// forwarded for jpeg; the png encoder takes none.
pub fn screenshot_params(
    format: OutputFormat,
    quality: u8,
    clip: ClipViewport,
) -> CaptureScreenshotParams {
    let builder = CaptureScreenshotParams::builder()
        .format(match format {
            OutputFormat::Png => CaptureScreenshotFormat::Png,
            OutputFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
        })
        .clip(clip)
        .capture_beyond_viewport(true);

    match format {
        OutputFormat::Jpeg => builder.quality(i64::from(quality)).build(),
        OutputFormat::Png => builder.build(),
    }
}

/// Capture `target` as one or more encoded segments, top to bottom.
pub async fn capture_segments(
    page: &Page,
    target: &ResolvedElement,
    settings: &CaptureSettings,
) -> Result<CaptureResult, RenderError> {
    freeze_network(page).await?;

    page.evaluate("window.scroll(0, 0)")
        .await
        .map_err(RenderError::page)?;

    let content = measure(page, &target.selector).await?;
    if content.height <= 0.0 {
        return Err(RenderError::CaptureFailed(format!(
            "element '{}' has no layout height",
            target.selector
        )));
    }

    let slices = plan_segments(&content, settings.max_segment_height, settings.device_scale_factor);
    info!(
        "Content box {:?}, dpr {}, capturing {} segment(s)",
        content,
        settings.device_scale_factor,
        slices.len()
    );

    let mut segments = Vec::with_capacity(slices.len());
    let single_shot = slices.len() == 1;
    for slice in slices {
        if !single_shot {
            page.evaluate(format!("window.scroll({}, {})", content.x, slice.y))
                .await
                .map_err(RenderError::page)?;
            tokio::time::sleep(settings.settle_delay).await;
        }

        debug!(
            "Capturing clip x={} y={} w={} h={}",
            content.x, slice.y, content.width, slice.height
        );
        let params = screenshot_params(
            settings.format,
            settings.quality,
            ClipViewport {
                x: content.x,
                y: slice.y,
                width: content.width,
                height: slice.height,
                scale: 1.0,
            },
        );
        let bytes = page
            .screenshot(params)
            .await
            .map_err(|e| RenderError::CaptureFailed(e.to_string()))?;
        segments.push(BASE64.encode(bytes));
    }

    Ok(CaptureResult::new(segments))
}

/// Abort every new network request so scrolling during capture cannot load
/// content that shifts layout.
async fn freeze_network(page: &Page) -> Result<(), RenderError> {
    page.execute(NetworkEnableParams::default())
        .await
        .map_err(RenderError::page)?;
    page.execute(SetBlockedUrLsParams {
        urls: vec!["*".to_string()],
    })
    .await
    .map_err(RenderError::page)?;
    Ok(())
}

/// Read the element's content box in document coordinates. A missing box
/// (detached or unstyled element) is a fatal capture error.
async fn measure(page: &Page, selector: &str) -> Result<ContentBox, RenderError> {
    let selector_json = serde_json::to_string(selector)?;
    let script = format!(
        r#"((selector) => {{
    const el = document.querySelector(selector);
    if (el === null) return null;
    const rect = el.getBoundingClientRect();
    return {{
        x: rect.x + window.scrollX,
        y: rect.y + window.scrollY,
        width: rect.width,
        height: rect.height
    }};
}})({selector_json})"#
    );
    let content: Option<ContentBox> = page
        .evaluate(script)
        .await
        .map_err(RenderError::page)?
        .into_value()
        .map_err(|e| RenderError::CaptureFailed(e.to_string()))?;

    content.ok_or_else(|| {
        RenderError::CaptureFailed(format!("element '{selector}' has no content box"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(y: f64, height: f64) -> ContentBox {
        ContentBox {
            x: 0.0,
            y,
            width: 720.0,
            height,
        }
    }

    #[test]
    fn short_content_takes_single_shot() {
        let slices = plan_segments(&content(0.0, 1200.0), 2000, 1.0);
        assert_eq!(slices, vec![Slice { y: 0.0, height: 1200.0 }]);
    }

    #[test]
    fn boundary_height_is_still_single_shot() {
        let slices = plan_segments(&content(0.0, 2000.0), 2000, 1.0);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].height, 2000.0);
    }

    #[test]
    fn tall_content_splits_into_clamped_slices() {
        // 5000px content against a 2000px budget: [0,2000) [2000,4000) [4000,5000)
        let slices = plan_segments(&content(0.0, 5000.0), 2000, 1.0);
        assert_eq!(
            slices,
            vec![
                Slice { y: 0.0, height: 2000.0 },
                Slice { y: 2000.0, height: 2000.0 },
                Slice { y: 4000.0, height: 1000.0 },
            ]
        );
    }

    #[test]
    fn slice_count_matches_effective_budget() {
        let slices = plan_segments(&content(0.0, 5000.0), 2000, 2.0);
        // effective budget is 1000 CSS px
        assert_eq!(slices.len(), 5);
        assert!(slices.iter().all(|s| s.height <= 1000.0));
    }

    #[test]
    fn slices_cover_the_box_exactly_in_order() {
        let boxes = [
            content(0.0, 4999.0),
            content(120.5, 5000.0),
            content(0.0, 6001.0),
        ];
        for content in &boxes {
            for dpr in [1.0, 1.5, 2.0] {
                let slices = plan_segments(content, 2000, dpr);
                let bottom = content.y + content.height;

                let mut cursor = content.y;
                let mut last_y = f64::NEG_INFINITY;
                for slice in &slices {
                    assert!(slice.y > last_y, "ordering must be strictly increasing");
                    assert_eq!(slice.y, cursor, "no gap, no overlap");
                    assert!(slice.height > 0.0);
                    assert!(slice.y + slice.height <= bottom + 1e-9, "no over-capture");
                    last_y = slice.y;
                    cursor = if slices.len() == 1 {
                        bottom
                    } else {
                        cursor + (f64::from(2000u32) / dpr).floor()
                    };
                }
                let last = slices.last().unwrap();
                assert!(
                    (last.y + last.height - bottom).abs() < 1e-9,
                    "final slice reaches the bottom edge"
                );
            }
        }
    }

    #[test]
    fn oversized_scale_factor_still_advances() {
        // dpr larger than the budget floors the raw step to 0; the planner
        // must still terminate and cover the box.
        let slices = plan_segments(&content(0.0, 5.0), 2, 4.0);
        assert_eq!(slices.len(), 5);
        assert!(slices.iter().all(|s| s.height == 1.0));

        let last = slices.last().unwrap();
        assert_eq!(last.y + last.height, 5.0);
    }

    #[test]
    fn offset_element_slices_start_at_its_top() {
        let slices = plan_segments(&content(300.0, 4100.0), 2000, 1.0);
        assert_eq!(slices[0].y, 300.0);
        assert_eq!(slices.last().unwrap().y, 300.0 + 4000.0);
        assert_eq!(slices.last().unwrap().height, 100.0);
    }

    #[test]
    fn png_params_never_carry_quality() {
        let clip = ClipViewport {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            scale: 1.0,
        };
        let png = screenshot_params(OutputFormat::Png, 90, clip.clone());
        assert!(png.quality.is_none());

        let jpeg = screenshot_params(OutputFormat::Jpeg, 90, clip);
        assert_eq!(jpeg.quality, Some(90));
    }
}
