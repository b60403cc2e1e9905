//! Coordinate-anchored highlighting.
//!
//! Citations are stored as rectangles normalized to page width/height and
//! mapped onto the rendered page on demand. The mapping is a pure function
//! of the current render size — nothing pixel-shaped is cached, so a zoom
//! change only needs a recompute.
//!
//! The set of active highlights lives in an explicit `HighlightContext`
//! handed to the rendering layer, not in process-wide state. Each scale
//! change bumps a render generation; a render pass that started under an
//! older generation is refused at commit and must be discarded rather than
//! painted over the newer render.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::SourceLocation;

/// Minimum visible edge, in pixels, for degenerate (point) citations.
pub const MIN_HIGHLIGHT_PX: f32 = 4.0;

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("render pass is stale: scale changed while rendering")]
    StaleRender,
    #[error("page render failed: {0}")]
    Render(String),
}

/// A draw region on the rendered page, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Map a normalized citation rectangle onto a page rendered at the given
/// pixel size.
///
/// Out-of-range coordinates are clamped into [0,1] and inverted extents
/// collapse to zero area, so a malformed citation can never produce a
/// negative draw region. Zero-area results are widened to
/// `MIN_HIGHLIGHT_PX` so point citations stay visible; the stored
/// normalized coordinates are never altered.
pub fn map_to_pixels(
    location: &SourceLocation,
    rendered_page_width: f32,
    rendered_page_height: f32,
) -> PixelRect {
    let x0 = location.x0.clamp(0.0, 1.0) as f32;
    let y0 = location.y0.clamp(0.0, 1.0) as f32;
    let x1 = (location.x1.clamp(0.0, 1.0) as f32).max(x0);
    let y1 = (location.y1.clamp(0.0, 1.0) as f32).max(y0);

    PixelRect {
        left: x0 * rendered_page_width,
        top: y0 * rendered_page_height,
        width: ((x1 - x0) * rendered_page_width).max(MIN_HIGHLIGHT_PX),
        height: ((y1 - y0) * rendered_page_height).max(MIN_HIGHLIGHT_PX),
    }
}

/// Pixel dimensions of a page rendered at some scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedPage {
    pub width_px: f32,
    pub height_px: f32,
}

/// Seam to the external PDF rendering surface. The mapper consumes only
/// the resulting pixel dimensions.
pub trait PdfRenderSurface {
    fn render_page(&self, page: u32, scale: f32) -> Result<RenderedPage, HighlightError>;
}

/// A highlight projected onto the rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedHighlight {
    pub field_path: String,
    pub page: u32,
    pub rect: PixelRect,
    /// Cited span, for tooltip display.
    pub text: String,
}

/// Token capturing the generation a render pass started under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPass {
    generation: u64,
}

/// Active citation highlights for the document being reviewed.
#[derive(Debug)]
pub struct HighlightContext {
    active: BTreeMap<String, Vec<SourceLocation>>,
    scale: f32,
    generation: u64,
}

impl HighlightContext {
    pub fn new() -> Self {
        Self {
            active: BTreeMap::new(),
            scale: 1.0,
            generation: 0,
        }
    }

    /// Replace the highlights shown for one field.
    pub fn set_highlights(&mut self, field_path: impl Into<String>, locations: Vec<SourceLocation>) {
        self.active.insert(field_path.into(), locations);
    }

    /// Drop all active highlights.
    pub fn clear_highlights(&mut self) {
        self.active.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Change the zoom level. Any in-flight render pass becomes stale.
    pub fn set_scale(&mut self, scale: f32) {
        if scale != self.scale {
            self.scale = scale;
            self.generation += 1;
        }
    }

    /// Start a render pass at the current scale.
    pub fn begin_render(&self) -> RenderPass {
        RenderPass {
            generation: self.generation,
        }
    }

    /// Check a pass against the current generation before painting.
    pub fn commit(&self, pass: RenderPass) -> Result<(), HighlightError> {
        if pass.generation != self.generation {
            return Err(HighlightError::StaleRender);
        }
        Ok(())
    }

    /// Project the active highlights for one page onto its rendered size.
    ///
    /// Fails with `StaleRender` when the scale moved since `begin_render`;
    /// the caller discards the pass and starts over at the new scale.
    pub fn project_page(
        &self,
        pass: RenderPass,
        page: u32,
        rendered: RenderedPage,
    ) -> Result<Vec<ProjectedHighlight>, HighlightError> {
        self.commit(pass)?;
        let mut projected = Vec::new();
        for (field_path, locations) in &self.active {
            for location in locations.iter().filter(|l| l.page == page) {
                projected.push(ProjectedHighlight {
                    field_path: field_path.clone(),
                    page,
                    rect: map_to_pixels(location, rendered.width_px, rendered.height_px),
                    text: location.text.clone(),
                });
            }
        }
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(page: u32, x0: f64, y0: f64, x1: f64, y1: f64) -> SourceLocation {
        SourceLocation {
            page,
            x0,
            y0,
            x1,
            y1,
            text: "cited span".to_string(),
        }
    }

    #[test]
    fn full_page_rect_maps_to_full_render() {
        let rect = map_to_pixels(&location(1, 0.0, 0.0, 1.0, 1.0), 400.0, 800.0);
        assert_eq!(
            rect,
            PixelRect {
                left: 0.0,
                top: 0.0,
                width: 400.0,
                height: 800.0
            }
        );
    }

    #[test]
    fn quarter_page_rect_maps_exactly() {
        let rect = map_to_pixels(&location(1, 0.25, 0.25, 0.75, 0.75), 400.0, 800.0);
        assert_eq!(
            rect,
            PixelRect {
                left: 100.0,
                top: 200.0,
                width: 200.0,
                height: 400.0
            }
        );
    }

    #[test]
    fn point_citation_gets_minimum_visible_size() {
        let rect = map_to_pixels(&location(1, 0.5, 0.5, 0.5, 0.5), 400.0, 800.0);
        assert_eq!(rect.left, 200.0);
        assert_eq!(rect.top, 400.0);
        assert_eq!(rect.width, MIN_HIGHLIGHT_PX);
        assert_eq!(rect.height, MIN_HIGHLIGHT_PX);
    }

    #[test]
    fn out_of_range_coordinates_clamp_to_degenerate() {
        // Inverted extent collapses to zero area at x0 and is floored to
        // the minimum size, never negative.
        let rect = map_to_pixels(&location(1, 0.8, 0.2, 0.3, 1.7), 400.0, 800.0);
        assert_eq!(rect.left, 320.0);
        assert_eq!(rect.width, MIN_HIGHLIGHT_PX);
        assert!(rect.height > 0.0);

        let negative = map_to_pixels(&location(1, -0.5, -0.5, -0.1, -0.1), 400.0, 800.0);
        assert_eq!(negative.left, 0.0);
        assert_eq!(negative.top, 0.0);
        assert_eq!(negative.width, MIN_HIGHLIGHT_PX);
        assert_eq!(negative.height, MIN_HIGHLIGHT_PX);
    }

    #[test]
    fn mapping_scales_with_render_size() {
        let loc = location(1, 0.25, 0.25, 0.75, 0.75);
        let at_1x = map_to_pixels(&loc, 400.0, 800.0);
        let at_2x = map_to_pixels(&loc, 800.0, 1600.0);
        assert_eq!(at_2x.left, at_1x.left * 2.0);
        assert_eq!(at_2x.width, at_1x.width * 2.0);
        // Stored coordinates untouched.
        assert_eq!(loc.x0, 0.25);
    }

    #[test]
    fn project_filters_by_page() {
        let mut ctx = HighlightContext::new();
        ctx.set_highlights(
            "population.sample_size",
            vec![
                location(2, 0.1, 0.1, 0.2, 0.15),
                location(3, 0.1, 0.1, 0.2, 0.15),
            ],
        );
        let pass = ctx.begin_render();
        let rendered = RenderedPage {
            width_px: 600.0,
            height_px: 800.0,
        };
        let on_page_2 = ctx.project_page(pass, 2, rendered).unwrap();
        assert_eq!(on_page_2.len(), 1);
        assert_eq!(on_page_2[0].page, 2);
        assert_eq!(on_page_2[0].field_path, "population.sample_size");
    }

    #[test]
    fn stale_pass_is_refused_after_zoom() {
        let mut ctx = HighlightContext::new();
        ctx.set_highlights("f", vec![location(1, 0.0, 0.0, 0.5, 0.5)]);

        let pass = ctx.begin_render();
        ctx.set_scale(1.5);

        let rendered = RenderedPage {
            width_px: 900.0,
            height_px: 1200.0,
        };
        let err = ctx.project_page(pass, 1, rendered).unwrap_err();
        assert!(matches!(err, HighlightError::StaleRender));
        assert!(matches!(ctx.commit(pass), Err(HighlightError::StaleRender)));

        // A fresh pass at the new scale succeeds.
        let fresh = ctx.begin_render();
        assert!(ctx.project_page(fresh, 1, rendered).is_ok());
    }

    #[test]
    fn unchanged_scale_keeps_pass_valid() {
        let mut ctx = HighlightContext::new();
        let pass = ctx.begin_render();
        ctx.set_scale(1.0); // same scale, no generation bump
        assert!(ctx.commit(pass).is_ok());
    }

    #[test]
    fn clear_highlights_resets_active_set() {
        let mut ctx = HighlightContext::new();
        ctx.set_highlights("a", vec![location(1, 0.0, 0.0, 0.1, 0.1)]);
        assert!(!ctx.is_empty());
        ctx.clear_highlights();
        assert!(ctx.is_empty());

        let pass = ctx.begin_render();
        let rendered = RenderedPage {
            width_px: 100.0,
            height_px: 100.0,
        };
        assert!(ctx.project_page(pass, 1, rendered).unwrap().is_empty());
    }
}
