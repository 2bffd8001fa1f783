#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use commands::{Point, Size};

use crate::consts::{DEFAULT_SCALE, ZOOM_STEP};
use crate::document::{DocumentPage, Viewport};

/// Local zoom and fullscreen state of one viewer.
///
/// Never shared with peers: each participant picks its own scale, and
/// strokes are rescaled on arrival instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    scale: f64,
    fullscreen: bool,
    screen: Size,
}

impl ViewState {
    /// A windowed view at the default scale on a screen of `screen` pixels.
    #[must_use]
    pub fn new(screen: Size) -> Self {
        Self { scale: DEFAULT_SCALE, fullscreen: false, screen }
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn zoom_in(&mut self) {
        self.scale *= ZOOM_STEP;
    }

    pub fn zoom_out(&mut self) {
        self.scale /= ZOOM_STEP;
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn set_screen(&mut self, screen: Size) {
        self.screen = screen;
    }

    /// Scale that fits a page laid out as `viewport` inside the screen.
    ///
    /// `min(scale * screen_h / vp_h, scale * screen_w / vp_w)`. Falls back to
    /// the current scale when the viewport is degenerate.
    #[must_use]
    pub fn fit_scale(&self, viewport: Viewport) -> f64 {
        let vertical = self.scale * self.screen.height / viewport.height;
        let horizontal = self.scale * self.screen.width / viewport.width;
        let fit = vertical.min(horizontal);
        if fit.is_finite() && fit > 0.0 { fit } else { self.scale }
    }

    /// Viewport `page` should be laid out with under the current view.
    #[must_use]
    pub fn viewport_for(&self, page: &dyn DocumentPage) -> Viewport {
        let viewport = page.viewport(self.scale);
        if self.fullscreen {
            page.viewport(self.fit_scale(viewport))
        } else {
            viewport
        }
    }
}

/// Per-axis factors mapping a source canvas onto a target canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeScale {
    pub x: f64,
    pub y: f64,
}

impl StrokeScale {
    /// Factors mapping points captured on `source` onto `target`.
    #[must_use]
    pub fn between(source: Size, target: Size) -> Self {
        Self { x: target.width / source.width, y: target.height / source.height }
    }

    #[must_use]
    pub fn apply(&self, point: Point) -> Point {
        Point::new(point.x * self.x, point.y * self.y)
    }

    /// Line widths follow the horizontal factor.
    #[must_use]
    pub fn apply_width(&self, width: f64) -> f64 {
        width * self.x
    }
}
