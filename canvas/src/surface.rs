//! Render target seam.
//!
//! Everything the replay engine draws goes through [`RenderTarget`]. The
//! browser build implements it over a `CanvasRenderingContext2d`; tools and
//! tests use [`crate::headless::RecordingTarget`].

use commands::{Point, Size};

/// Failure reported by a render target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("render target error: {0}")]
pub struct TargetError(pub String);

impl TargetError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Pen settings for one polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    /// Line width in target pixels.
    pub width: f64,
    /// Opacity in `[0, 1]`.
    pub alpha: f64,
}

/// A drawing surface with a pixel size.
///
/// The size is the surface the page was last laid out on. Strokes captured
/// on a different canvas size are rescaled against it before drawing.
pub trait RenderTarget {
    /// Current surface size in pixels.
    fn size(&self) -> Size;

    /// Resize the surface, discarding its contents.
    fn resize(&mut self, size: Size);

    /// Fill an axis-aligned rectangle with an opaque color.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if the underlying surface rejects the call.
    fn fill_rect(&mut self, origin: Point, size: Size, color: &str) -> Result<(), TargetError>;

    /// Stroke a polyline through `points` in order.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if the underlying surface rejects the call.
    fn stroke_path(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), TargetError>;
}
