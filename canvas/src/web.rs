//! Browser render target over a 2D canvas context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].

use commands::{Point, Size};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::surface::{RenderTarget, StrokeStyle, TargetError};

fn js_error(err: &JsValue) -> TargetError {
    TargetError::new(format!("{err:?}"))
}

/// A `<canvas>` element and its 2D context.
pub struct CanvasTarget {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasTarget {
    /// Wrap `canvas`, acquiring its 2D context.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if the element has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, TargetError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| js_error(&e))?
            .ok_or_else(|| TargetError::new("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| TargetError::new("context is not a CanvasRenderingContext2d"))?;
        Ok(Self { canvas, ctx })
    }

    #[must_use]
    pub fn element(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl RenderTarget for CanvasTarget {
    fn size(&self) -> Size {
        Size::new(f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn resize(&mut self, size: Size) {
        self.canvas.set_width(size.width.max(0.0).round() as u32);
        self.canvas.set_height(size.height.max(0.0).round() as u32);
    }

    fn fill_rect(&mut self, origin: Point, size: Size, color: &str) -> Result<(), TargetError> {
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(origin.x, origin.y, size.width, size.height);
        Ok(())
    }

    fn stroke_path(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), TargetError> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        self.ctx.save();
        self.ctx.set_global_alpha(style.alpha);
        self.ctx.set_stroke_style_str(&style.color);
        self.ctx.set_line_width(style.width);
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
        self.ctx.begin_path();
        self.ctx.move_to(first.x, first.y);
        if rest.is_empty() {
            self.ctx.line_to(first.x, first.y);
        }
        for point in rest {
            self.ctx.line_to(point.x, point.y);
        }
        self.ctx.stroke();
        self.ctx.restore();
        Ok(())
    }
}
