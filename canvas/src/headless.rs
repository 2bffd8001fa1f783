//! Headless rendering: a uniform-page document and a recording target.
//!
//! Used by the command-line tools to replay sessions without a browser, and
//! by tests to assert exactly what was drawn.

#[cfg(test)]
#[path = "headless_test.rs"]
mod headless_test;

use async_trait::async_trait;
use commands::{PageNumber, Point, Size};

use crate::consts::PAGE_BACKGROUND;
use crate::document::{DocumentError, DocumentLoader, DocumentPage, DocumentSource, LoadProgress, Viewport};
use crate::surface::{RenderTarget, StrokeStyle, TargetError};

/// A document of `pages` blank pages, all `page_size` at scale 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformDocument {
    pages: u32,
    page_size: Size,
}

impl UniformDocument {
    #[must_use]
    pub fn new(pages: u32, page_size: Size) -> Self {
        Self { pages, page_size }
    }
}

struct UniformPage {
    size: Size,
}

#[async_trait(?Send)]
impl DocumentPage for UniformPage {
    fn viewport(&self, scale: f64) -> Viewport {
        Viewport { width: self.size.width * scale, height: self.size.height * scale, scale }
    }

    async fn render(&self, target: &mut dyn RenderTarget, viewport: &Viewport) -> Result<(), DocumentError> {
        target.fill_rect(Point::new(0.0, 0.0), viewport.size(), PAGE_BACKGROUND)?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl DocumentSource for UniformDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    async fn page(&self, page: PageNumber) -> Result<Box<dyn DocumentPage>, DocumentError> {
        if page.get() > self.pages {
            return Err(DocumentError::PageOutOfRange { page, count: self.pages });
        }
        Ok(Box::new(UniformPage { size: self.page_size }))
    }
}

/// Loader that opens every location as a [`UniformDocument`].
///
/// Reports one progress step per page.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessLoader {
    pages: u32,
    page_size: Size,
}

impl HeadlessLoader {
    #[must_use]
    pub fn new(pages: u32, page_size: Size) -> Self {
        Self { pages, page_size }
    }
}

#[async_trait(?Send)]
impl DocumentLoader for HeadlessLoader {
    type Document = UniformDocument;

    async fn open(
        &self,
        location: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<UniformDocument, DocumentError> {
        if location.trim().is_empty() {
            return Err(DocumentError::Load("empty document location".into()));
        }
        let total = u64::from(self.pages);
        progress(LoadProgress::new(0, total));
        for loaded in 1..=total {
            progress(LoadProgress::new(loaded, total));
        }
        Ok(UniformDocument::new(self.pages, self.page_size))
    }
}

// =============================================================================
// RECORDING TARGET
// =============================================================================

/// One call made on a [`RecordingTarget`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Resize(Size),
    FillRect { origin: Point, size: Size, color: String },
    Stroke { points: Vec<Point>, style: StrokeStyle },
}

/// Render target that remembers every call since the last resize.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingTarget {
    size: Size,
    ops: Vec<DrawOp>,
}

impl RecordingTarget {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self { size, ops: Vec::new() }
    }

    /// Calls made since the surface was last resized.
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Stroke calls currently on the surface, in drawing order.
    pub fn strokes(&self) -> impl Iterator<Item = (&[Point], &StrokeStyle)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Stroke { points, style } => Some((points.as_slice(), style)),
            _ => None,
        })
    }
}

impl RenderTarget for RecordingTarget {
    fn size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
        self.ops.clear();
        self.ops.push(DrawOp::Resize(size));
    }

    fn fill_rect(&mut self, origin: Point, size: Size, color: &str) -> Result<(), TargetError> {
        self.ops.push(DrawOp::FillRect { origin, size, color: color.to_owned() });
        Ok(())
    }

    fn stroke_path(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), TargetError> {
        self.ops.push(DrawOp::Stroke { points: points.to_vec(), style: style.clone() });
        Ok(())
    }
}
