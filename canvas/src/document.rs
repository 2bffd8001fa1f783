//! Document source seam.
//!
//! The viewer never decodes documents itself. A [`DocumentSource`] hands out
//! pages by number; each [`DocumentPage`] reports its [`Viewport`] at a given
//! scale and paints its base content into a [`RenderTarget`]. Page numbers are
//! 1-based everywhere.

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;

use async_trait::async_trait;
use commands::{PageNumber, Size};

use crate::surface::{RenderTarget, TargetError};

/// Errors raised by a document source or one of its pages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("page {page} is outside the document ({count} pages)")]
    PageOutOfRange { page: PageNumber, count: u32 },
    #[error("document could not be loaded: {0}")]
    Load(String),
    #[error("page could not be drawn: {0}")]
    Draw(#[from] TargetError),
}

/// Pixel dimensions of a page laid out at a scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl Viewport {
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// A single page of an opened document.
#[async_trait(?Send)]
pub trait DocumentPage {
    /// Layout of this page at `scale`.
    fn viewport(&self, scale: f64) -> Viewport;

    /// Paint the page's base content into `target` using `viewport`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if the page cannot be painted.
    async fn render(&self, target: &mut dyn RenderTarget, viewport: &Viewport) -> Result<(), DocumentError>;
}

/// An opened document that yields pages by number.
#[async_trait(?Send)]
pub trait DocumentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Fetch page `page`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::PageOutOfRange`] for pages past the end, or a
    /// source-specific error if the page cannot be produced.
    async fn page(&self, page: PageNumber) -> Result<Box<dyn DocumentPage>, DocumentError>;
}

/// Download/parse progress of a document, as a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress {
    percent: f64,
}

impl LoadProgress {
    /// Progress after `loaded` of `total` units.
    ///
    /// Rounded to two decimals and clamped to `[0, 100]`. An unknown
    /// (zero) total reports 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(loaded: u64, total: u64) -> Self {
        if total == 0 {
            return Self { percent: 0.0 };
        }
        let raw = loaded as f64 / total as f64 * 100.0;
        let rounded = (raw * 100.0).round() / 100.0;
        Self { percent: rounded.clamp(0.0, 100.0) }
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        self.percent
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.percent >= 100.0
    }
}

/// Opens documents by location, reporting progress while it does.
#[async_trait(?Send)]
pub trait DocumentLoader {
    type Document: DocumentSource;

    /// Open the document at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Load`] if the document cannot be fetched or parsed.
    async fn open(
        &self,
        location: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Self::Document, DocumentError>;
}
