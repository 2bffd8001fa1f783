//! The [`PageView`] seam between the session controller and the screen.

use async_trait::async_trait;
use commands::{CommandLog, PageNumber, Stroke};

use crate::document::DocumentSource;
use crate::replay::{self, RenderError, RenderOutcome, ReplayEngine};
use crate::surface::RenderTarget;
use crate::view::ViewState;

/// What a session needs from whatever shows the document.
#[async_trait(?Send)]
pub trait PageView {
    /// Redraw `page` from scratch: base content, then replayed strokes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the page cannot be drawn.
    async fn render_page(&mut self, log: &CommandLog, page: PageNumber) -> Result<RenderOutcome, RenderError>;

    /// Draw one stroke on top of the current page.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the target rejects it.
    fn draw_stroke(&mut self, stroke: &Stroke) -> Result<(), RenderError>;

    fn page_count(&self) -> u32;

    fn view_mut(&mut self) -> &mut ViewState;
}

/// A replay engine bound to a render target.
pub struct Viewer<S, T> {
    engine: ReplayEngine<S>,
    target: T,
}

impl<S: DocumentSource, T: RenderTarget> Viewer<S, T> {
    #[must_use]
    pub fn new(source: S, view: ViewState, target: T) -> Self {
        Self { engine: ReplayEngine::new(source, view), target }
    }

    #[must_use]
    pub fn engine(&self) -> &ReplayEngine<S> {
        &self.engine
    }

    #[must_use]
    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }
}

#[async_trait(?Send)]
impl<S: DocumentSource, T: RenderTarget> PageView for Viewer<S, T> {
    async fn render_page(&mut self, log: &CommandLog, page: PageNumber) -> Result<RenderOutcome, RenderError> {
        self.engine.render_page(log, page, &mut self.target).await
    }

    fn draw_stroke(&mut self, stroke: &Stroke) -> Result<(), RenderError> {
        replay::draw_stroke(&mut self.target, stroke)
    }

    fn page_count(&self) -> u32 {
        self.engine.source().page_count()
    }

    fn view_mut(&mut self) -> &mut ViewState {
        self.engine.view_mut()
    }
}
