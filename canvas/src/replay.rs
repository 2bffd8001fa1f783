//! Replay engine: base page first, then the page's strokes on top.
//!
//! A render runs in two phases. [`ReplayEngine::prepare`] fetches the page
//! from the document source, which may suspend. [`ReplayEngine::commit`]
//! paints the base content and replays [`CommandLog::strokes_for_page`] into
//! the target. Every prepare takes a ticket from the [`RenderGate`]; a ticket
//! that is no longer the newest when its page resolves is dropped, so a slow
//! earlier render can never paint over a later one.

#[cfg(test)]
#[path = "replay_test.rs"]
mod replay_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use commands::{CommandLog, PageNumber, Point, Stroke};

use crate::consts::STROKE_ALPHA;
use crate::document::{DocumentError, DocumentPage, DocumentSource, Viewport};
use crate::surface::{RenderTarget, StrokeStyle, TargetError};
use crate::view::{StrokeScale, ViewState};

/// Errors raised while rendering a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("page {page} failed to render: {source}")]
    RenderFailed {
        page: PageNumber,
        #[source]
        source: DocumentError,
    },
    #[error(transparent)]
    Target(#[from] TargetError),
}

// =============================================================================
// RENDER GATE
// =============================================================================

/// Monotonic render generation counter.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct RenderGate {
    generation: Arc<AtomicU64>,
}

/// Proof that a render was the newest one when it started.
#[derive(Debug, Clone)]
pub struct RenderTicket {
    generation: u64,
    gate: Arc<AtomicU64>,
}

impl RenderGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render generation, invalidating all earlier tickets.
    #[must_use]
    pub fn issue(&self) -> RenderTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RenderTicket { generation, gate: Arc::clone(&self.generation) }
    }
}

impl RenderTicket {
    /// Whether no later render has started since this ticket was issued.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.gate.load(Ordering::SeqCst) == self.generation
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// A page fetched and laid out, waiting to be painted.
pub struct PreparedPage {
    ticket: RenderTicket,
    number: PageNumber,
    page: Box<dyn DocumentPage>,
    viewport: Viewport,
}

impl PreparedPage {
    #[must_use]
    pub fn number(&self) -> PageNumber {
        self.number
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

/// What a render did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderOutcome {
    /// The page was painted and `strokes` strokes were replayed on it.
    Rendered { page: PageNumber, viewport: Viewport, strokes: usize },
    /// A later render started first; nothing was painted by this one.
    Superseded { page: PageNumber },
}

/// Renders pages of one document under one view.
pub struct ReplayEngine<S> {
    source: S,
    view: ViewState,
    gate: RenderGate,
}

impl<S: DocumentSource> ReplayEngine<S> {
    #[must_use]
    pub fn new(source: S, view: ViewState) -> Self {
        Self { source, view, gate: RenderGate::new() }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Handle on this engine's generation counter.
    #[must_use]
    pub fn gate(&self) -> RenderGate {
        self.gate.clone()
    }

    /// Fetch and lay out `page`. Starts a new render generation.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::RenderFailed`] when the page is past the end
    /// of the document or the source cannot produce it.
    pub async fn prepare(&self, page: PageNumber) -> Result<PreparedPage, RenderError> {
        let ticket = self.gate.issue();
        let count = self.source.page_count();
        if page.get() > count {
            return Err(RenderError::RenderFailed { page, source: DocumentError::PageOutOfRange { page, count } });
        }
        let doc_page = self.source.page(page).await.map_err(|source| RenderError::RenderFailed { page, source })?;
        let viewport = self.view.viewport_for(doc_page.as_ref());
        Ok(PreparedPage { ticket, number: page, page: doc_page, viewport })
    }

    /// Paint a prepared page and replay its strokes from `log`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the page or a stroke cannot be painted.
    pub async fn commit(
        &self,
        prepared: PreparedPage,
        log: &CommandLog,
        target: &mut dyn RenderTarget,
    ) -> Result<RenderOutcome, RenderError> {
        let PreparedPage { ticket, number, page, viewport } = prepared;
        if !ticket.is_current() {
            return Ok(RenderOutcome::Superseded { page: number });
        }

        target.resize(viewport.size());
        page.render(target, &viewport)
            .await
            .map_err(|source| RenderError::RenderFailed { page: number, source })?;

        // The base render may have suspended; a newer render owns the target now.
        if !ticket.is_current() {
            return Ok(RenderOutcome::Superseded { page: number });
        }

        let mut strokes = 0;
        for stroke in log.strokes_for_page(number) {
            draw_stroke(target, stroke)?;
            strokes += 1;
        }
        Ok(RenderOutcome::Rendered { page: number, viewport, strokes })
    }

    /// Prepare and commit `page` in one go.
    ///
    /// # Errors
    ///
    /// See [`Self::prepare`] and [`Self::commit`].
    pub async fn render_page(
        &self,
        log: &CommandLog,
        page: PageNumber,
        target: &mut dyn RenderTarget,
    ) -> Result<RenderOutcome, RenderError> {
        let prepared = self.prepare(page).await?;
        self.commit(prepared, log, target).await
    }
}

/// Draw one stroke onto `target`, rescaled from its capture canvas.
///
/// # Errors
///
/// Returns [`RenderError::Target`] if the target rejects the path.
pub fn draw_stroke(target: &mut dyn RenderTarget, stroke: &Stroke) -> Result<(), RenderError> {
    let scale = StrokeScale::between(stroke.canvas(), target.size());
    let points: Vec<Point> = stroke.points().iter().map(|p| scale.apply(*p)).collect();
    let style = StrokeStyle {
        color: stroke.color().to_owned(),
        width: scale.apply_width(stroke.width()),
        alpha: STROKE_ALPHA,
    };
    target.stroke_path(&points, &style)?;
    Ok(())
}
