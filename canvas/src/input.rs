//! Input model: freehand stroke capture and keyboard navigation.
//!
//! [`StrokeCapture`] tracks one pointer gesture between pointer-down and
//! pointer-up. Moves closer than the pen width to the last recorded point are
//! skipped, which keeps strokes compact on the wire. The host draws the live
//! segments it returns and, on release, hands the finished [`Stroke`] to the
//! session.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use commands::{InvalidCommand, PageNumber, Point, Size, Stroke};

use crate::consts::{DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH};

/// A line segment the host should draw immediately while the pointer moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// Pointer gesture tracker for the presenter's pen.
#[derive(Debug, Clone)]
pub struct StrokeCapture {
    color: String,
    width: f64,
    points: Vec<Point>,
    active: bool,
}

impl Default for StrokeCapture {
    fn default() -> Self {
        Self::new(DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH)
    }
}

impl StrokeCapture {
    #[must_use]
    pub fn new(color: impl Into<String>, width: f64) -> Self {
        Self { color: color.into(), width, points: Vec::new(), active: false }
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin a gesture at `at`, discarding any unfinished one.
    pub fn pointer_down(&mut self, at: Point) {
        self.points.clear();
        self.points.push(at);
        self.active = true;
    }

    /// Record `at` if it moved more than the pen width on either axis.
    ///
    /// Returns the segment to draw live, or `None` when the move was skipped
    /// or no gesture is in progress.
    pub fn pointer_move(&mut self, at: Point) -> Option<Segment> {
        if !self.active {
            return None;
        }
        let last = *self.points.last()?;
        let dx = (at.x - last.x).abs();
        let dy = (at.y - last.y).abs();
        if dx <= self.width && dy <= self.width {
            return None;
        }
        self.points.push(at);
        Some(Segment { from: last, to: at })
    }

    /// Finish the gesture as a stroke on `page` of a `canvas`-sized surface.
    ///
    /// Returns `None` when no gesture was in progress.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand`] if the pen settings or canvas size are invalid.
    pub fn pointer_up(&mut self, page: PageNumber, canvas: Size) -> Option<Result<Stroke, InvalidCommand>> {
        if !self.active {
            return None;
        }
        self.active = false;
        let points = std::mem::take(&mut self.points);
        Some(Stroke::new(page, points, self.color.clone(), self.width, canvas))
    }

    /// Abandon the gesture without producing a stroke.
    pub fn cancel(&mut self) {
        self.points.clear();
        self.active = false;
    }
}

/// Page navigation requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Previous,
    Next,
}

impl NavKey {
    /// Map a browser `KeyboardEvent.key` value to a navigation step.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "ArrowUp" => Some(Self::Previous),
            " " | "Spacebar" | "ArrowRight" | "ArrowDown" => Some(Self::Next),
            _ => None,
        }
    }
}
