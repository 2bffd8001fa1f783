//! Shared drawing constants for the canvas crate.

// ── Strokes ─────────────────────────────────────────────────────

/// Pen color offered to the presenter by default.
pub const DEFAULT_STROKE_COLOR: &str = "#ADFF2F";

/// Pen width in canvas pixels offered to the presenter by default.
pub const DEFAULT_STROKE_WIDTH: f64 = 10.0;

/// Opacity every annotation stroke is drawn with, live or replayed.
pub const STROKE_ALPHA: f64 = 0.5;

// ── View ────────────────────────────────────────────────────────

/// Multiplier applied per zoom-in step (divisor per zoom-out step).
pub const ZOOM_STEP: f64 = 1.2;

/// Scale a freshly opened document is shown at.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Background painted by the headless page renderer.
pub const PAGE_BACKGROUND: &str = "#FFFFFF";
