//! Shared command model and JSON codec for live presentation sessions.
//!
//! This crate owns the wire representation exchanged between the presenting
//! client, the relay, and every viewing client. A [`Command`] is a closed set
//! of four synchronizable actions; each one is validated on construction and
//! again on decode, so a malformed command never reaches a [`CommandLog`].
//!
//! The encoding is one JSON object per message keyed by `cmd`:
//!
//! | Variant | `cmd` | Fields |
//! |---------|-------|--------|
//! | [`Command::DrawStroke`] | `drawLine` | `page`, `coords`, `color`, `width`, `canvasWidth`, `canvasHeight` |
//! | [`Command::GotoPage`] | `gotoPage` | `page` |
//! | [`Command::ClearPage`] | `clearSlide` | `page` |
//! | [`Command::EndSession`] | `close` | `timestamp` |

mod log;

pub use log::{Appended, CommandLog, LogError};

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use time::OffsetDateTime;

/// Wall-clock instant carried by [`Command::EndSession`].
pub type Timestamp = OffsetDateTime;

/// Error returned when a command's fields violate its invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidCommand {
    /// Page numbers start at 1.
    #[error("page must be at least 1, got {0}")]
    Page(i64),
    /// Stroke coordinates must be a non-empty list of `x, y` pairs.
    #[error("stroke needs a non-empty even number of coordinates, got {0}")]
    Coordinates(usize),
    /// A stroke coordinate was NaN or infinite.
    #[error("stroke coordinate at index {0} is not finite")]
    NonFiniteCoordinate(usize),
    /// Stroke width must be a positive, finite number.
    #[error("stroke width must be positive, got {0}")]
    Width(f64),
    /// The reference canvas must have a positive area.
    #[error("reference canvas must be positive, got {width}x{height}")]
    Canvas { width: f64, height: f64 },
    /// Stroke color must be a non-empty CSS color value.
    #[error("stroke color must not be empty")]
    EmptyColor,
}

/// Error returned by [`decode_command`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The message is not JSON, or not a known `cmd` shape.
    #[error("failed to decode command: {0}")]
    Json(#[from] serde_json::Error),
    /// The message parsed but its fields are invalid.
    #[error("invalid command: {0}")]
    Invalid(#[from] InvalidCommand),
}

// =============================================================================
// VALUE TYPES
// =============================================================================

/// One-based page number within a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct PageNumber(u32);

impl PageNumber {
    /// The first page of every document.
    pub const FIRST: Self = Self(1);

    /// Validate a page number.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand::Page`] when `page < 1` or it exceeds `u32`.
    pub fn new(page: i64) -> Result<Self, InvalidCommand> {
        match u32::try_from(page) {
            Ok(value) if value >= 1 => Ok(Self(value)),
            _ => Err(InvalidCommand::Page(page)),
        }
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// The following page. Saturates at `u32::MAX`.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The preceding page, or `None` on the first page.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        (self.0 > 1).then(|| Self(self.0 - 1))
    }
}

impl TryFrom<i64> for PageNumber {
    type Error = InvalidCommand;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageNumber> for u32 {
    fn from(page: PageNumber) -> Self {
        page.0
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in canvas pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are finite and strictly positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A committed freehand stroke.
///
/// Points are stored in the pixel space of the canvas they were captured on;
/// [`Stroke::canvas`] records that canvas so a receiver with a different
/// canvas size can rescale them.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    page: PageNumber,
    points: Vec<Point>,
    color: String,
    width: f64,
    canvas: Size,
}

impl Stroke {
    /// Build a validated stroke.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand`] when `points` is empty, a coordinate is not
    /// finite, `width` is not positive, `canvas` has no area, or `color` is
    /// empty.
    pub fn new(
        page: PageNumber,
        points: Vec<Point>,
        color: impl Into<String>,
        width: f64,
        canvas: Size,
    ) -> Result<Self, InvalidCommand> {
        if points.is_empty() {
            return Err(InvalidCommand::Coordinates(0));
        }
        if let Some(index) = points
            .iter()
            .flat_map(|p| [p.x, p.y])
            .position(|v| !v.is_finite())
        {
            return Err(InvalidCommand::NonFiniteCoordinate(index));
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(InvalidCommand::Width(width));
        }
        if !canvas.is_positive() {
            return Err(InvalidCommand::Canvas { width: canvas.width, height: canvas.height });
        }
        let color = color.into();
        if color.trim().is_empty() {
            return Err(InvalidCommand::EmptyColor);
        }
        Ok(Self { page, points, color, width, canvas })
    }

    /// Build a stroke from a flat `[x0, y0, x1, y1, ...]` coordinate list.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand::Coordinates`] for an empty or odd-length
    /// list, plus everything [`Stroke::new`] rejects.
    pub fn from_coords(
        page: PageNumber,
        coords: &[f64],
        color: impl Into<String>,
        width: f64,
        canvas: Size,
    ) -> Result<Self, InvalidCommand> {
        if coords.is_empty() || coords.len() % 2 != 0 {
            return Err(InvalidCommand::Coordinates(coords.len()));
        }
        let points = coords
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect();
        Self::new(page, points, color, width, canvas)
    }

    #[must_use]
    pub fn page(&self) -> PageNumber {
        self.page
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Flat `[x0, y0, x1, y1, ...]` view of the points, as sent on the wire.
    #[must_use]
    pub fn coords(&self) -> Vec<f64> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    /// CSS color value, e.g. `"#ADFF2F"`.
    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Line width in pixels of the reference canvas.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Size of the canvas the points were captured on.
    #[must_use]
    pub fn canvas(&self) -> Size {
        self.canvas
    }
}

// =============================================================================
// COMMAND
// =============================================================================

/// Discriminant of a [`Command`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    DrawStroke,
    GotoPage,
    ClearPage,
    EndSession,
}

impl CommandKind {
    /// Wire value of the `cmd` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DrawStroke => "drawLine",
            Self::GotoPage => "gotoPage",
            Self::ClearPage => "clearSlide",
            Self::EndSession => "close",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synchronizable change to a presentation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireCommand", into = "WireCommand")]
pub enum Command {
    /// A committed freehand stroke on a page.
    DrawStroke(Stroke),
    /// Switch the displayed page. Control only; never drawn.
    GotoPage { page: PageNumber },
    /// Remove every earlier mark from a page.
    ClearPage { page: PageNumber },
    /// Terminate the session.
    EndSession { timestamp: Timestamp },
}

impl Command {
    /// Navigation command for a raw page number.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand::Page`] when `page < 1`.
    pub fn goto_page(page: i64) -> Result<Self, InvalidCommand> {
        Ok(Self::GotoPage { page: PageNumber::new(page)? })
    }

    /// Clear command for a raw page number.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand::Page`] when `page < 1`.
    pub fn clear_page(page: i64) -> Result<Self, InvalidCommand> {
        Ok(Self::ClearPage { page: PageNumber::new(page)? })
    }

    /// End-of-session command stamped with the current UTC time.
    #[must_use]
    pub fn end_now() -> Self {
        Self::EndSession { timestamp: OffsetDateTime::now_utc() }
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::DrawStroke(_) => CommandKind::DrawStroke,
            Self::GotoPage { .. } => CommandKind::GotoPage,
            Self::ClearPage { .. } => CommandKind::ClearPage,
            Self::EndSession { .. } => CommandKind::EndSession,
        }
    }

    /// Page this command refers to. `None` only for [`Command::EndSession`].
    #[must_use]
    pub fn page(&self) -> Option<PageNumber> {
        match self {
            Self::DrawStroke(stroke) => Some(stroke.page),
            Self::GotoPage { page } | Self::ClearPage { page } => Some(*page),
            Self::EndSession { .. } => None,
        }
    }

    #[must_use]
    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Self::DrawStroke(stroke) => Some(stroke),
            _ => None,
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// First message a client sends after its socket opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub session_id: String,
}

/// Encode the join handshake for `session_id`.
#[must_use]
pub fn encode_handshake(session_id: &str) -> String {
    let handshake = Handshake { session_id: session_id.to_owned() };
    serde_json::to_string(&handshake).unwrap_or_default()
}

/// Encode a command into its canonical JSON wire form.
///
/// Whole-number coordinates and sizes are written as JSON integers; the relay
/// rejects `10.0` where it expects `10`.
#[must_use]
pub fn encode_command(command: &Command) -> String {
    serde_json::to_string(&WireCommand::from(command.clone())).unwrap_or_default()
}

/// Decode one wire message into a validated command.
///
/// Unknown fields are ignored; the relay stamps extra fields such as
/// `timestamp` on every command it forwards.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed JSON or an unknown `cmd`, and
/// [`CodecError::Invalid`] when the fields violate command invariants.
pub fn decode_command(text: &str) -> Result<Command, CodecError> {
    let wire: WireCommand = serde_json::from_str(text)?;
    Ok(Command::try_from(wire)?)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "cmd")]
enum WireCommand {
    #[serde(rename = "drawLine")]
    DrawLine {
        page: i64,
        #[serde(serialize_with = "whole_numbers")]
        coords: Vec<f64>,
        color: String,
        #[serde(serialize_with = "whole_number")]
        width: f64,
        #[serde(rename = "canvasWidth", serialize_with = "whole_number")]
        canvas_width: f64,
        #[serde(rename = "canvasHeight", serialize_with = "whole_number")]
        canvas_height: f64,
    },
    #[serde(rename = "gotoPage")]
    GotoPage { page: i64 },
    #[serde(rename = "clearSlide")]
    ClearSlide { page: i64 },
    #[serde(rename = "close")]
    Close {
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },
}

/// Largest magnitude an `f64` holds every integer up to (2^53).
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// `value` as an `i64` when it is a whole number that converts exactly.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn as_whole(value: f64) -> Option<i64> {
    (value.trunc() == value && value.abs() <= EXACT_INTEGER_LIMIT).then_some(value as i64)
}

/// JSON number that drops the fractional part when there is none.
struct WireNumber(f64);

impl Serialize for WireNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match as_whole(self.0) {
            Some(whole) => serializer.serialize_i64(whole),
            None => serializer.serialize_f64(self.0),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn whole_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    WireNumber(*value).serialize(serializer)
}

fn whole_numbers<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(&WireNumber(*value))?;
    }
    seq.end()
}

impl TryFrom<WireCommand> for Command {
    type Error = InvalidCommand;

    fn try_from(wire: WireCommand) -> Result<Self, Self::Error> {
        match wire {
            WireCommand::DrawLine { page, coords, color, width, canvas_width, canvas_height } => {
                let stroke = Stroke::from_coords(
                    PageNumber::new(page)?,
                    &coords,
                    color,
                    width,
                    Size::new(canvas_width, canvas_height),
                )?;
                Ok(Self::DrawStroke(stroke))
            }
            WireCommand::GotoPage { page } => Self::goto_page(page),
            WireCommand::ClearSlide { page } => Self::clear_page(page),
            WireCommand::Close { timestamp } => Ok(Self::EndSession { timestamp }),
        }
    }
}

impl From<Command> for WireCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::DrawStroke(stroke) => Self::DrawLine {
                page: i64::from(stroke.page.get()),
                coords: stroke.coords(),
                color: stroke.color,
                width: stroke.width,
                canvas_width: stroke.canvas.width,
                canvas_height: stroke.canvas.height,
            },
            Command::GotoPage { page } => Self::GotoPage { page: i64::from(page.get()) },
            Command::ClearPage { page } => Self::ClearSlide { page: i64::from(page.get()) },
            Command::EndSession { timestamp } => Self::Close { timestamp },
        }
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
