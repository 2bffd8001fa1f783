//! Page rendering and replay engine for presentation viewers.
//!
//! This crate turns a [`commands::CommandLog`] into pixels. It fetches a page
//! from an opaque document source, draws its base content into an explicit
//! render target, and replays the page's strokes on top, rescaled from the
//! canvas they were captured on to the canvas they are shown on. It holds no
//! session state of its own: everything visible is re-derived from the log.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`document`] | Document source seam: pages, viewports, load progress |
//! | [`surface`] | Render target seam and stroke styling |
//! | [`view`] | Zoom/fullscreen view state and stroke rescaling |
//! | [`replay`] | Replay engine and render generation gate |
//! | [`viewer`] | [`viewer::PageView`] seam consumed by the session controller |
//! | [`input`] | Pointer stroke capture and keyboard navigation |
//! | [`headless`] | Uniform-page document and recording target for tools and tests |
//! | [`consts`] | Shared drawing constants |
//! | `web` | Browser `CanvasRenderingContext2d` target (feature `web`) |

pub mod consts;
pub mod document;
pub mod headless;
pub mod input;
pub mod replay;
pub mod surface;
pub mod view;
pub mod viewer;
#[cfg(feature = "web")]
pub mod web;
