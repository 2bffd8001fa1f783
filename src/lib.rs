//! Live presentation sync client.
//!
//! One owner presents a document; viewers mirror the owner's page navigation
//! and freehand annotations in real time. Everything visible is derived from
//! an append-only [`commands::CommandLog`], so a viewer that joins late or
//! re-navigates sees the same picture as one that watched from the start.
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Environment-driven client configuration |
//! | [`info`] | Session-info HTTP collaborator |
//! | [`transport`] | Relay connection, handshake, reconnect with backoff |
//! | [`session`] | Role state machine over the command log |
//! | [`controller`] | Event loop wiring session, transport and viewer |

pub mod config;
pub mod controller;
pub mod info;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;
