//! Relay transport: one live connection at a time, reopened on loss.
//!
//! DESIGN
//! ======
//! A [`Connector`] opens a [`Link`] and reports everything that happens on it
//! as [`TransportEvent`]s on a single unbounded channel owned by the session
//! controller. Every connection gets a fresh [`ConnectionId`] and every event
//! carries the id of the connection that raised it, so events from a socket
//! that has already been replaced are recognised and dropped.
//!
//! [`Channel`] holds the current link and the reconnect schedule. It never
//! reorders or buffers: inbound text is surfaced in arrival order, outbound
//! commands are written immediately or dropped when the link is not ready.
//!
//! LIFECYCLE
//! =========
//! 1. `open` → `Opened` event → handshake `{"session_id": ..}` → ready
//! 2. `Message` events carry one encoded command each
//! 3. `Closed` → not ready → reconnect after the backoff delay → step 1
//! 4. `close` → link closed, no further reconnects

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;

use std::fmt;
use std::time::Duration;

use commands::{Command, encode_command, encode_handshake};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(10);

// =============================================================================
// IDENTITY AND EVENTS
// =============================================================================

/// Identity of one relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Something that happened on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

/// A [`LinkEvent`] tagged with the connection that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub connection: ConnectionId,
    pub kind: LinkEvent,
}

/// Sender half every link reports its events on.
pub type EventSink = mpsc::UnboundedSender<TransportEvent>;

fn emit(events: &EventSink, connection: ConnectionId, kind: LinkEvent) {
    if events.send(TransportEvent { connection, kind }).is_err() {
        debug!(%connection, "transport event dropped; controller gone");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("invalid relay URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid session cookie: {0}")]
    InvalidCookie(String),
    #[error("channel is closed")]
    Closed,
}

// =============================================================================
// CONNECTOR SEAM
// =============================================================================

/// An open (or opening) duplex text link.
pub trait Link {
    /// Queue `text` for delivery. Returns `false` if the link is gone.
    fn send(&self, text: String) -> bool;

    /// Ask the link to close. Its `Closed` event still follows.
    fn close(&self);
}

/// Opens links toward the relay.
pub trait Connector {
    /// Start opening a link identified by `id`, reporting on `events`.
    ///
    /// Failures that happen after this returns (refused connection, failed
    /// upgrade) arrive as `Error` then `Closed` events.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the link cannot even be attempted.
    fn open(&self, id: ConnectionId, events: EventSink) -> Result<Box<dyn Link>, ConnectError>;
}

// =============================================================================
// WEBSOCKET CONNECTOR
// =============================================================================

/// Connector over a websocket, one spawned pump task per link.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    cookie: Option<String>,
}

impl WsConnector {
    #[must_use]
    pub fn new(url: impl Into<String>, cookie: Option<String>) -> Self {
        Self { url: url.into(), cookie }
    }
}

enum Outbound {
    Text(String),
    Close,
}

struct WsLink {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Link for WsLink {
    fn send(&self, text: String) -> bool {
        self.outbound.send(Outbound::Text(text)).is_ok()
    }

    fn close(&self) {
        if self.outbound.send(Outbound::Close).is_err() {
            debug!("close requested on finished link");
        }
    }
}

impl Connector for WsConnector {
    fn open(&self, id: ConnectionId, events: EventSink) -> Result<Box<dyn Link>, ConnectError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ConnectError::InvalidUrl { url: self.url.clone(), reason: e.to_string() })?;
        if let Some(cookie) = &self.cookie {
            let value = HeaderValue::from_str(cookie).map_err(|e| ConnectError::InvalidCookie(e.to_string()))?;
            request.headers_mut().insert(COOKIE, value);
        }

        let (outbound, rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(id, request, rx, events));
        Ok(Box::new(WsLink { outbound }))
    }
}

async fn pump(
    id: ConnectionId,
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: EventSink,
) {
    let stream = match connect_async(request).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            emit(&events, id, LinkEvent::Error(e.to_string()));
            emit(&events, id, LinkEvent::Closed);
            return;
        }
    };
    emit(&events, id, LinkEvent::Opened);

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        emit(&events, id, LinkEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(connection = %id, error = %e, "close frame not sent");
                    }
                    break;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => emit(&events, id, LinkEvent::Message(text.as_str().to_owned())),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(&events, id, LinkEvent::Error(e.to_string()));
                    break;
                }
            },
        }
    }
    emit(&events, id, LinkEvent::Closed);
}

// =============================================================================
// BACKOFF
// =============================================================================

/// Exponential reconnect delay: `initial`, doubling, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { initial: DEFAULT_RECONNECT_INITIAL, max: DEFAULT_RECONNECT_MAX }
    }
}

impl Backoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Delay that follows `current`.
    #[must_use]
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Link state as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// A connection is being opened.
    Connecting,
    /// Handshake sent; commands are delivered.
    Ready,
    /// The link was lost; a new one opens after `delay`.
    Reconnecting { delay: Duration },
    /// Closed for good.
    Closed,
}

/// Result of sending one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The link was not ready. The command is only in the local log.
    Dropped,
}

/// What a [`TransportEvent`] means for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// From a replaced connection, or the channel is closed.
    Ignored,
    Status(LinkStatus),
    Error(String),
    Message(String),
}

struct ActiveLink {
    id: ConnectionId,
    link: Box<dyn Link>,
}

/// The session's connection to the relay.
pub struct Channel<C> {
    connector: C,
    session_id: String,
    events: EventSink,
    current: Option<ActiveLink>,
    ready: bool,
    closed: bool,
    backoff: Backoff,
    next_delay: Duration,
    reconnect_at: Option<Instant>,
}

impl<C: Connector> Channel<C> {
    #[must_use]
    pub fn new(connector: C, session_id: impl Into<String>, events: EventSink, backoff: Backoff) -> Self {
        Self {
            connector,
            session_id: session_id.into(),
            events,
            current: None,
            ready: false,
            closed: false,
            backoff,
            next_delay: backoff.initial,
            reconnect_at: None,
        }
    }

    /// Open a new connection, replacing the current one.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] if the connector refuses outright; a reconnect
    /// is scheduled in that case too.
    pub fn open(&mut self) -> Result<ConnectionId, ConnectError> {
        if self.closed {
            return Err(ConnectError::Closed);
        }
        if let Some(old) = self.current.take() {
            old.link.close();
        }
        self.ready = false;
        self.reconnect_at = None;

        let id = ConnectionId::new();
        match self.connector.open(id, self.events.clone()) {
            Ok(link) => {
                info!(session_id = %self.session_id, connection = %id, "opening relay connection");
                self.current = Some(ActiveLink { id, link });
                Ok(id)
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "relay connection not attempted");
                self.schedule_reconnect();
                Err(e)
            }
        }
    }

    /// Interpret an event raised by one of this channel's links.
    pub fn handle(&mut self, event: TransportEvent) -> ChannelEvent {
        let Some(active) = &self.current else {
            debug!(connection = %event.connection, "event after link released");
            return ChannelEvent::Ignored;
        };
        if active.id != event.connection {
            debug!(connection = %event.connection, current = %active.id, "stale connection event");
            return ChannelEvent::Ignored;
        }

        match event.kind {
            LinkEvent::Opened => {
                if active.link.send(encode_handshake(&self.session_id)) {
                    self.ready = true;
                    self.next_delay = self.backoff.initial;
                    info!(session_id = %self.session_id, connection = %active.id, "relay connection ready");
                    ChannelEvent::Status(LinkStatus::Ready)
                } else {
                    self.current = None;
                    ChannelEvent::Status(self.lost())
                }
            }
            LinkEvent::Message(text) => ChannelEvent::Message(text),
            LinkEvent::Error(reason) => {
                warn!(session_id = %self.session_id, connection = %active.id, %reason, "relay connection error");
                ChannelEvent::Error(reason)
            }
            LinkEvent::Closed => {
                warn!(session_id = %self.session_id, connection = %active.id, "relay connection lost");
                self.current = None;
                ChannelEvent::Status(self.lost())
            }
        }
    }

    fn lost(&mut self) -> LinkStatus {
        self.ready = false;
        let delay = self.schedule_reconnect();
        LinkStatus::Reconnecting { delay }
    }

    fn schedule_reconnect(&mut self) -> Duration {
        let delay = self.next_delay;
        self.next_delay = self.backoff.next(delay);
        self.reconnect_at = Some(Instant::now() + delay);
        delay
    }

    /// When the pending reconnect is due, if one is scheduled.
    #[must_use]
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Perform the scheduled reconnect now.
    ///
    /// # Errors
    ///
    /// See [`Self::open`].
    pub fn reconnect(&mut self) -> Result<ConnectionId, ConnectError> {
        self.reconnect_at = None;
        info!(session_id = %self.session_id, "reconnecting to relay");
        self.open()
    }

    /// Deliver `command` if the link is ready.
    pub fn send(&mut self, command: &Command) -> SendOutcome {
        if !self.ready {
            debug!(kind = %command.kind(), "link not ready; command kept locally");
            return SendOutcome::Dropped;
        }
        let Some(active) = &self.current else {
            return SendOutcome::Dropped;
        };
        if active.link.send(encode_command(command)) {
            debug!(kind = %command.kind(), connection = %active.id, "command sent");
            SendOutcome::Delivered
        } else {
            self.ready = false;
            SendOutcome::Dropped
        }
    }

    /// Close the current link and stop reconnecting.
    pub fn close(&mut self) {
        self.closed = true;
        self.ready = false;
        self.reconnect_at = None;
        if let Some(active) = self.current.take() {
            info!(session_id = %self.session_id, connection = %active.id, "closing relay connection");
            active.link.close();
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.current.as_ref().map(|active| active.id)
    }
}
