//! Session controller: the single owner of session, connection and view.
//!
//! DESIGN
//! ======
//! One `tokio::select!` loop per session multiplexes transport events, local
//! input and the reconnect timer, so no two handlers ever run at once and no
//! session state needs a lock. Link pumps run in their own tasks and reach the
//! controller only through the transport event channel.
//!
//! Master input is validated, appended to the log, shown, then sent. Slave
//! traffic is decoded, appended and shown in delivery order. Observers
//! subscribe to [`SessionEvent`]s instead of reading shared state.

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;

use canvas::input::NavKey;
use canvas::replay::RenderOutcome;
use canvas::viewer::PageView;
use commands::{Command, CommandKind, PageNumber, Stroke, Timestamp, decode_command};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::session::{Applied, Role, Session, SessionError};
use crate::transport::{Backoff, Channel, ChannelEvent, ConnectError, Connector, LinkStatus, SendOutcome, TransportEvent};

const EVENT_CAPACITY: usize = 256;

/// Notifications for observers of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Link(LinkStatus),
    TransportError(String),
    CommandApplied(CommandKind),
    PageChanged(PageNumber),
    RenderFailed { page: PageNumber, reason: String },
    /// An inbound message was not a valid command.
    Rejected(String),
    Ended(Timestamp),
}

/// Local input fed to [`SessionController::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Stroke(Stroke),
    GotoPage(PageNumber),
    NextPage,
    PreviousPage,
    ClearPage,
    EndSession,
    /// A navigation key; only acted on in fullscreen.
    Key(NavKey),
    ZoomIn,
    ZoomOut,
    Fullscreen(bool),
}

/// Result of a master operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Sent(SendOutcome),
    /// Nothing to do: already on the boundary page, or already ended.
    Unchanged,
}

pub struct SessionController<C, V> {
    session: Session,
    channel: Channel<C>,
    transport: mpsc::UnboundedReceiver<TransportEvent>,
    view: V,
    notify: broadcast::Sender<SessionEvent>,
}

impl<C: Connector, V: PageView> SessionController<C, V> {
    #[must_use]
    pub fn new(session: Session, connector: C, view: V, backoff: Backoff) -> Self {
        let (events, transport) = mpsc::unbounded_channel();
        let channel = Channel::new(connector, session.id(), events, backoff);
        let (notify, _) = broadcast::channel(EVENT_CAPACITY);
        Self { session, channel, transport, view, notify }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.notify.subscribe()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.channel.is_ready()
    }

    fn publish(&self, event: SessionEvent) {
        if self.notify.send(event).is_err() {
            trace!("session event dropped; no subscribers");
        }
    }

    /// Show the current page and, unless the session already ended, connect.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] if the first connection cannot be attempted.
    /// A retry is already scheduled when that happens.
    pub async fn start(&mut self) -> Result<(), ConnectError> {
        info!(
            session_id = %self.session.id(),
            role = ?self.session.role(),
            page = self.session.current_page().get(),
            logged = self.session.log().len(),
            "session joined"
        );
        self.render(self.session.current_page()).await;
        if let Some(ended_at) = self.session.ended_at() {
            self.disconnect();
            self.publish(SessionEvent::Ended(ended_at));
            return Ok(());
        }
        self.channel.open()?;
        self.publish(SessionEvent::Link(LinkStatus::Connecting));
        Ok(())
    }

    // =========================================================================
    // MASTER INPUT
    // =========================================================================

    /// Submit an already-built command as local input.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if this client may not submit it.
    pub async fn submit(&mut self, command: Command) -> Result<Submitted, SessionError> {
        if let Command::GotoPage { page } = &command {
            self.session.check_local()?;
            self.check_page(*page)?;
        }
        let applied = self.session.record_local(command.clone())?;
        if applied == Applied::Ignored {
            return Ok(Submitted::Unchanged);
        }
        self.show(applied, &command).await;
        let outcome = self.channel.send(&command);
        if let Applied::Ended(_) = applied {
            self.disconnect();
        }
        Ok(Submitted::Sent(outcome))
    }

    /// Publish a finished stroke.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn draw(&mut self, stroke: Stroke) -> Result<Submitted, SessionError> {
        self.submit(Command::DrawStroke(stroke)).await
    }

    /// Navigate everyone to `page`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PageOutOfRange`] past the last page, plus
    /// everything [`Self::submit`] returns.
    pub async fn goto_page(&mut self, page: PageNumber) -> Result<Submitted, SessionError> {
        self.submit(Command::GotoPage { page }).await
    }

    /// Advance one page; unchanged on the last page.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn next_page(&mut self) -> Result<Submitted, SessionError> {
        let next = self.session.current_page().next();
        if next.get() > self.view.page_count() {
            self.session.check_local()?;
            return Ok(Submitted::Unchanged);
        }
        self.goto_page(next).await
    }

    /// Go back one page; unchanged on the first page.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn previous_page(&mut self) -> Result<Submitted, SessionError> {
        let Some(previous) = self.session.current_page().previous() else {
            self.session.check_local()?;
            return Ok(Submitted::Unchanged);
        };
        self.goto_page(previous).await
    }

    /// Wipe the marks on the current page.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn clear_current_page(&mut self) -> Result<Submitted, SessionError> {
        let page = self.session.current_page();
        self.submit(Command::ClearPage { page }).await
    }

    /// End the session for everyone. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ReadOnly`] for viewers.
    pub async fn end_session(&mut self) -> Result<Submitted, SessionError> {
        self.submit(Command::end_now()).await
    }

    /// Turn the page for a navigation key while presenting fullscreen.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn navigate(&mut self, key: NavKey) -> Result<Submitted, SessionError> {
        if !self.view.view_mut().is_fullscreen() {
            return Ok(Submitted::Unchanged);
        }
        match key {
            NavKey::Previous => self.previous_page().await,
            NavKey::Next => self.next_page().await,
        }
    }

    fn check_page(&self, page: PageNumber) -> Result<(), SessionError> {
        let count = self.view.page_count();
        if page.get() > count {
            return Err(SessionError::PageOutOfRange { page, count });
        }
        Ok(())
    }

    // =========================================================================
    // VIEW
    // =========================================================================

    pub async fn zoom_in(&mut self) {
        self.view.view_mut().zoom_in();
        self.render(self.session.current_page()).await;
    }

    pub async fn zoom_out(&mut self) {
        self.view.view_mut().zoom_out();
        self.render(self.session.current_page()).await;
    }

    pub async fn set_fullscreen(&mut self, fullscreen: bool) {
        self.view.view_mut().set_fullscreen(fullscreen);
        self.render(self.session.current_page()).await;
    }

    async fn render(&mut self, page: PageNumber) {
        match self.view.render_page(self.session.log(), page).await {
            Ok(RenderOutcome::Rendered { strokes, .. }) => debug!(page = page.get(), strokes, "page rendered"),
            Ok(RenderOutcome::Superseded { .. }) => debug!(page = page.get(), "render superseded"),
            Err(e) => {
                warn!(page = page.get(), error = %e, "page render failed");
                self.publish(SessionEvent::RenderFailed { page, reason: e.to_string() });
            }
        }
    }

    /// Bring the screen in line with an applied command.
    async fn show(&mut self, applied: Applied, command: &Command) {
        self.publish(SessionEvent::CommandApplied(command.kind()));
        match applied {
            Applied::Stroke { on_current_page: true } => {
                if let Some(stroke) = command.as_stroke() {
                    if let Err(e) = self.view.draw_stroke(stroke) {
                        warn!(error = %e, "stroke draw failed");
                        let page = stroke.page();
                        self.publish(SessionEvent::RenderFailed { page, reason: e.to_string() });
                    }
                }
            }
            Applied::PageChanged(page) => {
                self.render(page).await;
                self.publish(SessionEvent::PageChanged(page));
            }
            Applied::Cleared { on_current_page: true } => self.render(self.session.current_page()).await,
            Applied::Ended(timestamp) => {
                info!(session_id = %self.session.id(), "session ended");
                self.publish(SessionEvent::Ended(timestamp));
            }
            Applied::Stroke { on_current_page: false } | Applied::Cleared { on_current_page: false } | Applied::Ignored => {}
        }
    }

    // =========================================================================
    // TRANSPORT
    // =========================================================================

    /// React to one event from a link.
    pub async fn handle_transport(&mut self, event: TransportEvent) {
        match self.channel.handle(event) {
            ChannelEvent::Ignored => {}
            ChannelEvent::Status(status) => self.publish(SessionEvent::Link(status)),
            ChannelEvent::Error(reason) => self.publish(SessionEvent::TransportError(reason)),
            ChannelEvent::Message(text) => self.receive(&text).await,
        }
    }

    async fn receive(&mut self, text: &str) {
        if self.session.role() == Role::Master || self.session.is_ended() {
            debug!("inbound message ignored");
            return;
        }
        let command = match decode_command(text) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "rejected inbound message");
                self.publish(SessionEvent::Rejected(e.to_string()));
                return;
            }
        };
        match self.session.accept_remote(command.clone()) {
            Ok(Applied::Ignored) => {}
            Ok(applied) => {
                debug!(kind = %command.kind(), "applied inbound command");
                self.show(applied, &command).await;
                if let Applied::Ended(_) = applied {
                    self.disconnect();
                }
            }
            Err(e) => warn!(error = %e, "inbound command not applied"),
        }
    }

    fn disconnect(&mut self) {
        self.channel.close();
        self.publish(SessionEvent::Link(LinkStatus::Closed));
    }

    /// Open the scheduled replacement connection.
    pub fn reconnect(&mut self) {
        match self.channel.reconnect() {
            Ok(_) => self.publish(SessionEvent::Link(LinkStatus::Connecting)),
            Err(e) => self.publish(SessionEvent::TransportError(e.to_string())),
        }
    }

    /// Wait for the next transport event or the reconnect timer and handle it.
    pub async fn process_next(&mut self) {
        let deadline = self.channel.reconnect_deadline();
        tokio::select! {
            Some(event) = self.transport.recv() => self.handle_transport(event).await,
            () = wait_until(deadline) => self.reconnect(),
        }
    }

    /// Process transport traffic until the link is ready to send.
    pub async fn wait_until_ready(&mut self) {
        while !self.channel.is_ready() && !self.session.is_ended() {
            self.process_next().await;
        }
    }

    /// Drive the session until it ends.
    ///
    /// A master also stops once its input closes, since nothing else can
    /// change a master's session.
    pub async fn run(&mut self, mut input: mpsc::UnboundedReceiver<Input>) {
        let mut input_open = true;
        while !self.session.is_ended() {
            if !input_open && self.session.role() == Role::Master {
                break;
            }
            let deadline = self.channel.reconnect_deadline();
            tokio::select! {
                Some(event) = self.transport.recv() => self.handle_transport(event).await,
                next = input.recv(), if input_open => match next {
                    Some(item) => self.handle_input(item).await,
                    None => input_open = false,
                },
                () = wait_until(deadline) => self.reconnect(),
            }
        }
    }

    async fn handle_input(&mut self, input: Input) {
        let result = match input {
            Input::Command(command) => self.submit(command).await,
            Input::Stroke(stroke) => self.draw(stroke).await,
            Input::GotoPage(page) => self.goto_page(page).await,
            Input::NextPage => self.next_page().await,
            Input::PreviousPage => self.previous_page().await,
            Input::ClearPage => self.clear_current_page().await,
            Input::EndSession => self.end_session().await,
            Input::Key(key) => self.navigate(key).await,
            Input::ZoomIn => {
                self.zoom_in().await;
                return;
            }
            Input::ZoomOut => {
                self.zoom_out().await;
                return;
            }
            Input::Fullscreen(fullscreen) => {
                self.set_fullscreen(fullscreen).await;
                return;
            }
        };
        match result {
            Ok(Submitted::Sent(SendOutcome::Dropped)) => warn!("relay not ready; command kept in local log only"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "input rejected"),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
