//! Role state machine: `Joining → {Master, Slave} → Ended`.
//!
//! The role is fixed once at join from the session info. The master records
//! local input; slaves accept what the relay delivers. Both paths go through
//! the same [`Session::apply`] so the command log, the current page and the
//! lifecycle state can never disagree.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use commands::{Appended, Command, CommandLog, InvalidCommand, LogError, PageNumber, Timestamp};

use crate::info::SessionInfo;

/// Which side of the session this client is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The owner; the only source of commands.
    Master,
    /// A viewer; applies what the owner sends.
    Slave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Joining,
    Master,
    Slave,
    Ended,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("session is read-only for viewers")]
    ReadOnly,
    #[error("session has ended")]
    SessionEnded,
    #[error("session has not been joined")]
    NotJoined,
    #[error("session was already joined")]
    AlreadyJoined,
    #[error("page {page} is outside the document ({count} pages)")]
    PageOutOfRange { page: PageNumber, count: u32 },
    #[error(transparent)]
    Invalid(#[from] InvalidCommand),
}

impl From<LogError> for SessionError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::SessionEnded(_) => Self::SessionEnded,
        }
    }
}

/// The visible effect of one applied command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    /// A stroke was logged; draw it now if it is on the current page.
    Stroke { on_current_page: bool },
    /// The current page changed.
    PageChanged(PageNumber),
    /// A page was cleared; re-render if it is the current page.
    Cleared { on_current_page: bool },
    /// The session ended.
    Ended(Timestamp),
    /// Nothing changed: a repeated end, or inbound traffic this role ignores.
    Ignored,
}

/// One joined presentation session and its command log.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    title: String,
    document_id: String,
    role: Role,
    state: SessionState,
    current_page: PageNumber,
    log: CommandLog,
}

impl Session {
    /// A session that has not been joined yet.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            document_id: String::new(),
            role: Role::Slave,
            state: SessionState::Joining,
            current_page: PageNumber::FIRST,
            log: CommandLog::new(),
        }
    }

    /// Create and join in one step.
    ///
    /// # Errors
    ///
    /// See [`Self::join`].
    pub fn joined(id: impl Into<String>, info: SessionInfo) -> Result<Self, SessionError> {
        let mut session = Self::new(id);
        session.join(info)?;
        Ok(session)
    }

    /// Seed role, log and page from the session info.
    ///
    /// A session whose info carries an end time (or whose log already holds
    /// an end) starts out `Ended`. Without a reported page the last page
    /// navigated to is used, then the first page.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyJoined`] on a second join, or
    /// [`SessionError::SessionEnded`] when the logged commands continue past
    /// an end.
    pub fn join(&mut self, info: SessionInfo) -> Result<Role, SessionError> {
        if self.state != SessionState::Joining {
            return Err(SessionError::AlreadyJoined);
        }
        let mut log = CommandLog::from_snapshot(info.commands)?;
        if let Some(ended_at) = info.ended_at {
            log.append(Command::EndSession { timestamp: ended_at })?;
        }

        self.role = if info.is_owner { Role::Master } else { Role::Slave };
        self.current_page = info
            .current_page
            .or_else(|| log.last_visited_page())
            .unwrap_or(PageNumber::FIRST);
        self.title = info.title;
        self.document_id = info.document_id;
        self.state = if log.is_closed() {
            SessionState::Ended
        } else {
            match self.role {
                Role::Master => SessionState::Master,
                Role::Slave => SessionState::Slave,
            }
        };
        self.log = log;
        Ok(self.role)
    }

    /// Record a command produced by local input.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ReadOnly`] for viewers,
    /// [`SessionError::SessionEnded`] after the end (a repeated end is
    /// [`Applied::Ignored`] instead), or [`SessionError::NotJoined`].
    pub fn record_local(&mut self, command: Command) -> Result<Applied, SessionError> {
        match self.state {
            SessionState::Master => self.apply(command),
            SessionState::Slave => Err(SessionError::ReadOnly),
            SessionState::Ended if matches!(command, Command::EndSession { .. }) => Ok(Applied::Ignored),
            SessionState::Ended => Err(SessionError::SessionEnded),
            SessionState::Joining => Err(SessionError::NotJoined),
        }
    }

    /// Whether [`Self::record_local`] would accept new input right now.
    ///
    /// # Errors
    ///
    /// The error `record_local` would return for anything but a repeated end.
    pub fn check_local(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Master => Ok(()),
            SessionState::Slave => Err(SessionError::ReadOnly),
            SessionState::Ended => Err(SessionError::SessionEnded),
            SessionState::Joining => Err(SessionError::NotJoined),
        }
    }

    /// Accept a command delivered by the relay.
    ///
    /// Only slaves apply inbound commands; the master and ended sessions
    /// ignore them.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotJoined`] before join.
    pub fn accept_remote(&mut self, command: Command) -> Result<Applied, SessionError> {
        match self.state {
            SessionState::Slave => self.apply(command),
            SessionState::Master | SessionState::Ended => Ok(Applied::Ignored),
            SessionState::Joining => Err(SessionError::NotJoined),
        }
    }

    fn apply(&mut self, command: Command) -> Result<Applied, SessionError> {
        let effect = match &command {
            Command::DrawStroke(stroke) => Applied::Stroke { on_current_page: stroke.page() == self.current_page },
            Command::GotoPage { page } => Applied::PageChanged(*page),
            Command::ClearPage { page } => Applied::Cleared { on_current_page: *page == self.current_page },
            Command::EndSession { timestamp } => Applied::Ended(*timestamp),
        };
        if self.log.append(command)? == Appended::DuplicateEnd {
            return Ok(Applied::Ignored);
        }
        match effect {
            Applied::PageChanged(page) => self.current_page = page,
            Applied::Ended(_) => self.state = SessionState::Ended,
            _ => {}
        }
        Ok(effect)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn current_page(&self) -> PageNumber {
        self.current_page
    }

    #[must_use]
    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<Timestamp> {
        self.log.ended_at()
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state == SessionState::Ended
    }
}
