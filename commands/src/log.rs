//! Append-only command log: the source of truth for page replay.
//!
//! Insertion order is arrival order: local authorship order for the
//! presenter, relay delivery order for viewers. Entries are never mutated,
//! removed, or reordered; a `ClearPage` supersedes earlier marks on its page
//! by position alone, which keeps replay identical for a viewer that was
//! connected throughout and one that joined late.

use crate::{Command, PageNumber, Stroke, Timestamp};

/// Error returned by [`CommandLog::append`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogError {
    /// The log already holds an `EndSession`.
    #[error("session ended at {0}")]
    SessionEnded(Timestamp),
}

/// Result of a successful [`CommandLog::append`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Appended {
    /// The command was stored.
    Stored,
    /// The command was an `EndSession` after the log had already closed; it
    /// was absorbed without being stored.
    DuplicateEnd,
}

/// Ordered, append-only sequence of commands for one session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandLog {
    entries: Vec<Command>,
    ended_at: Option<Timestamp>,
}

impl CommandLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from a stored snapshot, appending in order.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::SessionEnded`] when the snapshot contains a
    /// drawable or navigation command after its `EndSession`.
    pub fn from_snapshot(commands: impl IntoIterator<Item = Command>) -> Result<Self, LogError> {
        let mut log = Self::new();
        for command in commands {
            log.append(command)?;
        }
        Ok(log)
    }

    /// Append a command.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::SessionEnded`] for any command other than
    /// `EndSession` once the log is closed.
    pub fn append(&mut self, command: Command) -> Result<Appended, LogError> {
        if let Some(ended_at) = self.ended_at {
            return match command {
                Command::EndSession { .. } => Ok(Appended::DuplicateEnd),
                _ => Err(LogError::SessionEnded(ended_at)),
            };
        }
        if let Command::EndSession { timestamp } = command {
            self.ended_at = Some(timestamp);
        }
        self.entries.push(command);
        Ok(Appended::Stored)
    }

    /// Commands that make up the visible state of `page`, in log order.
    ///
    /// Navigation commands are skipped, and replay starts after the most
    /// recent `ClearPage` for `page` (from the beginning when there is none).
    pub fn commands_for_page(&self, page: PageNumber) -> impl Iterator<Item = &Command> + '_ {
        let start = self
            .entries
            .iter()
            .rposition(|command| matches!(command, Command::ClearPage { page: cleared } if *cleared == page))
            .map_or(0, |index| index + 1);

        self.entries[start..]
            .iter()
            .filter(move |command| matches!(command, Command::DrawStroke(stroke) if stroke.page() == page))
    }

    /// Strokes to replay for `page`; the typed view of
    /// [`CommandLog::commands_for_page`].
    pub fn strokes_for_page(&self, page: PageNumber) -> impl Iterator<Item = &Stroke> + '_ {
        self.commands_for_page(page).filter_map(Command::as_stroke)
    }

    /// Full ordered copy of the log.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Command> {
        self.entries.clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.entries.iter()
    }

    /// Page of the most recent `GotoPage`, if any.
    #[must_use]
    pub fn last_visited_page(&self) -> Option<PageNumber> {
        self.entries.iter().rev().find_map(|command| match command {
            Command::GotoPage { page } => Some(*page),
            _ => None,
        })
    }

    /// Timestamp of the `EndSession` that closed the log.
    #[must_use]
    pub fn ended_at(&self) -> Option<Timestamp> {
        self.ended_at
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ended_at.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a CommandLog {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
#[path = "log_test.rs"]
mod tests;
