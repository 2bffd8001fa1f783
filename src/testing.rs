//! In-memory connector shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::transport::{ConnectError, ConnectionId, Connector, EventSink, Link, LinkEvent, TransportEvent};

/// Everything the fake links were asked to do, in order.
#[derive(Debug, Default)]
pub struct Wire {
    pub opened: Vec<ConnectionId>,
    pub sent: Vec<(ConnectionId, String)>,
    pub closed: Vec<ConnectionId>,
    /// Refuse the next `open` call.
    pub refuse_next: bool,
    /// Links report send failure.
    pub broken: bool,
    sinks: Vec<(ConnectionId, EventSink)>,
}

impl Wire {
    pub fn sent_on(&self, id: ConnectionId) -> Vec<String> {
        self.sent.iter().filter(|(conn, _)| *conn == id).map(|(_, text)| text.clone()).collect()
    }

    pub fn last_opened(&self) -> ConnectionId {
        *self.opened.last().expect("a connection was opened")
    }

    /// Raise `kind` on link `id` as its pump would.
    pub fn raise(&self, id: ConnectionId, kind: LinkEvent) {
        let (_, sink) = self.sinks.iter().find(|(conn, _)| *conn == id).expect("link was opened");
        sink.send(TransportEvent { connection: id, kind }).expect("controller alive");
    }
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    pub wire: Rc<RefCell<Wire>>,
}

struct FakeLink {
    id: ConnectionId,
    wire: Rc<RefCell<Wire>>,
}

impl Link for FakeLink {
    fn send(&self, text: String) -> bool {
        let mut wire = self.wire.borrow_mut();
        if wire.broken {
            return false;
        }
        wire.sent.push((self.id, text));
        true
    }

    fn close(&self) {
        self.wire.borrow_mut().closed.push(self.id);
    }
}

impl Connector for FakeConnector {
    fn open(&self, id: ConnectionId, events: EventSink) -> Result<Box<dyn Link>, ConnectError> {
        let mut wire = self.wire.borrow_mut();
        if wire.refuse_next {
            wire.refuse_next = false;
            return Err(ConnectError::InvalidUrl { url: "fake://".into(), reason: "refused".into() });
        }
        wire.opened.push(id);
        wire.sinks.push((id, events));
        Ok(Box::new(FakeLink { id, wire: Rc::clone(&self.wire) }))
    }
}
