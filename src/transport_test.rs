use super::*;
use crate::testing::FakeConnector;

fn channel(fake: &FakeConnector, backoff: Backoff) -> (Channel<FakeConnector>, mpsc::UnboundedReceiver<TransportEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Channel::new(fake.clone(), "abc123", tx, backoff), rx)
}

fn event(connection: ConnectionId, kind: LinkEvent) -> TransportEvent {
    TransportEvent { connection, kind }
}

fn instant_backoff() -> Backoff {
    Backoff::new(Duration::ZERO, Duration::ZERO)
}

// =============================================================================
// backoff
// =============================================================================

#[test]
fn backoff_doubles_up_to_cap() {
    let backoff = Backoff::default();
    assert_eq!(backoff.initial, Duration::from_secs(1));
    assert_eq!(backoff.next(Duration::from_secs(1)), Duration::from_secs(2));
    assert_eq!(backoff.next(Duration::from_secs(4)), Duration::from_secs(8));
    assert_eq!(backoff.next(Duration::from_secs(8)), Duration::from_secs(10));
    assert_eq!(backoff.next(Duration::from_secs(10)), Duration::from_secs(10));
}

#[test]
fn connection_ids_are_unique() {
    assert_ne!(ConnectionId::new(), ConnectionId::new());
}

// =============================================================================
// handshake and send
// =============================================================================

#[tokio::test]
async fn handshake_is_first_message_after_open() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());
    let id = channel.open().expect("open");
    assert!(!channel.is_ready());

    let status = channel.handle(event(id, LinkEvent::Opened));
    assert_eq!(status, ChannelEvent::Status(LinkStatus::Ready));
    assert!(channel.is_ready());
    assert_eq!(fake.wire.borrow().sent_on(id), vec![r#"{"session_id":"abc123"}"#.to_owned()]);
}

#[tokio::test]
async fn send_before_open_is_dropped() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());
    channel.open().expect("open");

    let outcome = channel.send(&Command::goto_page(2).expect("goto"));
    assert_eq!(outcome, SendOutcome::Dropped);
    assert!(fake.wire.borrow().sent.is_empty());
}

#[tokio::test]
async fn send_when_ready_writes_encoded_command() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());
    let id = channel.open().expect("open");
    channel.handle(event(id, LinkEvent::Opened));

    let command = Command::clear_page(3).expect("clear");
    assert_eq!(channel.send(&command), SendOutcome::Delivered);
    let sent = fake.wire.borrow().sent_on(id);
    assert_eq!(sent.last(), Some(&encode_command(&command)));
}

#[tokio::test]
async fn failed_write_unarms_channel() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());
    let id = channel.open().expect("open");
    channel.handle(event(id, LinkEvent::Opened));

    fake.wire.borrow_mut().broken = true;
    assert_eq!(channel.send(&Command::goto_page(2).expect("goto")), SendOutcome::Dropped);
    assert!(!channel.is_ready());
}

// =============================================================================
// reconnect
// =============================================================================

#[tokio::test]
async fn closed_link_schedules_reconnect_with_backoff() {
    let fake = FakeConnector::default();
    let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(250));
    let (mut channel, _rx) = channel(&fake, backoff);

    let first = channel.open().expect("open");
    let status = channel.handle(event(first, LinkEvent::Closed));
    assert_eq!(status, ChannelEvent::Status(LinkStatus::Reconnecting { delay: Duration::from_millis(100) }));
    assert!(channel.reconnect_deadline().is_some());

    let second = channel.reconnect().expect("reconnect");
    assert!(channel.reconnect_deadline().is_none());
    let status = channel.handle(event(second, LinkEvent::Closed));
    assert_eq!(status, ChannelEvent::Status(LinkStatus::Reconnecting { delay: Duration::from_millis(200) }));

    let third = channel.reconnect().expect("reconnect");
    let status = channel.handle(event(third, LinkEvent::Closed));
    assert_eq!(status, ChannelEvent::Status(LinkStatus::Reconnecting { delay: Duration::from_millis(250) }));
}

#[tokio::test]
async fn successful_open_resets_backoff() {
    let fake = FakeConnector::default();
    let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));
    let (mut channel, _rx) = channel(&fake, backoff);

    let first = channel.open().expect("open");
    channel.handle(event(first, LinkEvent::Closed));
    let second = channel.reconnect().expect("reconnect");
    channel.handle(event(second, LinkEvent::Opened));
    let status = channel.handle(event(second, LinkEvent::Closed));
    assert_eq!(status, ChannelEvent::Status(LinkStatus::Reconnecting { delay: Duration::from_millis(100) }));
}

#[tokio::test]
async fn reconnect_resends_handshake_on_new_connection() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());

    let first = channel.open().expect("open");
    channel.handle(event(first, LinkEvent::Opened));
    channel.handle(event(first, LinkEvent::Closed));
    assert!(!channel.is_ready());

    let second = channel.reconnect().expect("reconnect");
    assert_ne!(first, second);
    assert!(!channel.is_ready());
    channel.handle(event(second, LinkEvent::Opened));
    assert!(channel.is_ready());
    assert_eq!(fake.wire.borrow().sent_on(second), vec![encode_handshake("abc123")]);
}

#[tokio::test]
async fn events_from_replaced_connection_are_ignored() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());

    let first = channel.open().expect("open");
    let second = channel.open().expect("open");
    assert_eq!(fake.wire.borrow().closed, vec![first]);

    assert_eq!(channel.handle(event(first, LinkEvent::Message("{}".into()))), ChannelEvent::Ignored);
    assert_eq!(channel.handle(event(first, LinkEvent::Closed)), ChannelEvent::Ignored);
    assert!(channel.reconnect_deadline().is_none());
    assert_eq!(channel.current_connection(), Some(second));
}

#[tokio::test]
async fn refused_open_still_schedules_retry() {
    let fake = FakeConnector::default();
    fake.wire.borrow_mut().refuse_next = true;
    let (mut channel, _rx) = channel(&fake, instant_backoff());

    assert!(channel.open().is_err());
    assert!(channel.reconnect_deadline().is_some());
    assert!(channel.reconnect().is_ok());
}

#[tokio::test]
async fn inbound_messages_surface_in_order() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());
    let id = channel.open().expect("open");

    for text in ["a", "b", "c"] {
        assert_eq!(channel.handle(event(id, LinkEvent::Message(text.into()))), ChannelEvent::Message(text.into()));
    }
}

// =============================================================================
// close
// =============================================================================

#[tokio::test]
async fn close_stops_reconnecting() {
    let fake = FakeConnector::default();
    let (mut channel, _rx) = channel(&fake, instant_backoff());
    let id = channel.open().expect("open");
    channel.handle(event(id, LinkEvent::Opened));

    channel.close();
    assert!(channel.is_closed());
    assert!(!channel.is_ready());
    assert_eq!(fake.wire.borrow().closed, vec![id]);

    assert_eq!(channel.handle(event(id, LinkEvent::Closed)), ChannelEvent::Ignored);
    assert!(channel.reconnect_deadline().is_none());
    assert!(matches!(channel.open(), Err(ConnectError::Closed)));
}
