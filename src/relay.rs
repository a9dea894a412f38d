//! # Relay Hub
//!
//! Room membership registry and broadcast multiplexer, shared by the
//! signaling channel (sender-excluded relay) and the analysis handlers
//! (result fan-out to every member). Rooms are created implicitly on first
//! join and deliberately not deleted when they empty out; an observer can
//! rejoin a quiet room and a terminate notice does not clear membership.
//!
//! Delivery is a non-blocking send on each member's outbound channel; a
//! member whose connection is gone just misses the message. The hub knows
//! nothing about session state, and its single lock is never held together
//! with any session-store lock.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Outbound channel for one connected client; carries serialized JSON text.
pub type MemberSender = UnboundedSender<String>;

#[derive(Default)]
struct HubInner {
    /// room id -> member connection ids.
    rooms: HashMap<String, HashSet<String>>,
    /// connection id -> outbound sender.
    members: HashMap<String, MemberSender>,
}

#[derive(Default)]
pub struct RelayHub {
    inner: RwLock<HubInner>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound sender. Called once per socket.
    pub fn connect(&self, conn_id: &str, sender: MemberSender) {
        let mut inner = self.inner.write().unwrap();
        inner.members.insert(conn_id.to_string(), sender);
    }

    /// Drop a connection and remove it from every room. Returns the rooms it
    /// was a member of, so the caller can emit leave notices.
    pub fn disconnect(&self, conn_id: &str) -> Vec<String> {
        let mut inner = self.inner.write().unwrap();
        inner.members.remove(conn_id);

        let mut left = Vec::new();
        for (room, members) in inner.rooms.iter_mut() {
            if members.remove(conn_id) {
                left.push(room.clone());
            }
        }
        left
    }

    /// Add a member to a room, creating the room on first join. Idempotent.
    pub fn join(&self, room: &str, conn_id: &str) {
        let mut inner = self.inner.write().unwrap();
        inner
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id.to_string());
    }

    /// Remove a member from a room. Idempotent; no error when either the
    /// room or the member is absent. The room itself is retained.
    pub fn leave(&self, room: &str, conn_id: &str) {
        let mut inner = self.inner.write().unwrap();
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(conn_id);
        }
    }

    /// Deliver `message` to every current member of `room`, skipping
    /// `excluding` when given. No exclusion means every member receives it,
    /// including whoever triggered the broadcast.
    pub fn broadcast(&self, room: &str, message: &str, excluding: Option<&str>) {
        let inner = self.inner.read().unwrap();
        let Some(members) = inner.rooms.get(room) else {
            return;
        };

        for conn_id in members {
            if excluding == Some(conn_id.as_str()) {
                continue;
            }
            if let Some(sender) = inner.members.get(conn_id) {
                if sender.send(message.to_string()).is_err() {
                    debug!(conn_id = %conn_id, room = %room, "Dropping message for closed connection");
                }
            }
        }
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.inner
            .read()
            .unwrap()
            .rooms
            .get(room)
            .map_or(0, |m| m.len())
    }

    pub fn room_count(&self) -> usize {
        self.inner.read().unwrap().rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().unwrap().members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn member(hub: &RelayHub, id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.connect(id, tx);
        rx
    }

    #[test]
    fn test_broadcast_reaches_all_members_including_trigger() {
        let hub = RelayHub::new();
        let mut a = member(&hub, "a");
        let mut b = member(&hub, "b");
        hub.join("room", "a");
        hub.join("room", "b");

        hub.broadcast("room", "result", None);
        assert_eq!(a.try_recv().unwrap(), "result");
        assert_eq!(b.try_recv().unwrap(), "result");
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let hub = RelayHub::new();
        let mut a = member(&hub, "a");
        let mut b = member(&hub, "b");
        hub.join("room", "a");
        hub.join("room", "b");

        hub.broadcast("room", "offer", Some("a"));
        assert!(a.try_recv().is_err());
        assert_eq!(b.try_recv().unwrap(), "offer");
    }

    #[test]
    fn test_join_is_idempotent() {
        let hub = RelayHub::new();
        let _rx = member(&hub, "a");
        hub.join("room", "a");
        hub.join("room", "a");
        assert_eq!(hub.room_size("room"), 1);
    }

    #[test]
    fn test_leave_is_idempotent_and_keeps_room() {
        let hub = RelayHub::new();
        let _rx = member(&hub, "a");
        hub.join("room", "a");
        hub.leave("room", "a");
        hub.leave("room", "a");
        hub.leave("no-such-room", "a");
        assert_eq!(hub.room_size("room"), 0);
        // Empty rooms are retained.
        assert_eq!(hub.room_count(), 1);
    }

    #[test]
    fn test_broadcast_to_unknown_room_is_noop() {
        let hub = RelayHub::new();
        let mut a = member(&hub, "a");
        hub.broadcast("ghost", "msg", None);
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn test_disconnect_leaves_all_rooms_and_reports_them() {
        let hub = RelayHub::new();
        let _a = member(&hub, "a");
        let mut b = member(&hub, "b");
        hub.join("r1", "a");
        hub.join("r2", "a");
        hub.join("r1", "b");

        let mut left = hub.disconnect("a");
        left.sort();
        assert_eq!(left, vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(hub.room_size("r1"), 1);

        // Remaining member still reachable.
        hub.broadcast("r1", "still-here", None);
        assert_eq!(b.try_recv().unwrap(), "still-here");
    }

    #[test]
    fn test_termination_notice_leaves_room_usable() {
        let hub = RelayHub::new();
        let mut a = member(&hub, "a");
        let mut b = member(&hub, "b");
        hub.join("room", "a");
        hub.join("room", "b");

        // A termination notice is an ordinary sender-excluded broadcast;
        // it must not disturb membership.
        hub.broadcast("room", "terminated", Some("a"));
        assert!(a.try_recv().is_err());
        assert_eq!(b.try_recv().unwrap(), "terminated");
        assert_eq!(hub.room_size("room"), 2);

        // The room keeps working afterwards: both members are still wired.
        hub.broadcast("room", "after", None);
        assert_eq!(a.try_recv().unwrap(), "after");
        assert_eq!(b.try_recv().unwrap(), "after");
    }

    #[test]
    fn test_send_to_closed_connection_does_not_block_others() {
        let hub = RelayHub::new();
        let mut b = member(&hub, "b");
        {
            let _dropped = member(&hub, "a");
            // receiver dropped here
        }
        hub.join("room", "a");
        hub.join("room", "b");

        hub.broadcast("room", "msg", None);
        assert_eq!(b.try_recv().unwrap(), "msg");
    }
}
