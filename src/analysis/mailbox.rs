//! One-slot, latest-wins mailbox.
//!
//! The streaming analysis path only ever cares about the most recent result:
//! a producer publishes each new value, overwriting whatever was there, and a
//! consumer reads (or drains) the latest. Modeled as a single swappable slot
//! rather than a queue; intermediate values are deliberately dropped.

use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct LatestSlot<T> {
    slot: Mutex<Option<T>>,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Replace the slot contents, returning the displaced value if any.
    pub fn publish(&self, value: T) -> Option<T> {
        self.slot.lock().unwrap().replace(value)
    }

    /// Drain the slot.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().unwrap().take()
    }
}

impl<T: Clone> LatestSlot<T> {
    /// Read the latest value without draining it.
    pub fn latest(&self) -> Option<T> {
        self.slot.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_wins() {
        let slot = LatestSlot::new();
        slot.publish(1);
        slot.publish(2);
        slot.publish(3);
        assert_eq!(slot.latest(), Some(3));
    }

    #[test]
    fn test_publish_returns_displaced_value() {
        let slot = LatestSlot::new();
        assert_eq!(slot.publish("a"), None);
        assert_eq!(slot.publish("b"), Some("a"));
    }

    #[test]
    fn test_take_drains() {
        let slot = LatestSlot::new();
        slot.publish(7);
        assert_eq!(slot.take(), Some(7));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_latest_does_not_drain() {
        let slot = LatestSlot::new();
        slot.publish(5);
        assert_eq!(slot.latest(), Some(5));
        assert_eq!(slot.latest(), Some(5));
    }
}
