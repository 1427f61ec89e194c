//! The bounded lists of recent pushes shown in the live panel.

use std::collections::VecDeque;

use crate::transaction::Transaction;

/// How many transactions the live feed keeps.
pub const RECENT_CAPACITY: usize = 10;
/// How many fraud alerts the live feed keeps.
pub const ALERT_CAPACITY: usize = 5;

/// The events the push hub sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A transaction was scored.
    ReceiveTransaction,
    /// A scored transaction was classified as fraud.
    ReceiveFraudAlert,
}

impl EventKind {
    /// Both events, in the order they are subscribed to.
    pub const ALL: [EventKind; 2] = [EventKind::ReceiveTransaction, EventKind::ReceiveFraudAlert];

    /// The name of the hub method for this event.
    pub fn target(self) -> &'static str {
        match self {
            EventKind::ReceiveTransaction => "ReceiveTransaction",
            EventKind::ReceiveFraudAlert => "ReceiveFraudAlert",
        }
    }

    /// Get the event for the hub method `target`, matched exactly.
    pub fn from_target(target: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.target() == target)
    }
}

/// A decoded event from the push hub.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub kind: EventKind,
    pub transaction: Transaction,
}

/// The most recent transactions and fraud alerts, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveFeed {
    recent: VecDeque<Transaction>,
    alerts: VecDeque<Transaction>,
}

impl LiveFeed {
    /// Add the transaction in `event` to the list for its kind, dropping the
    /// oldest entry once the list is full.
    pub fn apply(&mut self, event: PushEvent) {
        let (list, capacity) = match event.kind {
            EventKind::ReceiveTransaction => (&mut self.recent, RECENT_CAPACITY),
            EventKind::ReceiveFraudAlert => (&mut self.alerts, ALERT_CAPACITY),
        };

        list.push_front(event.transaction);
        list.truncate(capacity);
    }

    pub fn recent(&self) -> impl Iterator<Item = &Transaction> {
        self.recent.iter()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Transaction> {
        self.alerts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::transaction::test_utils::{fraudulent, transaction};

    use super::{ALERT_CAPACITY, EventKind, LiveFeed, PushEvent, RECENT_CAPACITY};

    fn ids<'a>(transactions: impl Iterator<Item = &'a crate::transaction::Transaction>) -> Vec<i64> {
        transactions.map(|t| t.id.as_i64()).collect()
    }

    #[test]
    fn recent_feed_keeps_ten_newest() {
        let mut feed = LiveFeed::default();

        for id in 1..=11 {
            feed.apply(PushEvent {
                kind: EventKind::ReceiveTransaction,
                transaction: transaction(id, 1.0),
            });
        }

        let recent = ids(feed.recent());
        assert_eq!(recent.len(), RECENT_CAPACITY);
        assert_eq!(recent, (2..=11).rev().collect::<Vec<_>>());
        assert_eq!(feed.alerts().count(), 0);
    }

    #[test]
    fn alerts_keep_five_newest() {
        let mut feed = LiveFeed::default();

        for id in 1..=7 {
            feed.apply(PushEvent {
                kind: EventKind::ReceiveFraudAlert,
                transaction: fraudulent(id, 1.0),
            });
        }

        assert_eq!(ids(feed.alerts()), [7, 6, 5, 4, 3]);
        assert_eq!(feed.alerts().count(), ALERT_CAPACITY);
        assert_eq!(feed.recent().count(), 0);
    }

    #[test]
    fn targets_are_matched_exactly() {
        assert_eq!(
            EventKind::from_target("ReceiveFraudAlert"),
            Some(EventKind::ReceiveFraudAlert)
        );
        assert_eq!(EventKind::from_target("receivetransaction"), None);
    }
}
