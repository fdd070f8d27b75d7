//! In-process change notifications.
//!
//! Every mutation made through the data layer publishes a [`ChangeEvent`]
//! on the shared [`ChangeHub`]. Listeners subscribe with a set of
//! [`ChangeFilter`]s and receive only matching events. Dropping a
//! [`Subscription`] unsubscribes it.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// Tables that emit change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    UserRoles,
    Loads,
    LoadBids,
    Trucks,
    SubDrivers,
    DriverDetails,
    Notifications,
    SupportTickets,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::UserRoles => "user_roles",
            Table::Loads => "loads",
            Table::LoadBids => "load_bids",
            Table::Trucks => "trucks",
            Table::SubDrivers => "sub_drivers",
            Table::DriverDetails => "driver_details",
            Table::Notifications => "notifications",
            Table::SupportTickets => "support_tickets",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: Uuid,
}

/// Selects events from one table, optionally narrowed to one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: Table,
    pub kind: Option<ChangeKind>,
}

impl ChangeFilter {
    pub fn any(table: Table) -> Self {
        Self { table, kind: None }
    }

    pub fn only(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            kind: Some(kind),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.table == event.table && self.kind.is_none_or(|kind| kind == event.kind)
    }
}

impl From<Table> for ChangeFilter {
    fn from(table: Table) -> Self {
        Self::any(table)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Events were dropped because the subscriber fell behind.
    #[error("subscriber lagged behind by {0} events")]
    Lagged(u64),
    #[error("change hub closed")]
    Closed,
}

#[derive(Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning how many subscribers were listening.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        tracing::debug!(table = %event.table, kind = ?event.kind, row_id = %event.row_id, "change published");
        // No listeners is not an error
        self.sender.send(event).unwrap_or(0)
    }

    pub fn inserted(&self, table: Table, row_id: Uuid) -> usize {
        self.publish(ChangeEvent {
            table,
            kind: ChangeKind::Insert,
            row_id,
        })
    }

    pub fn updated(&self, table: Table, row_id: Uuid) -> usize {
        self.publish(ChangeEvent {
            table,
            kind: ChangeKind::Update,
            row_id,
        })
    }

    pub fn deleted(&self, table: Table, row_id: Uuid) -> usize {
        self.publish(ChangeEvent {
            table,
            kind: ChangeKind::Delete,
            row_id,
        })
    }

    pub fn subscribe<I, F>(&self, filters: I) -> Subscription
    where
        I: IntoIterator<Item = F>,
        F: Into<ChangeFilter>,
    {
        Subscription {
            receiver: self.sender.subscribe(),
            filters: filters.into_iter().map(Into::into).collect(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(256)
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filters: Vec<ChangeFilter>,
}

impl Subscription {
    pub fn filters(&self) -> &[ChangeFilter] {
        &self.filters
    }

    /// Wait for the next event matching any of this subscription's filters.
    pub async fn recv(&mut self) -> Result<ChangeEvent, SubscriptionError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filters.iter().any(|f| f.matches(&event)) => return Ok(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => return Err(SubscriptionError::Lagged(skipped)),
                Err(RecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_subscription_receives_only_watched_tables() {
        let hub = ChangeHub::new(16);
        let mut sub = hub.subscribe([Table::Loads]);

        let truck = Uuid::new_v4();
        let load = Uuid::new_v4();
        hub.inserted(Table::Trucks, truck);
        hub.updated(Table::Loads, load);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.table, Table::Loads);
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.row_id, load);
    }

    #[tokio::test]
    async fn test_kind_filter_skips_other_kinds() {
        let hub = ChangeHub::new(16);
        let mut sub = hub.subscribe([ChangeFilter::only(Table::Loads, ChangeKind::Delete)]);

        hub.inserted(Table::Loads, Uuid::new_v4());
        hub.updated(Table::Loads, Uuid::new_v4());
        let deleted = Uuid::new_v4();
        hub.deleted(Table::Loads, deleted);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.row_id, deleted);
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_the_event() {
        let hub = ChangeHub::new(16);
        let mut first = hub.subscribe([Table::SubDrivers]);
        let mut second = hub.subscribe([Table::SubDrivers, Table::Trucks]);

        assert_eq!(hub.inserted(Table::SubDrivers, Uuid::new_v4()), 2);

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_subscriber_reports_lag() {
        let hub = ChangeHub::new(2);
        let mut sub = hub.subscribe([Table::Loads]);

        for _ in 0..5 {
            hub.inserted(Table::Loads, Uuid::new_v4());
        }

        assert!(matches!(sub.recv().await, Err(SubscriptionError::Lagged(_))));
        // Delivery resumes with the retained events
        assert!(sub.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let hub = ChangeHub::new(4);
        let sub = hub.subscribe([Table::Loads]);
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.inserted(Table::Loads, Uuid::new_v4()), 0);
    }

    #[tokio::test]
    async fn test_no_event_for_unwatched_table() {
        let hub = ChangeHub::new(4);
        let mut sub = hub.subscribe([Table::Notifications]);

        hub.inserted(Table::Loads, Uuid::new_v4());

        let waited = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await;
        assert!(waited.is_err());
    }
}
