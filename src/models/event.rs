use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::record::Record;
use crate::utils::logging;

/// Kinds of state change a CRUD instance reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(EventKind::Created),
            "updated" => Ok(EventKind::Updated),
            "deleted" => Ok(EventKind::Deleted),
            _ => Err(format!("Unknown event kind: {}", s)),
        }
    }
}

/// Data attached to an event: persisted rows, or just the key of a removed row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Records(Vec<Record>),
    Key(Record),
}

/// Observer invoked synchronously after each successful write
pub type EventHandler = Arc<dyn Fn(EventKind, &EventPayload) + Send + Sync>;

/// Owned event, as delivered through a channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEvent {
    pub table: String,
    pub kind: EventKind,
    pub payload: EventPayload,
}

/// Wrap a plain closure as an event handler
pub fn handler<F>(f: F) -> EventHandler where F: Fn(EventKind, &EventPayload) + Send + Sync + 'static {
    Arc::new(f)
}

/// Build a handler that forwards events to an observer task over a bounded channel.
///
/// The handler never blocks the write path: when the channel is full or closed the
/// event is dropped and a warning is logged.
pub fn forward_to(table: impl Into<String>, sender: mpsc::Sender<TableEvent>) -> EventHandler {
    let table = table.into();
    Arc::new(move |kind: EventKind, payload: &EventPayload| {
        let event = TableEvent {
            table: table.clone(),
            kind,
            payload: payload.clone(),
        };
        if let Err(e) = sender.try_send(event) {
            logging::log_table_warning("events", &table, "Dropped event notification", &e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_round_trips_through_names() {
        for kind in [EventKind::Created, EventKind::Updated, EventKind::Deleted] {
            assert_eq!(kind.to_string().parse::<EventKind>(), Ok(kind));
        }
        assert!("udpated".parse::<EventKind>().is_err());
        assert_eq!(serde_json::to_value(EventKind::Updated).unwrap(), "updated");
    }

    #[test]
    fn test_payload_serializes_untagged() {
        let key = EventPayload::Key(Record::new().with("id", 1i64));
        assert_eq!(serde_json::to_value(&key).unwrap(), serde_json::json!({"id": 1}));

        let rows = EventPayload::Records(vec![Record::new().with("id", 1i64)]);
        assert_eq!(serde_json::to_value(&rows).unwrap(), serde_json::json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_forward_to_delivers_and_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let on_event = forward_to("Users", tx);
        let payload = EventPayload::Key(Record::new().with("id", 3i64));

        on_event(EventKind::Deleted, &payload);
        // Channel capacity is one, so this one is dropped rather than blocking
        on_event(EventKind::Deleted, &payload);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, "Users");
        assert_eq!(event.kind, EventKind::Deleted);
        assert_eq!(event.payload, payload);
        assert!(rx.try_recv().is_err());
    }
}
