use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_core::AggregateId;

use crate::Event;

/// Envelope for an event, containing stream metadata.
///
/// This is the unit appended to a product's journal.
///
/// - `sequence_number` increases by one per stream and starts at 1.
/// - `payload` is the (usually serialized) domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    aggregate_id: AggregateId,
    aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    sequence_number: u64,

    event_type: String,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    /// Wrap a typed event, copying its type name and business time.
    pub fn wrap<T: Event>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        event: &T,
        payload: E,
    ) -> Self {
        Self::new(
            Uuid::now_v7(),
            aggregate_id,
            aggregate_type,
            sequence_number,
            event.event_type(),
            event.occurred_at(),
            payload,
        )
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct PriceNoted {
        cents: i64,
        at: DateTime<Utc>,
    }

    impl Event for PriceNoted {
        fn event_type(&self) -> &'static str {
            "tests.price.noted"
        }

        fn version(&self) -> u32 {
            1
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[test]
    fn wrap_copies_type_and_business_time() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = PriceNoted { cents: 1_250, at };
        let aggregate_id = AggregateId::new();

        let envelope = EventEnvelope::wrap(aggregate_id, "tests.price", 3, &event, event.clone());

        assert_eq!(envelope.aggregate_id(), aggregate_id);
        assert_eq!(envelope.aggregate_type(), "tests.price");
        assert_eq!(envelope.sequence_number(), 3);
        assert_eq!(envelope.event_type(), "tests.price.noted");
        assert_eq!(envelope.occurred_at(), at);
        assert_eq!(envelope.payload(), &event);
    }

    #[test]
    fn json_payload_survives_storage() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = PriceNoted { cents: 990, at };
        let payload = serde_json::to_value(&event).unwrap();
        let envelope = EventEnvelope::wrap(AggregateId::new(), "tests.price", 1, &event, payload);

        let stored = serde_json::to_string(&envelope).unwrap();
        let loaded: EventEnvelope<serde_json::Value> = serde_json::from_str(&stored).unwrap();
        assert_eq!(loaded, envelope);

        let decoded: PriceNoted = serde_json::from_value(loaded.into_payload()).unwrap();
        assert_eq!(decoded, event);
    }
}
