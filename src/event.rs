//! On-chain event model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event record as returned by the indexer's `events` collection.
///
/// ```json
/// {
///   "data": { "user": "0xabc...", "amount": "150000000" },
///   "indexed_type": "0x2cc...::minting_manager::MintEvent",
///   "transaction_version": 1839211,
///   "transaction_block_height": 104223
/// }
/// ```
///
/// The `data` payload is whatever the emitting Move module put on chain, so
/// it is kept as raw JSON and read through [`EventData`]. The remaining
/// fields are reporting metadata only; none of them participate in
/// aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Raw event payload; shape is controlled by the emitting contract.
    #[serde(default)]
    pub data: Option<Value>,
    /// Full event type signature, e.g. `0x..::minting_manager::MintEvent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_type: Option<String>,
    /// Ledger version of the emitting transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_version: Option<u64>,
    /// Block height of the emitting transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_block_height: Option<u64>,
}

/// The payload fields the checker reads, each optional because the indexer
/// makes no guarantee about the payload shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData {
    /// Address the event is attributed to.
    pub user: Option<String>,
    /// Amount encoded as a decimal string.
    pub amount: Option<String>,
}

impl Event {
    /// Parse the opaque payload into the declared [`EventData`] shape.
    ///
    /// Returns `None` when the payload is absent or not a JSON object. A
    /// field that is missing or not a string comes back as `None` without
    /// failing the rest of the event.
    pub fn payload(&self) -> Option<EventData> {
        let obj = self.data.as_ref()?.as_object()?;
        Some(EventData {
            user: obj.get("user").and_then(Value::as_str).map(str::to_owned),
            amount: obj.get("amount").and_then(Value::as_str).map(str::to_owned),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_with_data(data: Value) -> Event {
        Event {
            data: Some(data),
            indexed_type: None,
            transaction_version: None,
            transaction_block_height: None,
        }
    }

    #[test]
    fn payload_reads_user_and_amount() {
        let ev = event_with_data(json!({"user": "0xA", "amount": "42"}));
        let payload = ev.payload().unwrap();
        assert_eq!(payload.user.as_deref(), Some("0xA"));
        assert_eq!(payload.amount.as_deref(), Some("42"));
    }

    #[test]
    fn payload_absent_when_data_missing_or_not_object() {
        let ev = Event {
            data: None,
            indexed_type: None,
            transaction_version: None,
            transaction_block_height: None,
        };
        assert!(ev.payload().is_none());
        assert!(event_with_data(json!("just a string")).payload().is_none());
        assert!(event_with_data(json!([1, 2, 3])).payload().is_none());
    }

    #[test]
    fn payload_fields_optional_and_type_checked() {
        let ev = event_with_data(json!({"user": "0xA"}));
        let payload = ev.payload().unwrap();
        assert_eq!(payload.user.as_deref(), Some("0xA"));
        assert!(payload.amount.is_none());

        // a numeric amount is a missing field, not a panic
        let ev = event_with_data(json!({"user": 7, "amount": 42}));
        let payload = ev.payload().unwrap();
        assert!(payload.user.is_none());
        assert!(payload.amount.is_none());
    }

    #[test]
    fn deserializes_bare_indexer_record() {
        let ev: Event = serde_json::from_value(json!({
            "data": {"user": "0xA", "amount": "1"},
            "indexed_type": "0x1::m::E",
            "transaction_version": 5,
            "transaction_block_height": 2
        }))
        .unwrap();
        assert_eq!(ev.transaction_version, Some(5));
        assert_eq!(ev.indexed_type.as_deref(), Some("0x1::m::E"));
    }

    #[test]
    fn round_trips_through_json() {
        let ev = event_with_data(json!({"user": "0xA", "amount": "1"}));
        let text = serde_json::to_string(&ev).unwrap();
        let back: Event = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ev);
    }
}
