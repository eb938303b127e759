//! Per-address aggregation and threshold verdicts.

use log::{info, warn};

use crate::event::Event;

/// Error string reported when the global event set is empty.
pub const NO_GLOBAL_EVENTS: &str = "no global events of target type found";

/// Verdict for one checked address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressResult {
    /// Address the verdict applies to.
    pub address: String,
    /// Whether the cumulative amount strictly exceeds the threshold.
    pub meets_criteria: bool,
    /// Sum of the successfully parsed amounts.
    pub cumulative_amount: u128,
    /// Number of events attributed to the address, including malformed ones.
    pub events_found: usize,
    /// Populated only when no verdict could be computed from data.
    pub error: Option<String>,
}

/// Aggregation outcome. `summed` and the caller's attributable count are
/// reported separately because malformed events keep them apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmountTotal {
    /// Sum of all amounts that parsed.
    pub sum: u128,
    /// Events whose amount contributed to the sum.
    pub summed: usize,
    /// Events skipped for a missing or unparseable amount.
    pub malformed: usize,
}

/// Events whose payload attributes them to `address`.
///
/// The match is exact and case-sensitive; events without an object payload
/// or without a `user` field are excluded silently.
pub fn events_for_address<'a>(events: &'a [Event], address: &str) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|ev| ev.payload().and_then(|p| p.user).as_deref() == Some(address))
        .collect()
}

/// Sum the string-encoded `amount` across `events`.
///
/// An absent or unparseable amount skips the event and counts it as
/// malformed instead of aborting the aggregation.
pub fn cumulative_amount(events: &[&Event]) -> AmountTotal {
    let mut total = AmountTotal::default();
    for ev in events {
        match ev.payload().and_then(|p| p.amount).map(|a| a.parse::<u128>()) {
            Some(Ok(amount)) => {
                total.sum += amount;
                total.summed += 1;
            }
            _ => total.malformed += 1,
        }
    }
    if total.malformed > 0 {
        warn!(
            "skipped {} events with a missing or malformed amount",
            total.malformed
        );
    }
    total
}

/// Evaluate one address against the shared event set.
///
/// Evaluations are independent and order-insensitive; running the same
/// address twice against the same set yields the same result.
pub fn check_address(events: &[Event], address: &str, threshold: u128) -> AddressResult {
    if events.is_empty() {
        return AddressResult {
            address: address.to_owned(),
            meets_criteria: false,
            cumulative_amount: 0,
            events_found: 0,
            error: Some(NO_GLOBAL_EVENTS.to_owned()),
        };
    }
    let attributable = events_for_address(events, address);
    if attributable.is_empty() {
        info!("no events attributed to {address}");
        return AddressResult {
            address: address.to_owned(),
            meets_criteria: false,
            cumulative_amount: 0,
            events_found: 0,
            error: None,
        };
    }
    let total = cumulative_amount(&attributable);
    info!(
        "{address}: {} events attributed, {} summed, cumulative {}",
        attributable.len(),
        total.summed,
        total.sum
    );
    AddressResult {
        address: address.to_owned(),
        meets_criteria: total.sum > threshold,
        cumulative_amount: total.sum,
        events_found: attributable.len(),
        error: None,
    }
}
