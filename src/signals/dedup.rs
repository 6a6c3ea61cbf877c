//! Signal deduplication: collapse a raw, possibly-redundant list of signal
//! records into one current signal per market.
//!
//! The scanner re-assesses markets on every pass, so a snapshot can carry
//! several records for the same market. The merge rules:
//!
//! - Records are keyed by market id (question text when the id is absent).
//! - Two records with the same key and the same signal type: the one with the
//!   later creation timestamp survives, regardless of input order. A missing
//!   timestamp always loses to a present one.
//! - Two records with the same key but *different* signal types both survive,
//!   the later one under a `{key}_{type}` secondary key: the signal flipped
//!   and both states stay visible.
//!
//! When two competing records both lack a timestamp, the last one processed
//! wins. That is a deliberate, documented choice, not an accident of map
//! ordering (see DESIGN.md).

use std::collections::HashMap;

use crate::api::types::{Signal, SignalType};

/// Reduce `signals` to the display-ready set. Output order is unspecified;
/// callers that care should rank afterwards (see [`actionable_ranked`]).
pub fn dedupe_signals(signals: &[Signal]) -> Vec<Signal> {
    let mut retained: HashMap<String, Signal> = HashMap::new();

    for sig in signals {
        let primary = sig.dedup_key();
        match retained.get(&primary) {
            None => {
                retained.insert(primary, sig.clone());
            }
            Some(existing) if existing.signal_type != sig.signal_type => {
                // Signal flipped: track the new state under a type-qualified key
                let secondary = format!("{}_{}", primary, sig.signal_type.as_str());
                upsert_by_recency(&mut retained, secondary, sig);
            }
            Some(_) => {
                upsert_by_recency(&mut retained, primary, sig);
            }
        }
    }

    retained.into_values().collect()
}

/// Filter a deduplicated set down to actionable signals (BUY_YES / BUY_NO),
/// ranked by absolute edge descending, the order the backend itself uses.
pub fn actionable_ranked(mut signals: Vec<Signal>) -> Vec<Signal> {
    signals.retain(|s| s.signal_type.is_actionable());
    signals.sort_by(|a, b| {
        b.edge
            .abs()
            .partial_cmp(&a.edge.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    signals
}

fn upsert_by_recency(retained: &mut HashMap<String, Signal>, key: String, incoming: &Signal) {
    match retained.get(&key) {
        Some(existing) if !is_at_least_as_recent(incoming, existing) => {}
        _ => {
            retained.insert(key, incoming.clone());
        }
    }
}

/// Recency comparison on the raw timestamp strings. Both wire formats are
/// ISO-ordered (`YYYY-MM-DD…`), so lexicographic comparison is temporal
/// comparison; a missing timestamp compares as the empty string and loses to
/// any present one. Equal (including both-missing) means the incoming record
/// wins: last processed.
fn is_at_least_as_recent(incoming: &Signal, existing: &Signal) -> bool {
    incoming.created_at.as_deref().unwrap_or("")
        >= existing.created_at.as_deref().unwrap_or("")
}
