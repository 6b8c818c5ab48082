//! Aggregation Engine
//!
//! Single pass over every stored event producing the dashboard summary.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::event::{CallEvent, Classification};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatePair {
    pub start_rate: i64,
    pub final_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonCount {
    /// Literal classification value; `null` when the event had none.
    pub reason: Value,
    pub count: usize,
}

/// Aggregated statistics rendered on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_calls: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub ongoing_count: usize,
    /// Percentage of calls that ended in a deal.
    pub success_rate: f64,
    pub pickups: Vec<LocationCount>,
    pub dropoffs: Vec<LocationCount>,
    /// Every recorded (start, final) pair in encounter order.
    pub last5_rates: Vec<RatePair>,
    /// Average final/start ratio over successes, as a percentage above 100.
    pub negotiation_under_pct: f64,
    pub unsuccessful_reasons: Vec<ReasonCount>,
}

/// Counter that remembers the order in which keys were first seen.
struct OrderedCounter<K> {
    index: HashMap<String, usize>,
    entries: Vec<(K, usize)>,
}

impl<K> OrderedCounter<K> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn increment(&mut self, lookup: String, key: impl FnOnce() -> K) {
        match self.index.get(&lookup) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(lookup, self.entries.len());
                self.entries.push((key(), 1));
            }
        }
    }

    fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    fn into_entries(self) -> Vec<(K, usize)> {
        self.entries
    }
}

/// Compute the dashboard summary over `events`.
pub fn summarize(events: &[Value]) -> DashboardSummary {
    let total_calls = events.len();
    let mut success_count = 0usize;
    let mut ongoing_count = 0usize;
    let mut ratio_sum = 0.0f64;
    let mut pickups: OrderedCounter<String> = OrderedCounter::new();
    let mut dropoffs: OrderedCounter<String> = OrderedCounter::new();
    let mut failures: OrderedCounter<Value> = OrderedCounter::new();
    let mut rates = Vec::new();

    for raw in events {
        let event = CallEvent::from_value(raw);
        debug!("classification={:?}", event.classification);

        match &event.classification {
            Classification::Success => {
                success_count += 1;
                ratio_sum += event.rate_ratio();

                if let Some(origin) = event.origin {
                    pickups.increment(origin.to_string(), || origin.to_string());
                }
                if let Some(destination) = event.destination {
                    dropoffs.increment(destination.to_string(), || destination.to_string());
                }
                if event.has_rate_pair() {
                    rates.push(RatePair {
                        start_rate: event.start_rate,
                        final_rate: event.final_rate,
                    });
                }
            }
            Classification::Ongoing => ongoing_count += 1,
            Classification::Failure(reason) => {
                failures.increment(reason.to_string(), || reason.clone());
            }
        }
    }

    let success_rate = if total_calls > 0 {
        success_count as f64 / total_calls as f64 * 100.0
    } else {
        0.0
    };

    // A zero ratio sum reads the same as "no rate data"
    let negotiation_under_pct = if success_count != 0 && ratio_sum != 0.0 {
        (ratio_sum / success_count as f64) * 100.0 - 100.0
    } else {
        0.0
    };

    let fail_count = failures.total();

    DashboardSummary {
        total_calls,
        success_count,
        fail_count,
        ongoing_count,
        success_rate,
        pickups: location_counts(pickups),
        dropoffs: location_counts(dropoffs),
        last5_rates: rates,
        negotiation_under_pct,
        unsuccessful_reasons: failures
            .into_entries()
            .into_iter()
            .map(|(reason, count)| ReasonCount { reason, count })
            .collect(),
    }
}

fn location_counts(counter: OrderedCounter<String>) -> Vec<LocationCount> {
    counter
        .into_entries()
        .into_iter()
        .map(|(location, count)| LocationCount { location, count })
        .collect()
}
