//! Client-side aggregation over tracked predictions: resolved vs total,
//! hit rate, and a per-confidence-tier breakdown.
//!
//! The backend ships its own `accuracy_stats`, but those cover all history;
//! recomputing over the snapshot's prediction list lets the operator view
//! stay consistent with exactly what is displayed.

use crate::api::types::{Confidence, Prediction};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracySummary {
    pub total: usize,
    pub resolved: usize,
    pub correct: usize,
    pub buy_yes: usize,
    pub buy_no: usize,
    /// Mean absolute edge at signal time, over predictions that carried one.
    pub avg_abs_edge: f64,
    pub by_confidence: Vec<ConfidenceBucket>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBucket {
    pub confidence: Confidence,
    pub total: usize,
    pub resolved: usize,
    pub correct: usize,
}

impl AccuracySummary {
    /// Fraction of resolved predictions that called the direction right.
    /// None until at least one prediction has resolved.
    pub fn hit_rate(&self) -> Option<f64> {
        if self.resolved == 0 {
            None
        } else {
            Some(self.correct as f64 / self.resolved as f64)
        }
    }
}

impl ConfidenceBucket {
    pub fn hit_rate(&self) -> Option<f64> {
        if self.resolved == 0 {
            None
        } else {
            Some(self.correct as f64 / self.resolved as f64)
        }
    }
}

pub fn summarize(predictions: &[Prediction]) -> AccuracySummary {
    let mut summary = AccuracySummary {
        by_confidence: [Confidence::High, Confidence::Medium, Confidence::Low]
            .iter()
            .map(|&confidence| ConfidenceBucket {
                confidence,
                total: 0,
                resolved: 0,
                correct: 0,
            })
            .collect(),
        ..Default::default()
    };

    let mut edge_sum = 0.0;
    let mut edge_count = 0usize;

    for p in predictions {
        summary.total += 1;
        match p.signal_type {
            crate::api::types::SignalType::BuyYes => summary.buy_yes += 1,
            crate::api::types::SignalType::BuyNo => summary.buy_no += 1,
            _ => {}
        }
        if let Some(edge) = p.edge_at_signal {
            edge_sum += edge.abs();
            edge_count += 1;
        }

        let tier = match p.confidence {
            Confidence::High => 0,
            Confidence::Medium => 1,
            Confidence::Low => 2,
        };
        let bucket = &mut summary.by_confidence[tier];
        bucket.total += 1;

        match p.direction_correct {
            Some(true) => {
                summary.resolved += 1;
                summary.correct += 1;
                bucket.resolved += 1;
                bucket.correct += 1;
            }
            Some(false) => {
                summary.resolved += 1;
                bucket.resolved += 1;
            }
            None => {}
        }
    }

    if edge_count > 0 {
        summary.avg_abs_edge = edge_sum / edge_count as f64;
    }
    summary
}
