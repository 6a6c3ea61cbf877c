pub mod accuracy;
pub mod dedup;

pub use accuracy::{summarize, AccuracySummary};
pub use dedup::{actionable_ranked, dedupe_signals};
