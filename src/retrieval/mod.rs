//! Recuperação em duas etapas com thresholds adaptativos.

mod adaptive;
mod history;

pub use adaptive::{AdaptiveRetriever, RetrievalOutcome};
pub use history::{adjust_threshold, QueryTypeStats, MAX_THRESHOLD, MIN_THRESHOLD};
