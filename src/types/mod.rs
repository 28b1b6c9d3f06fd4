//! Tipos compartilhados do Recall.

pub mod config;
pub mod errors;
pub mod pattern;
pub mod requests;
pub mod responses;

pub use pattern::{Embedding, MemoryPattern, PatternMetadata};
pub use requests::{QueryContext, Sample, DEFAULT_QUERY_TYPE};
pub use responses::{CascadeMetadata, CascadeResult, RetrievalCandidate, Stage, Strategy};
