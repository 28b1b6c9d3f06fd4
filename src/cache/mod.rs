//! Armazenamento de padrões: cache limitado de embeddings com evicção por importância.
//!
//! O armazenamento mantém no máximo `buffer_size` padrões. Quando cheio, uma
//! entrada é removida por inserção, conforme a política configurada:
//!
//! - **LRU**: acessada há mais tempo (ordem de inserção para as não acessadas)
//! - **LFU**: menor número de acessos
//! - **Importance**: menor importância
//!
//! Em LFU e importance, empates removem a entrada inserida primeiro.

mod eviction;
mod importance;
mod persistence;
mod store;

pub use importance::{ImportanceInputs, ImportanceScorer};
pub use persistence::{PersistedConfig, PersistedStats, StoreSnapshot};
pub use store::{PatternStore, ScoredPattern, StoreStats};
