//! # Recall
//!
//! Motor de recuperação e retenção sobre um espaço de embeddings.
//!
//! O Recall mantém um armazenamento limitado de padrões de embedding, faz
//! recuperação por similaridade em duas etapas com thresholds que se adaptam
//! às consultas recentes, encadeia um retriever student barato com um
//! re-ranker teacher caro e entrega periodicamente as amostras a um trainer.
//!
//! ## Módulos
//!
//! - [`cache`] - Armazenamento de padrões com evicção LRU, LFU e por importância
//! - [`retrieval`] - Retriever adaptativo em duas etapas
//! - [`cascade`] - Cascata de destilação teacher/student
//! - [`retention`] - Buffer de retenção com atualizações periódicas e checkpoints
//! - [`collaborators`] - Traits para encoder, índice, teacher, trainer e persistência
//! - [`similarity`] - Utilitários de vetores
//! - [`telemetry`] - Configuração de logging
//! - [`types`] - Tipos compartilhados
//!
//! ## Exemplo
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use recall::types::config::{EvictionPolicy, StoreConfig};
//! use recall::types::PatternMetadata;
//! use recall::PatternStore;
//!
//! let store = Arc::new(PatternStore::new(3, StoreConfig::new(100, EvictionPolicy::Lru))?);
//! store.add_pattern("p1", vec![0.1, 0.2, 0.3], PatternMetadata::new().with_text("hello"));
//!
//! let hits = store.search_similar(&[0.1, 0.2, 0.3], 5, Some(0.5));
//! assert_eq!(hits[0].pattern.id, "p1");
//! # Ok::<(), recall::RecallError>(())
//! ```

pub mod cache;
pub mod cascade;
pub mod collaborators;
pub mod retention;
pub mod retrieval;
pub mod similarity;
pub mod telemetry;
pub mod types;

pub use cache::PatternStore;
pub use cascade::DistillationCascade;
pub use retention::RetentionBuffer;
pub use retrieval::AdaptiveRetriever;
pub use types::config::Config;
pub use types::errors::{RecallError, RecallResult};
