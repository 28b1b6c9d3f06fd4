//! Traits dos colaboradores externos.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::StoreStats;
use crate::types::{Embedding, RetrievalCandidate, Sample};
use crate::{RecallError, RecallResult};

/// Transforma texto em embeddings.
///
/// Deve ser determinístico para uma versão fixa do modelo.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Nome usado em logs e erros.
    fn name(&self) -> &str;

    /// Codifica um texto.
    async fn encode(&self, text: &str) -> RecallResult<Embedding>;
}

/// Índice de vizinhos mais próximos aproximado usado na etapa grossa.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nome usado em logs e erros.
    fn name(&self) -> &str;

    /// Retorna até `top_k` candidatos para `embedding`, melhor primeiro.
    async fn query(&self, embedding: &[f64], top_k: usize)
        -> RecallResult<Vec<RetrievalCandidate>>;
}

/// Re-ranker caro.
#[async_trait]
pub trait Teacher: Send + Sync {
    /// Nome usado em logs e erros.
    fn name(&self) -> &str;

    /// Relevância de `doc_text` para `query`. Maior é melhor.
    async fn get_score(&self, query: &str, doc_text: &str) -> RecallResult<f64>;
}

/// Retriever barato de primeira passada usado pela cascata.
#[async_trait]
pub trait StudentRetriever: Send + Sync {
    /// Nome usado em logs e erros.
    fn name(&self) -> &str;

    /// Retorna até `k` candidatos para `query`, pontuados pelo student.
    async fn retrieve(&self, query: &str, k: usize) -> RecallResult<Vec<RetrievalCandidate>>;
}

/// Aplica uma atualização de retenção com as amostras do buffer.
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Nome usado em logs e erros.
    fn name(&self) -> &str;

    /// Consome um lote de amostras. O buffer só é limpo com `Ok`.
    async fn update(&self, samples: &[Sample]) -> RecallResult<()>;
}

/// Guarda os checkpoints pedidos pelo buffer de retenção.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Nome usado em logs e erros.
    fn name(&self) -> &str;

    /// Salva um checkpoint.
    async fn checkpoint(&self, state: &CheckpointState) -> RecallResult<()>;
}

/// Snapshot entregue a [`Persistence::checkpoint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Atualizações de retenção concluídas até agora.
    pub updates_completed: u64,

    /// Amostras aceitas desde a criação do buffer.
    pub samples_seen: u64,

    /// Estatísticas do armazenamento associado, se houver.
    pub store_stats: Option<StoreStats>,

    /// Quando o checkpoint foi pedido.
    pub timestamp: DateTime<Utc>,
}

/// Executa uma chamada a um colaborador com timeout.
///
/// Timeouts viram [`RecallError::Timeout`] com `name`.
pub async fn call_with_timeout<T, F>(name: &str, timeout: Duration, call: F) -> RecallResult<T>
where
    F: Future<Output = RecallResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                collaborator = name,
                timeout_ms = timeout.as_millis() as u64,
                "Collaborator call timed out"
            );
            Err(RecallError::Timeout(name.to_string()))
        }
    }
}
