//! Retriever em duas etapas com threshold de similaridade ajustado online.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::collaborators::{call_with_timeout, Encoder, StudentRetriever, VectorIndex};
use crate::similarity::cosine_similarity;
use crate::types::config::RetrieverConfig;
use crate::types::{Embedding, QueryContext, RetrievalCandidate, Stage};
use crate::RecallResult;

use super::history::{adjust_threshold, QueryHistory, QueryTypeStats};

/// Resultado de uma chamada a [`AdaptiveRetriever::retrieve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// Candidatos da etapa fina, melhor primeiro.
    pub candidates: Vec<RetrievalCandidate>,
    /// Threshold aplicado na etapa fina.
    pub threshold: f64,
    pub coarse_count: usize,
    pub fine_count: usize,
    /// Tempo da chamada (em milissegundos).
    pub elapsed_ms: f64,
}

/// Retriever em duas etapas (grossa e fina).
///
/// A etapa grossa pede `coarse_top_k` candidatos a um [`VectorIndex`]; a
/// etapa fina recalcula o score por cosseno exato e mantém os que ficam
/// acima do threshold. O threshold se adapta à quantidade de resultados de
/// cada tipo de consulta e à semelhança com as consultas recentes.
///
/// As chamadas ao encoder e ao índice acontecem fora do lock de estado.
pub struct AdaptiveRetriever {
    config: RetrieverConfig,
    encoder: Arc<dyn Encoder>,
    index: Arc<dyn VectorIndex>,
    history: Mutex<QueryHistory>,
}

impl AdaptiveRetriever {
    /// Cria um retriever. Falha se `coarse_top_k < fine_top_k`.
    pub fn new(
        encoder: Arc<dyn Encoder>,
        index: Arc<dyn VectorIndex>,
        config: RetrieverConfig,
    ) -> RecallResult<Self> {
        config.validate()?;

        Ok(Self {
            history: Mutex::new(QueryHistory::new(config.context_window_size)),
            config,
            encoder,
            index,
        })
    }

    /// Cria um retriever com as configurações padrão.
    pub fn with_defaults(
        encoder: Arc<dyn Encoder>,
        index: Arc<dyn VectorIndex>,
    ) -> RecallResult<Self> {
        Self::new(encoder, index, RetrieverConfig::default())
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Codifica uma consulta. Sem cache.
    pub async fn encode_query(&self, text: &str) -> RecallResult<Embedding> {
        call_with_timeout(
            self.encoder.name(),
            self.config.timeout(),
            self.encoder.encode(text),
        )
        .await
    }

    /// Threshold para `context`, sempre em [0.1, 0.9].
    pub fn get_adaptive_threshold(&self, context: &QueryContext) -> f64 {
        let history = self.history.lock();
        adjust_threshold(
            self.config.base_threshold,
            history.stats_for(context.type_key()),
            self.config.min_type_history,
            history.mean_similarity(&context.query_embedding),
        )
    }

    /// Pede candidatos ao índice. Usa `coarse_top_k` por padrão.
    pub async fn coarse_retrieval(
        &self,
        embedding: &[f64],
        top_k: Option<usize>,
    ) -> RecallResult<Vec<RetrievalCandidate>> {
        let top_k = top_k.unwrap_or(self.config.coarse_top_k);
        let mut candidates = call_with_timeout(
            self.index.name(),
            self.config.timeout(),
            self.index.query(embedding, top_k),
        )
        .await?;

        candidates.truncate(top_k);
        for candidate in &mut candidates {
            candidate.stage = Stage::Coarse;
        }

        tracing::debug!(
            index = self.index.name(),
            requested = top_k,
            returned = candidates.len(),
            "Coarse retrieval"
        );

        Ok(candidates)
    }

    /// Recalcula o score dos candidatos com cosseno exato.
    ///
    /// Candidatos sem vetor são codificados a partir do texto; os que não têm
    /// nenhum dos dois, cuja codificação falha ou cuja similaridade não é finita
    /// são descartados. Os que ficam em `threshold` ou acima são ordenados de
    /// forma decrescente e truncados em `top_k` (padrão `fine_top_k`).
    pub async fn fine_retrieval(
        &self,
        query_embedding: &[f64],
        coarse: Vec<RetrievalCandidate>,
        top_k: Option<usize>,
        threshold: f64,
    ) -> Vec<RetrievalCandidate> {
        let top_k = top_k.unwrap_or(self.config.fine_top_k);
        let mut fine = Vec::with_capacity(coarse.len());

        for mut candidate in coarse {
            let similarity = match (&candidate.embedding, &candidate.text) {
                (Some(vector), _) => cosine_similarity(query_embedding, vector),
                (None, Some(text)) => match self.encode_query(text).await {
                    Ok(vector) => cosine_similarity(query_embedding, &vector),
                    Err(e) => {
                        tracing::warn!(
                            content_ref = ?candidate.content_ref,
                            error = %e,
                            "Dropping candidate: re-encoding failed"
                        );
                        continue;
                    }
                },
                (None, None) => {
                    tracing::debug!(
                        content_ref = ?candidate.content_ref,
                        "Dropping candidate without vector or text"
                    );
                    continue;
                }
            };

            if !similarity.is_finite() || similarity < threshold {
                continue;
            }
            candidate.score = similarity;
            candidate.stage = Stage::Fine;
            fine.push(candidate);
        }

        fine.sort_by(|a, b| b.score.total_cmp(&a.score));
        fine.truncate(top_k);
        fine
    }

    /// Recuperação completa: codifica, calcula o threshold, etapas grossa e fina, e registra no histórico.
    pub async fn retrieve(
        &self,
        query_text: &str,
        query_type: Option<&str>,
        adaptive: bool,
    ) -> RecallResult<RetrievalOutcome> {
        self.retrieve_top_k(query_text, query_type, adaptive, self.config.fine_top_k)
            .await
    }

    async fn retrieve_top_k(
        &self,
        query_text: &str,
        query_type: Option<&str>,
        adaptive: bool,
        fine_top_k: usize,
    ) -> RecallResult<RetrievalOutcome> {
        let start = Instant::now();

        let embedding = self.encode_query(query_text).await?;
        let mut context = QueryContext::new(query_text, embedding);
        if let Some(query_type) = query_type {
            context = context.with_query_type(query_type);
        }

        let threshold = if adaptive {
            self.get_adaptive_threshold(&context)
        } else {
            self.config.base_threshold
        };

        let coarse_top_k = self.config.coarse_top_k.max(fine_top_k);
        let coarse = self
            .coarse_retrieval(&context.query_embedding, Some(coarse_top_k))
            .await?;
        let coarse_count = coarse.len();

        let candidates = self
            .fine_retrieval(&context.query_embedding, coarse, Some(fine_top_k), threshold)
            .await;
        let fine_count = candidates.len();

        {
            let mut history = self.history.lock();
            history.record_results(context.type_key(), fine_count);
            history.push(context);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            query_type = query_type.unwrap_or(crate::types::DEFAULT_QUERY_TYPE),
            threshold,
            coarse_count,
            fine_count,
            elapsed_ms,
            "Retrieval completed"
        );

        Ok(RetrievalOutcome {
            candidates,
            threshold,
            coarse_count,
            fine_count,
            elapsed_ms,
        })
    }

    /// Média dos embeddings das consultas lembradas.
    pub fn get_context_embeddings(&self) -> Option<Embedding> {
        self.history.lock().pooled_embedding()
    }

    /// Estatísticas por tipo registradas até agora.
    pub fn query_type_stats(&self) -> HashMap<String, QueryTypeStats> {
        self.history.lock().all_stats()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Esquece as consultas lembradas. As estatísticas por tipo são mantidas.
    pub fn reset_history(&self) {
        self.history.lock().clear();
    }
}

#[async_trait]
impl StudentRetriever for AdaptiveRetriever {
    fn name(&self) -> &str {
        "adaptive-retriever"
    }

    async fn retrieve(&self, query: &str, k: usize) -> RecallResult<Vec<RetrievalCandidate>> {
        self.retrieve_top_k(query, None, true, k)
            .await
            .map(|outcome| outcome.candidates)
    }
}
