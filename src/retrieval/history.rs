//! Histórico de consultas recentes e estatísticas por tipo para o aprendizado do threshold.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::similarity::{cosine_similarity, mean_pool};
use crate::types::{Embedding, QueryContext};

/// Menor threshold usado pelo retriever.
pub const MIN_THRESHOLD: f64 = 0.1;
/// Maior threshold usado pelo retriever.
pub const MAX_THRESHOLD: f64 = 0.9;

const PERMISSIVE_FACTOR: f64 = 0.9;
const STRICT_FACTOR: f64 = 1.1;
const FEW_RESULTS: f64 = 3.0;
const MANY_RESULTS: f64 = 10.0;
const SIMILAR_CONTEXT: f64 = 0.7;
const DISSIMILAR_CONTEXT: f64 = 0.3;

/// Estatísticas acumuladas de um tipo de consulta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTypeStats {
    /// Consultas vistas.
    pub count: u64,
    /// Média acumulada de resultados retornados.
    pub avg_results: f64,
}

impl QueryTypeStats {
    /// Incorpora mais uma contagem de resultados na média.
    pub fn record(&mut self, results: usize) {
        self.count += 1;
        self.avg_results += (results as f64 - self.avg_results) / self.count as f64;
    }
}

/// Aplica os ajustes aprendidos e de contexto a `base` e limita o resultado.
///
/// - Com pelo menos `min_history` consultas do tipo, poucos resultados em média
///   afrouxam o threshold e muitos o apertam.
/// - Um histórico parecido com a consulta afrouxa; um histórico sem relação
///   aperta.
pub fn adjust_threshold(
    base: f64,
    type_stats: Option<&QueryTypeStats>,
    min_history: u64,
    history_similarity: Option<f64>,
) -> f64 {
    let mut threshold = base;

    if let Some(stats) = type_stats.filter(|s| s.count >= min_history) {
        if stats.avg_results < FEW_RESULTS {
            threshold *= PERMISSIVE_FACTOR;
        } else if stats.avg_results > MANY_RESULTS {
            threshold *= STRICT_FACTOR;
        }
    }

    if let Some(similarity) = history_similarity {
        if similarity > SIMILAR_CONTEXT {
            threshold *= PERMISSIVE_FACTOR;
        } else if similarity < DISSIMILAR_CONTEXT {
            threshold *= STRICT_FACTOR;
        }
    }

    if threshold.is_nan() {
        return MIN_THRESHOLD;
    }
    threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD)
}

/// Anel limitado de contextos recentes mais estatísticas por tipo.
#[derive(Debug)]
pub(crate) struct QueryHistory {
    window: usize,
    contexts: VecDeque<QueryContext>,
    type_stats: HashMap<String, QueryTypeStats>,
}

impl QueryHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            contexts: VecDeque::with_capacity(window),
            type_stats: HashMap::new(),
        }
    }

    /// Adiciona um contexto, descartando o mais antigo quando o anel está cheio.
    pub fn push(&mut self, context: QueryContext) {
        if self.window == 0 {
            return;
        }
        while self.contexts.len() >= self.window {
            self.contexts.pop_front();
        }
        self.contexts.push_back(context);
    }

    pub fn record_results(&mut self, query_type: &str, results: usize) {
        self.type_stats
            .entry(query_type.to_string())
            .or_default()
            .record(results);
    }

    pub fn stats_for(&self, query_type: &str) -> Option<&QueryTypeStats> {
        self.type_stats.get(query_type)
    }

    pub fn all_stats(&self) -> HashMap<String, QueryTypeStats> {
        self.type_stats.clone()
    }

    /// Cosseno médio entre `embedding` e cada consulta lembrada.
    pub fn mean_similarity(&self, embedding: &[f64]) -> Option<f64> {
        if self.contexts.is_empty() {
            return None;
        }
        let total: f64 = self
            .contexts
            .iter()
            .map(|c| cosine_similarity(embedding, &c.query_embedding))
            .sum();
        Some(total / self.contexts.len() as f64)
    }

    pub fn pooled_embedding(&self) -> Option<Embedding> {
        mean_pool(self.contexts.iter().map(|c| c.query_embedding.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[cfg(test)]
    pub fn contexts(&self) -> impl Iterator<Item = &QueryContext> {
        self.contexts.iter()
    }

    pub fn clear(&mut self) {
        self.contexts.clear();
    }
}
