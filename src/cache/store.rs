//! Armazenamento limitado de padrões com evicção configurável.

use async_trait::async_trait;
use chrono::Utc;
use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::collaborators::VectorIndex;
use crate::similarity::cosine_similarity;
use crate::types::config::{EvictionPolicy, StoreConfig};
use crate::types::{Embedding, MemoryPattern, PatternMetadata, RetrievalCandidate, Stage};
use crate::{RecallError, RecallResult};

use super::eviction::RankIndex;
use super::importance::{ImportanceInputs, ImportanceScorer};

/// Estatísticas do armazenamento.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Número atual de padrões.
    pub size: usize,

    /// Número máximo de padrões.
    pub capacity: usize,

    /// Padrões inseridos desde a criação (substituições incluídas).
    pub total_patterns_added: u64,

    /// Padrões removidos por evicção ou compactação.
    pub total_patterns_evicted: u64,

    /// Buscas com sucesso.
    pub total_accesses: u64,

    /// Buscas sem sucesso.
    pub misses: u64,
}

impl StoreStats {
    /// Taxa de buscas com sucesso.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses + self.misses;
        if total == 0 {
            0.0
        } else {
            self.total_accesses as f64 / total as f64
        }
    }
}

/// Um padrão com sua similaridade a uma consulta.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPattern {
    pub pattern: MemoryPattern,
    pub similarity: f64,
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub pattern: MemoryPattern,
    /// Sequência de inserção, usada para desempate determinístico.
    pub seq: u64,
}

#[derive(Debug)]
pub(crate) struct StoreInner {
    /// Arena ordenada por recência. Em LRU essa ordem define a evicção.
    pub entries: LruCache<String, Entry>,
    /// Ranks ordenados, mantidos só para LFU e importance.
    pub ranks: RankIndex,
    pub next_seq: u64,
    pub total_added: u64,
    pub total_evicted: u64,
    pub total_accesses: u64,
    pub misses: u64,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            ranks: RankIndex::new(),
            next_seq: 0,
            total_added: 0,
            total_evicted: 0,
            total_accesses: 0,
            misses: 0,
        }
    }

    /// Insere um padrão já pontuado como a entrada mais recente.
    pub(crate) fn push(&mut self, policy: EvictionPolicy, pattern: MemoryPattern) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(rank) = rank_of(policy, &pattern) {
            self.ranks.insert(rank, seq, &pattern.id);
        }
        self.entries.put(pattern.id.clone(), Entry { pattern, seq });
    }

    fn take(&mut self, policy: EvictionPolicy, id: &str) -> Option<Entry> {
        let entry = self.entries.pop(id)?;
        if let Some(rank) = rank_of(policy, &entry.pattern) {
            self.ranks.remove(rank, entry.seq, id);
        }
        Some(entry)
    }

    /// Remove uma entrada conforme a política. Não faz nada se estiver vazio.
    fn evict_one(&mut self, policy: EvictionPolicy) -> Option<MemoryPattern> {
        let victim = match policy {
            EvictionPolicy::Lru => self.entries.pop_lru().map(|(_, entry)| entry),
            EvictionPolicy::Lfu | EvictionPolicy::Importance => {
                let id = self.ranks.min()?.to_string();
                self.take(policy, &id)
            }
        }?;

        self.total_evicted += 1;
        tracing::info!(
            pattern_id = %victim.pattern.id,
            policy = %policy,
            access_count = victim.pattern.access_count,
            importance = victim.pattern.importance_score,
            "Pattern evicted"
        );
        Some(victim.pattern)
    }

    /// Entradas em ordem de inserção.
    pub(crate) fn in_insertion_order(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.iter().map(|(_, e)| e).collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }
}

/// Rank de evicção das políticas com índice. LRU não tem rank.
fn rank_of(policy: EvictionPolicy, pattern: &MemoryPattern) -> Option<f64> {
    match policy {
        EvictionPolicy::Lru => None,
        EvictionPolicy::Lfu => Some(pattern.access_count as f64),
        EvictionPolicy::Importance => Some(pattern.importance_score),
    }
}

/// Cache limitado de [`MemoryPattern`]s.
///
/// Toda mutação (incluindo `get_pattern`, que atualiza as estatísticas de acesso)
/// roda sob o lock exclusivo; `search_similar` usa apenas o lock
/// compartilhado. A política de evicção não muda durante a vida do armazenamento.
pub struct PatternStore {
    config: StoreConfig,
    dimension: usize,
    scorer: ImportanceScorer,
    pub(crate) inner: RwLock<StoreInner>,
}

impl PatternStore {
    /// Cria um armazenamento vazio para embeddings de dimensão `dimension`.
    pub fn new(dimension: usize, config: StoreConfig) -> RecallResult<Self> {
        if dimension == 0 {
            return Err(RecallError::config("embedding dimension must be at least 1"));
        }
        config.validate()?;

        Ok(Self {
            scorer: ImportanceScorer::from_config(&config),
            config,
            dimension,
            inner: RwLock::new(StoreInner::new()),
        })
    }

    /// Cria um armazenamento com as configurações padrão.
    pub fn with_defaults(dimension: usize) -> RecallResult<Self> {
        Self::new(dimension, StoreConfig::default())
    }

    /// Configurações do armazenamento.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Dimensão de embedding aceita.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Política de evicção.
    pub fn policy(&self) -> EvictionPolicy {
        self.config.eviction_policy
    }

    /// Número máximo de padrões.
    pub fn capacity(&self) -> usize {
        self.config.buffer_size
    }

    /// Verifica se um embedding pode ser armazenado.
    pub fn validate_embedding(&self, embedding: &[f64]) -> RecallResult<()> {
        if embedding.len() != self.dimension {
            return Err(RecallError::validation(format!(
                "embedding has dimension {}, expected {}",
                embedding.len(),
                self.dimension
            )));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(RecallError::validation(
                "embedding contains non-finite values",
            ));
        }
        Ok(())
    }

    /// Adiciona um padrão. Retorna `false` se o embedding for rejeitado.
    pub fn add_pattern(
        &self,
        id: impl Into<String>,
        embedding: Embedding,
        metadata: PatternMetadata,
    ) -> bool {
        self.report_add(self.try_add_pattern(id, embedding, metadata, None))
    }

    /// Adiciona um padrão pontuado contra a consulta que o gerou.
    pub fn add_pattern_for_query(
        &self,
        id: impl Into<String>,
        embedding: Embedding,
        metadata: PatternMetadata,
        query_embedding: &[f64],
    ) -> bool {
        self.report_add(self.try_add_pattern(id, embedding, metadata, Some(query_embedding)))
    }

    fn report_add(&self, result: RecallResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Pattern rejected");
                false
            }
        }
    }

    /// Adiciona um padrão, retornando os erros de validação.
    ///
    /// Um id novo com o armazenamento cheio remove exatamente uma entrada antes.
    /// Um id existente é substituído no lugar, sem evicção.
    pub fn try_add_pattern(
        &self,
        id: impl Into<String>,
        embedding: Embedding,
        metadata: PatternMetadata,
        query_embedding: Option<&[f64]>,
    ) -> RecallResult<()> {
        let id = id.into();
        self.validate_embedding(&embedding)?;
        if self.config.buffer_size == 0 {
            return Err(RecallError::validation("store has zero capacity"));
        }

        let now = Utc::now();
        let mut pattern = MemoryPattern::new(id, embedding, metadata);
        pattern.importance_score = self.scorer.score(
            ImportanceInputs {
                embedding: &pattern.embedding,
                query_embedding,
                access_count: pattern.metadata.access_count,
                created_at: pattern.metadata.created_at,
            },
            now,
        );

        let policy = self.policy();
        let mut inner = self.inner.write();

        if inner.take(policy, &pattern.id).is_some() {
            tracing::debug!(pattern_id = %pattern.id, "Replacing existing pattern");
        } else if inner.entries.len() >= self.config.buffer_size {
            inner.evict_one(policy);
        }

        tracing::debug!(
            pattern_id = %pattern.id,
            importance = pattern.importance_score,
            "Pattern added"
        );
        inner.push(policy, pattern);
        inner.total_added += 1;

        Ok(())
    }

    /// Busca um padrão, atualizando suas estatísticas de acesso.
    ///
    /// Um acerto incrementa `access_count`, atualiza `last_accessed`, recalcula
    /// a importância e, em LRU, marca a entrada como a mais recente.
    pub fn get_pattern(&self, id: &str) -> Option<MemoryPattern> {
        let policy = self.policy();
        let now = Utc::now();
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let entry = match policy {
            EvictionPolicy::Lru => inner.entries.get_mut(id),
            _ => inner.entries.peek_mut(id),
        };
        let Some(entry) = entry else {
            inner.misses += 1;
            tracing::debug!(pattern_id = id, "Pattern miss");
            return None;
        };

        let old_rank = rank_of(policy, &entry.pattern);
        let pattern = &mut entry.pattern;
        pattern.access_count += 1;
        pattern.last_accessed = now;
        pattern.importance_score = self.scorer.score(
            ImportanceInputs {
                embedding: &pattern.embedding,
                query_embedding: None,
                access_count: Some(pattern.access_count),
                created_at: Some(pattern.metadata.created_at.unwrap_or(pattern.created_at)),
            },
            now,
        );

        if let (Some(old), Some(new)) = (old_rank, rank_of(policy, pattern)) {
            inner.ranks.update(old, new, entry.seq, id);
        }
        inner.total_accesses += 1;

        Some(entry.pattern.clone())
    }

    /// Retorna um padrão sem alterar suas estatísticas.
    pub fn peek_pattern(&self, id: &str) -> Option<MemoryPattern> {
        self.inner.read().entries.peek(id).map(|e| e.pattern.clone())
    }

    /// Busca exata por cosseno em todo o armazenamento.
    ///
    /// É uma varredura linear: O(n) por chamada. Os resultados são filtrados por
    /// `threshold` (inclusivo) quando informado, ordenados por similaridade decrescente
    /// (empates pela ordem de inserção) e truncados em `top_k`.
    pub fn search_similar(
        &self,
        query_embedding: &[f64],
        top_k: usize,
        threshold: Option<f64>,
    ) -> Vec<ScoredPattern> {
        let inner = self.inner.read();

        let mut scored: Vec<(f64, u64, &MemoryPattern)> = inner
            .entries
            .iter()
            .map(|(_, e)| {
                (
                    cosine_similarity(query_embedding, &e.pattern.embedding),
                    e.seq,
                    &e.pattern,
                )
            })
            .filter(|(sim, _, _)| threshold.map_or(true, |t| *sim >= t))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(similarity, _, pattern)| ScoredPattern {
                pattern: pattern.clone(),
                similarity,
            })
            .collect()
    }

    /// Compactação.
    ///
    /// Mantém os `floor(len × retention_ratio)` padrões mais importantes
    /// (em empate vence o inserido primeiro) e remove o resto de uma vez.
    /// Retorna os ids mantidos, do mais importante ao menos.
    pub fn retain_important_patterns(&self) -> Vec<String> {
        let policy = self.policy();
        let mut inner = self.inner.write();

        let total = inner.entries.len();
        let keep = ((total as f64) * self.config.retention_ratio).floor() as usize;

        let mut ranked: Vec<(f64, u64, String)> = inner
            .entries
            .iter()
            .map(|(id, e)| (e.pattern.importance_score, e.seq, id.clone()))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let evicted = ranked.split_off(keep.min(total));
        for (_, _, id) in &evicted {
            inner.take(policy, id);
        }
        inner.total_evicted += evicted.len() as u64;

        if !evicted.is_empty() {
            tracing::info!(
                retained = ranked.len(),
                evicted = evicted.len(),
                retention_ratio = self.config.retention_ratio,
                "Compaction sweep completed"
            );
        }

        ranked.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Sobrescreve a importância de um padrão (limitada a [0, 1]).
    ///
    /// Retorna `false` se o id não existir.
    pub fn set_importance(&self, id: &str, importance: f64) -> bool {
        let policy = self.policy();
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let Some(entry) = inner.entries.peek_mut(id) else {
            return false;
        };

        let old_rank = rank_of(policy, &entry.pattern);
        entry.pattern.importance_score = importance.clamp(0.0, 1.0);
        if let (Some(old), Some(new)) = (old_rank, rank_of(policy, &entry.pattern)) {
            inner.ranks.update(old, new, entry.seq, id);
        }
        true
    }

    /// Ids com importância a partir de `importance_threshold`, do mais importante ao menos.
    pub fn important_patterns(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut important: Vec<(f64, u64, &String)> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.pattern.importance_score >= self.config.importance_threshold)
            .map(|(id, e)| (e.pattern.importance_score, e.seq, id))
            .collect();
        important.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        important.into_iter().map(|(_, _, id)| id.clone()).collect()
    }

    /// Remove um padrão. Não conta como evicção.
    pub fn remove_pattern(&self, id: &str) -> Option<MemoryPattern> {
        let policy = self.policy();
        self.inner.write().take(policy, id).map(|e| e.pattern)
    }

    /// Remove todos os padrões. As estatísticas são mantidas.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.ranks.clear();
    }

    /// Se um padrão existe (não conta como acesso).
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().entries.contains(id)
    }

    /// Número de padrões.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Se o armazenamento está vazio.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids na ordem relevante para evicção: do menos recente ao mais recente em LRU,
    /// ordem de inserção nas outras políticas.
    pub fn ids(&self) -> Vec<String> {
        let inner = self.inner.read();
        match self.policy() {
            EvictionPolicy::Lru => inner.entries.iter().rev().map(|(id, _)| id.clone()).collect(),
            _ => inner
                .in_insertion_order()
                .into_iter()
                .map(|e| e.pattern.id.clone())
                .collect(),
        }
    }

    /// Cópias de todos os padrões, na ordem de [`PatternStore::ids`].
    pub fn patterns(&self) -> Vec<MemoryPattern> {
        let inner = self.inner.read();
        match self.policy() {
            EvictionPolicy::Lru => inner
                .entries
                .iter()
                .rev()
                .map(|(_, e)| e.pattern.clone())
                .collect(),
            _ => inner
                .in_insertion_order()
                .into_iter()
                .map(|e| e.pattern.clone())
                .collect(),
        }
    }

    /// Estatísticas atuais.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        debug_assert!(
            self.policy() == EvictionPolicy::Lru || inner.ranks.len() == inner.entries.len()
        );
        StoreStats {
            size: inner.entries.len(),
            capacity: self.config.buffer_size,
            total_patterns_added: inner.total_added,
            total_patterns_evicted: inner.total_evicted,
            total_accesses: inner.total_accesses,
            misses: inner.misses,
        }
    }
}

#[async_trait]
impl VectorIndex for PatternStore {
    fn name(&self) -> &str {
        "pattern-store"
    }

    async fn query(
        &self,
        embedding: &[f64],
        top_k: usize,
    ) -> RecallResult<Vec<RetrievalCandidate>> {
        Ok(self
            .search_similar(embedding, top_k, None)
            .into_iter()
            .map(|scored| {
                let pattern = scored.pattern;
                let mut candidate = RetrievalCandidate::new(scored.similarity)
                    .with_ref(pattern.id)
                    .with_embedding(pattern.embedding)
                    .with_metadata("importance", serde_json::json!(pattern.importance_score))
                    .at_stage(Stage::Coarse);
                candidate.text = pattern.metadata.text;
                if let Some(query_type) = pattern.metadata.query_type {
                    candidate
                        .metadata
                        .insert("query_type".to_string(), serde_json::json!(query_type));
                }
                candidate
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize, policy: EvictionPolicy) -> PatternStore {
        PatternStore::new(2, StoreConfig::new(capacity, policy)).unwrap()
    }

    fn add(store: &PatternStore, id: &str) {
        assert!(store.add_pattern(id, vec![1.0, 0.0], PatternMetadata::new()));
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let store = store(3, EvictionPolicy::Lru);
        assert!(!store.add_pattern("a", vec![1.0, 0.0, 0.0], PatternMetadata::new()));
        assert!(!store.add_pattern("b", vec![], PatternMetadata::new()));
        assert!(!store.add_pattern("c", vec![f64::NAN, 0.0], PatternMetadata::new()));
        assert!(store.is_empty());

        let err = store
            .try_add_pattern("a", vec![1.0], PatternMetadata::new(), None)
            .unwrap_err();
        assert!(matches!(err, RecallError::Validation(_)));
    }

    #[test]
    fn test_zero_dimension_store_is_rejected() {
        assert!(PatternStore::new(0, StoreConfig::default()).is_err());
    }

    #[test]
    fn test_zero_capacity_store_holds_nothing() {
        let store = store(0, EvictionPolicy::Lru);
        assert!(!store.add_pattern("a", vec![1.0, 0.0], PatternMetadata::new()));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_lru_eviction_after_access() {
        let store = store(3, EvictionPolicy::Lru);
        add(&store, "A");
        add(&store, "B");
        add(&store, "C");

        assert!(store.get_pattern("A").is_some());
        add(&store, "D");

        assert!(!store.contains("B"));
        assert_eq!(store.ids(), vec!["C", "A", "D"]);
        assert_eq!(store.stats().total_patterns_evicted, 1);
    }

    #[test]
    fn test_lru_never_accessed_evicts_in_insertion_order() {
        let store = store(2, EvictionPolicy::Lru);
        add(&store, "A");
        add(&store, "B");
        add(&store, "C");

        assert_eq!(store.ids(), vec!["B", "C"]);
    }

    #[test]
    fn test_lfu_evicts_least_accessed() {
        let store = store(3, EvictionPolicy::Lfu);
        for (id, count) in [("A", 5), ("B", 1), ("C", 3)] {
            store.add_pattern(
                id,
                vec![1.0, 0.0],
                PatternMetadata::new().with_access_count(count),
            );
        }

        add(&store, "D");

        assert!(!store.contains("B"));
        assert!(store.contains("A") && store.contains("C") && store.contains("D"));
    }

    #[test]
    fn test_lfu_tracks_lookups() {
        let store = store(2, EvictionPolicy::Lfu);
        add(&store, "A");
        add(&store, "B");
        store.get_pattern("A");
        store.get_pattern("A");
        store.get_pattern("B");

        add(&store, "C");
        assert!(!store.contains("B"));
    }

    #[test]
    fn test_lfu_tie_breaks_on_insertion_order() {
        let store = store(3, EvictionPolicy::Lfu);
        add(&store, "A");
        add(&store, "B");
        add(&store, "C");

        add(&store, "D");
        assert!(!store.contains("A"));
    }

    #[test]
    fn test_importance_evicts_lowest() {
        let store = store(2, EvictionPolicy::Importance);
        add(&store, "A");
        add(&store, "B");
        store.set_importance("A", 0.9);
        store.set_importance("B", 0.2);

        add(&store, "C");

        assert!(store.contains("A"));
        assert!(!store.contains("B"));
        assert!(store.contains("C"));
    }

    #[test]
    fn test_replacing_existing_id_does_not_evict() {
        let store = store(2, EvictionPolicy::Importance);
        add(&store, "A");
        add(&store, "B");
        assert!(store.add_pattern("A", vec![0.0, 1.0], PatternMetadata::new()));

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().total_patterns_evicted, 0);
        assert_eq!(store.peek_pattern("A").unwrap().embedding, vec![0.0, 1.0]);
    }

    #[test]
    fn test_get_pattern_updates_statistics() {
        let store = store(3, EvictionPolicy::Importance);
        add(&store, "A");
        let before = store.peek_pattern("A").unwrap();

        let after = store.get_pattern("A").unwrap();
        assert_eq!(after.access_count, 1);
        assert!(after.last_accessed >= before.last_accessed);
        // Agora frequência de acesso e recência contribuem.
        assert!(after.importance_score > before.importance_score);

        assert!(store.get_pattern("missing").is_none());
        let stats = store.stats();
        assert_eq!(stats.total_accesses, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_query_similarity_raises_importance() {
        let store = store(3, EvictionPolicy::Importance);
        store.add_pattern("plain", vec![1.0, 0.0], PatternMetadata::new());
        store.add_pattern_for_query("relevant", vec![1.0, 0.0], PatternMetadata::new(), &[1.0, 0.0]);

        let plain = store.peek_pattern("plain").unwrap().importance_score;
        let relevant = store.peek_pattern("relevant").unwrap().importance_score;
        assert!((relevant - plain - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_search_similar_threshold_and_order() {
        let store = store(10, EvictionPolicy::Lru);
        store.add_pattern("x", vec![1.0, 0.0], PatternMetadata::new());
        store.add_pattern("xy", vec![1.0, 1.0], PatternMetadata::new());
        store.add_pattern("y", vec![0.0, 1.0], PatternMetadata::new());
        store.add_pattern("neg", vec![-1.0, 0.0], PatternMetadata::new());

        let results = store.search_similar(&[1.0, 0.0], 10, Some(0.5));
        let ids: Vec<_> = results.iter().map(|r| r.pattern.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "xy"]);
        assert!(results.iter().all(|r| r.similarity >= 0.5));

        let top1 = store.search_similar(&[1.0, 0.0], 1, None);
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].pattern.id, "x");
    }

    #[test]
    fn test_search_does_not_touch_access_stats() {
        let store = store(3, EvictionPolicy::Lru);
        add(&store, "A");
        store.search_similar(&[1.0, 0.0], 3, None);
        assert_eq!(store.peek_pattern("A").unwrap().access_count, 0);
        assert_eq!(store.stats().total_accesses, 0);
    }

    #[test]
    fn test_retain_important_patterns() {
        let store = store(10, EvictionPolicy::Lru);
        let config = store.config().clone();
        assert_eq!(config.retention_ratio, 0.8);

        for (i, importance) in [0.1, 0.9, 0.5, 0.7, 0.3].iter().enumerate() {
            let id = format!("p{}", i);
            add(&store, &id);
            store.set_importance(&id, *importance);
        }

        let retained = store.retain_important_patterns();
        assert_eq!(retained, vec!["p1", "p3", "p2", "p4"]);
        assert_eq!(store.len(), 4);
        assert!(!store.contains("p0"));
        assert_eq!(store.stats().total_patterns_evicted, 1);
    }

    #[test]
    fn test_retain_on_empty_store_is_noop() {
        let store = store(3, EvictionPolicy::Importance);
        assert!(store.retain_important_patterns().is_empty());
        assert_eq!(store.stats().total_patterns_evicted, 0);
    }

    #[test]
    fn test_important_patterns() {
        let store = store(5, EvictionPolicy::Importance);
        add(&store, "low");
        add(&store, "high");
        store.set_importance("low", 0.1);
        store.set_importance("high", 2.0);

        assert_eq!(store.important_patterns(), vec!["high"]);
        assert_eq!(store.peek_pattern("high").unwrap().importance_score, 1.0);
        assert!(!store.set_importance("missing", 0.5));
    }

    #[test]
    fn test_remove_and_clear() {
        let store = store(5, EvictionPolicy::Lfu);
        add(&store, "A");
        add(&store, "B");

        assert!(store.remove_pattern("A").is_some());
        assert!(store.remove_pattern("A").is_none());
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.stats().total_patterns_added, 2);
    }

    #[tokio::test]
    async fn test_store_as_vector_index() {
        let store = store(5, EvictionPolicy::Lru);
        store.add_pattern(
            "doc",
            vec![1.0, 0.0],
            PatternMetadata::new().with_text("rust ownership"),
        );

        let hits = store.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content_ref.as_deref(), Some("doc"));
        assert_eq!(hits[0].text.as_deref(), Some("rust ownership"));
        assert_eq!(hits[0].stage, Stage::Coarse);
        assert!(hits[0].embedding.is_some());
    }
}
