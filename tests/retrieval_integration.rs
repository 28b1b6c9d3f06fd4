//! Testes de integração para o retriever adaptativo sobre o armazenamento de padrões.

use std::sync::Arc;

use async_trait::async_trait;

use recall::collaborators::{Encoder, StudentRetriever};
use recall::retrieval::{MAX_THRESHOLD, MIN_THRESHOLD};
use recall::types::config::{EvictionPolicy, RetrieverConfig, StoreConfig};
use recall::types::{Embedding, PatternMetadata, QueryContext, Stage};
use recall::{AdaptiveRetriever, PatternStore, RecallError, RecallResult};

const DIM: usize = 8;

/// Encoder bag-of-words: cada palavra incrementa um bucket.
struct HashingEncoder;

impl HashingEncoder {
    fn embed(text: &str) -> Embedding {
        let mut v = vec![0.0; DIM];
        for word in text.split_whitespace() {
            let bucket = word
                .bytes()
                .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % DIM] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Encoder for HashingEncoder {
    fn name(&self) -> &str {
        "hashing-encoder"
    }

    async fn encode(&self, text: &str) -> RecallResult<Embedding> {
        if text.is_empty() {
            return Err(RecallError::collaborator("hashing-encoder", "empty text"));
        }
        Ok(Self::embed(text))
    }
}

const CORPUS: &[&str] = &[
    "rust ownership borrowing",
    "rust lifetimes borrowing",
    "python garbage collector",
    "tokio async runtime",
    "serde json serialization",
    "lru cache eviction",
    "btree ordered map",
    "cosine similarity vectors",
];

fn indexed_store() -> Arc<PatternStore> {
    let store =
        Arc::new(PatternStore::new(DIM, StoreConfig::new(100, EvictionPolicy::Lru)).unwrap());
    for (i, text) in CORPUS.iter().enumerate() {
        store.add_pattern(
            format!("doc-{}", i),
            HashingEncoder::embed(text),
            PatternMetadata::new().with_text(*text),
        );
    }
    store
}

fn retriever(store: Arc<PatternStore>, config: RetrieverConfig) -> AdaptiveRetriever {
    AdaptiveRetriever::new(Arc::new(HashingEncoder), store, config).unwrap()
}

// Testes da recuperação completa em duas etapas
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_exact_text_ranks_first() {
        let r = retriever(indexed_store(), RetrieverConfig::default());

        let outcome = r.retrieve("tokio async runtime", None, false).await.unwrap();

        assert_eq!(outcome.coarse_count, CORPUS.len());
        assert!(outcome.fine_count >= 1);
        let top = &outcome.candidates[0];
        assert_eq!(top.content_ref.as_deref(), Some("doc-3"));
        assert!((top.score - 1.0).abs() < 1e-9);
        assert_eq!(top.stage, Stage::Fine);
        assert!(outcome.candidates.iter().all(|c| c.score >= outcome.threshold));
        assert!(outcome
            .candidates
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
        assert!(outcome.elapsed_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_fine_top_k_limits_results() {
        let config = RetrieverConfig {
            base_threshold: 0.0,
            fine_top_k: 2,
            ..RetrieverConfig::default()
        };
        let r = retriever(indexed_store(), config);

        let outcome = r.retrieve("rust borrowing", None, false).await.unwrap();
        assert_eq!(outcome.fine_count, 2);
    }

    #[tokio::test]
    async fn test_retrieval_does_not_count_as_store_access() {
        let store = indexed_store();
        let r = retriever(Arc::clone(&store), RetrieverConfig::default());

        r.retrieve("rust ownership borrowing", None, true).await.unwrap();
        assert_eq!(store.stats().total_accesses, 0);
    }
}

// Testes do aprendizado do threshold
mod threshold_tests {
    use super::*;

    #[tokio::test]
    async fn test_threshold_stays_in_bounds() {
        let r = retriever(indexed_store(), RetrieverConfig::default());
        let queries = ["rust", "tokio async", "zzz qqq", "cache", "rust rust rust", "json"];

        for round in 0..5 {
            for (i, query) in queries.iter().enumerate() {
                let query_type = if (round + i) % 2 == 0 { Some("factual") } else { None };
                let outcome = r.retrieve(query, query_type, true).await.unwrap();
                assert!(
                    (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&outcome.threshold),
                    "threshold {} out of bounds",
                    outcome.threshold
                );
            }
        }
    }

    #[tokio::test]
    async fn test_sparse_query_type_loosens_threshold() {
        let config = RetrieverConfig {
            context_window_size: 0,
            ..RetrieverConfig::default()
        };
        let r = retriever(indexed_store(), config);

        // Uma consulta sem relação não encontra nada, dez vezes.
        for _ in 0..10 {
            let outcome = r.retrieve("quantum sunset", Some("rare"), true).await.unwrap();
            assert_eq!(outcome.threshold, 0.5);
            assert_eq!(outcome.fine_count, 0);
        }

        let stats = r.query_type_stats();
        assert_eq!(stats["rare"].count, 10);
        assert_eq!(stats["rare"].avg_results, 0.0);

        let context = QueryContext::new("x", HashingEncoder::embed("x")).with_query_type("rare");
        assert!((r.get_adaptive_threshold(&context) - 0.45).abs() < 1e-9);

        // Os outros tipos não são afetados.
        let context = QueryContext::new("x", HashingEncoder::embed("x"));
        assert_eq!(r.get_adaptive_threshold(&context), 0.5);
    }

    #[tokio::test]
    async fn test_context_embeddings_follow_history() {
        let config = RetrieverConfig {
            context_window_size: 2,
            ..RetrieverConfig::default()
        };
        let r = retriever(indexed_store(), config);
        assert!(r.get_context_embeddings().is_none());

        r.retrieve("rust", None, true).await.unwrap();
        r.retrieve("tokio", None, true).await.unwrap();
        r.retrieve("json", None, true).await.unwrap();

        let expected: Vec<f64> = HashingEncoder::embed("tokio")
            .iter()
            .zip(HashingEncoder::embed("json"))
            .map(|(a, b)| (a + b) / 2.0)
            .collect();
        assert_eq!(r.get_context_embeddings().unwrap(), expected);
        assert_eq!(r.history_len(), 2);
    }
}

// Testes de chamadas concorrentes
mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_retrievals_keep_history_consistent() {
        let config = RetrieverConfig {
            context_window_size: 3,
            ..RetrieverConfig::default()
        };
        let r = Arc::new(retriever(indexed_store(), config));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let r = Arc::clone(&r);
                tokio::spawn(async move {
                    for i in 0..10 {
                        let query_type = if t % 2 == 0 { Some("factual") } else { None };
                        let query = CORPUS[(t + i) % CORPUS.len()];
                        r.retrieve(query, query_type, true).await.unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = r.query_type_stats();
        let total: u64 = stats.values().map(|s| s.count).sum();
        assert_eq!(total, 80);
        assert_eq!(stats["factual"].count, 40);
        assert_eq!(stats["general"].count, 40);
        assert!(r.history_len() <= 3);
    }
}

// Testes do retriever como student da cascata
mod student_tests {
    use super::*;

    #[tokio::test]
    async fn test_student_interface_respects_k() {
        let config = RetrieverConfig {
            base_threshold: 0.0,
            coarse_top_k: 4,
            fine_top_k: 2,
            ..RetrieverConfig::default()
        };
        let r = retriever(indexed_store(), config);

        let results = StudentRetriever::retrieve(&r, "rust borrowing", 6).await.unwrap();
        assert!(results.len() <= 6);
        assert!(results.len() > 2);
    }

    #[tokio::test]
    async fn test_encoder_errors_propagate() {
        let r = retriever(indexed_store(), RetrieverConfig::default());
        let err = StudentRetriever::retrieve(&r, "", 5).await.unwrap_err();
        assert!(matches!(err, RecallError::Collaborator { .. }));
    }
}
