//! Cálculo de importância dos padrões.
//!
//! O score é uma soma ponderada de quatro fatores, cada um em [0, 1]:
//!
//! | fator                           | peso   |
//! |---------------------------------|--------|
//! | magnitude do embedding (limite) | 0.3    |
//! | similaridade com a consulta     | 0.4    |
//! | frequência de acesso            | 0.2    |
//! | recência linear em 30 dias      | 0.1    |
//!
//! Fatores sem entrada não contribuem.

use chrono::{DateTime, Utc};

use crate::similarity::{cosine_similarity, l2_norm};
use crate::types::config::StoreConfig;

const MAGNITUDE_WEIGHT: f64 = 0.3;
const QUERY_WEIGHT: f64 = 0.4;
const ACCESS_WEIGHT: f64 = 0.2;
const RECENCY_WEIGHT: f64 = 0.1;
const RECENCY_WINDOW_DAYS: f64 = 30.0;

/// Entradas de um cálculo de importância.
#[derive(Debug, Clone, Copy)]
pub struct ImportanceInputs<'a> {
    pub embedding: &'a [f64],
    pub query_embedding: Option<&'a [f64]>,
    pub access_count: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Calcula scores de importância.
#[derive(Debug, Clone, Copy)]
pub struct ImportanceScorer {
    magnitude_scale: f64,
    access_saturation: u64,
}

impl ImportanceScorer {
    /// Cria um scorer com constantes de normalização explícitas.
    pub fn new(magnitude_scale: f64, access_saturation: u64) -> Self {
        Self {
            magnitude_scale,
            access_saturation: access_saturation.max(1),
        }
    }

    /// Cria um scorer a partir das configurações do armazenamento.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.magnitude_scale, config.access_saturation)
    }

    /// Calcula a importância de um padrão no instante `now`.
    pub fn score(&self, inputs: ImportanceInputs<'_>, now: DateTime<Utc>) -> f64 {
        let mut score = MAGNITUDE_WEIGHT * self.magnitude_factor(inputs.embedding);

        if let Some(query) = inputs.query_embedding {
            score += QUERY_WEIGHT * cosine_similarity(inputs.embedding, query).max(0.0);
        }

        if let Some(count) = inputs.access_count {
            score += ACCESS_WEIGHT * self.access_factor(count);
        }

        if let Some(created_at) = inputs.created_at {
            score += RECENCY_WEIGHT * recency_factor(created_at, now);
        }

        score.clamp(0.0, 1.0)
    }

    fn magnitude_factor(&self, embedding: &[f64]) -> f64 {
        (l2_norm(embedding) / self.magnitude_scale).min(1.0)
    }

    fn access_factor(&self, count: u64) -> f64 {
        (count as f64 / self.access_saturation as f64).min(1.0)
    }
}

impl Default for ImportanceScorer {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

/// 1.0 para recém-criado, 0.0 a partir de 30 dias. Datas futuras contam como novas.
fn recency_factor(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
    (1.0 - age_days / RECENCY_WINDOW_DAYS).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn inputs(embedding: &[f64]) -> ImportanceInputs<'_> {
        ImportanceInputs {
            embedding,
            query_embedding: None,
            access_count: None,
            created_at: None,
        }
    }

    #[test]
    fn test_magnitude_only() {
        let scorer = ImportanceScorer::new(10.0, 100);
        let now = Utc::now();

        // ‖(3,4)‖ = 5 → 0.5 × 0.3
        let score = scorer.score(inputs(&[3.0, 4.0]), now);
        assert!((score - 0.15).abs() < 1e-9);

        // Limitado a 1.0 × 0.3
        let score = scorer.score(inputs(&[30.0, 40.0]), now);
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_all_factors_saturated() {
        let scorer = ImportanceScorer::new(1.0, 10);
        let now = Utc::now();
        let e = [1.0, 0.0];

        let score = scorer.score(
            ImportanceInputs {
                embedding: &e,
                query_embedding: Some(&e),
                access_count: Some(50),
                created_at: Some(now),
            },
            now,
        );
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_query_similarity_contributes_nothing() {
        let scorer = ImportanceScorer::new(1.0, 10);
        let now = Utc::now();
        let e = [1.0, 0.0];
        let q = [-1.0, 0.0];

        let with_query = scorer.score(
            ImportanceInputs {
                query_embedding: Some(&q),
                ..inputs(&e)
            },
            now,
        );
        assert!((with_query - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_recency_decay() {
        let now = Utc::now();
        assert!((recency_factor(now, now) - 1.0).abs() < 1e-9);
        assert!((recency_factor(now - Duration::days(15), now) - 0.5).abs() < 1e-3);
        assert_eq!(recency_factor(now - Duration::days(45), now), 0.0);
        assert_eq!(recency_factor(now + Duration::days(1), now), 1.0);
    }
}
