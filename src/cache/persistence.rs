//! Salvamento e carga em JSON do armazenamento de padrões.
//!
//! O arquivo traz o buffer completo, as estatísticas agregadas e a
//! configuração. A carga é estrita: campo ausente ou com tipo errado,
//! dimensão errada ou score fora do intervalo fazem a carga falhar.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::config::{EvictionPolicy, StoreConfig};
use crate::types::MemoryPattern;
use crate::{RecallError, RecallResult};

use super::store::PatternStore;

/// Seção de estatísticas agregadas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedStats {
    /// Número de padrões no arquivo.
    pub buffer_size: u64,
    pub total_patterns_added: u64,
    pub total_patterns_evicted: u64,
    pub total_accesses: u64,
}

/// Seção de configuração.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfig {
    pub buffer_size: u64,
    pub importance_threshold: f64,
    pub eviction_policy: EvictionPolicy,
    pub retention_ratio: f64,
}

/// Formato em disco de um armazenamento salvo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub patterns: Vec<MemoryPattern>,
    pub stats: PersistedStats,
    pub config: PersistedConfig,
}

impl StoreSnapshot {
    /// Verifica os invariantes que um snapshot carregado deve cumprir.
    pub fn validate(&self, dimension: usize) -> RecallResult<()> {
        let config = &self.config;
        if !(0.0..=1.0).contains(&config.retention_ratio) {
            return Err(RecallError::validation(format!(
                "config.retention_ratio out of range: {}",
                config.retention_ratio
            )));
        }
        if !(0.0..=1.0).contains(&config.importance_threshold) {
            return Err(RecallError::validation(format!(
                "config.importance_threshold out of range: {}",
                config.importance_threshold
            )));
        }
        if self.patterns.len() as u64 > config.buffer_size {
            return Err(RecallError::validation(format!(
                "{} patterns exceed buffer_size {}",
                self.patterns.len(),
                config.buffer_size
            )));
        }
        if self.stats.buffer_size != self.patterns.len() as u64 {
            return Err(RecallError::validation(format!(
                "stats.buffer_size is {} but {} patterns are present",
                self.stats.buffer_size,
                self.patterns.len()
            )));
        }

        let mut seen = HashSet::new();
        for pattern in &self.patterns {
            if !seen.insert(pattern.id.as_str()) {
                return Err(RecallError::validation(format!(
                    "duplicate pattern id '{}'",
                    pattern.id
                )));
            }
            if pattern.embedding.len() != dimension {
                return Err(RecallError::validation(format!(
                    "pattern '{}' has dimension {}, expected {}",
                    pattern.id,
                    pattern.embedding.len(),
                    dimension
                )));
            }
            if pattern.embedding.iter().any(|x| !x.is_finite()) {
                return Err(RecallError::validation(format!(
                    "pattern '{}' has non-finite embedding values",
                    pattern.id
                )));
            }
            if !(0.0..=1.0).contains(&pattern.importance_score) {
                return Err(RecallError::validation(format!(
                    "pattern '{}' has importance_score {} outside [0, 1]",
                    pattern.id, pattern.importance_score
                )));
            }
        }

        Ok(())
    }
}

impl PatternStore {
    /// Captura o armazenamento como snapshot.
    ///
    /// Em LRU os padrões vêm do menos recente para o mais recente;
    /// nas outras políticas, em ordem de inserção. A carga repete essa ordem.
    pub fn snapshot(&self) -> StoreSnapshot {
        let patterns = self.patterns();
        let stats = self.stats();
        let config = self.config();

        StoreSnapshot {
            stats: PersistedStats {
                buffer_size: patterns.len() as u64,
                total_patterns_added: stats.total_patterns_added,
                total_patterns_evicted: stats.total_patterns_evicted,
                total_accesses: stats.total_accesses,
            },
            config: PersistedConfig {
                buffer_size: config.buffer_size as u64,
                importance_threshold: config.importance_threshold,
                eviction_policy: config.eviction_policy,
                retention_ratio: config.retention_ratio,
            },
            patterns,
        }
    }

    /// Salva o armazenamento em um arquivo JSON.
    pub fn save(&self, path: &Path) -> RecallResult<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;

        tracing::info!(
            path = %path.display(),
            patterns = snapshot.patterns.len(),
            "Pattern store saved"
        );

        Ok(())
    }

    /// Carrega um armazenamento de um arquivo JSON.
    ///
    /// Constantes de normalização ausentes no arquivo usam o padrão.
    pub fn load(path: &Path, dimension: usize) -> RecallResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)
            .map_err(|e| RecallError::validation(format!("malformed store file: {}", e)))?;

        let store = Self::from_snapshot(snapshot, dimension)?;

        tracing::info!(
            path = %path.display(),
            patterns = store.len(),
            policy = %store.policy(),
            "Pattern store loaded"
        );

        Ok(store)
    }

    /// Reconstrói o armazenamento a partir de um snapshot, mantendo scores e contadores.
    pub fn from_snapshot(snapshot: StoreSnapshot, dimension: usize) -> RecallResult<Self> {
        snapshot.validate(dimension)?;

        let buffer_size = usize::try_from(snapshot.config.buffer_size)
            .map_err(|_| RecallError::validation("config.buffer_size does not fit in usize"))?;
        let config = StoreConfig {
            buffer_size,
            importance_threshold: snapshot.config.importance_threshold,
            eviction_policy: snapshot.config.eviction_policy,
            retention_ratio: snapshot.config.retention_ratio,
            ..StoreConfig::default()
        };

        let store = Self::new(dimension, config)
            .map_err(|e| RecallError::validation(format!("invalid store config: {}", e)))?;
        {
            let policy = store.policy();
            let mut inner = store.inner.write();
            for pattern in snapshot.patterns {
                inner.push(policy, pattern);
            }
            inner.total_added = snapshot.stats.total_patterns_added;
            inner.total_evicted = snapshot.stats.total_patterns_evicted;
            inner.total_accesses = snapshot.stats.total_accesses;
        }

        Ok(store)
    }
}
