//! Padrões mantidos pelo armazenamento.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vetor de embedding. A dimensão é fixa por armazenamento.
pub type Embedding = Vec<f64>;

/// Campos auxiliares de um padrão.
///
/// As chaves documentadas são tipadas; o resto vai para `extra` e é
/// persistido como está.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMetadata {
    /// Texto de origem do embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Origem do padrão (ex: "query", "result", "generated").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Tipo da consulta que gerou o padrão.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,

    /// Contagem de acessos herdada de outro armazenamento.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_count: Option<u64>,

    /// Data de criação original, usada no decaimento por recência.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Campos livres.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PatternMetadata {
    /// Cria metadados vazios.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define o texto de origem.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Define a origem.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Define o tipo de consulta.
    #[must_use]
    pub fn with_query_type(mut self, query_type: impl Into<String>) -> Self {
        self.query_type = Some(query_type.into());
        self
    }

    /// Define uma contagem de acessos prévia.
    #[must_use]
    pub fn with_access_count(mut self, access_count: u64) -> Self {
        self.access_count = Some(access_count);
        self
    }

    /// Define a data de criação original.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Adiciona um campo livre.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Uma unidade de conhecimento recuperável.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPattern {
    /// Chave única fornecida pelo chamador.
    pub id: String,

    /// Vetor de embedding.
    pub embedding: Embedding,

    /// Campos auxiliares.
    pub metadata: PatternMetadata,

    /// Importância derivada em [0, 1].
    pub importance_score: f64,

    /// Número de buscas bem-sucedidas.
    pub access_count: u64,

    /// Última busca bem-sucedida (ou inserção).
    pub last_accessed: DateTime<Utc>,

    /// Data de inserção, ou a data de criação dos metadados quando informada.
    pub created_at: DateTime<Utc>,
}

impl MemoryPattern {
    /// Cria um padrão com estatísticas zeradas.
    pub fn new(id: impl Into<String>, embedding: Embedding, metadata: PatternMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            access_count: metadata.access_count.unwrap_or(0),
            created_at: metadata.created_at.unwrap_or(now),
            embedding,
            metadata,
            importance_score: 0.0,
            last_accessed: now,
        }
    }

    /// Dimensão do embedding.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
