//! Tipos de entrada da recuperação e da retenção.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pattern::{Embedding, PatternMetadata};

/// Tipo usado quando a consulta não tem tipo.
pub const DEFAULT_QUERY_TYPE: &str = "general";

/// Contexto de uma recuperação guardado no histórico do retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Texto da consulta.
    pub query_text: String,

    /// Consulta codificada.
    pub query_embedding: Embedding,

    /// Tipo de consulta opcional.
    pub query_type: Option<String>,

    /// Momento da consulta.
    pub timestamp: DateTime<Utc>,
}

impl QueryContext {
    /// Cria um contexto com o horário atual.
    pub fn new(query_text: impl Into<String>, query_embedding: Embedding) -> Self {
        Self {
            query_text: query_text.into(),
            query_embedding,
            query_type: None,
            timestamp: Utc::now(),
        }
    }

    /// Define o tipo de consulta.
    #[must_use]
    pub fn with_query_type(mut self, query_type: impl Into<String>) -> Self {
        self.query_type = Some(query_type.into());
        self
    }

    /// Tipo da consulta, ou [`DEFAULT_QUERY_TYPE`].
    pub fn type_key(&self) -> &str {
        self.query_type.as_deref().unwrap_or(DEFAULT_QUERY_TYPE)
    }
}

/// Amostra observada ou gerada entregue ao buffer de retenção.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Texto da amostra.
    pub text: Option<String>,

    /// Embedding da amostra.
    pub embedding: Option<Embedding>,

    /// Campos auxiliares.
    #[serde(default)]
    pub metadata: PatternMetadata,
}

impl Sample {
    /// Cria uma amostra só com texto.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Associa um embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Substitui os metadados.
    #[must_use]
    pub fn with_metadata(mut self, metadata: PatternMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
