//! Tipos de resposta da recuperação e da cascata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::pattern::Embedding;

/// Etapa que produziu o score atual do candidato.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Busca aproximada no índice.
    Coarse,
    /// Re-score exato por cosseno.
    Fine,
    /// Re-ranking do teacher.
    Teacher,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Coarse => write!(f, "coarse"),
            Stage::Fine => write!(f, "fine"),
            Stage::Teacher => write!(f, "teacher"),
        }
    }
}

/// Um resultado de recuperação com score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    /// Referência opaca ao corpus do chamador (id do padrão, id do documento).
    pub content_ref: Option<String>,

    /// Texto do candidato, quando disponível. Necessário para o teacher.
    pub text: Option<String>,

    /// Vetor devolvido pelo índice, quando disponível.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,

    /// Campos livres vindos do índice.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Score da última etapa que tocou o candidato.
    pub score: f64,

    /// Etapa que produziu `score`.
    pub stage: Stage,

    /// Score do student, definido pela cascata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_score: Option<f64>,

    /// Score do teacher, definido pela cascata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_score: Option<f64>,
}

impl RetrievalCandidate {
    /// Cria um candidato da etapa grossa com o score dado.
    pub fn new(score: f64) -> Self {
        Self {
            content_ref: None,
            text: None,
            embedding: None,
            metadata: BTreeMap::new(),
            score,
            stage: Stage::Coarse,
            student_score: None,
            teacher_score: None,
        }
    }

    /// Define a referência de conteúdo.
    #[must_use]
    pub fn with_ref(mut self, content_ref: impl Into<String>) -> Self {
        self.content_ref = Some(content_ref.into());
        self
    }

    /// Define o texto.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Associa um embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Adiciona um campo de metadados.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Define a etapa.
    #[must_use]
    pub fn at_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }
}

/// Estratégia da cascata que produziu o resultado.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Strategy {
    /// O student estava confiante; o teacher foi pulado.
    #[serde(rename = "student-only (adaptive)")]
    StudentOnly,
    /// O student propôs e o teacher reordenou.
    #[serde(rename = "student-retrieve-teacher-rerank")]
    TeacherRerank,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::StudentOnly => write!(f, "student-only (adaptive)"),
            Strategy::TeacherRerank => write!(f, "student-retrieve-teacher-rerank"),
        }
    }
}

/// Metadados de como o resultado da cascata foi produzido.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeMetadata {
    /// Candidatos pedidos ao student.
    pub initial_k: usize,

    /// Candidatos pedidos pelo chamador.
    pub final_k: usize,

    /// Tempo total da chamada (em milissegundos).
    pub execution_time_ms: f64,

    /// Estratégia usada; ausente em resultados vazios ou com falha.
    pub strategy: Option<Strategy>,

    /// Falha do student, quando a chamada não pôde continuar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Explicação para resultados vazios.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Chamadas de score ao teacher tentadas.
    pub teacher_calls: usize,

    /// Chamadas ao teacher que falharam ou expiraram.
    pub teacher_failures: usize,

    /// Se o orçamento de re-ranking acabou antes de pontuar todos os candidatos.
    pub timed_out: bool,
}

/// Saída da cascata teacher/student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeResult {
    /// Candidatos ordenados, melhor primeiro.
    pub candidates: Vec<RetrievalCandidate>,

    /// Como o resultado foi produzido.
    pub metadata: CascadeMetadata,
}

impl CascadeResult {
    /// Cria um resultado vazio só com metadados.
    pub fn empty(metadata: CascadeMetadata) -> Self {
        Self {
            candidates: Vec::new(),
            metadata,
        }
    }

    /// Número de candidatos.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Se não há candidatos.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Se a chamada ao student falhou.
    pub fn is_error(&self) -> bool {
        self.metadata.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_serialization() {
        assert_eq!(
            serde_json::to_string(&Strategy::StudentOnly).unwrap(),
            "\"student-only (adaptive)\""
        );
        assert_eq!(
            serde_json::to_string(&Strategy::TeacherRerank).unwrap(),
            "\"student-retrieve-teacher-rerank\""
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(format!("{}", Stage::Coarse), "coarse");
        assert_eq!(format!("{}", Stage::Fine), "fine");
        assert_eq!(format!("{}", Stage::Teacher), "teacher");
    }

    #[test]
    fn test_candidate_builder() {
        let candidate = RetrievalCandidate::new(0.4)
            .with_ref("doc-1")
            .with_text("hello")
            .with_metadata("lang", serde_json::json!("en"))
            .at_stage(Stage::Fine);

        assert_eq!(candidate.content_ref.as_deref(), Some("doc-1"));
        assert_eq!(candidate.stage, Stage::Fine);
        assert_eq!(candidate.metadata["lang"], "en");
        assert!(candidate.student_score.is_none());
    }
}
