//! Cascata: o student recupera, o teacher reordena.

use std::sync::Arc;
use std::time::Instant;

use crate::collaborators::{call_with_timeout, StudentRetriever, Teacher};
use crate::types::config::CascadeConfig;
use crate::types::{CascadeMetadata, CascadeResult, RetrievalCandidate, Stage, Strategy};
use crate::{RecallError, RecallResult};

/// Encadeia um retriever student barato com um re-ranker teacher caro.
///
/// Sem estado entre chamadas. Falhas do student nunca viram `Err`: geram
/// um resultado vazio com `metadata.error` definido. Falhas do teacher só
/// descartam o candidato afetado.
pub struct DistillationCascade {
    teacher: Arc<dyn Teacher>,
    config: CascadeConfig,
}

impl DistillationCascade {
    /// Cria uma cascata. Falha se `initial_k < final_k`.
    pub fn new(teacher: Arc<dyn Teacher>, config: CascadeConfig) -> RecallResult<Self> {
        config.validate()?;
        Ok(Self { teacher, config })
    }

    /// Cria uma cascata com as configurações padrão.
    pub fn with_defaults(teacher: Arc<dyn Teacher>) -> RecallResult<Self> {
        Self::new(teacher, CascadeConfig::default())
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Executa a cascata com os k, a adaptatividade e a confiança configurados.
    pub async fn run(&self, query: &str, student: &dyn StudentRetriever) -> CascadeResult {
        self.retrieve_and_rerank(
            query,
            student,
            self.config.initial_k,
            self.config.final_k,
            self.config.adaptive,
            self.config.confidence_threshold,
        )
        .await
    }

    /// Recupera `initial_k` candidatos do `student` e retorna os `final_k`
    /// melhores (limitado a `initial_k`).
    ///
    /// Com `adaptive`, pelo menos dois candidatos e o melhor score do student
    /// estritamente acima de `confidence_threshold`, o teacher é pulado.
    pub async fn retrieve_and_rerank(
        &self,
        query: &str,
        student: &dyn StudentRetriever,
        initial_k: usize,
        final_k: usize,
        adaptive: bool,
        confidence_threshold: f64,
    ) -> CascadeResult {
        let start = Instant::now();
        let final_k = final_k.min(initial_k);
        let mut metadata = CascadeMetadata {
            initial_k,
            final_k,
            ..CascadeMetadata::default()
        };

        let retrieved = call_with_timeout(
            student.name(),
            self.config.student_timeout(),
            student.retrieve(query, initial_k),
        )
        .await;

        let mut candidates = match retrieved {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(student = student.name(), error = %e, "Student retrieval failed");
                metadata.error = Some(e.to_string());
                metadata.execution_time_ms = elapsed_ms(start);
                return CascadeResult::empty(metadata);
            }
        };

        if candidates.is_empty() {
            metadata.message = Some("student returned no candidates".to_string());
            metadata.execution_time_ms = elapsed_ms(start);
            return CascadeResult::empty(metadata);
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        for candidate in &mut candidates {
            candidate.student_score = Some(candidate.score);
        }

        let top_score = candidates[0].score;
        if adaptive && candidates.len() >= 2 && top_score > confidence_threshold {
            candidates.truncate(final_k);
            metadata.strategy = Some(Strategy::StudentOnly);
            metadata.execution_time_ms = elapsed_ms(start);

            tracing::debug!(
                top_score,
                confidence_threshold,
                returned = candidates.len(),
                "Student confident, teacher skipped"
            );
            return CascadeResult {
                candidates,
                metadata,
            };
        }

        let mut reranked = self.rerank(query, candidates, &mut metadata).await;
        reranked.sort_by(|a, b| {
            b.teacher_score
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.teacher_score.unwrap_or(f64::NEG_INFINITY))
        });
        reranked.truncate(final_k);

        metadata.strategy = Some(Strategy::TeacherRerank);
        metadata.execution_time_ms = elapsed_ms(start);

        tracing::info!(
            teacher = self.teacher.name(),
            teacher_calls = metadata.teacher_calls,
            teacher_failures = metadata.teacher_failures,
            timed_out = metadata.timed_out,
            returned = reranked.len(),
            execution_time_ms = metadata.execution_time_ms,
            "Teacher re-rank completed"
        );

        CascadeResult {
            candidates: reranked,
            metadata,
        }
    }

    /// Pontua os candidatos com o teacher, na ordem do student, até o
    /// orçamento de re-ranking acabar.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalCandidate>,
        metadata: &mut CascadeMetadata,
    ) -> Vec<RetrievalCandidate> {
        let deadline = Instant::now() + self.config.rerank_budget();
        let mut scored = Vec::with_capacity(candidates.len());

        for mut candidate in candidates {
            let Some(text) = candidate.text.as_deref() else {
                tracing::debug!(
                    content_ref = ?candidate.content_ref,
                    "Skipping candidate without text"
                );
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                metadata.timed_out = true;
                break;
            }

            metadata.teacher_calls += 1;
            let timeout = self.config.teacher_timeout().min(remaining);
            let scored_call =
                call_with_timeout(self.teacher.name(), timeout, self.teacher.get_score(query, text))
                    .await;
            match scored_call {
                Ok(score) => {
                    candidate.teacher_score = Some(score);
                    candidate.score = score;
                    candidate.stage = Stage::Teacher;
                    scored.push(candidate);
                }
                Err(e) => {
                    metadata.teacher_failures += 1;
                    tracing::warn!(
                        teacher = self.teacher.name(),
                        content_ref = ?candidate.content_ref,
                        error = %e,
                        "Teacher scoring failed, candidate dropped"
                    );
                    if matches!(e, RecallError::Timeout(_)) && Instant::now() >= deadline {
                        metadata.timed_out = true;
                        break;
                    }
                }
            }
        }

        if metadata.timed_out {
            tracing::warn!(
                budget_ms = self.config.rerank_budget_ms,
                scored = scored.len(),
                "Re-rank budget exhausted, keeping partial results"
            );
        }

        scored
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
