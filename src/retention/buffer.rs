//! Buffer de amostras que dispara atualizações periódicas de retenção.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::PatternStore;
use crate::collaborators::{call_with_timeout, CheckpointState, Persistence, Trainer};
use crate::similarity::text_signature;
use crate::types::config::RetentionConfig;
use crate::types::Sample;
use crate::RecallResult;

/// O que uma chamada a [`RetentionBuffer::add_sample`] ou
/// [`RetentionBuffer::flush`] fez.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RetentionOutcome {
    /// A amostra foi guardada; nenhuma atualização rodou.
    Buffered { pending: usize },
    /// Uma atualização consumiu o buffer.
    Updated { samples: usize, checkpointed: bool },
}

/// Estatísticas do buffer de retenção.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionStats {
    /// Amostras esperando a próxima atualização.
    pub pending: usize,
    /// Amostras adicionadas desde a última atualização bem-sucedida.
    pub counter: usize,
    pub updates_completed: u64,
    /// Amostras aceitas desde a criação.
    pub samples_seen: u64,
    pub checkpoints: u64,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct RetentionState {
    buffer: Vec<Sample>,
    counter: usize,
    updates_completed: u64,
    samples_seen: u64,
    checkpoints: u64,
    last_update: Option<DateTime<Utc>>,
}

/// Coleta amostras e as entrega a um [`Trainer`] a cada
/// `update_frequency` amostras.
///
/// O lock de estado fica retido durante a chamada ao trainer, então as
/// atualizações nunca se sobrepõem. O buffer só é limpo após uma atualização bem-sucedida.
pub struct RetentionBuffer {
    config: RetentionConfig,
    trainer: Arc<dyn Trainer>,
    persistence: Option<Arc<dyn Persistence>>,
    store: Option<Arc<PatternStore>>,
    state: Mutex<RetentionState>,
}

impl RetentionBuffer {
    /// Cria um buffer. Falha se alguma cadência for zero.
    pub fn new(trainer: Arc<dyn Trainer>, config: RetentionConfig) -> RecallResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            trainer,
            persistence: None,
            store: None,
            state: Mutex::new(RetentionState::default()),
        })
    }

    /// Pede checkpoints a `persistence` a cada `checkpoint_every` atualizações.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Também insere em `store` toda amostra que tiver embedding.
    #[must_use]
    pub fn with_store(mut self, store: Arc<PatternStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Guarda uma amostra e roda uma atualização quando há amostras suficientes.
    ///
    /// Uma falha do trainer é retornada e deixa o buffer e o contador como
    /// estão, então a próxima amostra tenta de novo. Uma falha de checkpoint é
    /// retornada depois que a atualização foi aplicada.
    pub async fn add_sample(&self, sample: Sample) -> RecallResult<RetentionOutcome> {
        self.store_sample(&sample)?;

        let mut state = self.state.lock().await;
        state.buffer.push(sample);
        state.counter += 1;
        state.samples_seen += 1;

        if state.counter >= self.config.update_frequency {
            return self.run_update(&mut state).await;
        }

        tracing::debug!(
            pending = state.buffer.len(),
            update_frequency = self.config.update_frequency,
            "Sample buffered"
        );
        Ok(RetentionOutcome::Buffered {
            pending: state.buffer.len(),
        })
    }

    /// Roda uma atualização com o que estiver no buffer. Não faz nada se vazio.
    pub async fn flush(&self) -> RecallResult<RetentionOutcome> {
        let mut state = self.state.lock().await;
        if state.buffer.is_empty() {
            return Ok(RetentionOutcome::Buffered { pending: 0 });
        }
        self.run_update(&mut state).await
    }

    /// Estatísticas atuais.
    pub async fn stats(&self) -> RetentionStats {
        let state = self.state.lock().await;
        RetentionStats {
            pending: state.buffer.len(),
            counter: state.counter,
            updates_completed: state.updates_completed,
            samples_seen: state.samples_seen,
            checkpoints: state.checkpoints,
            last_update: state.last_update,
        }
    }

    fn store_sample(&self, sample: &Sample) -> RecallResult<()> {
        let (Some(store), Some(embedding)) = (&self.store, &sample.embedding) else {
            return Ok(());
        };

        let id = match &sample.text {
            Some(text) => text_signature(text),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let mut metadata = sample.metadata.clone();
        if metadata.text.is_none() {
            metadata.text = sample.text.clone();
        }

        store.try_add_pattern(id, embedding.clone(), metadata, None)
    }

    async fn run_update(&self, state: &mut RetentionState) -> RecallResult<RetentionOutcome> {
        let samples = state.buffer.len();

        if let Err(e) = call_with_timeout(
            self.trainer.name(),
            self.config.timeout(),
            self.trainer.update(&state.buffer),
        )
        .await
        {
            tracing::warn!(
                trainer = self.trainer.name(),
                samples,
                error = %e,
                "Retention update failed, samples kept"
            );
            return Err(e);
        }

        state.buffer.clear();
        state.counter = 0;
        state.updates_completed += 1;
        state.last_update = Some(Utc::now());

        tracing::info!(
            trainer = self.trainer.name(),
            samples,
            updates_completed = state.updates_completed,
            "Retention update completed"
        );

        if self.config.compact_on_update {
            if let Some(store) = &self.store {
                store.retain_important_patterns();
            }
        }

        let checkpointed = self.maybe_checkpoint(state).await?;
        Ok(RetentionOutcome::Updated {
            samples,
            checkpointed,
        })
    }

    async fn maybe_checkpoint(&self, state: &mut RetentionState) -> RecallResult<bool> {
        let Some(persistence) = &self.persistence else {
            return Ok(false);
        };
        if state.updates_completed % self.config.checkpoint_every != 0 {
            return Ok(false);
        }

        let checkpoint = CheckpointState {
            updates_completed: state.updates_completed,
            samples_seen: state.samples_seen,
            store_stats: self.store.as_ref().map(|s| s.stats()),
            timestamp: Utc::now(),
        };

        call_with_timeout(
            persistence.name(),
            self.config.timeout(),
            persistence.checkpoint(&checkpoint),
        )
        .await
        .map_err(|e| {
            tracing::warn!(persistence = persistence.name(), error = %e, "Checkpoint failed");
            e
        })?;

        state.checkpoints += 1;
        tracing::info!(
            persistence = persistence.name(),
            updates_completed = state.updates_completed,
            "Checkpoint saved"
        );
        Ok(true)
    }
}
