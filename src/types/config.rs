//! Configuração do Recall.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{RecallError, RecallResult};

/// Configuração principal do Recall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configurações gerais.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Configurações do armazenamento de padrões.
    #[serde(default)]
    pub store: StoreConfig,

    /// Configurações do retriever adaptativo.
    #[serde(default)]
    pub retriever: RetrieverConfig,

    /// Configurações da cascata teacher/student.
    #[serde(default)]
    pub cascade: CascadeConfig,

    /// Configurações do buffer de retenção.
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Configurações gerais.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Nível de log (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Formato de log (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

/// Políticas de evicção disponíveis para o armazenamento.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Sai primeiro a entrada acessada há mais tempo.
    Lru,
    /// Sai primeiro a entrada com menos acessos.
    Lfu,
    /// Sai primeiro a entrada com menor importância.
    Importance,
}

impl std::fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvictionPolicy::Lru => write!(f, "lru"),
            EvictionPolicy::Lfu => write!(f, "lfu"),
            EvictionPolicy::Importance => write!(f, "importance"),
        }
    }
}

/// Configurações do armazenamento de padrões.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Número máximo de padrões armazenados.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Padrões com importância igual ou acima deste valor são considerados importantes.
    #[serde(default = "default_importance_threshold")]
    pub importance_threshold: f64,

    /// Política de evicção (lru, lfu, importance).
    #[serde(default = "default_eviction_policy")]
    pub eviction_policy: EvictionPolicy,

    /// Fração de padrões mantida na compactação.
    #[serde(default = "default_retention_ratio")]
    pub retention_ratio: f64,

    /// Norma do embedding que corresponde à informatividade máxima.
    #[serde(default = "default_magnitude_scale")]
    pub magnitude_scale: f64,

    /// Número de acessos que corresponde à frequência máxima.
    #[serde(default = "default_access_saturation")]
    pub access_saturation: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            importance_threshold: default_importance_threshold(),
            eviction_policy: default_eviction_policy(),
            retention_ratio: default_retention_ratio(),
            magnitude_scale: default_magnitude_scale(),
            access_saturation: default_access_saturation(),
        }
    }
}

impl StoreConfig {
    /// Cria uma configuração com a capacidade e a política dadas.
    pub fn new(buffer_size: usize, eviction_policy: EvictionPolicy) -> Self {
        Self {
            buffer_size,
            eviction_policy,
            ..Self::default()
        }
    }

    /// Define a taxa de retenção.
    #[must_use]
    pub fn with_retention_ratio(mut self, retention_ratio: f64) -> Self {
        self.retention_ratio = retention_ratio;
        self
    }

    /// Verifica os intervalos dos valores.
    pub fn validate(&self) -> RecallResult<()> {
        if !(0.0..=1.0).contains(&self.retention_ratio) {
            return Err(RecallError::config(format!(
                "store.retention_ratio must be in [0, 1], got {}",
                self.retention_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.importance_threshold) {
            return Err(RecallError::config(format!(
                "store.importance_threshold must be in [0, 1], got {}",
                self.importance_threshold
            )));
        }
        if self.magnitude_scale.is_nan() || self.magnitude_scale <= 0.0 {
            return Err(RecallError::config("store.magnitude_scale must be positive"));
        }
        if self.access_saturation == 0 {
            return Err(RecallError::config(
                "store.access_saturation must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_buffer_size() -> usize {
    1000
}

fn default_importance_threshold() -> f64 {
    0.5
}

fn default_eviction_policy() -> EvictionPolicy {
    EvictionPolicy::Importance
}

fn default_retention_ratio() -> f64 {
    0.8
}

fn default_magnitude_scale() -> f64 {
    10.0
}

fn default_access_saturation() -> u64 {
    100
}

/// Configurações do retriever adaptativo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Threshold de similaridade antes de qualquer ajuste.
    #[serde(default = "default_base_threshold")]
    pub base_threshold: f64,

    /// Candidatos pedidos ao índice na etapa grossa.
    #[serde(default = "default_coarse_top_k")]
    pub coarse_top_k: usize,

    /// Candidatos mantidos após o re-score exato.
    #[serde(default = "default_fine_top_k")]
    pub fine_top_k: usize,

    /// Número de contextos de consulta recentes lembrados.
    #[serde(default = "default_context_window_size")]
    pub context_window_size: usize,

    /// Consultas de um tipo necessárias antes que suas estatísticas ajustem o threshold.
    #[serde(default = "default_min_type_history")]
    pub min_type_history: u64,

    /// Timeout por chamada ao encoder e ao índice (em milissegundos).
    #[serde(default = "default_retriever_timeout")]
    pub timeout_ms: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            base_threshold: default_base_threshold(),
            coarse_top_k: default_coarse_top_k(),
            fine_top_k: default_fine_top_k(),
            context_window_size: default_context_window_size(),
            min_type_history: default_min_type_history(),
            timeout_ms: default_retriever_timeout(),
        }
    }
}

impl RetrieverConfig {
    /// Timeout por chamada como `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Verifica os intervalos e a ordem entre coarse e fine.
    pub fn validate(&self) -> RecallResult<()> {
        if self.coarse_top_k < self.fine_top_k {
            return Err(RecallError::config(format!(
                "retriever.coarse_top_k ({}) must be >= fine_top_k ({})",
                self.coarse_top_k, self.fine_top_k
            )));
        }
        if !(0.0..=1.0).contains(&self.base_threshold) {
            return Err(RecallError::config(format!(
                "retriever.base_threshold must be in [0, 1], got {}",
                self.base_threshold
            )));
        }
        Ok(())
    }
}

fn default_base_threshold() -> f64 {
    0.5
}

fn default_coarse_top_k() -> usize {
    100
}

fn default_fine_top_k() -> usize {
    10
}

fn default_context_window_size() -> usize {
    5
}

fn default_min_type_history() -> u64 {
    10
}

fn default_retriever_timeout() -> u64 {
    5_000
}

/// Configurações da cascata teacher/student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Candidatos pedidos ao student.
    #[serde(default = "default_initial_k")]
    pub initial_k: usize,

    /// Candidatos devolvidos ao chamador.
    #[serde(default = "default_final_k")]
    pub final_k: usize,

    /// Pula o teacher quando o student está confiante.
    #[serde(default = "default_true")]
    pub adaptive: bool,

    /// Score do melhor candidato acima do qual o teacher é pulado.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Timeout da chamada ao student (em milissegundos).
    #[serde(default = "default_student_timeout")]
    pub student_timeout_ms: u64,

    /// Timeout de cada chamada de score ao teacher (em milissegundos).
    #[serde(default = "default_teacher_timeout")]
    pub teacher_timeout_ms: u64,

    /// Orçamento de tempo para todo o re-ranking (em milissegundos).
    #[serde(default = "default_rerank_budget")]
    pub rerank_budget_ms: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            initial_k: default_initial_k(),
            final_k: default_final_k(),
            adaptive: true,
            confidence_threshold: default_confidence_threshold(),
            student_timeout_ms: default_student_timeout(),
            teacher_timeout_ms: default_teacher_timeout(),
            rerank_budget_ms: default_rerank_budget(),
        }
    }
}

impl CascadeConfig {
    pub fn student_timeout(&self) -> Duration {
        Duration::from_millis(self.student_timeout_ms)
    }

    pub fn teacher_timeout(&self) -> Duration {
        Duration::from_millis(self.teacher_timeout_ms)
    }

    pub fn rerank_budget(&self) -> Duration {
        Duration::from_millis(self.rerank_budget_ms)
    }

    /// Verifica a ordem dos k.
    pub fn validate(&self) -> RecallResult<()> {
        if self.initial_k < self.final_k {
            return Err(RecallError::config(format!(
                "cascade.initial_k ({}) must be >= final_k ({})",
                self.initial_k, self.final_k
            )));
        }
        Ok(())
    }
}

fn default_initial_k() -> usize {
    50
}

fn default_final_k() -> usize {
    10
}

fn default_confidence_threshold() -> f64 {
    0.85
}

fn default_student_timeout() -> u64 {
    10_000
}

fn default_teacher_timeout() -> u64 {
    5_000
}

fn default_rerank_budget() -> u64 {
    60_000
}

/// Configurações do buffer de retenção.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Amostras coletadas antes de disparar uma atualização.
    #[serde(default = "default_update_frequency")]
    pub update_frequency: usize,

    /// Um checkpoint é pedido a cada N atualizações concluídas.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u64,

    /// Compacta o armazenamento associado após cada atualização.
    #[serde(default)]
    pub compact_on_update: bool,

    /// Timeout das chamadas ao trainer e à persistência (em milissegundos).
    #[serde(default = "default_retention_timeout")]
    pub timeout_ms: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            update_frequency: default_update_frequency(),
            checkpoint_every: default_checkpoint_every(),
            compact_on_update: false,
            timeout_ms: default_retention_timeout(),
        }
    }
}

impl RetentionConfig {
    /// Timeout do trainer e da persistência como `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Verifica que as duas cadências são diferentes de zero.
    pub fn validate(&self) -> RecallResult<()> {
        if self.update_frequency == 0 {
            return Err(RecallError::config(
                "retention.update_frequency must be at least 1",
            ));
        }
        if self.checkpoint_every == 0 {
            return Err(RecallError::config(
                "retention.checkpoint_every must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_update_frequency() -> usize {
    100
}

fn default_checkpoint_every() -> u64 {
    10
}

fn default_retention_timeout() -> u64 {
    60_000
}

impl Config {
    /// Carrega a configuração de um arquivo TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> RecallResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Salva a configuração em um arquivo TOML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RecallResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Cria a configuração padrão.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            store: StoreConfig::default(),
            retriever: RetrieverConfig::default(),
            cascade: CascadeConfig::default(),
            retention: RetentionConfig::default(),
        }
    }

    /// Valida todas as seções.
    pub fn validate(&self) -> RecallResult<()> {
        self.store.validate()?;
        self.retriever.validate()?;
        self.cascade.validate()?;
        self.retention.validate()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.eviction_policy, EvictionPolicy::Importance);
        assert_eq!(config.retriever.context_window_size, 5);
        assert_eq!(config.retention.update_frequency, 100);
        assert_eq!(config.retention.checkpoint_every, 10);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [store]
            buffer_size = 3
            eviction_policy = "lru"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.buffer_size, 3);
        assert_eq!(config.store.eviction_policy, EvictionPolicy::Lru);
        assert_eq!(config.store.retention_ratio, 0.8);
        assert_eq!(config.cascade.final_k, 10);
    }

    #[test]
    fn test_rejects_inverted_top_k() {
        let retriever = RetrieverConfig {
            coarse_top_k: 5,
            fine_top_k: 10,
            ..RetrieverConfig::default()
        };
        assert!(matches!(retriever.validate(), Err(RecallError::Config(_))));
    }

    #[test]
    fn test_rejects_inverted_cascade_k() {
        let cascade = CascadeConfig {
            initial_k: 2,
            final_k: 3,
            ..CascadeConfig::default()
        };
        assert!(cascade.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recall.toml");

        let mut config = Config::default();
        config.store.buffer_size = 42;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.store.buffer_size, 42);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recall.toml");

        std::fs::write(&path, "[store\nbuffer_size = ").unwrap();
        assert!(matches!(Config::load(&path), Err(RecallError::TomlParse(_))));

        std::fs::write(&path, "[store]\nbuffer_size = \"many\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(RecallError::TomlParse(_))));

        std::fs::write(&path, "[retriever]\ncoarse_top_k = 1\nfine_top_k = 5\n").unwrap();
        assert!(matches!(Config::load(&path), Err(RecallError::Config(_))));

        assert!(matches!(
            Config::load(dir.path().join("missing.toml")),
            Err(RecallError::Io(_))
        ));
    }
}
