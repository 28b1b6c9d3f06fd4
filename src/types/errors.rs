//! Tipos de erro do Recall.

use thiserror::Error;

/// Tipo de resultado padrão do Recall.
pub type RecallResult<T> = Result<T, RecallError>;

/// Erros possíveis no Recall.
///
/// Buscas sem resultado não são erros: aparecem como `None` ou resultado vazio.
#[derive(Error, Debug)]
pub enum RecallError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Collaborator '{name}' failed: {message}")]
    Collaborator { name: String, message: String },

    #[error("Timeout while calling '{0}'")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecallError {
    /// Cria um erro de validação.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Cria uma falha de colaborador atribuída a `name`.
    pub fn collaborator<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::Collaborator {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Se o erro veio de um colaborador externo (incluindo timeouts).
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator { .. } | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_display() {
        let err = RecallError::collaborator("teacher", "model unavailable");
        assert_eq!(
            err.to_string(),
            "Collaborator 'teacher' failed: model unavailable"
        );
        assert!(err.is_collaborator());
    }

    #[test]
    fn test_timeout_is_collaborator() {
        assert!(RecallError::Timeout("encoder".to_string()).is_collaborator());
        assert!(!RecallError::validation("bad dim").is_collaborator());
    }
}
