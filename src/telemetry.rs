//! Configuração de logging estruturado.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::types::config::GeneralConfig;
use crate::{RecallError, RecallResult};

/// Monta o filtro: primeiro `RUST_LOG`, depois `recall=<log_level>`.
pub fn env_filter(config: &GeneralConfig) -> RecallResult<EnvFilter> {
    let directive: Directive = format!("recall={}", config.log_level)
        .parse()
        .map_err(|e| RecallError::config(format!("invalid log_level '{}': {}", config.log_level, e)))?;

    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Instala um subscriber global que escreve no stderr.
///
/// `log_format` escolhe saída `"json"` ou texto. Falha se já houver
/// um subscriber global.
pub fn init_tracing(config: &GeneralConfig) -> RecallResult<()> {
    let filter = env_filter(config)?;

    let (json, text) = match config.log_format.as_str() {
        "json" => (Some(fmt::layer().json().with_writer(std::io::stderr)), None),
        "text" => (None, Some(fmt::layer().with_writer(std::io::stderr))),
        other => {
            return Err(RecallError::config(format!(
                "unknown log_format '{}', expected 'text' or 'json'",
                other
            )))
        }
    };

    tracing_subscriber::registry()
        .with(json)
        .with(text)
        .with(filter)
        .try_init()
        .map_err(|e| RecallError::config(format!("tracing already initialized: {}", e)))
}
