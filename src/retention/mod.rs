//! Buffer de retenção: atualizações periódicas do trainer com as amostras acumuladas.

mod buffer;

pub use buffer::{RetentionBuffer, RetentionOutcome, RetentionStats};
