//! Colaboradores externos usados pelo Recall.
//!
//! O encoder, o índice aproximado, os modelos teacher e student, o
//! trainer e o armazenamento de checkpoints ficam fora deste crate. Cada um é
//! uma trait assíncrona, e toda chamada feita por meio deles passa por
//! [`call_with_timeout`].

mod base;

pub use base::{
    call_with_timeout, CheckpointState, Encoder, Persistence, StudentRetriever, Teacher, Trainer,
    VectorIndex,
};
