//! Índice ordenado de ranks para evicção LFU e por importância.
//!
//! As entradas usam a chave `(rank, insertion_seq, id)`: a primeira chave é o
//! menor rank e, entre ranks iguais, a entrada inserida primeiro.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// `f64` com ordem total, para coleções ordenadas.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderedScore(pub f64);

impl PartialEq for OrderedScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedScore {}

impl PartialOrd for OrderedScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type RankKey = (OrderedScore, u64, String);

/// Índice dos ranks dos padrões, do menor para o maior.
#[derive(Debug, Default)]
pub(crate) struct RankIndex {
    keys: BTreeSet<RankKey>,
}

impl RankIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rank: f64, seq: u64, id: &str) {
        self.keys.insert((OrderedScore(rank), seq, id.to_string()));
    }

    pub fn remove(&mut self, rank: f64, seq: u64, id: &str) -> bool {
        self.keys.remove(&(OrderedScore(rank), seq, id.to_string()))
    }

    /// Move uma entrada de `old_rank` para `new_rank`.
    pub fn update(&mut self, old_rank: f64, new_rank: f64, seq: u64, id: &str) {
        self.remove(old_rank, seq, id);
        self.insert(new_rank, seq, id);
    }

    /// Id com menor rank; em empate, o inserido primeiro.
    pub fn min(&self) -> Option<&str> {
        self.keys.iter().next().map(|(_, _, id)| id.as_str())
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}
