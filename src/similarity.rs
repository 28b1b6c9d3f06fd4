//! Utilitários de vetores e texto usados pelo armazenamento, retriever e retenção.
//!
//! - Similaridade por cosseno e normas de embeddings `f64`
//! - Média de um conjunto de embeddings
//! - Assinaturas SHA-256 de texto normalizado, usadas como ids estáveis

use sha2::{Digest, Sha256};

/// Norma euclidiana de um vetor.
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Similaridade por cosseno em [-1, 1].
///
/// Retorna 0.0 para vetores nulos ou de tamanhos diferentes.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Média elemento a elemento dos embeddings.
///
/// Retorna `None` quando não há nada para agregar. Vetores com tamanho
/// diferente do primeiro são ignorados.
pub fn mean_pool<'a, I>(embeddings: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut iter = embeddings.into_iter();
    let first = iter.next()?;
    let mut sum = first.to_vec();
    let mut count = 1usize;

    for e in iter {
        if e.len() != sum.len() {
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(e) {
            *acc += x;
        }
        count += 1;
    }

    let n = count as f64;
    sum.iter_mut().for_each(|x| *x /= n);
    Some(sum)
}

/// Normaliza texto para assinaturas (apara linhas, remove vazias, minúsculas).
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}

/// Assinatura SHA-256 do texto normalizado, em hexadecimal.
pub fn text_signature(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    hex::encode(hasher.finalize())
}
