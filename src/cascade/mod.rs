//! Cascata de destilação teacher/student.
//!
//! Um student barato propõe candidatos. Quando não está confiante, um
//! teacher caro pontua cada um e a lista é reordenada pelo julgamento
//! do teacher.

mod distillation;

pub use distillation::DistillationCascade;
