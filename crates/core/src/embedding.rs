//! Deterministic bag-of-hashed-words vectors.
//!
//! Every lowercased word token is hashed with SHA-256; the first four digest bytes, read as a
//! big-endian integer and reduced modulo [`EMBEDDING_DIM`], select the bucket that is incremented.
//! The result is L2-normalized unless it is all zeros. Identical text always yields the identical
//! vector and overlapping text yields a non-zero cosine similarity. There is no semantic
//! generalization; documents and queries are embedded the same way so nearest-neighbour search is
//! internally consistent.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

pub const EMBEDDING_DIM: usize = 1536;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered).map(|token| token.as_str().to_string()).collect()
}

fn bucket(token: &str) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix as usize % EMBEDDING_DIM
}

pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];
    for token in tokenize(text) {
        vector[bucket(&token)] += 1.0;
    }

    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

pub fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|value| *value == 0.0)
}

/// Cosine similarity in `[-1, 1]`; `0.0` when either side has no magnitude or the lengths differ.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut left_norm = 0.0f64;
    let mut right_norm = 0.0f64;
    for (l, r) in left.iter().zip(right) {
        let (l, r) = (f64::from(*l), f64::from(*r));
        dot += l * r;
        left_norm += l * l;
        right_norm += r * r;
    }

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

/// Little-endian `f32` encoding used for stored embeddings.
pub fn to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|value| value.to_le_bytes()).collect()
}

pub fn from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
