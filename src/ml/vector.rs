//! Hashed character n-gram embeddings for short phrases.

use std::ops::RangeInclusive;

use crate::text::normalize_for_matching;

/// Default embedding width.
pub const DEFAULT_DIMENSIONS: usize = 2048;
/// Character n-gram lengths hashed into the embedding.
const NGRAM_LENGTHS: RangeInclusive<usize> = 3..=5;

/// Normalize a vector in-place and return whether the norm was non-zero.
pub fn normalize_l2_in_place(values: &mut [f32]) -> bool {
    let mut sum = 0.0_f32;
    for value in values.iter() {
        sum += value * value;
    }
    if !sum.is_finite() || sum <= 0.0 {
        return false;
    }
    let norm = sum.sqrt();
    if norm <= 0.0 {
        return false;
    }
    for value in values {
        *value /= norm;
    }
    true
}

/// Dot product; equals cosine similarity for L2-normalized inputs.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Embed a phrase as L2-normalized counts of hashed words and character n-grams.
///
/// Components are non-negative, so cosine similarity between two embeddings
/// lies in `[0, 1]`. A phrase with no matchable characters embeds to zeros.
pub fn phrase_embedding(phrase: &str, dimensions: usize) -> Vec<f32> {
    let mut out = vec![0.0_f32; dimensions];
    let normalized = normalize_for_matching(phrase);
    if dimensions == 0 || normalized.is_empty() {
        return out;
    }
    for word in normalized.split(' ') {
        out[bucket(&format!("w:{word}"), dimensions)] += 1.0;
    }
    let padded: Vec<char> = format!(" {normalized} ").chars().collect();
    for n in NGRAM_LENGTHS {
        for window in padded.windows(n) {
            let gram: String = window.iter().collect();
            out[bucket(&gram, dimensions)] += 1.0;
        }
    }
    normalize_l2_in_place(&mut out);
    out
}

fn bucket(feature: &str, dimensions: usize) -> usize {
    let hash = blake3::hash(feature.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % dimensions as u64) as usize
}
