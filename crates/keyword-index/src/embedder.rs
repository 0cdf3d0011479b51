use crate::error::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Text-to-vector boundary for the keyword index. Model-backed embedders
/// plug in behind this trait; the corpus builder and the query side must use
/// the same implementation for similarities to be meaningful.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize;

    /// Stable identifier recorded alongside corpora built with this embedder.
    fn id(&self) -> &str;
}

/// Deterministic feature-hashing embedder: SHA-256 buckets over word
/// unigrams and bigrams, L2-normalized. No model assets, identical output
/// across processes, which keeps runs reproducible.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSION: usize = 256;

    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str) {
        let digest = Sha256::digest(feature.as_bytes());
        let bucket = u64::from_le_bytes(digest[0..8].try_into().expect("8 bytes"))
            as usize
            % self.dimension;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        for word in &words {
            self.accumulate(&mut vector, word);
        }
        for pair in words.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn id(&self) -> &str {
        "hash-v1"
    }
}

pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
