use crate::embedder::Embedder;
use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const KEYWORD_CORPUS_SCHEMA_VERSION: u32 = 1;

/// One precomputed corpus row: a search phrase with its demand score and
/// embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub keyword: String,
    pub raw_score: f32,
    pub embedding: Vec<f32>,
}

/// Read-only keyword corpus persisted as versioned JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordCorpus {
    pub schema_version: u32,
    pub dimension: usize,
    pub embedder_id: String,
    pub entries: Vec<CorpusEntry>,
}

impl KeywordCorpus {
    /// Build a corpus by embedding scored keywords. Intended for tests and
    /// offline tooling; production corpora arrive prebuilt.
    pub async fn from_scored_keywords(
        embedder: &dyn Embedder,
        keywords: &[(&str, f32)],
    ) -> Result<Self> {
        let texts: Vec<&str> = keywords.iter().map(|(k, _)| *k).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        let entries = keywords
            .iter()
            .zip(vectors)
            .map(|((keyword, raw_score), embedding)| CorpusEntry {
                keyword: (*keyword).to_string(),
                raw_score: *raw_score,
                embedding,
            })
            .collect();

        Ok(Self {
            schema_version: KEYWORD_CORPUS_SCHEMA_VERSION,
            dimension: embedder.dimension(),
            embedder_id: embedder.id().to_string(),
            entries,
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let corpus: Self = serde_json::from_slice(&bytes)?;
        if corpus.schema_version != KEYWORD_CORPUS_SCHEMA_VERSION {
            return Err(IndexError::UnsupportedSchema {
                found: corpus.schema_version,
                expected: KEYWORD_CORPUS_SCHEMA_VERSION,
            });
        }
        corpus.check_dimensions()?;
        log::info!(
            "loaded keyword corpus: {} entries, dimension {}",
            corpus.entries.len(),
            corpus.dimension
        );
        Ok(corpus)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Every row must match the declared dimension.
    pub fn check_dimensions(&self) -> Result<()> {
        for entry in &self.entries {
            if entry.embedding.len() != self.dimension {
                return Err(IndexError::InvalidDimension {
                    expected: self.dimension,
                    actual: entry.embedding.len(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn corpus_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("keywords.json");

        let embedder = HashEmbedder::default();
        let corpus = KeywordCorpus::from_scored_keywords(
            &embedder,
            &[("garbage bags", 0.41), ("trash bags", 0.38)],
        )
        .await
        .unwrap();
        corpus.save(&path).await.unwrap();

        let loaded = KeywordCorpus::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension, embedder.dimension());
        assert_eq!(loaded.embedder_id, "hash-v1");
    }

    #[tokio::test]
    async fn load_rejects_wrong_schema_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("keywords.json");

        let embedder = HashEmbedder::default();
        let mut corpus = KeywordCorpus::from_scored_keywords(&embedder, &[("a b", 0.1)])
            .await
            .unwrap();
        corpus.schema_version = 99;
        corpus.save(&path).await.unwrap();

        let err = KeywordCorpus::load(&path).await.unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedSchema { found: 99, .. }));
    }

    #[tokio::test]
    async fn ragged_dimensions_rejected() {
        let embedder = HashEmbedder::default();
        let mut corpus = KeywordCorpus::from_scored_keywords(&embedder, &[("a b", 0.1)])
            .await
            .unwrap();
        corpus.entries[0].embedding.pop();
        assert!(matches!(
            corpus.check_dimensions(),
            Err(IndexError::InvalidDimension { .. })
        ));
    }
}
