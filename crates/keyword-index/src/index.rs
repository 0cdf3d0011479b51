use crate::corpus::KeywordCorpus;
use crate::embedder::{l2_normalize, Embedder};
use crate::error::{IndexError, Result};
use curator_protocol::CandidateKeyword;
use lru::LruCache;
use ndarray::{Array1, Array2};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const QUERY_CACHE_CAPACITY: usize = 128;

/// Read-only nearest-neighbor index over the keyword corpus. Loaded once per
/// process; `search` takes `&self` and is safe for unlimited concurrent
/// callers.
pub struct KeywordIndex {
    keywords: Vec<IndexedKeyword>,
    /// Row-per-keyword matrix of L2-normalized embeddings.
    matrix: Array2<f32>,
    embedder: Arc<dyn Embedder>,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
}

struct IndexedKeyword {
    text: String,
    raw_score: f32,
}

impl KeywordIndex {
    pub fn build(corpus: &KeywordCorpus, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if embedder.dimension() != corpus.dimension {
            return Err(IndexError::InvalidDimension {
                expected: corpus.dimension,
                actual: embedder.dimension(),
            });
        }
        corpus.check_dimensions()?;

        let dimension = corpus.dimension;
        let mut matrix = Array2::<f32>::zeros((corpus.entries.len(), dimension));
        let mut keywords = Vec::with_capacity(corpus.entries.len());

        for (row, entry) in corpus.entries.iter().enumerate() {
            let mut vector = entry.embedding.clone();
            l2_normalize(&mut vector);
            for (col, value) in vector.iter().enumerate() {
                matrix[[row, col]] = *value;
            }
            keywords.push(IndexedKeyword {
                text: entry.keyword.clone(),
                raw_score: entry.raw_score,
            });
        }

        log::info!("keyword index ready: {} keywords", keywords.len());
        Ok(Self {
            keywords,
            matrix,
            embedder,
            query_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(QUERY_CACHE_CAPACITY).expect("nonzero capacity"),
            )),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Top-k keywords by cosine similarity (dot product of normalized
    /// vectors) for one query.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<CandidateKeyword>> {
        if self.keywords.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embed_cached(query).await?;
        let scores: Array1<f32> = self.matrix.dot(&Array1::from(query_vector));

        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| s.is_finite())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(k);

        let results = ranked
            .into_iter()
            .map(|(idx, similarity)| {
                let keyword = &self.keywords[idx];
                CandidateKeyword::new(keyword.text.clone(), keyword.raw_score, similarity)
                    .hit_query(query)
            })
            .collect();
        Ok(results)
    }

    /// Run many queries, merge duplicates by lowercase key (keeping best
    /// scores, accumulating hit queries), rank, and cap the total.
    pub async fn search_many(
        &self,
        queries: &[String],
        k_per_query: usize,
        max_total: usize,
    ) -> Result<Vec<CandidateKeyword>> {
        let mut merged: HashMap<String, CandidateKeyword> = HashMap::new();

        for query in queries {
            for candidate in self.search(query, k_per_query).await? {
                let key = candidate.text.to_lowercase();
                match merged.get_mut(&key) {
                    Some(existing) => existing.absorb(&candidate),
                    None => {
                        merged.insert(key, candidate);
                    }
                }
            }
        }

        let mut candidates: Vec<CandidateKeyword> = merged.into_values().collect();
        rank_candidates(&mut candidates);
        candidates.truncate(max_total);

        log::debug!(
            "retrieved {} candidates from {} queries",
            candidates.len(),
            queries.len()
        );
        Ok(candidates)
    }

    async fn embed_cached(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self
            .query_cache
            .lock()
            .expect("query cache lock")
            .get(text)
        {
            return Ok(vector.clone());
        }

        let mut vector = self.embedder.embed(text).await?;
        l2_normalize(&mut vector);
        self.query_cache
            .lock()
            .expect("query cache lock")
            .put(text.to_string(), vector.clone());
        Ok(vector)
    }
}

/// Ranking: similarity desc, then raw_score desc, then shorter phrase, then
/// lexicographic for full determinism.
fn rank_candidates(candidates: &mut [CandidateKeyword]) {
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.raw_score
                    .partial_cmp(&a.raw_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.text.len().cmp(&b.text.len()))
            .then_with(|| a.text.cmp(&b.text))
    });
}
