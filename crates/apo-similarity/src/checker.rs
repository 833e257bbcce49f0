//! `SimilarityChecker` (§4.6): char-shingle Jaccard similarity, an optional
//! cosine embedding similarity, and the hybrid score that drives the
//! near-duplicate alert.

use crate::batch::{BatchEntry, BatchMemory};
use apo_collab_core::EmbeddingClient;
use apo_core::context::SimilarityReport;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Character-shingle length (§4.6: `k=9`).
pub const SHINGLE_SIZE: usize = 9;
/// Weight given to character similarity in the hybrid score.
pub const CHAR_WEIGHT: f64 = 0.4;
/// Weight given to semantic similarity in the hybrid score.
pub const SEM_WEIGHT: f64 = 0.6;
/// `hybrid` at or above this value triggers a near-duplicate alert.
pub const DUPLICATE_THRESHOLD: f64 = 0.70;

/// Computes [`SimilarityReport`]s for a job against a batch's prior
/// history, then records the job into that history.
pub struct SimilarityChecker {
    embedding: Option<Arc<dyn EmbeddingClient>>,
}

impl SimilarityChecker {
    /// Build a checker with no embedding client: `sem_sim` will always be
    /// `None` and `hybrid` falls back to `char_sim` alone (§8 boundary
    /// behavior: "Embedding client unavailable").
    #[must_use]
    pub fn char_only() -> Self {
        Self { embedding: None }
    }

    /// Build a checker that also computes cosine embedding similarity.
    #[must_use]
    pub fn with_embedding(embedding: Arc<dyn EmbeddingClient>) -> Self {
        Self { embedding: Some(embedding) }
    }

    /// Compare `text` (the current job's article body) against `batch`,
    /// then append the current job's fingerprint so later jobs in the same
    /// batch compare against it too.
    ///
    /// Returns the report alongside the embedding client's error, if it was
    /// configured and failed (§4.6 step 2: "fall back to char-sim only and
    /// record an advisory error"). The caller decides how to surface that
    /// error; this method only computes and never swallows it silently.
    pub async fn check(&self, batch: &BatchMemory, job_id: Uuid, keyword: &str, text: &str) -> CheckOutcome {
        let shingles = char_shingles(text);
        let (embedding, embed_error) = match &self.embedding {
            Some(client) => match client.embed(text).await {
                Ok(vector) => (Some(vector), None),
                Err(e) => (None, Some(e)),
            },
            None => (None, None),
        };

        let prior = batch.snapshot();
        let report = nearest(&shingles, embedding.as_deref(), &prior);

        batch.append(BatchEntry {
            job_id,
            keyword: keyword.to_string(),
            shingles,
            embedding,
        });

        CheckOutcome { report, embed_error }
    }
}

/// Result of [`SimilarityChecker::check`]: the computed report plus any
/// embedding-client error that caused `sem_sim` to fall back to `None`.
pub struct CheckOutcome {
    /// The computed similarity report (always present, even on embed failure).
    pub report: SimilarityReport,
    /// The embedding client's error, if one was configured and it failed.
    pub embed_error: Option<anyhow::Error>,
}

fn nearest(shingles: &HashSet<String>, embedding: Option<&[f32]>, prior: &[BatchEntry]) -> SimilarityReport {
    let mut best_char = 0.0_f64;
    let mut best_sem: Option<f64> = None;
    let mut best_hybrid = 0.0_f64;
    let mut nearest_job_id = None;

    for entry in prior {
        let char_sim = jaccard(shingles, &entry.shingles);
        let sem_sim = match (embedding, &entry.embedding) {
            (Some(a), Some(b)) => Some(cosine(a, b)),
            _ => None,
        };
        let hybrid = match sem_sim {
            Some(sem) => CHAR_WEIGHT * char_sim + SEM_WEIGHT * sem,
            None => char_sim,
        };

        if hybrid > best_hybrid || nearest_job_id.is_none() {
            best_hybrid = hybrid;
            best_char = char_sim;
            best_sem = sem_sim;
            nearest_job_id = Some(entry.job_id);
        }
    }

    SimilarityReport {
        char_sim: best_char,
        sem_sim: best_sem,
        hybrid: best_hybrid,
        nearest_job_id,
    }
}

/// Lowercased, whitespace-collapsed `k`-character shingle set of `text`.
fn char_shingles(text: &str) -> HashSet<String> {
    let normalized: Vec<char> = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect();

    if normalized.len() < SHINGLE_SIZE {
        if normalized.is_empty() {
            return HashSet::new();
        }
        return HashSet::from([normalized.into_iter().collect()]);
    }

    normalized
        .windows(SHINGLE_SIZE)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let dot: f64 = a[..len].iter().zip(&b[..len]).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a[..len].iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b[..len].iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchMemory;

    #[tokio::test]
    async fn empty_batch_yields_zero_similarity() {
        let checker = SimilarityChecker::char_only();
        let batch = BatchMemory::new();
        let outcome = checker.check(&batch, Uuid::from_u128(1), "kw", "some article text here").await;
        assert_eq!(outcome.report.hybrid, 0.0);
        assert!(outcome.report.nearest_job_id.is_none());
        assert!(outcome.embed_error.is_none());
    }

    #[tokio::test]
    async fn identical_text_is_a_perfect_match() {
        let checker = SimilarityChecker::char_only();
        let batch = BatchMemory::new();
        let text = "cloud security best practices for growing teams in 2026";
        checker.check(&batch, Uuid::from_u128(1), "kw", text).await;
        let outcome = checker.check(&batch, Uuid::from_u128(2), "kw", text).await;
        assert!(outcome.report.hybrid >= DUPLICATE_THRESHOLD);
        assert_eq!(outcome.report.nearest_job_id, Some(Uuid::from_u128(1)));
    }

    #[tokio::test]
    async fn dissimilar_text_stays_below_threshold() {
        let checker = SimilarityChecker::char_only();
        let batch = BatchMemory::new();
        checker
            .check(&batch, Uuid::from_u128(1), "kw", "an article about deep sea fishing techniques")
            .await;
        let outcome = checker
            .check(&batch, Uuid::from_u128(2), "kw", "quarterly tax filing deadlines for small businesses")
            .await;
        assert!(outcome.report.hybrid < DUPLICATE_THRESHOLD);
    }

    struct FailingEmbeddingClient;

    #[async_trait::async_trait]
    impl EmbeddingClient for FailingEmbeddingClient {
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("embedding service down")
        }
    }

    #[tokio::test]
    async fn embed_failure_falls_back_to_char_sim_and_surfaces_the_error() {
        let checker = SimilarityChecker::with_embedding(Arc::new(FailingEmbeddingClient));
        let batch = BatchMemory::new();
        let text = "cloud security best practices for growing teams in 2026";
        checker.check(&batch, Uuid::from_u128(1), "kw", text).await;
        let outcome = checker.check(&batch, Uuid::from_u128(2), "kw", text).await;
        assert!(outcome.embed_error.is_some());
        assert!(outcome.report.sem_sim.is_none());
        assert_eq!(outcome.report.hybrid, outcome.report.char_sim);
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let a = char_shingles("the quick brown fox jumps over the lazy dog");
        let b = char_shingles("the quick brown fox jumps over the lazy dog");
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![1.0_f32, 2.0, 3.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }
}
