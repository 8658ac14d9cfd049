//! Enrichment pipeline: advisory text and representative imagery for trends
//! that have neither.
//!
//! Each record is processed independently under a bounded concurrency limit.
//! Enrichment is atomic per record: the commit stores advisory text and image
//! reference together, guarded by a still-unenriched precondition so
//! concurrent runs cannot double-charge the external services. A record whose
//! image call fails after a successful text call stays unenriched and remains
//! eligible for a later pass.

use futures::StreamExt;
use trendscope_core::TrendPhase;
use trendscope_genai::{AdvisoryRequest, GenaiError, ImageGenClient, TextGenClient};

/// Hard server-side cap on one enrichment batch, whatever the caller asks for.
pub const MAX_ENRICH_BATCH: usize = 50;

/// A trend record selected for enrichment (advisory text or image missing).
#[derive(Debug, Clone)]
pub struct EnrichCandidate {
    pub record_id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub style_tag: String,
    pub segment: String,
    pub score: f64,
    pub phase: TrendPhase,
}

/// The complete enrichment payload committed atomically per record.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub advisory: String,
    pub rationale: String,
    pub image_ref: String,
}

/// One record's failure, reported without aborting the batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EnrichmentFailure {
    pub record_id: i64,
    pub stage: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// Outcome of one enrichment batch.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EnrichmentReport {
    /// Records selected for this batch.
    pub selected: usize,
    /// Records fully enriched and committed.
    pub enriched: usize,
    /// Records skipped at commit time because another run got there first.
    pub skipped: usize,
    pub errors: Vec<EnrichmentFailure>,
}

/// Storage seam for the enrichment pipeline.
///
/// `select_unenriched` must return only records lacking advisory text or
/// image; `commit_enrichment` must persist text and image together and return
/// `false` without writing when the record is already enriched (the
/// check-then-write is scoped per record, so no global lock is needed).
#[allow(async_fn_in_trait)]
pub trait EnrichmentStore {
    async fn select_unenriched(&self, limit: usize) -> anyhow::Result<Vec<EnrichCandidate>>;
    async fn commit_enrichment(&self, record_id: i64, enrichment: &Enrichment)
        -> anyhow::Result<bool>;
}

/// Advisory-text seam, implemented by [`TextGenClient`] and by test doubles.
#[allow(async_fn_in_trait)]
pub trait AdvisoryGenerator {
    async fn advisory(
        &self,
        candidate: &EnrichCandidate,
    ) -> Result<trendscope_genai::Advisory, GenaiError>;
}

/// Image seam, implemented by [`ImageGenClient`] and by test doubles.
#[allow(async_fn_in_trait)]
pub trait ImageGenerator {
    async fn image(&self, prompt: &str) -> Result<String, GenaiError>;
}

impl AdvisoryGenerator for TextGenClient {
    async fn advisory(
        &self,
        candidate: &EnrichCandidate,
    ) -> Result<trendscope_genai::Advisory, GenaiError> {
        self.generate_advisory(&AdvisoryRequest {
            name: candidate.name.clone(),
            brand: candidate.brand.clone(),
            category: candidate.category.clone(),
            style_tag: candidate.style_tag.clone(),
            segment: candidate.segment.clone(),
            score: candidate.score,
            phase: candidate.phase.to_string(),
        })
        .await
    }
}

impl ImageGenerator for ImageGenClient {
    async fn image(&self, prompt: &str) -> Result<String, GenaiError> {
        self.generate_image(prompt).await
    }
}

/// Image prompt derived from the advisory text (step 2 depends on step 1).
#[must_use]
pub fn image_prompt(candidate: &EnrichCandidate, advisory: &str) -> String {
    format!(
        "Editorial fashion photograph of {name}, {category} in the {style} style for the \
         {segment} segment. Mood: {advisory}",
        name = candidate.name,
        category = candidate.category,
        style = candidate.style_tag,
        segment = candidate.segment,
        advisory = advisory,
    )
}

/// Run one enrichment batch over up to `limit` unenriched records.
///
/// `limit` is clamped to `1..=`[`MAX_ENRICH_BATCH`]. Records are processed
/// with at most `concurrency` in-flight external calls. Per-record failures
/// are collected into the report; only a selection failure aborts the batch.
///
/// # Errors
///
/// Returns an error only when the store cannot list candidates.
pub async fn run_enrichment<S, T, I>(
    store: &S,
    text_gen: &T,
    image_gen: &I,
    limit: usize,
    concurrency: usize,
) -> anyhow::Result<EnrichmentReport>
where
    S: EnrichmentStore,
    T: AdvisoryGenerator,
    I: ImageGenerator,
{
    let limit = limit.clamp(1, MAX_ENRICH_BATCH);
    let candidates = store.select_unenriched(limit).await?;

    let mut report = EnrichmentReport {
        selected: candidates.len(),
        ..EnrichmentReport::default()
    };

    if candidates.is_empty() {
        tracing::debug!("enrichment: no unenriched records; nothing to do");
        return Ok(report);
    }

    tracing::info!(
        selected = candidates.len(),
        concurrency,
        "enrichment: starting batch"
    );

    let outcomes: Vec<Result<bool, EnrichmentFailure>> = futures::stream::iter(candidates)
        .map(|candidate| enrich_one(store, text_gen, image_gen, candidate))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            Ok(true) => report.enriched += 1,
            Ok(false) => report.skipped += 1,
            Err(failure) => {
                tracing::warn!(
                    record_id = failure.record_id,
                    stage = failure.stage,
                    error = %failure.message,
                    "enrichment: record failed"
                );
                report.errors.push(failure);
            }
        }
    }

    tracing::info!(
        enriched = report.enriched,
        skipped = report.skipped,
        failed = report.errors.len(),
        "enrichment: batch complete"
    );
    Ok(report)
}

/// Enrich a single record: advisory text, then image, then atomic commit.
///
/// `Ok(false)` means the commit precondition found the record already
/// enriched — a concurrent run won the race and no write happened here.
async fn enrich_one<S, T, I>(
    store: &S,
    text_gen: &T,
    image_gen: &I,
    candidate: EnrichCandidate,
) -> Result<bool, EnrichmentFailure>
where
    S: EnrichmentStore,
    T: AdvisoryGenerator,
    I: ImageGenerator,
{
    let advisory = text_gen
        .advisory(&candidate)
        .await
        .map_err(|e| EnrichmentFailure {
            record_id: candidate.record_id,
            stage: "advisory",
            message: e.to_string(),
            retryable: e.is_retryable(),
        })?;

    let prompt = image_prompt(&candidate, &advisory.advisory);
    let image_ref = image_gen
        .image(&prompt)
        .await
        .map_err(|e| EnrichmentFailure {
            record_id: candidate.record_id,
            stage: "image",
            message: e.to_string(),
            retryable: e.is_retryable(),
        })?;

    let enrichment = Enrichment {
        advisory: advisory.advisory,
        rationale: advisory.rationale,
        image_ref,
    };

    store
        .commit_enrichment(candidate.record_id, &enrichment)
        .await
        .map_err(|e| EnrichmentFailure {
            record_id: candidate.record_id,
            stage: "commit",
            message: e.to_string(),
            retryable: true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use trendscope_genai::Advisory;

    fn candidate(record_id: i64) -> EnrichCandidate {
        EnrichCandidate {
            record_id,
            name: format!("item-{record_id}"),
            brand: "Maison Rive".to_string(),
            category: "outerwear".to_string(),
            style_tag: "workwear".to_string(),
            segment: "homme".to_string(),
            score: 72.0,
            phase: TrendPhase::Growing,
        }
    }

    /// In-memory store: pending candidates plus committed enrichments.
    #[derive(Default)]
    struct FakeStore {
        pending: Mutex<Vec<EnrichCandidate>>,
        committed: Mutex<HashMap<i64, Enrichment>>,
        /// Record ids to treat as already enriched at commit time.
        lost_races: Vec<i64>,
    }

    impl FakeStore {
        fn with_pending(candidates: Vec<EnrichCandidate>) -> Self {
            Self {
                pending: Mutex::new(candidates),
                ..Self::default()
            }
        }
    }

    impl EnrichmentStore for FakeStore {
        async fn select_unenriched(&self, limit: usize) -> anyhow::Result<Vec<EnrichCandidate>> {
            let pending = self.pending.lock().unwrap();
            let committed = self.committed.lock().unwrap();
            Ok(pending
                .iter()
                .filter(|c| !committed.contains_key(&c.record_id))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn commit_enrichment(
            &self,
            record_id: i64,
            enrichment: &Enrichment,
        ) -> anyhow::Result<bool> {
            if self.lost_races.contains(&record_id) {
                return Ok(false);
            }
            let mut committed = self.committed.lock().unwrap();
            if committed.contains_key(&record_id) {
                return Ok(false);
            }
            committed.insert(record_id, enrichment.clone());
            Ok(true)
        }
    }

    struct CountingTextGen {
        calls: AtomicUsize,
        fail_for: Vec<i64>,
    }

    impl CountingTextGen {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_for: Vec::new(),
            }
        }
    }

    impl AdvisoryGenerator for CountingTextGen {
        async fn advisory(&self, candidate: &EnrichCandidate) -> Result<Advisory, GenaiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_for.contains(&candidate.record_id) {
                return Err(GenaiError::Api("text model unavailable".to_owned()));
            }
            Ok(Advisory {
                advisory: format!("Stock more of {}", candidate.name),
                rationale: format!("score {}", candidate.score),
            })
        }
    }

    struct CountingImageGen {
        calls: AtomicUsize,
        fail_all: bool,
    }

    impl CountingImageGen {
        fn new(fail_all: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_all,
            }
        }
    }

    impl ImageGenerator for CountingImageGen {
        async fn image(&self, _prompt: &str) -> Result<String, GenaiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all {
                return Err(GenaiError::Api("image model unavailable".to_owned()));
            }
            Ok("https://img.example.com/generated.png".to_owned())
        }
    }

    #[tokio::test]
    async fn full_batch_enriches_every_candidate() {
        let store = FakeStore::with_pending(vec![candidate(1), candidate(2), candidate(3)]);
        let text = CountingTextGen::new();
        let image = CountingImageGen::new(false);

        let report = run_enrichment(&store, &text, &image, 10, 2).await.unwrap();

        assert_eq!(report.selected, 3);
        assert_eq!(report.enriched, 3);
        assert!(report.errors.is_empty());
        let committed = store.committed.lock().unwrap();
        assert_eq!(committed.len(), 3);
        let one = committed.get(&1).expect("record 1 committed");
        assert!(!one.advisory.is_empty() && !one.image_ref.is_empty());
    }

    #[tokio::test]
    async fn limit_caps_the_selection() {
        let store = FakeStore::with_pending((1..=9).map(candidate).collect());
        let text = CountingTextGen::new();
        let image = CountingImageGen::new(false);

        let report = run_enrichment(&store, &text, &image, 4, 2).await.unwrap();
        assert_eq!(report.selected, 4);
        assert_eq!(text.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn already_enriched_records_trigger_no_external_calls() {
        // Everything already committed: selection is empty, so a second run
        // must not touch either external service.
        let store = FakeStore::with_pending(vec![candidate(1)]);
        let text = CountingTextGen::new();
        let image = CountingImageGen::new(false);

        let first = run_enrichment(&store, &text, &image, 10, 2).await.unwrap();
        assert_eq!(first.enriched, 1);
        let calls_after_first = text.calls.load(Ordering::SeqCst);

        let second = run_enrichment(&store, &text, &image, 10, 2).await.unwrap();
        assert_eq!(second.selected, 0);
        assert_eq!(second.enriched, 0);
        assert_eq!(text.calls.load(Ordering::SeqCst), calls_after_first);
        assert_eq!(image.calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[tokio::test]
    async fn image_failure_leaves_record_unenriched() {
        let store = FakeStore::with_pending(vec![candidate(7)]);
        let text = CountingTextGen::new();
        let image = CountingImageGen::new(true);

        let report = run_enrichment(&store, &text, &image, 10, 2).await.unwrap();

        assert_eq!(report.enriched, 0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].stage, "image");
        // Text succeeded but nothing was committed: the record stays in the
        // selection pool for the next pass.
        assert!(store.committed.lock().unwrap().is_empty());
        let next = store.select_unenriched(10).await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].record_id, 7);
    }

    #[tokio::test]
    async fn one_record_failure_does_not_block_the_rest() {
        let store = FakeStore::with_pending(vec![candidate(1), candidate(2), candidate(3)]);
        let text = CountingTextGen {
            calls: AtomicUsize::new(0),
            fail_for: vec![2],
        };
        let image = CountingImageGen::new(false);

        let report = run_enrichment(&store, &text, &image, 10, 1).await.unwrap();

        assert_eq!(report.enriched, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].record_id, 2);
        assert_eq!(report.errors[0].stage, "advisory");
        assert!(!report.errors[0].retryable);
    }

    #[tokio::test]
    async fn lost_commit_race_is_counted_as_skipped() {
        let store = FakeStore {
            pending: Mutex::new(vec![candidate(5)]),
            committed: Mutex::new(HashMap::new()),
            lost_races: vec![5],
        };
        let text = CountingTextGen::new();
        let image = CountingImageGen::new(false);

        let report = run_enrichment(&store, &text, &image, 10, 1).await.unwrap();
        assert_eq!(report.enriched, 0);
        assert_eq!(report.skipped, 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn image_prompt_carries_advisory_context() {
        let prompt = image_prompt(&candidate(1), "lean into heritage fabrics");
        assert!(prompt.contains("item-1"));
        assert!(prompt.contains("workwear"));
        assert!(prompt.contains("heritage fabrics"));
    }
}
