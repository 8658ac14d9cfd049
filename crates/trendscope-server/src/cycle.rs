//! Brain cycle driver: runs the four pipeline stages in order against live
//! storage and the external services.
//!
//! Stage failures are recorded in the report and never abort the whole run;
//! completed stages keep their writes (no cross-stage rollback). The
//! wall-clock ceiling is checked between stages and between work batches
//! inside a stage, so in-flight record writes always finish.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use trendscope_core::{AppConfig, BrandScrubber, MarketsFile, TrendPhase};
use trendscope_engine::{
    blend_score, classify, compute_window, iso_week_start, percentile_rank, run_enrichment,
    CycleDeadline, CycleMode, CyclePlan, CycleReport, CycleStage, EnrichCandidate, Enrichment,
    EnrichmentStore, ScoringPolicy, SignalSample, WindowEntry,
};
use trendscope_genai::{ImageGenClient, TextGenClient};

/// How far back the scoring stage looks for fresh signal samples.
const SIGNAL_LOOKBACK_DAYS: i64 = 7;

/// Most recent score observations considered during classification.
const HISTORY_DEPTH: i64 = 8;

/// [`EnrichmentStore`] backed by the live `trend_records` table.
struct PgEnrichmentStore<'a> {
    pool: &'a PgPool,
}

impl EnrichmentStore for PgEnrichmentStore<'_> {
    async fn select_unenriched(&self, limit: usize) -> anyhow::Result<Vec<EnrichCandidate>> {
        let rows = trendscope_db::select_unenriched(self.pool, i64::try_from(limit)?).await?;
        Ok(rows
            .into_iter()
            .map(|row| EnrichCandidate {
                record_id: row.id,
                name: row.name,
                brand: row.brand,
                category: row.category,
                style_tag: row.style_tag,
                segment: row.segment,
                score: row.score,
                phase: TrendPhase::parse_or_emerging(&row.phase),
            })
            .collect())
    }

    async fn commit_enrichment(
        &self,
        record_id: i64,
        enrichment: &Enrichment,
    ) -> anyhow::Result<bool> {
        Ok(trendscope_db::complete_enrichment(
            self.pool,
            record_id,
            &enrichment.advisory,
            &enrichment.rationale,
            &enrichment.image_ref,
        )
        .await?)
    }
}

/// Run one full cycle in `mode` and return the report.
///
/// Never returns an error: every failure ends up in the report instead, so
/// the trigger caller and the scheduler both always get a summary.
pub async fn run_cycle(
    pool: &PgPool,
    config: &AppConfig,
    markets: &MarketsFile,
    mode: CycleMode,
) -> CycleReport {
    let plan = CyclePlan::build(mode, config, &markets.segment_names());
    let deadline = CycleDeadline::new(plan.ceiling);
    let mut report = CycleReport::new(mode);
    let policy = ScoringPolicy::default();

    tracing::info!(
        mode = %mode,
        segments = plan.segments.len(),
        enrich_limit = plan.enrich_limit,
        ceiling_secs = plan.ceiling.as_secs(),
        "cycle: starting"
    );

    'stages: for stage in CycleStage::ALL {
        if deadline.expired() {
            report.record_timeout(stage);
            break 'stages;
        }

        let outcome = match stage {
            CycleStage::RefreshIngestion => {
                refresh_ingestion(pool, config, markets, &plan, &deadline, &mut report).await
            }
            CycleStage::ScoreAndClassify => {
                score_and_classify(pool, &plan, &policy, &mut report).await
            }
            CycleStage::AggregateMarket => {
                aggregate_market(pool, markets, &plan, &policy, &mut report).await
            }
            CycleStage::Enrich => enrich(pool, config, &plan, &mut report).await,
        };

        match outcome {
            Ok(()) => {
                report.complete_stage(stage);
                tracing::info!(stage = %stage, elapsed = ?deadline.elapsed(), "cycle: stage complete");
            }
            Err(e) => {
                tracing::error!(stage = %stage, error = %e, "cycle: stage failed");
                report.record_error(stage, e.to_string());
            }
        }
    }

    report.elapsed_ms = u64::try_from(deadline.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        mode = %mode,
        stages = report.stages_completed.len(),
        errors = report.errors.len(),
        elapsed_ms = report.elapsed_ms,
        "cycle: finished"
    );
    report
}

/// Stage 1: pull the trending feed for every in-plan (segment, zone) pair,
/// scrub it, and upsert records plus raw signal samples.
async fn refresh_ingestion(
    pool: &PgPool,
    config: &AppConfig,
    markets: &MarketsFile,
    plan: &CyclePlan,
    deadline: &CycleDeadline,
    report: &mut CycleReport,
) -> anyhow::Result<()> {
    let client = trendscope_catalog::CatalogClient::new(
        &config.catalog_base_url,
        config.catalog_request_timeout_secs,
        &config.catalog_user_agent,
        config.catalog_max_retries,
        config.catalog_retry_backoff_base_ms,
    )?;
    let scrubber = BrandScrubber::new(&markets.distributors);

    for segment in &plan.segments {
        for zone in &markets.zones {
            if deadline.expired() {
                report.record_error(
                    CycleStage::RefreshIngestion,
                    format!("ceiling reached before fetching {segment}/{zone}"),
                );
                return Ok(());
            }

            let fetched_at = Utc::now();
            let items = match client.fetch_trending(segment, zone).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(segment, zone, error = %e, "cycle: trending fetch failed");
                    report.record_error(
                        CycleStage::RefreshIngestion,
                        format!("{segment}/{zone}: {e}"),
                    );
                    continue;
                }
            };

            let observations =
                trendscope_catalog::normalize_items(items, &scrubber, segment, zone, fetched_at);
            let count = observations.len();

            for obs in observations {
                let record = trendscope_db::NewTrendRecord {
                    source_ref: obs.source_ref,
                    name: obs.name,
                    brand: obs.brand,
                    category: obs.category,
                    style_tag: obs.style_tag,
                    segment: obs.segment,
                    market_zone: obs.market_zone,
                };
                let record_id = trendscope_db::upsert_trend_record(pool, &record).await?;
                trendscope_db::insert_signal_sample(
                    pool,
                    record_id,
                    obs.popularity,
                    obs.velocity,
                    obs.observed_at,
                )
                .await?;
            }

            tracing::debug!(segment, zone, count, "cycle: ingested observations");
        }
    }

    Ok(())
}

/// Stage 2: blend recent signals into each record's score and classify its
/// lifecycle phase against segment percentiles.
async fn score_and_classify(
    pool: &PgPool,
    plan: &CyclePlan,
    policy: &ScoringPolicy,
    report: &mut CycleReport,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let since = now - ChronoDuration::days(SIGNAL_LOOKBACK_DAYS);
    let rows = trendscope_db::list_scoring_rows(pool, &plan.segments).await?;

    // First pass: blended scores and histories, grouped per segment so
    // percentile ranks can be taken over the whole segment batch.
    struct Pending {
        record_id: i64,
        segment: String,
        prior: f64,
        score: f64,
        history: Vec<f64>,
    }

    let mut pending: Vec<Pending> = Vec::with_capacity(rows.len());
    for row in rows {
        let samples = trendscope_db::list_signal_samples_since(pool, row.id, since).await?;
        let signals: Vec<SignalSample> = samples
            .iter()
            .map(|s| SignalSample {
                popularity: s.popularity,
                velocity: s.velocity,
                observed_at: s.observed_at,
            })
            .collect();

        let score = blend_score(row.score, &signals, now, policy);
        let mut history = trendscope_db::list_score_history(pool, row.id, HISTORY_DEPTH).await?;
        history.push(score);

        pending.push(Pending {
            record_id: row.id,
            segment: row.segment,
            prior: row.score,
            score,
            history,
        });
    }

    // Second pass: classify and persist, per segment.
    for segment in &plan.segments {
        let segment_scores: Vec<f64> = pending
            .iter()
            .filter(|p| &p.segment == segment)
            .map(|p| p.score)
            .collect();

        for entry in pending.iter().filter(|p| &p.segment == segment) {
            let percentile = percentile_rank(&segment_scores, entry.score);
            let phase = classify(&entry.history, Some(percentile), policy);
            let delta = entry.score - entry.prior;

            if let Err(e) = trendscope_db::apply_scoring(
                pool,
                entry.record_id,
                entry.score,
                delta,
                phase.as_str(),
                now,
            )
            .await
            {
                tracing::warn!(record_id = entry.record_id, error = %e, "cycle: scoring write failed");
                report.record_error(
                    CycleStage::ScoreAndClassify,
                    format!("record {}: {e}", entry.record_id),
                );
            }
        }
    }

    Ok(())
}

/// Stage 3: recompute and persist the market window snapshot for every
/// in-plan (segment, zone) pair and the current ISO week.
async fn aggregate_market(
    pool: &PgPool,
    markets: &MarketsFile,
    plan: &CyclePlan,
    policy: &ScoringPolicy,
    report: &mut CycleReport,
) -> anyhow::Result<()> {
    let week_start = iso_week_start(Utc::now());

    for segment in &plan.segments {
        for zone in &markets.zones {
            let rows =
                trendscope_db::list_window_entries(pool, segment, zone, week_start).await?;
            let entries: Vec<WindowEntry> = rows
                .into_iter()
                .map(|row| WindowEntry {
                    record_id: row.id,
                    name: row.name,
                    brand: row.brand,
                    score: row.score,
                    delta: row.score_delta,
                    first_observed_at: row.first_observed_at,
                })
                .collect();

            let window = compute_window(&entries, policy.significance);
            let payload = match serde_json::to_value(&window) {
                Ok(payload) => payload,
                Err(e) => {
                    report.record_error(
                        CycleStage::AggregateMarket,
                        format!("{segment}/{zone}: {e}"),
                    );
                    continue;
                }
            };

            trendscope_db::upsert_market_window(pool, segment, zone, week_start, &payload).await?;
            tracing::debug!(
                segment,
                zone,
                movers = window.top_movers.len(),
                "cycle: market window stored"
            );
        }
    }

    Ok(())
}

/// Stage 4: advisory text and imagery for unenriched records, atomic per
/// record, under the plan's batch limit.
async fn enrich(
    pool: &PgPool,
    config: &AppConfig,
    plan: &CyclePlan,
    report: &mut CycleReport,
) -> anyhow::Result<()> {
    let text_gen = TextGenClient::new(
        &config.textgen_base_url,
        config.textgen_api_key.as_deref(),
        config.genai_request_timeout_secs,
    )?;
    let image_gen = ImageGenClient::new(
        &config.imagegen_base_url,
        config.imagegen_api_key.as_deref(),
        config.genai_request_timeout_secs,
    )?;
    let store = PgEnrichmentStore { pool };

    let batch = run_enrichment(
        &store,
        &text_gen,
        &image_gen,
        plan.enrich_limit,
        config.enrich_concurrency,
    )
    .await?;

    for failure in &batch.errors {
        report.record_error(
            CycleStage::Enrich,
            format!("record {}: {} ({})", failure.record_id, failure.message, failure.stage),
        );
    }

    tracing::info!(
        selected = batch.selected,
        enriched = batch.enriched,
        skipped = batch.skipped,
        "cycle: enrichment done"
    );
    Ok(())
}
