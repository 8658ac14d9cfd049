//! Command handlers for the CLI.
//!
//! Read commands go straight to the database; the cycle trigger goes through
//! the server so the secret gate and single-run lock apply.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Print tracked trends as a compact table, highest score first.
pub(crate) async fn list_trends(
    pool: &PgPool,
    segment: Option<&str>,
    zone: Option<&str>,
    phase: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = trendscope_db::list_trend_records(
        pool,
        trendscope_db::TrendListFilters {
            segment,
            market_zone: zone,
            phase,
            limit: Some(limit.clamp(1, 200)),
        },
    )
    .await?;

    if rows.is_empty() {
        println!("no trends match the given filters");
        return Ok(());
    }

    println!(
        "{:<40} {:<24} {:<8} {:<8} {:>7} {:>7} {:<10}",
        "name", "brand", "segment", "zone", "score", "delta", "phase"
    );
    for row in rows {
        println!(
            "{:<40} {:<24} {:<8} {:<8} {:>7.1} {:>+7.1} {:<10}",
            truncate(&row.name, 40),
            truncate(&row.brand, 24),
            row.segment,
            row.market_zone,
            row.score,
            row.score_delta,
            row.phase
        );
    }
    Ok(())
}

/// Recompute and print the market window for one (segment, zone) pair.
///
/// For the current week this always reflects live record state; past weeks
/// fall back to the stored snapshot.
pub(crate) async fn print_market_window(
    pool: &PgPool,
    segment: &str,
    zone: &str,
    week_of: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let current_week = trendscope_engine::iso_week_start(now);
    let week_start = match week_of {
        Some(date) => trendscope_engine::iso_week_start(
            date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc(),
        ),
        None => current_week,
    };

    let payload = if week_start == current_week {
        let rows = trendscope_db::list_window_entries(pool, segment, zone, week_start).await?;
        let entries: Vec<trendscope_engine::WindowEntry> = rows
            .into_iter()
            .map(|row| trendscope_engine::WindowEntry {
                record_id: row.id,
                name: row.name,
                brand: row.brand,
                score: row.score,
                delta: row.score_delta,
                first_observed_at: row.first_observed_at,
            })
            .collect();
        let significance = trendscope_engine::ScoringPolicy::default().significance;
        serde_json::to_value(trendscope_engine::compute_window(&entries, significance))?
    } else {
        trendscope_db::get_market_window(pool, segment, zone, week_start)
            .await?
            .map(|row| row.payload)
            .ok_or_else(|| {
                anyhow::anyhow!("no snapshot stored for {segment}/{zone} week {week_start}")
            })?
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Show this month's consumption for one (user, feature) pair.
pub(crate) async fn show_usage(
    pool: &PgPool,
    user_id: Uuid,
    feature_key: &str,
) -> anyhow::Result<()> {
    let (month_start, month_end) = trendscope_engine::month_bounds(Utc::now());
    let used =
        trendscope_db::feature_count_between(pool, user_id, feature_key, month_start, month_end)
            .await?;
    println!(
        "{used} event(s) for user {user_id}, feature '{feature_key}' since {}",
        month_start.format("%Y-%m-%d")
    );
    Ok(())
}

/// Append one usage event for a user and feature.
pub(crate) async fn record_usage(
    pool: &PgPool,
    user_id: Uuid,
    feature_key: &str,
) -> anyhow::Result<()> {
    let id = trendscope_db::record_usage(pool, user_id, feature_key, Utc::now()).await?;
    println!("recorded usage event {id} for user {user_id}, feature '{feature_key}'");
    Ok(())
}

/// Trigger a brain cycle on a running server and print its report.
pub(crate) async fn trigger_cycle(
    server_url: &str,
    secret: &str,
    turbo: bool,
) -> anyhow::Result<()> {
    let url = format!(
        "{}/api/v1/cycle/run?turbo={turbo}",
        server_url.trim_end_matches('/')
    );
    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .header("x-cycle-secret", secret)
        .send()
        .await?;

    let status = response.status();
    let body: serde_json::Value = response.json().await?;

    if !status.is_success() {
        let message = body["error"]["message"].as_str().unwrap_or("unknown error");
        anyhow::bail!("cycle trigger failed ({status}): {message}");
    }

    println!("{}", serde_json::to_string_pretty(&body["data"])?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("veste", 10), "veste");
    }

    #[test]
    fn truncate_shortens_long_strings_with_ellipsis() {
        let out = truncate("a very long product name indeed", 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }
}
