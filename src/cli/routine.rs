//! Routine completion command implementation

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use levelup::{CategoryOutcome, today};

use super::Engine;

/// Record a routine completion and award its XP
pub async fn complete_command(
    engine: &Engine,
    user_id: &str,
    routine_id: &str,
    date: Option<String>,
) -> Result<()> {
    let day = match date {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", date))?,
        None => today(),
    };

    engine.load_routine_history(user_id)?;
    let completion = engine
        .routines
        .complete_routine(user_id, routine_id, day)
        .await?;

    if !completion.counted {
        println!("'{}' was already completed on {}", completion.routine_id, day);
        return Ok(());
    }

    // Log the day even when only part of the award committed, so a rerun
    // retries just the owed categories
    let pending = completion.pending_gains();
    engine
        .store
        .record_completion(user_id, routine_id, day, &pending)?;

    println!(
        "Completed '{}' on {} (streak: {} day(s))",
        completion.routine_id, day, completion.streak
    );
    if let Some(report) = &completion.report {
        for result in &report.results {
            match &result.outcome {
                CategoryOutcome::Committed(award) => println!(
                    "  {:<10} +{} XP -> Lv {} ({} XP)",
                    result.category.label(),
                    result.base_delta + award.streak_bonus,
                    award.new_stats.level,
                    award.new_stats.xp
                ),
                CategoryOutcome::Failed(err) => {
                    println!("  {:<10} FAILED: {}", result.category.label(), err)
                }
                CategoryOutcome::NotAttempted => {
                    println!("  {:<10} not attempted", result.category.label())
                }
            }
        }
    }

    if !pending.is_empty() {
        bail!(
            "Routine XP partly awarded; run `levelup complete {} {} --date {}` again to retry",
            user_id,
            routine_id,
            day
        );
    }
    Ok(())
}
