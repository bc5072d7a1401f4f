//! Award and prestige command implementations

use anyhow::{bail, Result};

use levelup::{Category, CategoryOutcome, XpGains};

use super::Engine;

/// Parse a `category=xp` argument
pub fn parse_gain(arg: &str) -> Result<(Category, i64), String> {
    let (category, xp) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=XP, got '{}'", arg))?;
    let category: Category = category.parse().map_err(|e| format!("{}", e))?;
    let xp: i64 = xp
        .trim()
        .parse()
        .map_err(|_| format!("invalid XP amount '{}'", xp))?;
    Ok((category, xp))
}

/// Merge parsed gains, summing repeated categories
pub fn collect_gains(gains: &[(Category, i64)]) -> XpGains {
    let mut merged = XpGains::new();
    for (category, xp) in gains {
        *merged.entry(*category).or_insert(0) += xp;
    }
    merged
}

/// Award XP to a user's categories
pub async fn award_command(
    engine: &Engine,
    user_id: &str,
    gains: &[(Category, i64)],
    streak: bool,
) -> Result<()> {
    let gains = collect_gains(gains);
    if gains.is_empty() {
        bail!("No XP gains given");
    }
    if streak {
        engine.load_routine_history(user_id)?;
    }

    let report = engine.orchestrator.award_xp(user_id, &gains, streak).await?;

    if report.streak > 0 {
        println!("Streak: {} day(s)", report.streak);
    }
    for result in &report.results {
        match &result.outcome {
            CategoryOutcome::Committed(award) => {
                let stats = award.new_stats;
                print!(
                    "  {:<10} +{} XP",
                    result.category.label(),
                    result.base_delta + award.streak_bonus
                );
                if award.streak_bonus > 0 {
                    print!(" (incl. +{} streak)", award.streak_bonus);
                }
                println!(
                    " -> Lv {} ({} XP), prestige {}",
                    stats.level, stats.xp, stats.prestige
                );
                if award.prestiged_this_call {
                    println!("    Prestiged!");
                } else if stats.level > award.previous.level {
                    println!("    Level up: {} -> {}", award.previous.level, stats.level);
                }
            }
            CategoryOutcome::Failed(err) => {
                println!("  {:<10} FAILED: {}", result.category.label(), err);
            }
            CategoryOutcome::NotAttempted => {
                println!("  {:<10} not attempted", result.category.label());
            }
        }
    }

    if !report.is_complete() {
        let retry: Vec<String> = report
            .retry_gains()
            .iter()
            .map(|(c, xp)| format!("{}={}", c, xp))
            .collect();
        bail!("Award incomplete, retry with: {}", retry.join(" "));
    }
    Ok(())
}

/// Manually prestige a category at the max level
pub async fn prestige_command(engine: &Engine, user_id: &str, category: Category) -> Result<()> {
    let stats = engine.orchestrator.prestige(user_id, category).await?;
    println!(
        "{} prestiged: now prestige {} (level {})",
        category.label(),
        stats.prestige,
        stats.level
    );
    Ok(())
}
