//! Show command implementation

use anyhow::Result;
use serde::Serialize;

use levelup::{routine_streak, today, Category};

use super::Engine;

#[derive(Serialize)]
struct CategoryView {
    category: Category,
    level: u32,
    xp: u64,
    xp_needed: u64,
    progress: f32,
    prestige: u32,
    can_prestige: bool,
}

#[derive(Serialize)]
struct RoutineView {
    routine_id: String,
    streak: u32,
}

#[derive(Serialize)]
struct UserView {
    user_id: String,
    categories: Vec<CategoryView>,
    routines: Vec<RoutineView>,
}

/// Print a user's progression
pub async fn show_command(engine: &Engine, user_id: &str, json: bool) -> Result<()> {
    let snapshot = engine.orchestrator.snapshot(user_id).await?;
    let policy = engine.orchestrator.policy();

    let categories = snapshot
        .all()
        .into_iter()
        .map(|(category, stats)| CategoryView {
            category,
            level: stats.level,
            xp: stats.xp,
            xp_needed: policy.xp_needed_for_next_level(stats.level),
            progress: policy.progress(&stats),
            prestige: stats.prestige,
            can_prestige: policy.can_prestige(&stats),
        })
        .collect();

    let as_of = today();
    let routines = engine
        .store
        .completion_histories(user_id)?
        .into_iter()
        .map(|(routine_id, history)| RoutineView {
            streak: routine_streak(&history, as_of),
            routine_id,
        })
        .collect();

    let view = UserView {
        user_id: user_id.to_string(),
        categories,
        routines,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Progression for {}:\n", view.user_id);
    for c in &view.categories {
        println!(
            "  {:<10} Lv {:>3}  {:>5}/{:<5} ({:>3.0}%)  Prestige {}{}",
            c.category.label(),
            c.level,
            c.xp,
            c.xp_needed,
            c.progress * 100.0,
            c.prestige,
            if c.can_prestige { "  [prestige available]" } else { "" }
        );
    }

    if !view.routines.is_empty() {
        println!("\nRoutine streaks:");
        for r in &view.routines {
            println!("  {:<20} {} day(s)", r.routine_id, r.streak);
        }
    }

    Ok(())
}
