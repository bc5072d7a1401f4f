//! Init command implementation

use anyhow::{bail, Result};
use std::path::PathBuf;

use levelup::Config;

/// Default configuration content for levelup init
pub const DEFAULT_CONFIG: &str = r#"# levelup configuration
# =====================

# XP cost per level and the level at which a category prestiges
[leveling]
xp_per_level = 1000
max_level = 100

# Bonus XP for streak-eligible awards: min(streak_days * per_day, cap)
[streak_bonus]
per_day = 2
cap = 20

# Ledger database (defaults to ~/.levelup/progression.db)
[storage]
# db_path = "/path/to/progression.db"

# Routines award XP to one or more categories per completion
# Categories: physical, mental, financial, social, spiritual, career
[[routine]]
id = "morning-run"
gains = { physical = 30, mental = 10 }

[[routine]]
id = "budget-review"
gains = { financial = 25 }
"#;

/// Write a default config file
pub async fn init_command(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Config::global_config_path);

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::write_file(&config_path, DEFAULT_CONFIG)?;
    println!(
        "Created: {} ({} routine(s))",
        config_path.display(),
        config.routines.len()
    );

    Ok(())
}
