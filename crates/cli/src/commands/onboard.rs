//! `fitcoach onboard` — First-time setup.

use anyhow::Context;
use fitcoach_config::AppConfig;

pub async fn run(force: bool) -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🏋️ FitCoach — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let documents_dir = AppConfig::load_from(&config_path)
        .map(|c| c.knowledge.documents_dir)
        .unwrap_or_else(|_| AppConfig::default().knowledge.documents_dir);
    if !documents_dir.exists() {
        std::fs::create_dir_all(&documents_dir)
            .with_context(|| format!("Failed to create {}", documents_dir.display()))?;
        println!("✅ Created documents folder: {}", documents_dir.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. Export GROQ_API_KEY (or add api_key to {})", config_path.display());
    println!("   2. Put fitness PDFs or text files in {}", documents_dir.display());
    println!("   3. Run: fitcoach chat\n");

    Ok(())
}
