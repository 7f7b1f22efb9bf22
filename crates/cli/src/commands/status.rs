//! `fitcoach status` — Knowledge base and provider summary.

use fitcoach_agent::KnowledgeStatus;
use fitcoach_config::AppConfig;

use super::load_coach;

pub async fn run(json: bool) -> anyhow::Result<()> {
    let coach = load_coach()?;
    let status = coach.status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("🏋️ FitCoach Status");
    println!("==================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", status.provider);
    println!("  Model:        {}", status.model);
    println!("  Language:     {}", status.language);
    println!(
        "  API key:      {}",
        if status.api_key_configured { "configured" } else { "missing" }
    );
    println!("  Documents:    {}", status.documents_dir);
    match &status.knowledge {
        KnowledgeStatus::Ready { documents, chunks } => {
            println!("  Knowledge:    {documents} documents, {chunks} chunks");
        }
        KnowledgeStatus::Empty => println!("  Knowledge:    empty (answers without retrieval)"),
        KnowledgeStatus::Failed { reason } => println!("  Knowledge:    failed: {reason}"),
    }

    Ok(())
}
