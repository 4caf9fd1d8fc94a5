use std::path::PathBuf;

use supportdesk_db::{KnowledgeBaseSeed, SeedResult, SqlDocumentStore, DEFAULT_FAQ_PATH};

use crate::commands::{build_runtime, load_config, open_migrated_pool, CommandResult};

pub fn run(faq_path: Option<PathBuf>) -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let faq_path = faq_path.unwrap_or_else(|| PathBuf::from(DEFAULT_FAQ_PATH));
    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let store = SqlDocumentStore::new(pool.clone());
        let seeded = KnowledgeBaseSeed::load(&store, &faq_path)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8));
        pool.close().await;
        seeded
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded, &faq_path)),
        Err(failure) => CommandResult::from_step("seed", failure),
    }
}

fn summary(seeded: &SeedResult, faq_path: &std::path::Path) -> String {
    let faq = if seeded.used_faq_fallback {
        format!("{} not found, built-in FAQ used", faq_path.display())
    } else {
        format!("faq from {}", faq_path.display())
    };
    format!(
        "knowledge base seeded: inserted {}, skipped {} ({faq})",
        seeded.inserted.len(),
        seeded.skipped.len()
    )
}
