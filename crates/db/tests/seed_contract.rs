use std::path::PathBuf;

use supportdesk_core::embedding::embed;
use supportdesk_db::fixtures::FAQ_TITLE;
use supportdesk_db::{
    connect_with_settings, migrations, DocumentStore, KnowledgeBaseSeed, SqlDocumentStore,
};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

fn repo_faq_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/kb/sample_faq.md")
}

async fn seeded_store() -> SeedContractTestResult<SqlDocumentStore> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    let store = SqlDocumentStore::new(pool);
    KnowledgeBaseSeed::load(&store, &repo_faq_path())
        .await
        .map_err(|error| format!("seed: {error}"))?;
    Ok(store)
}

#[tokio::test]
async fn shipped_faq_file_is_seeded_with_question_answer_lines() -> SeedContractTestResult {
    let store = seeded_store().await?;

    let faq = store
        .find_by_source(&repo_faq_path().to_string_lossy())
        .await
        .map_err(|error| format!("find faq: {error}"))?
        .ok_or_else(|| "faq document should be present".to_string())?;

    require_eq!(faq.title, FAQ_TITLE);
    require!(
        faq.body.lines().any(|line| line.trim_start().starts_with("A:")),
        "faq body should carry at least one `A:` answer line"
    );
    require_eq!(store.count().await.map_err(|error| error.to_string())?, 3);
    Ok(())
}

#[tokio::test]
async fn seeded_collection_answers_return_questions_by_similarity() -> SeedContractTestResult {
    let store = seeded_store().await?;

    let hits = store
        .nearest(&embed("return policy"), 3)
        .await
        .map_err(|error| format!("nearest: {error}"))?;

    require_eq!(hits.len(), 3);
    require!(
        hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance),
        "hits should be ranked by ascending distance"
    );
    require_eq!(hits[0].document.source.as_str(), "seed:return");
    Ok(())
}

#[tokio::test]
async fn every_seeded_document_is_reachable_by_keyword() -> SeedContractTestResult {
    let store = seeded_store().await?;

    for (term, source) in [("shipping", "seed:shipping"), ("receipt", "seed:return")] {
        let hits =
            store.keyword(term, 10).await.map_err(|error| format!("keyword {term}: {error}"))?;
        require!(
            hits.iter().any(|doc| doc.source == source),
            "keyword `{term}` should reach `{source}`"
        );
    }
    Ok(())
}
