//! Outline command implementation.

use crate::agent::format_outline;
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::retrieval::{RetrievalBackend, VectorRetriever};
use crate::vector_store::open_store;
use anyhow::Result;
use std::sync::Arc;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let embedder = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    )?);
    let retriever = VectorRetriever::new(store, embedder);

    match retriever.course_outline(course).await {
        Some(outline) => {
            println!("{}", format_outline(&outline));
            let linked: Vec<_> = outline
                .lessons
                .iter()
                .filter_map(|l| l.lesson_link.as_ref().map(|link| (l.lesson_number, link)))
                .collect();
            if !linked.is_empty() {
                Output::header("Lesson links");
                for (number, link) in linked {
                    Output::kv(&format!("Lesson {}", number), link);
                }
            }
        }
        None => {
            Output::warning(&format!("No course found matching '{}'.", course));
        }
    }

    Ok(())
}
