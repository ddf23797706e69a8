//! Import command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::{CourseDocument, RagSystem};
use anyhow::{Context, Result};

/// Run the import command.
pub async fn run_import(file: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Import) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = Settings::expand_path(file);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: CourseDocument = serde_json::from_str(&content)
        .with_context(|| format!("Invalid course file {}", path.display()))?;

    let title = document.course.title.clone();
    let system = RagSystem::from_settings(&settings)?;

    let spinner = Output::spinner(&format!("Embedding {} chunks...", document.chunks.len()));
    let result = system.add_course_document(document).await;
    spinner.finish_and_clear();

    let stored = result?;
    Output::success(&format!("Imported '{}' with {} chunks.", title, stored));

    Ok(())
}
