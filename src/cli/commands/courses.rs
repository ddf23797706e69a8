//! Courses command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the courses command.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    let titles = store.course_titles().await?;
    if titles.is_empty() {
        Output::info("No courses indexed yet. Import one with 'syllabus import <file.json>'.");
        return Ok(());
    }

    Output::header(&format!("Courses ({})", titles.len()));
    for title in &titles {
        match store.get_course(title).await? {
            Some(course) => {
                let instructor = course
                    .instructor
                    .map(|i| format!(", {}", i))
                    .unwrap_or_default();
                Output::list_item(&format!(
                    "{} ({} lessons{})",
                    course.title,
                    course.lessons.len(),
                    instructor
                ));
            }
            None => Output::list_item(title),
        }
    }

    println!();
    Output::kv("Indexed chunks", &store.chunk_count().await?.to_string());

    Ok(())
}
