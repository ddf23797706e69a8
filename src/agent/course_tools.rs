//! Course tools: content search and outline retrieval.

use super::tools::{ParamKind, ParamSpec, Source, Tool, ToolArgs, ToolOutput, ToolSchema};
use crate::retrieval::{CourseOutline, RetrievalBackend, SearchResults};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Name under which the content-search tool is offered.
pub const SEARCH_TOOL_NAME: &str = "search_course_content";

/// Name under which the outline tool is offered.
pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

/// Searches course content with fuzzy course matching and lesson filtering.
pub struct CourseSearchTool {
    backend: Arc<dyn RetrievalBackend>,
}

impl CourseSearchTool {
    pub fn new(backend: Arc<dyn RetrievalBackend>) -> Self {
        Self { backend }
    }

    /// Format results and build citations sorted by course, then lesson.
    async fn format_results(&self, results: SearchResults) -> ToolOutput {
        let mut formatted = Vec::with_capacity(results.documents.len());
        let mut cited: Vec<(Source, String, Option<u32>)> = Vec::with_capacity(results.documents.len());

        for (doc, meta) in results.documents.iter().zip(results.metadata.iter()) {
            let label = match meta.lesson_number {
                Some(n) => format!("{} - Lesson {}", meta.course_title, n),
                None => meta.course_title.clone(),
            };

            let link = match meta.lesson_number {
                Some(n) => self.backend.lesson_link(&meta.course_title, n).await,
                None => None,
            };

            formatted.push(format!("[{}]\n{}", label, doc));
            cited.push((
                Source { text: label, link },
                meta.course_title.clone(),
                meta.lesson_number,
            ));
        }

        cited.sort_by(|(_, title_a, lesson_a), (_, title_b, lesson_b)| {
            title_a
                .cmp(title_b)
                .then_with(|| lessons_last(*lesson_a, *lesson_b))
        });

        ToolOutput::with_sources(
            formatted.join("\n\n"),
            cited.into_iter().map(|(source, _, _)| source).collect(),
        )
    }
}

/// Ascending lesson order with lesson-less fragments last.
fn lessons_last(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            SEARCH_TOOL_NAME,
            "Search course materials with smart course name matching and lesson filtering",
        )
        .with_param(ParamSpec::required(
            "query",
            ParamKind::String,
            "What to search for in the course content",
        ))
        .with_param(ParamSpec::optional(
            "course_name",
            ParamKind::String,
            "Course title (partial matches work, e.g. 'MCP', 'Introduction')",
        ))
        .with_param(ParamSpec::optional(
            "lesson_number",
            ParamKind::Integer,
            "Specific lesson number to search within (e.g. 1, 2, 3)",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> ToolOutput {
        let query = args.str("query").unwrap_or_default();
        let course_name = args.str("course_name");
        let lesson_number = match args.u32("lesson_number") {
            Ok(n) => n,
            Err(message) => return ToolOutput::text(message),
        };

        debug!(?course_name, ?lesson_number, "Searching course content");
        let results = self.backend.search(query, course_name, lesson_number).await;

        if let Some(error) = results.error {
            return ToolOutput::text(error);
        }

        if results.is_empty() {
            let mut filter_info = String::new();
            if let Some(course) = course_name {
                filter_info.push_str(&format!(" in course '{}'", course));
            }
            if let Some(lesson) = lesson_number {
                filter_info.push_str(&format!(" in lesson {}", lesson));
            }
            return ToolOutput::text(format!("No relevant content found{}.", filter_info));
        }

        self.format_results(results).await
    }
}

/// Retrieves a course outline with its lesson list.
pub struct CourseOutlineTool {
    backend: Arc<dyn RetrievalBackend>,
}

impl CourseOutlineTool {
    pub fn new(backend: Arc<dyn RetrievalBackend>) -> Self {
        Self { backend }
    }
}

/// Render an outline as shown to the model.
pub fn format_outline(outline: &CourseOutline) -> String {
    let mut lines = vec![format!("Course: {}", outline.title)];

    if let Some(link) = outline.course_link.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("Link: {}", link));
    }
    if let Some(instructor) = outline.instructor.as_deref().filter(|i| !i.is_empty()) {
        lines.push(format!("Instructor: {}", instructor));
    }

    if outline.lessons.is_empty() {
        lines.push("\nNo lessons found.".to_string());
    } else {
        lines.push(format!("\nLessons ({} total):", outline.lessons.len()));
        for lesson in &outline.lessons {
            lines.push(format!("  Lesson {}: {}", lesson.lesson_number, lesson.lesson_title));
        }
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            OUTLINE_TOOL_NAME,
            "Get the complete outline and structure of a course including all lessons",
        )
        .with_param(ParamSpec::required(
            "course_name",
            ParamKind::String,
            "Course title (partial matches work, e.g. 'MCP', 'Prompt Caching')",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> ToolOutput {
        let course_name = args.str("course_name").unwrap_or_default();

        match self.backend.course_outline(course_name).await {
            Some(outline) => ToolOutput::text(format_outline(&outline)),
            None => ToolOutput::text(format!("No course found matching '{}'.", course_name)),
        }
    }
}
