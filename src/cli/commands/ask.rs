//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    max_rounds: Option<usize>,
    show_tools: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }
    if let Some(max_rounds) = max_rounds {
        settings.llm.max_tool_rounds = max_rounds;
    }

    let system = RagSystem::from_settings(&settings)?;

    let spinner = Output::spinner("Searching course material...");

    match system.answer(question, None).await {
        Ok(response) => {
            spinner.finish_and_clear();

            if show_tools && !response.tool_calls.is_empty() {
                Output::header("Tool calls");
                for call in &response.tool_calls {
                    Output::list_item(&call.to_string());
                }
            }

            println!("\n{}\n", response.answer);
            Output::sources(&response.sources);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
