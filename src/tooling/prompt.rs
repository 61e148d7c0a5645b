//! Interactive conflict resolution on the terminal.

use crate::error::ApiError;
use crate::merge::{ConflictChoice, ConflictResolver};
use dialoguer::Select;

/// Asks the user through `dialoguer` prompts.
#[derive(Debug, Default)]
pub struct PromptResolver;

fn select(prompt: String, items: &[&str], choices: &[ConflictChoice]) -> Result<ConflictChoice, ApiError> {
    let selection = Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(1)
        .interact()
        .map_err(|e| ApiError::MergeConflict(format!("Failed to get user input: {}", e)))?;
    choices
        .get(selection)
        .copied()
        .ok_or_else(|| ApiError::MergeConflict(format!("Invalid selection {}", selection)))
}

fn excerpt(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("    | {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ConflictResolver for PromptResolver {
    fn resolve_lines(
        &mut self,
        line: usize,
        mine: &[String],
        theirs: &[String],
    ) -> Result<ConflictChoice, ApiError> {
        select(
            format!(
                "Conflict at line {}\n  mine:\n{}\n  theirs:\n{}\n",
                line + 1,
                excerpt(mine),
                excerpt(theirs)
            ),
            &["mine", "theirs", "both", "merge characters"],
            &[
                ConflictChoice::Mine,
                ConflictChoice::Theirs,
                ConflictChoice::Both,
                ConflictChoice::Descend,
            ],
        )
    }

    fn resolve_chars(&mut self, mine: &str, theirs: &str) -> Result<ConflictChoice, ApiError> {
        select(
            format!("Character conflict: mine '{}', theirs '{}'", mine, theirs),
            &["mine", "theirs", "both"],
            &[ConflictChoice::Mine, ConflictChoice::Theirs, ConflictChoice::Both],
        )
    }

    fn resolve_binary(&mut self, path: &str) -> Result<ConflictChoice, ApiError> {
        select(
            format!("Binary file {} differs", path),
            &["mine", "theirs"],
            &[ConflictChoice::Mine, ConflictChoice::Theirs],
        )
    }
}
