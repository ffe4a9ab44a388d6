use crate::changes::ClassifiedChanges;
use crate::error::ConfigError;
use crate::llm::ChatMessage;

/// Shortest instruction prompt accepted, in characters.
pub const MIN_PROMPT_LEN: usize = 10;

pub fn validate_prompt(prompt: &str) -> Result<(), ConfigError> {
    // Unicode scalar values, not UTF-16 units: an emoji counts once, not twice.
    let len = prompt.chars().count();
    if len < MIN_PROMPT_LEN {
        return Err(ConfigError::PromptTooShort {
            len,
            min: MIN_PROMPT_LEN,
        });
    }
    Ok(())
}

/// Build the two user messages sent to the model: the quoted instruction,
/// then the rendered changes.
pub fn assemble(prompt: &str, changes: &ClassifiedChanges) -> Result<Vec<ChatMessage>, ConfigError> {
    validate_prompt(prompt)?;

    Ok(vec![
        ChatMessage::user(format!("\"{prompt}\"")),
        ChatMessage::user(render_changes(changes)),
    ])
}

/// Modified diffs, deletions, then renames. Empty groups still leave their
/// blank-line separator behind.
pub fn render_changes(changes: &ClassifiedChanges) -> String {
    format!(
        "{modified}\n\n{deleted}\n\n{renamed}",
        modified = changes.modified.join("\n"),
        deleted = changes.deleted.join("\n"),
        renamed = changes.renamed.join("\n"),
    )
}
