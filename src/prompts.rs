//! Instruction templates for bullet and narration generation.
//!
//! Every prompt lives here so wording changes touch exactly one place and
//! unit tests can inspect the templates without calling a model.

use crate::config::NarrationMode;

/// System prompt for turning section content into slide bullets.
pub const BULLETS_SYSTEM_PROMPT: &str = r#"Create a list of bullet points based on the content provided.
- Minimal 3 items in the list.
- Maximum 8 items in the list.
- Make sure to be concise, complete and clear.
- Each bullet point should be maximum 5 words long."#;

/// System prompt for the speaker transcript; `{mode}` is replaced by the
/// mode-specific instruction from [`mode_instruction`].
pub const NARRATION_SYSTEM_PROMPT: &str = r#"Create a speaker transcript based on the content provided.
- You are a professional instructor and you are giving a presentation.
- Do not include any bullet points or lists.
- Make sure to be concise and clear.
- Use natural language and avoid markdown, code fragments, or any other formatting.
- File extensions should be in uppercase (like .MP4, .PDF, etc.)
- This will be used for a video, so make sure to use a friendly and engaging tone.
- {mode}"#;

/// The fixed instruction appended for each narration mode.
pub fn mode_instruction(mode: NarrationMode) -> &'static str {
    match mode {
        NarrationMode::Intro => {
            "Welcome the audience. At the end, you do not have to say goodbye or thank the audience."
        }
        NarrationMode::Conclusion => {
            "Do not include an introducion or greeting, but at the end, thank the audience for watching the video."
        }
        NarrationMode::Content => "Do not include any greetings or introductions.",
    }
}

/// Full narration system prompt for `mode`.
pub fn narration_system_prompt(mode: NarrationMode) -> String {
    NARRATION_SYSTEM_PROMPT.replace("{mode}", mode_instruction(mode))
}

pub fn bullets_user_prompt(content: &str) -> String {
    format!("Generate a list of bullet points based on the following content:\n\n{content}")
}

pub fn narration_user_prompt(content: &str) -> String {
    format!("Generate the speaker transcript:\n\n{content}")
}
