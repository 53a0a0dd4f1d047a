//! Prompt templates for hosted summarization

/// System message for the word-limited summary prompt
pub const SYSTEM_PROMPT: &str =
    "You are a ruthless summarization engine that never exceeds word limits.";

/// Instruction block asking for a `min_words`-`max_words` summary of `text`
///
/// The source text is embedded verbatim between separator lines.
pub fn word_limited_prompt(text: &str, min_words: usize, max_words: usize) -> String {
    format!(
        "|||NON-NEGOTIABLE INSTRUCTIONS|||\n\
         Create a {min}-{max} word summary that:\n\
         1. Is EXACTLY {max} words (ABSOLUTE LIMIT)\n\
         2. Uses COMPLETE SENTENCES only\n\
         3. Preserves ALL KEY INFORMATION from this text:\n\
         ----------------\n\
         {text}\n\
         ----------------\n\
         FORMAT YOUR RESPONSE AS:\n\
         [Your summary here]",
        min = min_words,
        max = max_words,
        text = text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_states_limits_and_embeds_text() {
        let text = "Line one.\n  Indented line two.";
        let prompt = word_limited_prompt(text, 40, 50);

        assert!(prompt.contains("Create a 40-50 word summary"));
        assert!(prompt.contains("EXACTLY 50 words (ABSOLUTE LIMIT)"));
        assert!(prompt.contains("COMPLETE SENTENCES"));
        assert!(prompt.contains(&format!("----------------\n{}\n----------------", text)));
    }
}
